use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use dialog_apply::{ApplyResult, LeafResolution, ValueSource};
use serde_json::Value;

/// Table of per-setting decisions of an apply.
pub fn apply_summary_table(result: &ApplyResult) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Setting"),
        header_cell("Value"),
        header_cell("Source"),
        header_cell("Controlled by"),
        header_cell("Exposed as"),
    ]);
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
    align_column(&mut table, 2, CellAlignment::Center);
    for leaf in &result.leaves {
        table.add_row(vec![
            Cell::new(&leaf.path),
            value_cell(&leaf.value),
            source_cell(leaf),
            variable_cell(leaf.controlling_variable.as_deref()),
            variable_cell(leaf.exposed_variable.as_deref()),
        ]);
    }
    table
}

pub fn print_apply_summary(result: &ApplyResult) {
    println!("{}", apply_summary_table(result));
    let reset = if result.reset_required { "yes" } else { "no" };
    println!("Reset required: {reset}");
    if !result.warnings.is_empty() {
        eprintln!("Warnings:");
        for warning in &result.warnings {
            eprintln!("- {warning}");
        }
    }
}

fn value_cell(value: &Value) -> Cell {
    match value {
        Value::Null => dim_cell("null"),
        Value::String(text) => Cell::new(text),
        other => Cell::new(other.to_string()),
    }
}

fn source_cell(leaf: &LeafResolution) -> Cell {
    let cell = Cell::new(leaf.source.to_string());
    if leaf.flawed {
        return cell.fg(Color::Yellow).add_attribute(Attribute::Bold);
    }
    match leaf.source {
        ValueSource::FlowVariable => cell.fg(Color::Green),
        ValueSource::Submitted => cell,
        ValueSource::Previous | ValueSource::Default => cell.fg(Color::Yellow),
    }
}

fn variable_cell(name: Option<&str>) -> Cell {
    match name {
        Some(name) => Cell::new(name).fg(Color::Blue),
        None => dim_cell("-"),
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value.to_string()).fg(Color::DarkGrey)
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}
