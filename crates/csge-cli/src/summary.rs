use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use csge_model::{ProductReport, TableCounts};

use crate::cli::Request;
use crate::types::RunResult;

pub fn print_summary(result: &RunResult) {
    println!("Request: {}", describe_request(&result.request));
    if result.dry_run {
        println!("Dry run: nothing was written");
    }
    if let Some(created) = &result.created {
        println!(
            "Created product {} ({} dimensions, {} dimension values)",
            created.product_id, created.dimensions, created.dimension_values
        );
    }
    if result.outcomes.is_empty() {
        println!("No products were processed.");
        return;
    }
    println!("{}", product_table(result));

    if let Some(table) = unresolved_table(result) {
        println!();
        println!("Unresolved references:");
        println!("{table}");
    }
    if let Some(table) = conflict_table(result) {
        println!();
        println!("Unit conflicts (master unit kept):");
        println!("{table}");
    }
    if result.has_errors() {
        eprintln!("Errors:");
        for outcome in &result.outcomes {
            if let Err(err) = &outcome.result {
                eprintln!("- {}: {err}", outcome.product_id);
            }
        }
    }
}

pub fn describe_request(request: &Request) -> String {
    match request {
        Request::Insert(ids) => {
            let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
            format!("insert {}", ids.join(" "))
        }
        Request::Product(id) => format!("rebuild {id}"),
        Request::Range { start, end } => format!("rebuild products released {start} to {end}"),
    }
}

/// One row per product with the rows it wrote, plus a total.
pub fn product_table(result: &RunResult) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Product"),
        header_cell("Role"),
        header_cell("Indicators"),
        header_cell("Values"),
        header_cell("Geo refs"),
        header_cell("Levels"),
        header_cell("Metadata"),
        header_cell("Charts"),
        header_cell("Batches"),
        header_cell("Rows read"),
        header_cell("Warnings"),
        header_cell("Status"),
    ]);
    apply_table_style(&mut table);
    for index in 2..=10 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    align_column(&mut table, 11, CellAlignment::Center);

    let mut total = TableCounts::default();
    let mut total_warnings = 0usize;
    for outcome in &result.outcomes {
        match &outcome.result {
            Ok(report) => {
                add_counts(&mut total, &report.counts);
                let warnings = warning_count(report);
                total_warnings += warnings;
                table.add_row(report_row(report, warnings));
            }
            Err(_) => {
                let mut row = vec![product_cell(&outcome.product_id.to_string()), dim_cell("-")];
                row.extend((0..9).map(|_| dim_cell("-")));
                row.push(Cell::new("FAILED").fg(Color::Red).add_attribute(Attribute::Bold));
                table.add_row(row);
            }
        }
    }

    let mut total_row = vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
    ];
    total_row.extend(
        counts_cells(&total)
            .into_iter()
            .map(|cell| cell.add_attribute(Attribute::Bold)),
    );
    total_row.push(dim_cell("-"));
    total_row.push(dim_cell("-"));
    total_row.push(count_cell(total_warnings, Color::Yellow).add_attribute(Attribute::Bold));
    total_row.push(failure_cell(result.failure_count()));
    table.add_row(total_row);
    table
}

fn report_row(report: &ProductReport, warnings: usize) -> Vec<Cell> {
    let mut row = vec![
        product_cell(&report.product_id.to_string()),
        Cell::new(report.role.label()),
    ];
    row.extend(counts_cells(&report.counts));
    row.push(Cell::new(report.batches));
    row.push(Cell::new(report.rows_read));
    row.push(count_cell(warnings, Color::Yellow));
    row.push(Cell::new("OK").fg(Color::Green).add_attribute(Attribute::Bold));
    row
}

fn counts_cells(counts: &TableCounts) -> Vec<Cell> {
    [
        counts.indicators,
        counts.indicator_values,
        counts.geography_references,
        counts.geographic_levels,
        counts.metadata,
        counts.related_charts,
    ]
    .into_iter()
    .map(Cell::new)
    .collect()
}

fn add_counts(total: &mut TableCounts, counts: &TableCounts) {
    total.indicators += counts.indicators;
    total.indicator_values += counts.indicator_values;
    total.geography_references += counts.geography_references;
    total.geographic_levels += counts.geographic_levels;
    total.metadata += counts.metadata;
    total.related_charts += counts.related_charts;
}

fn warning_count(report: &ProductReport) -> usize {
    report.warnings.entry_count() + report.warnings.unit_conflicts().len()
}

/// Distinct unresolved ids per product, or `None` when every reference resolved.
pub fn unresolved_table(result: &RunResult) -> Option<Table> {
    let mut rows = Vec::new();
    for report in result.reports() {
        for (kind, id, occurrences) in report.warnings.entries() {
            rows.push(vec![
                product_cell(&report.product_id.to_string()),
                Cell::new(kind.label()),
                Cell::new(id),
                count_cell(occurrences, Color::Yellow),
            ]);
        }
    }
    if rows.is_empty() {
        return None;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Product"),
        header_cell("Kind"),
        header_cell("Id"),
        header_cell("Occurrences"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Right);
    for row in rows {
        table.add_row(row);
    }
    Some(table)
}

fn conflict_table(result: &RunResult) -> Option<Table> {
    let mut rows = Vec::new();
    for report in result.reports() {
        for conflict in report.warnings.unit_conflicts() {
            rows.push(vec![
                product_cell(&report.product_id.to_string()),
                Cell::new(&conflict.indicator_code),
                Cell::new(&conflict.master_uom),
                Cell::new(&conflict.sibling_uom).fg(Color::Yellow),
            ]);
        }
    }
    if rows.is_empty() {
        return None;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Product"),
        header_cell("Indicator"),
        header_cell("Master unit"),
        header_cell("Sibling unit"),
    ]);
    apply_table_style(&mut table);
    for row in rows {
        table.add_row(row);
    }
    Some(table)
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(160);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn product_cell(product_id: &str) -> Cell {
    Cell::new(product_id)
        .fg(Color::Blue)
        .add_attribute(Attribute::Bold)
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn failure_cell(failures: usize) -> Cell {
    if failures > 0 {
        Cell::new(format!("{failures} failed"))
            .fg(Color::Red)
            .add_attribute(Attribute::Bold)
    } else {
        Cell::new("OK").fg(Color::Green).add_attribute(Attribute::Bold)
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
