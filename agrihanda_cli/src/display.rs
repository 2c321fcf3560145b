use std::collections::BTreeMap;

use agrihanda::{
    flatten::LabelIndex,
    label::{ColumnLabel, Level},
    library::Library,
    pipeline::RunReport,
    query::{CellValue, Lookup},
    search::SearchResults,
    summary::BarangaySummary,
    COL,
};
use comfy_table::{presets::NOTHING, *};
use itertools::izip;

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_style(comfy_table::TableComponent::BottomBorder, '─')
        .set_style(comfy_table::TableComponent::MiddleHeaderIntersections, '─')
        .set_style(comfy_table::TableComponent::HeaderLines, '─')
        .set_style(comfy_table::TableComponent::BottomBorderIntersections, '─')
        .set_style(comfy_table::TableComponent::TopBorder, '─')
        .set_style(comfy_table::TableComponent::TopBorderIntersections, '─');
    table
}

fn bold_header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|name| Cell::new(name).add_attribute(Attribute::Bold))
        .collect()
}

pub fn display_run_report(report: &RunReport) {
    let mut table = new_table();
    table
        .add_row(vec![
            Cell::new("Groups cleaned").add_attribute(Attribute::Bold),
            report.groups_cleaned.join(", ").into(),
        ])
        .add_row(vec![
            Cell::new("Barangays").add_attribute(Attribute::Bold),
            report.barangays.into(),
        ])
        .add_row(vec![
            Cell::new("Columns").add_attribute(Attribute::Bold),
            report.columns.into(),
        ]);
    for (group, reason) in &report.groups_skipped {
        table.add_row(vec![
            Cell::new(format!("Skipped {group}")).add_attribute(Attribute::Bold),
            reason.into(),
        ]);
    }
    if let Some(column) = table.column_mut(0) {
        column.set_cell_alignment(CellAlignment::Right);
    }
    println!("\n{}", table);
}

pub fn display_labels(results: &SearchResults, max_results: Option<usize>) -> anyhow::Result<()> {
    let df_to_show = match max_results {
        Some(max) => results.0.head(Some(max)),
        None => results.0.clone(),
    };
    let mut table = new_table();
    table.set_header(bold_header(&[
        "Flat key",
        COL::SECTOR,
        COL::ELEMENT,
        COL::HAZARD,
        COL::DISASTER_RISK_ASPECT,
        COL::DETAIL,
    ]));
    for (flat_key, sector, element, hazard, aspect, detail) in izip!(
        df_to_show.column(COL::FLAT_KEY)?.str()?,
        df_to_show.column(Level::Sector.column_name())?.str()?,
        df_to_show.column(Level::Element.column_name())?.str()?,
        df_to_show.column(Level::Hazard.column_name())?.str()?,
        df_to_show.column(Level::Aspect.column_name())?.str()?,
        df_to_show.column(Level::Detail.column_name())?.str()?,
    ) {
        table.add_row(vec![
            flat_key.unwrap_or_default(),
            sector.unwrap_or_default(),
            element.unwrap_or_default(),
            hazard.unwrap_or_default(),
            aspect.unwrap_or_default(),
            detail.unwrap_or_default(),
        ]);
    }
    println!("\n{}", table);
    Ok(())
}

pub fn print_labels_count(shown: usize, total: usize) {
    if shown < total {
        println!("\nShowing {shown} of {total} labels, use --full to show all.");
    } else {
        println!("\nFound {total} labels.");
    }
}

/// One line per column, keyed by flat key.
pub fn display_row(row: &BTreeMap<ColumnLabel, Lookup<CellValue>>, index: &LabelIndex) {
    let mut table = new_table();
    table.set_header(bold_header(&["Flat key", "Value"]));
    for (label, value) in row {
        table.add_row(vec![
            index.flat_key(label).unwrap_or_default().to_string(),
            value.to_string(),
        ]);
    }
    println!("\n{}", table);
}

pub fn display_library(library: &Library) {
    let mut table = new_table();
    table.set_header(bold_header(&[COL::SID, COL::SECTOR, COL::ELEMENT, COL::HAZARD]));
    for entry in library.entries() {
        table.add_row(vec![
            entry.sid.as_str(),
            entry.sector.as_str(),
            entry.element.as_str(),
            entry.hazard.as_str(),
        ]);
    }
    println!("\n{}", table);
}

pub fn display_options(level: Level, options: &[String]) {
    let mut table = new_table();
    table.set_header(bold_header(&[&level.to_string()]));
    for option in options {
        table.add_row(vec![option]);
    }
    println!("\n{}", table);
}

pub fn display_summary(summary: &BarangaySummary) {
    let mut table = new_table();
    table
        .add_row(vec![
            Cell::new(COL::BID).add_attribute(Attribute::Bold),
            summary.bid().into(),
        ])
        .add_row(vec![
            Cell::new("Barangay").add_attribute(Attribute::Bold),
            summary.name().to_string().into(),
        ])
        .add_row(vec![
            Cell::new("Geographical areas").add_attribute(Attribute::Bold),
            summary.geographical_areas().join(", ").into(),
        ]);
    if let Some(column) = table.column_mut(0) {
        column.set_cell_alignment(CellAlignment::Right);
    }
    println!("\n{}", table);

    let mut risks = new_table();
    risks.set_header(bold_header(&[
        COL::ELEMENT,
        COL::HAZARD,
        COL::VULNERABILITY_CATEGORY,
        COL::RISK_CATEGORY,
    ]));
    for risk in summary.element_hazard_risks() {
        risks.add_row(vec![
            risk.element,
            risk.hazard,
            risk.vulnerability_category.to_string(),
            risk.risk_category.to_string(),
        ]);
    }
    println!("\n{}", risks);
}

pub fn display_key_values(summary: &BarangaySummary, element: &str, hazard: &str) {
    let mut categories = new_table();
    categories.set_header(bold_header(&["Category", "Value"]));
    for category in summary.key_categories(element, hazard) {
        categories.add_row(vec![category.name, category.value.to_string()]);
    }
    println!("\n{}", categories);

    let mut scores = new_table();
    scores.set_header(bold_header(&["Score", "Value", "Percentile"]));
    for score in summary.key_scores(element, hazard) {
        scores.add_row(vec![
            score.name,
            score.score.to_string(),
            score.percentile.to_string(),
        ]);
    }
    println!("\n{}", scores);
}
