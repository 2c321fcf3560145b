//! Per-barangay summary: geographical areas, risk categories and key scores.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::hierarchy::HierarchicalTable;
use crate::label::ColumnLabel;
use crate::library::Library;
use crate::query::{CellValue, Lookup, Percentile};
use crate::COL;

/// Categories shown for an element and hazard, in display order.
pub const KEY_CATEGORIES: [&str; 3] = [
    COL::DEGREE_OF_IMPACT_CATEGORY,
    COL::VULNERABILITY_CATEGORY,
    COL::RISK_CATEGORY,
];

/// Scores shared by all hazards of an element. Every other score varies per hazard.
pub const GENERAL_SCORES: [&str; 2] = [COL::SENSITIVITY_SCORE, COL::ADAPTIVE_CAPACITY_SCORE];

/// Display order of all key scores.
pub const SCORE_ORDER: [&str; 8] = [
    COL::LIKELIHOOD_OF_OCCURRENCE,
    COL::EXPOSURE_SCORE,
    COL::SENSITIVITY_SCORE,
    COL::DEGREE_OF_IMPACT_SCORE,
    COL::ADAPTIVE_CAPACITY_SCORE,
    COL::VULNERABILITY_SCORE,
    COL::SEVERITY_OF_CONSEQUENCE_SCORE,
    COL::RISK_SCORE,
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementHazardRisk {
    pub element: String,
    pub hazard: String,
    pub vulnerability_category: Lookup<CellValue>,
    pub risk_category: Lookup<CellValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyCategory {
    pub name: String,
    pub value: Lookup<CellValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyScore {
    pub name: String,
    pub score: Lookup<CellValue>,
    pub percentile: Lookup<Percentile>,
}

/// Read-only view of one barangay.
#[derive(Debug, Clone, Copy)]
pub struct BarangaySummary<'a> {
    table: &'a HierarchicalTable,
    library: &'a Library,
    bid: i64,
}

impl<'a> BarangaySummary<'a> {
    /// `Unknown` when the barangay is not in the table.
    pub fn new(table: &'a HierarchicalTable, library: &'a Library, bid: i64) -> Lookup<Self> {
        table
            .row_position(bid)
            .map(|_| Self {
                table,
                library,
                bid,
            })
            .into()
    }

    pub fn bid(&self) -> i64 {
        self.bid
    }

    pub fn name(&self) -> Lookup<String> {
        self.table.barangay_name(self.bid).into()
    }

    /// First column of the element and hazard whose detail is `detail`, any sector or aspect.
    fn find(&self, element: &str, hazard: &str, detail: &str) -> Option<ColumnLabel> {
        self.table
            .filter_columns(|label| {
                label.element == element && label.hazard == hazard && label.detail == detail
            })
            .into_iter()
            .next()
    }

    fn value_of(&self, label: Option<ColumnLabel>) -> Lookup<CellValue> {
        label
            .map(|label| self.table.get_value(self.bid, &label))
            .unwrap_or(Lookup::Unknown)
    }

    /// Distinct values of every geographical-area column.
    pub fn geographical_areas(&self) -> Vec<String> {
        self.table
            .filter_columns(|label| label.detail == COL::GEOGRAPHICAL_AREA)
            .iter()
            .filter_map(|label| self.table.get_value(self.bid, label).known())
            .map(|value| value.to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Overall-risk categories of every element and hazard, skipping combinations where either is
    /// unknown.
    pub fn element_hazard_risks(&self) -> Vec<ElementHazardRisk> {
        self.library
            .entries()
            .iter()
            .filter(|entry| entry.hazard != COL::ALL_HAZARDS)
            .filter_map(|entry| {
                let category = |detail: &str| {
                    let label = ColumnLabel::new(
                        &entry.sector,
                        &entry.element,
                        &entry.hazard,
                        COL::OVERALL_RISK,
                        detail,
                    );
                    self.table.get_value(self.bid, &label)
                };
                let vulnerability_category = category(COL::VULNERABILITY_CATEGORY);
                let risk_category = category(COL::RISK_CATEGORY);
                (vulnerability_category.is_known() && risk_category.is_known()).then(|| {
                    ElementHazardRisk {
                        element: entry.element.clone(),
                        hazard: entry.hazard.clone(),
                        vulnerability_category,
                        risk_category,
                    }
                })
            })
            .collect()
    }

    pub fn key_categories(&self, element: &str, hazard: &str) -> Vec<KeyCategory> {
        KEY_CATEGORIES
            .iter()
            .map(|name| KeyCategory {
                name: name.to_string(),
                value: self.value_of(self.find(element, hazard, name)),
            })
            .collect()
    }

    /// Hazard-specific and general scores with their percentiles, in display order.
    pub fn key_scores(&self, element: &str, hazard: &str) -> Vec<KeyScore> {
        SCORE_ORDER
            .iter()
            .map(|name| {
                let score_hazard = if GENERAL_SCORES.contains(name) {
                    COL::ALL_HAZARDS
                } else {
                    hazard
                };
                let label = self.find(element, score_hazard, name);
                let percentile = label
                    .as_ref()
                    .map(|label| self.table.percentile_of(self.bid, label))
                    .unwrap_or(Lookup::Unknown);
                KeyScore {
                    name: name.to_string(),
                    score: self.value_of(label),
                    percentile,
                }
            })
            .collect()
    }
}
