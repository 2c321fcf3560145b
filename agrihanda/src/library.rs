//! The library of (Sector, Element, Hazard) combinations and the divided database derived from it.

use itertools::Itertools;
use log::debug;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::AgrihandaResult;
use crate::hierarchy::HierarchicalTable;
use crate::label::ColumnLabel;
use crate::COL;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryEntry {
    /// Sheet ID: the position of the entry, as text.
    pub sid: String,
    pub sector: String,
    pub element: String,
    pub hazard: String,
}

impl LibraryEntry {
    pub fn matches(&self, label: &ColumnLabel) -> bool {
        label.sector == self.sector && label.element == self.element && label.hazard == self.hazard
    }
}

/// One entry per distinct (Sector, Element, Hazard) triple, in label order. The barangay column is
/// not part of the library.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Library {
    entries: Vec<LibraryEntry>,
}

impl Library {
    pub fn from_labels<'a, I>(labels: I) -> Self
    where
        I: IntoIterator<Item = &'a ColumnLabel>,
    {
        let entries = labels
            .into_iter()
            .filter(|label| !label.is_barangay())
            .map(|label| {
                (
                    label.sector.as_str(),
                    label.element.as_str(),
                    label.hazard.as_str(),
                )
            })
            .sorted()
            .dedup()
            .enumerate()
            .map(|(sid, (sector, element, hazard))| LibraryEntry {
                sid: sid.to_string(),
                sector: sector.to_string(),
                element: element.to_string(),
                hazard: hazard.to_string(),
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[LibraryEntry] {
        &self.entries
    }

    pub fn get(&self, sid: &str) -> Option<&LibraryEntry> {
        self.entries.iter().find(|entry| entry.sid == sid)
    }

    /// Distinct (Element, Hazard) pairs, hazard-specific only.
    pub fn element_hazards(&self) -> Vec<(&str, &str)> {
        self.entries
            .iter()
            .filter(|entry| entry.hazard != COL::ALL_HAZARDS)
            .map(|entry| (entry.element.as_str(), entry.hazard.as_str()))
            .sorted()
            .dedup()
            .collect()
    }

    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let mut sids = Vec::with_capacity(self.entries.len());
        let mut sectors = Vec::with_capacity(self.entries.len());
        let mut elements = Vec::with_capacity(self.entries.len());
        let mut hazards = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            sids.push(entry.sid.as_str());
            sectors.push(entry.sector.as_str());
            elements.push(entry.element.as_str());
            hazards.push(entry.hazard.as_str());
        }
        DataFrame::new(vec![
            Series::new(COL::SID, sids),
            Series::new(COL::SECTOR, sectors),
            Series::new(COL::ELEMENT, elements),
            Series::new(COL::HAZARD, hazards),
        ])
    }
}

/// The sub-table of one library entry: `BID` plus one `{Aspect}/{Detail}` column per matching
/// label. Rows without any value are dropped.
pub fn divided_table(table: &HierarchicalTable, entry: &LibraryEntry) -> AgrihandaResult<DataFrame> {
    let frame = table.frame();
    let mut columns = vec![frame.column(COL::BID)?.clone()];
    let mut has_value = BooleanChunked::full("has_value", false, frame.height());
    for label in table.labels().iter().filter(|label| entry.matches(label)) {
        if let Some(series) = table.column(label) {
            let mut series = series.clone();
            has_value = &has_value | &series.is_not_null();
            series.rename(&format!("{}/{}", label.aspect, label.detail));
            columns.push(series);
        }
    }
    let divided = DataFrame::new(columns)?.filter(&has_value)?;
    debug!(
        "Divided table {}: {} rows, {} columns",
        entry.sid,
        divided.height(),
        divided.width()
    );
    Ok(divided)
}
