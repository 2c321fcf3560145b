//! Projection of the hierarchical table onto string keys, and back.

use std::collections::BTreeMap;

use log::debug;
use polars::prelude::*;

use crate::error::{AgrihandaError, AgrihandaResult};
use crate::hierarchy::HierarchicalTable;
use crate::label::{ColumnLabel, Level};
use crate::COL;

/// The hierarchical table with columns renamed to flat keys. The first column is `BID`.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatTable {
    frame: DataFrame,
}

impl FlatTable {
    pub fn from_frame(frame: DataFrame) -> AgrihandaResult<Self> {
        if frame.get_column_names().first() != Some(&COL::BID) {
            return Err(AgrihandaError::schema(
                "flat table",
                format!("first column must be '{}'", COL::BID),
            ));
        }
        Ok(Self { frame })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn flat_keys(&self) -> Vec<&str> {
        self.frame
            .get_column_names()
            .into_iter()
            .filter(|name| *name != COL::BID)
            .collect()
    }
}

/// One row per flat-table column, barangay alias included: the flat key and its five label
/// components.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LabelIndex {
    entries: Vec<(String, ColumnLabel)>,
    by_key: BTreeMap<String, usize>,
}

impl LabelIndex {
    pub fn new(entries: Vec<(String, ColumnLabel)>) -> AgrihandaResult<Self> {
        let mut by_key = BTreeMap::new();
        for (position, (key, label)) in entries.iter().enumerate() {
            if let Some(previous) = by_key.insert(key.clone(), position) {
                let (_, other) = &entries[previous];
                return Err(AgrihandaError::schema(
                    COL::FLAT_KEY,
                    format!(
                        "labels {:?} and {:?} share the flat key '{key}'",
                        other.components(),
                        label.components()
                    ),
                ));
            }
        }
        Ok(Self { entries, by_key })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn label(&self, flat_key: &str) -> Option<&ColumnLabel> {
        self.by_key
            .get(flat_key)
            .map(|position| &self.entries[*position].1)
    }

    pub fn flat_key(&self, label: &ColumnLabel) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, candidate)| candidate == label)
            .map(|(key, _)| key.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &ColumnLabel)> {
        self.entries.iter().map(|(key, label)| (key.as_str(), label))
    }

    pub fn labels(&self) -> impl Iterator<Item = &ColumnLabel> {
        self.entries.iter().map(|(_, label)| label)
    }

    /// The index as a frame with columns `flat_key` and one per level.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let mut columns = vec![Series::new(
            COL::FLAT_KEY,
            self.entries
                .iter()
                .map(|(key, _)| key.as_str())
                .collect::<Vec<_>>(),
        )];
        for level in Level::ALL {
            columns.push(Series::new(
                level.column_name(),
                self.entries
                    .iter()
                    .map(|(_, label)| label.get(level))
                    .collect::<Vec<_>>(),
            ));
        }
        DataFrame::new(columns)
    }

    pub fn from_frame(frame: &DataFrame) -> AgrihandaResult<Self> {
        let column = |name: &str| -> AgrihandaResult<Vec<String>> {
            Ok(frame
                .column(name)?
                .cast(&DataType::String)?
                .str()?
                .into_iter()
                .map(|value| value.unwrap_or_default().to_string())
                .collect())
        };
        let keys = column(COL::FLAT_KEY)?;
        let levels = Level::ALL
            .iter()
            .map(|level| column(level.column_name()))
            .collect::<AgrihandaResult<Vec<_>>>()?;
        let entries = keys
            .into_iter()
            .enumerate()
            .map(|(row, key)| {
                let components: Vec<&str> = levels.iter().map(|level| level[row].as_str()).collect();
                let label = ColumnLabel::from_components(&components).ok_or_else(|| {
                    AgrihandaError::schema(COL::FLAT_KEY, format!("malformed row for '{key}'"))
                })?;
                Ok((key, label))
            })
            .collect::<AgrihandaResult<Vec<_>>>()?;
        Self::new(entries)
    }
}

/// Renames every column to its flat key and records the mapping in a label index.
pub fn flatten(table: &HierarchicalTable) -> AgrihandaResult<(FlatTable, LabelIndex)> {
    let labels = table.labels();
    let entries: Vec<(String, ColumnLabel)> = labels
        .into_iter()
        .map(|label| (label.flat_key(), label))
        .collect();
    if let Some((key, label)) = entries.iter().find(|(key, _)| key == COL::BID) {
        return Err(AgrihandaError::schema(
            COL::FLAT_KEY,
            format!("label {:?} has the reserved flat key '{key}'", label.components()),
        ));
    }
    let index = LabelIndex::new(entries)?;

    let mut frame = table.frame().clone();
    for (key, label) in index.entries() {
        frame.rename(&label.column_id(), key)?;
    }
    debug!("Flattened {} columns", index.len());
    Ok((FlatTable::from_frame(frame)?, index))
}

/// Restores labels from flat keys. A key missing from the index is a schema error.
pub fn unflatten(flat: &FlatTable, index: &LabelIndex) -> AgrihandaResult<HierarchicalTable> {
    let mut frame = flat.frame().clone();
    let keys: Vec<String> = flat.flat_keys().into_iter().map(String::from).collect();
    for key in keys {
        let label = index.label(&key).ok_or_else(|| {
            AgrihandaError::schema(COL::FLAT_KEY, format!("unknown flat key '{key}'"))
        })?;
        frame.rename(&key, &label.column_id())?;
    }
    HierarchicalTable::from_frame(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::tests::{label, sample_table};

    #[test]
    fn flatten_should_round_trip() {
        let table = sample_table();
        let (flat, index) = flatten(&table).unwrap();
        assert_eq!(
            flat.frame().get_column_names(),
            vec![
                "BID",
                "(Barangay)",
                "Agriculture/Crops/All Hazards/Exposure/Ecosystem",
                "Agriculture/Crops/Drought/Exposure/Risk",
                "Agriculture/Crops/Flood/Exposure/Score",
            ]
        );
        assert_eq!(index.len(), 4);
        assert_eq!(index.label("(Barangay)"), Some(&ColumnLabel::barangay()));
        assert_eq!(unflatten(&flat, &index).unwrap(), table);
    }

    #[test]
    fn label_index_should_round_trip_through_frame() {
        let (_, index) = flatten(&sample_table()).unwrap();
        let frame = index.to_frame().unwrap();
        assert_eq!(
            frame.get_column_names(),
            vec![
                COL::FLAT_KEY,
                COL::SECTOR,
                COL::ELEMENT,
                COL::HAZARD,
                COL::DISASTER_RISK_ASPECT,
                COL::DETAIL
            ]
        );
        assert_eq!(LabelIndex::from_frame(&frame).unwrap(), index);
    }

    #[test]
    fn colliding_flat_keys_are_schema_errors() {
        let table = HierarchicalTable::new(
            vec![1],
            vec![
                (ColumnLabel::barangay(), Series::new("", &["Ambago"])),
                (label("Flood", "Rice/Corn"), Series::new("", &[1i64])),
                (label("Flood", "RiceCorn"), Series::new("", &[2i64])),
            ],
        )
        .unwrap();
        let err = flatten(&table).unwrap_err();
        assert!(matches!(err, AgrihandaError::Schema { .. }));
    }

    #[test]
    fn unknown_flat_key_is_schema_error() {
        let (flat, _) = flatten(&sample_table()).unwrap();
        let partial = LabelIndex::new(vec![(
            COL::BARANGAY_ALIAS.to_string(),
            ColumnLabel::barangay(),
        )])
        .unwrap();
        assert!(unflatten(&flat, &partial).is_err());
    }
}
