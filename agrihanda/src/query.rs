//! Read-only lookups over the hierarchical table.

use std::collections::BTreeMap;
use std::fmt::Display;

use log::warn;
use polars::prelude::*;
use serde::{Serialize, Serializer};

use crate::hierarchy::HierarchicalTable;
use crate::label::ColumnLabel;

/// Result of a lookup that may miss. A miss is not an error: callers render it as "Unknown".
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<T> {
    Known(T),
    Unknown,
}

impl<T> Lookup<T> {
    pub fn known(self) -> Option<T> {
        match self {
            Lookup::Known(value) => Some(value),
            Lookup::Unknown => None,
        }
    }

    pub fn as_ref(&self) -> Lookup<&T> {
        match self {
            Lookup::Known(value) => Lookup::Known(value),
            Lookup::Unknown => Lookup::Unknown,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Lookup::Known(_))
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Lookup<U> {
        match self {
            Lookup::Known(value) => Lookup::Known(f(value)),
            Lookup::Unknown => Lookup::Unknown,
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Lookup::Known(value),
            None => Lookup::Unknown,
        }
    }
}

impl<T: Display> Display for Lookup<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lookup::Known(value) => value.fmt(f),
            Lookup::Unknown => write!(f, "Unknown"),
        }
    }
}

impl<T: Serialize> Serialize for Lookup<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Lookup::Known(value) => value.serialize(serializer),
            Lookup::Unknown => serializer.serialize_str("Unknown"),
        }
    }
}

/// A single non-null cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Integer(i64),
    Number(f64),
    Text(String),
    Boolean(bool),
}

impl CellValue {
    fn from_any_value(value: AnyValue) -> Option<Self> {
        match value {
            AnyValue::Null => None,
            AnyValue::Boolean(b) => Some(CellValue::Boolean(b)),
            AnyValue::String(s) => Some(CellValue::Text(s.to_string())),
            AnyValue::StringOwned(s) => Some(CellValue::Text(s.to_string())),
            AnyValue::Int32(n) => Some(CellValue::Integer(n.into())),
            AnyValue::Int64(n) => Some(CellValue::Integer(n)),
            AnyValue::UInt32(n) => Some(CellValue::Integer(n.into())),
            AnyValue::UInt64(n) => Some(CellValue::Integer(n as i64)),
            AnyValue::Float32(n) => Some(CellValue::Number(n.into())),
            AnyValue::Float64(n) => Some(CellValue::Number(n)),
            other => Some(CellValue::Text(other.to_string())),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Integer(n) => Some(*n as f64),
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Integer(n) => write!(f, "{n}"),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Boolean(b) => write!(f, "{b}"),
        }
    }
}

/// Share of non-null values at or below a barangay's value, in percent, and the number of
/// non-null values it was computed over.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Percentile {
    pub percentile: f64,
    pub sample_size: usize,
}

impl Display for Percentile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} (n={})", self.percentile, self.sample_size)
    }
}

impl HierarchicalTable {
    /// Value of one cell.
    pub fn get_value(&self, bid: i64, label: &ColumnLabel) -> Lookup<CellValue> {
        let (Some(row), Some(series)) = (self.row_position(bid), self.column(label)) else {
            return Lookup::Unknown;
        };
        cell_at(series, row)
    }

    /// Every column of one barangay. `Unknown` when the barangay is absent.
    pub fn get_row(&self, bid: i64) -> Lookup<BTreeMap<ColumnLabel, Lookup<CellValue>>> {
        let Some(row) = self.row_position(bid) else {
            return Lookup::Unknown;
        };
        Lookup::Known(
            self.labels()
                .into_iter()
                .filter_map(|label| {
                    let value = cell_at(self.column(&label)?, row);
                    Some((label, value))
                })
                .collect(),
        )
    }

    /// Labels satisfying a predicate, in table order.
    pub fn filter_columns<F>(&self, predicate: F) -> Vec<ColumnLabel>
    where
        F: Fn(&ColumnLabel) -> bool,
    {
        self.labels()
            .into_iter()
            .filter(|label| predicate(label))
            .collect()
    }

    /// Percentile rank of a barangay within a numeric column. The barangay counts towards the
    /// sample.
    pub fn percentile_of(&self, bid: i64, label: &ColumnLabel) -> Lookup<Percentile> {
        let (Some(row), Some(series)) = (self.row_position(bid), self.column(label)) else {
            return Lookup::Unknown;
        };
        if !series.dtype().is_numeric() {
            return Lookup::Unknown;
        }
        let values = match series.cast(&DataType::Float64) {
            Ok(values) => values,
            Err(err) => {
                warn!("Cannot read {label} as numbers: {err}");
                return Lookup::Unknown;
            }
        };
        let Ok(values) = values.f64() else {
            return Lookup::Unknown;
        };
        let Some(own) = values.get(row) else {
            return Lookup::Unknown;
        };
        let present: Vec<f64> = values.into_iter().flatten().collect();
        let at_or_below = present.iter().filter(|value| **value <= own).count();
        Lookup::Known(Percentile {
            percentile: at_or_below as f64 / present.len() as f64 * 100.0,
            sample_size: present.len(),
        })
    }
}

fn cell_at(series: &Series, row: usize) -> Lookup<CellValue> {
    match series.get(row) {
        Ok(value) => CellValue::from_any_value(value).into(),
        Err(err) => {
            warn!("Cannot read row {row} of {}: {err}", series.name());
            Lookup::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::tests::{label, sample_table};

    #[test]
    fn percentile_counts_values_at_or_below() {
        let table = sample_table();
        assert_eq!(
            table.percentile_of(3, &label("Flood", "Score")),
            Lookup::Known(Percentile {
                percentile: 75.0,
                sample_size: 4
            })
        );
        assert_eq!(
            table.percentile_of(1, &label("Flood", "Score")),
            Lookup::Known(Percentile {
                percentile: 25.0,
                sample_size: 4
            })
        );
    }

    #[test]
    fn percentile_misses_are_unknown() {
        let table = sample_table();
        // Barangay 1 has no drought risk
        assert_eq!(table.percentile_of(1, &label("Drought", "Risk")), Lookup::Unknown);
        assert_eq!(table.percentile_of(9, &label("Flood", "Score")), Lookup::Unknown);
        assert_eq!(table.percentile_of(1, &label("Flood", "Missing")), Lookup::Unknown);
        assert_eq!(
            table.percentile_of(1, &label("All Hazards", "Ecosystem")),
            Lookup::Unknown
        );
        assert_eq!(
            table.percentile_of(2, &label("Drought", "Risk")),
            Lookup::Known(Percentile {
                percentile: 100.0,
                sample_size: 3
            })
        );
    }

    #[test]
    fn row_should_map_every_label() {
        let table = sample_table();
        let row = table.get_row(3).known().unwrap();
        assert_eq!(row.len(), 4);
        assert_eq!(
            row[&ColumnLabel::barangay()],
            Lookup::Known(CellValue::Text("Central".into()))
        );
        assert_eq!(row[&label("All Hazards", "Ecosystem")], Lookup::Unknown);
        assert_eq!(
            row[&label("Flood", "Score")],
            Lookup::Known(CellValue::Integer(30))
        );
        assert_eq!(table.get_row(42), Lookup::Unknown);
    }

    #[test]
    fn columns_should_filter_by_label() {
        let table = sample_table();
        let flood = table.filter_columns(|label| label.hazard == "Flood");
        assert_eq!(flood, vec![label("Flood", "Score")]);
        assert_eq!(
            table.get_value(4, &label("Drought", "Risk")),
            Lookup::Known(CellValue::Number(0.5))
        );
    }

    #[test]
    fn lookups_serialize_unknown_as_text() {
        let known: Lookup<CellValue> = Lookup::Known(CellValue::Integer(3));
        assert_eq!(serde_json::to_string(&known).unwrap(), "3");
        let unknown: Lookup<CellValue> = Lookup::Unknown;
        assert_eq!(serde_json::to_string(&unknown).unwrap(), "\"Unknown\"");
    }
}
