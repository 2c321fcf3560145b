//! The hierarchical table: one row per barangay keyed by `BID`, one column per five-level label.

use std::collections::{HashMap, HashSet};

use log::info;
use polars::prelude::*;

use crate::barangay::BarangayIds;
use crate::error::{AgrihandaError, AgrihandaResult};
use crate::group::{order_by_label, outer_join_on, GroupTable};
use crate::label::ColumnLabel;
use crate::COL;

/// Rows sorted by `BID`; columns sorted by label, the barangay column first. Internally each
/// data column is named by its label's column id.
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchicalTable {
    frame: DataFrame,
    rows: HashMap<i64, usize>,
}

impl HierarchicalTable {
    /// Builds a table from `BID`s and labelled columns. The barangay column is required.
    pub fn new(bids: Vec<i64>, columns: Vec<(ColumnLabel, Series)>) -> AgrihandaResult<Self> {
        let mut seen = HashSet::new();
        let mut series = vec![Series::new(COL::BID, bids)];
        for (label, mut column) in columns {
            if !seen.insert(label.clone()) {
                return Err(AgrihandaError::schema(
                    COL::BID,
                    format!("more than one column is labelled {label}"),
                ));
            }
            column.rename(&label.column_id());
            series.push(column);
        }
        Self::from_frame(DataFrame::new(series)?)
    }

    /// Validates a frame with a `BID` column and column-id named data columns, and puts rows and
    /// columns in canonical order.
    pub(crate) fn from_frame(mut frame: DataFrame) -> AgrihandaResult<Self> {
        let mut labels = frame
            .get_column_names()
            .into_iter()
            .filter(|name| *name != COL::BID)
            .map(|name| {
                ColumnLabel::from_column_id(name).ok_or_else(|| {
                    AgrihandaError::schema(COL::BID, format!("'{name}' is not a column label"))
                })
            })
            .collect::<AgrihandaResult<Vec<_>>>()?;
        if !labels.iter().any(ColumnLabel::is_barangay) {
            return Err(AgrihandaError::schema(
                COL::BID,
                "table has no barangay column",
            ));
        }
        labels.sort();

        let bids = frame.column(COL::BID)?.cast(&DataType::Int64)?;
        if bids.null_count() > 0 {
            return Err(AgrihandaError::schema(COL::BID, "missing barangay ID"));
        }
        if bids.n_unique()? != bids.len() {
            return Err(AgrihandaError::schema(COL::BID, "duplicate barangay ID"));
        }
        frame.with_column(bids)?;

        let order: Vec<String> = std::iter::once(COL::BID.to_string())
            .chain(labels.iter().map(ColumnLabel::column_id))
            .collect();
        let frame = frame
            .select(order)?
            .sort([COL::BID], SortMultipleOptions::default())?;
        let rows = frame
            .column(COL::BID)?
            .i64()?
            .into_iter()
            .enumerate()
            .filter_map(|(row, bid)| bid.map(|bid| (bid, row)))
            .collect();
        Ok(Self { frame, rows })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// Every column label in table order, the barangay column first.
    pub fn labels(&self) -> Vec<ColumnLabel> {
        self.frame
            .get_column_names()
            .into_iter()
            .filter_map(ColumnLabel::from_column_id)
            .collect()
    }

    pub fn bids(&self) -> Vec<i64> {
        self.frame
            .column(COL::BID)
            .ok()
            .and_then(|bids| bids.i64().ok())
            .map(|bids| bids.into_iter().flatten().collect())
            .unwrap_or_default()
    }

    pub fn column(&self, label: &ColumnLabel) -> Option<&Series> {
        self.frame.column(&label.column_id()).ok()
    }

    pub fn row_position(&self, bid: i64) -> Option<usize> {
        self.rows.get(&bid).copied()
    }

    /// Name of the barangay with this `BID`.
    pub fn barangay_name(&self, bid: i64) -> Option<String> {
        let row = self.row_position(bid)?;
        self.column(&ColumnLabel::barangay())?
            .str()
            .ok()?
            .get(row)
            .map(String::from)
    }
}

/// Outer-joins cleaned groups on barangay name. Rows are sorted by name and columns by label.
pub fn merge_groups(groups: &[GroupTable]) -> AgrihandaResult<DataFrame> {
    let frames: Vec<DataFrame> = groups.iter().map(|group| group.frame.clone()).collect();
    let merged = outer_join_on("merge", COL::BARANGAY_NAME, &frames)?;
    order_by_label(merged, COL::BARANGAY_NAME)
}

/// Turns the name-keyed merged frame into the hierarchical table: the name becomes the barangay
/// column and each name is resolved to its `BID`.
pub fn assign_barangay_ids(
    merged: DataFrame,
    ids: &BarangayIds,
) -> AgrihandaResult<HierarchicalTable> {
    let names: Vec<String> = merged
        .column(COL::BARANGAY_NAME)?
        .str()?
        .into_iter()
        .map(|name| {
            name.map(String::from)
                .ok_or_else(|| AgrihandaError::schema(COL::BARANGAY_NAME, "blank barangay name"))
        })
        .collect::<AgrihandaResult<_>>()?;
    let bids = ids.resolve_all(&names)?;

    let mut columns = vec![Series::new(COL::BID, bids)];
    for series in merged.get_columns() {
        let mut series = series.clone();
        if series.name() == COL::BARANGAY_NAME {
            series.rename(&ColumnLabel::barangay().column_id());
        }
        columns.push(series);
    }
    let table = HierarchicalTable::from_frame(DataFrame::new(columns)?)?;
    info!(
        "Hierarchical table: {} barangays, {} columns",
        table.height(),
        table.frame.width() - 1
    );
    Ok(table)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn label(hazard: &str, detail: &str) -> ColumnLabel {
        ColumnLabel::new("Agriculture", "Crops", hazard, "Exposure", detail)
    }

    /// Four barangays with an integer score, a float score with a gap and a text column.
    pub(crate) fn sample_table() -> HierarchicalTable {
        HierarchicalTable::new(
            vec![4, 1, 3, 2],
            vec![
                (
                    label("Flood", "Score"),
                    Series::new("", &[Some(40i64), Some(10), Some(30), Some(20)]),
                ),
                (
                    ColumnLabel::barangay(),
                    Series::new("", &["Dahican", "Ambago", "Central", "Bading"]),
                ),
                (
                    label("All Hazards", "Ecosystem"),
                    Series::new("", &[Some("Coastal"), Some("Lowland"), None, Some("Upland")]),
                ),
                (
                    label("Drought", "Risk"),
                    Series::new("", &[Some(0.5f64), None, Some(1.5), Some(2.0)]),
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn table_should_be_canonically_ordered() {
        let table = sample_table();
        assert_eq!(table.bids(), vec![1, 2, 3, 4]);
        assert_eq!(
            table.labels(),
            vec![
                ColumnLabel::barangay(),
                label("All Hazards", "Ecosystem"),
                label("Drought", "Risk"),
                label("Flood", "Score"),
            ]
        );
        assert_eq!(table.barangay_name(3), Some("Central".to_string()));
        assert_eq!(table.barangay_name(9), None);
    }

    #[test]
    fn row_positions_follow_sorted_ids() {
        let table = sample_table();
        assert_eq!(table.row_position(1), Some(0));
        assert_eq!(table.row_position(4), Some(3));
        assert_eq!(table.row_position(5), None);

        let reloaded = HierarchicalTable::from_frame(table.frame().clone()).unwrap();
        assert_eq!(reloaded, table);
        assert_eq!(reloaded.row_position(3), Some(2));
    }

    #[test]
    fn table_requires_barangay_column_and_unique_ids() {
        let no_barangay = HierarchicalTable::new(
            vec![1],
            vec![(label("Flood", "Score"), Series::new("", &[1i64]))],
        );
        assert!(no_barangay.is_err());

        let duplicate_ids = HierarchicalTable::new(
            vec![1, 1],
            vec![(ColumnLabel::barangay(), Series::new("", &["Ambago", "Bading"]))],
        );
        assert!(duplicate_ids.is_err());
    }

    #[test]
    fn groups_should_merge_and_resolve_ids() {
        let crops = GroupTable {
            name: "agriculture_crops".into(),
            frame: df!(
                COL::BARANGAY_NAME => &["Bading", "Ambago"],
                &label("Flood", "Score").column_id() => &[2i64, 1]
            )
            .unwrap(),
        };
        let livestock = GroupTable {
            name: "agriculture_livestock".into(),
            frame: df!(
                COL::BARANGAY_NAME => &["Central"],
                &ColumnLabel::new("Agriculture", "Livestock", "Flood", "Exposure", "Heads").column_id() => &[7i64]
            )
            .unwrap(),
        };
        let merged = merge_groups(&[crops, livestock]).unwrap();
        assert_eq!(merged.height(), 3);

        let ids = BarangayIds::sequential(["Ambago", "Bading", "Central"]);
        let table = assign_barangay_ids(merged, &ids).unwrap();
        assert_eq!(table.bids(), vec![1, 2, 3]);
        let heads = table
            .column(&ColumnLabel::new("Agriculture", "Livestock", "Flood", "Exposure", "Heads"))
            .unwrap();
        assert_eq!(heads.i64().unwrap().get(2), Some(7));
        assert_eq!(heads.null_count(), 2);
    }
}
