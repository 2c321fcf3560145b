//! Cleaning of one (Sector, Element) workbook into a single frame keyed by barangay name.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use log::{debug, info};
use polars::prelude::*;

use crate::config::Config;
use crate::dictionary::{DataDictionary, DictionaryEntry, ElementGroup};
use crate::error::{AgrihandaError, AgrihandaResult};
use crate::expand::expand_list_column;
use crate::label::ColumnLabel;
use crate::normalize::{normalize_label, normalize_value, typed_series};
use crate::sheet::{RawSheet, Workbook};
use crate::COL;

/// A data sheet after normalization: one key per kept row and one typed series per output
/// column, paired with the index of its dictionary entry.
#[derive(Debug, Clone)]
pub struct NormalizedSheet {
    pub name: String,
    pub keys: Vec<String>,
    pub columns: Vec<(usize, Series)>,
}

/// The cleaned frame of one element group. Its key column is `barangay_name`; every other column
/// is named by its label's column id.
#[derive(Debug, Clone)]
pub struct GroupTable {
    pub name: String,
    pub frame: DataFrame,
}

/// Normalizes the data area of one sheet: rows with a blank key are dropped and every remaining
/// column described by the dictionary is typed.
pub fn normalize_sheet(
    sheet: &RawSheet,
    dictionary: &DataDictionary,
    group: &ElementGroup,
) -> AgrihandaResult<NormalizedSheet> {
    let context = format!("{}/{}", group.file_name, sheet.name);
    let sheet = sheet.truncated(group.data_nrows, group.data_ncols);
    if sheet.width() < dictionary.entries.len() {
        return Err(AgrihandaError::schema(
            &context,
            format!(
                "sheet has {} columns but the dictionary describes {}",
                sheet.width(),
                dictionary.entries.len()
            ),
        ));
    }
    let key_idx = dictionary.key_index(&context)?;

    let mut keys = Vec::with_capacity(sheet.height());
    let mut kept_rows = Vec::with_capacity(sheet.height());
    let mut seen = HashSet::new();
    for row in 0..sheet.height() {
        let Some(key) = sheet
            .cell(row, key_idx)
            .as_text()
            .and_then(|key| normalize_value(&key))
        else {
            continue;
        };
        if !seen.insert(key.clone()) {
            return Err(AgrihandaError::schema(
                &context,
                format!("barangay '{key}' appears more than once"),
            ));
        }
        keys.push(key);
        kept_rows.push(row);
    }

    let columns = dictionary
        .data_entries()
        .map(|(idx, entry)| {
            let cells: Vec<_> = kept_rows
                .iter()
                .map(|row| sheet.cell(*row, idx).clone())
                .collect();
            (idx, typed_series(&entry.detail, &cells))
        })
        .collect();
    debug!("{context}: {} barangays", keys.len());
    Ok(NormalizedSheet {
        name: sheet.name.clone(),
        keys,
        columns,
    })
}

/// Labels the selected columns of a normalized sheet under one hazard, expanding list columns.
fn hazard_frame<F>(
    sheet: &NormalizedSheet,
    dictionary: &DataDictionary,
    group: &ElementGroup,
    hazard: &str,
    delimiter: &str,
    include: F,
) -> AgrihandaResult<DataFrame>
where
    F: Fn(&DictionaryEntry) -> bool,
{
    let context = format!("{}/{}", group.file_name, sheet.name);
    let mut labelled: Vec<(ColumnLabel, Series)> = vec![];
    for (idx, series) in &sheet.columns {
        let entry = &dictionary.entries[*idx];
        if !include(entry) {
            continue;
        }
        let label = |detail: &str| {
            ColumnLabel::new(
                &group.sector,
                &group.element,
                hazard,
                &entry.aspect,
                detail,
            )
        };
        if entry.is_list {
            for indicator in expand_list_column(series, delimiter)? {
                labelled.push((label(indicator.name()), indicator));
            }
        } else {
            labelled.push((label(&entry.detail), series.clone()));
        }
    }
    labelled_frame(&context, &sheet.keys, labelled)
}

/// Builds a frame keyed by barangay name from labelled columns, sorted by label.
pub(crate) fn labelled_frame(
    context: &str,
    keys: &[String],
    columns: Vec<(ColumnLabel, Series)>,
) -> AgrihandaResult<DataFrame> {
    let mut sorted: BTreeMap<ColumnLabel, Series> = BTreeMap::new();
    for (label, mut series) in columns {
        if sorted.contains_key(&label) {
            return Err(AgrihandaError::schema(
                context,
                format!("more than one column is labelled {label}"),
            ));
        }
        series.rename(&label.column_id());
        sorted.insert(label, series);
    }
    let mut series = vec![Series::new(COL::BARANGAY_NAME, keys)];
    series.extend(sorted.into_values());
    Ok(DataFrame::new(series)?)
}

/// Outer join of frames on a string key column: the union of keys, sorted, with every frame
/// left-joined onto it. Non-key columns must be distinct across frames.
pub(crate) fn outer_join_on(
    context: &str,
    key: &str,
    frames: &[DataFrame],
) -> AgrihandaResult<DataFrame> {
    let mut names: HashSet<String> = HashSet::new();
    let mut keys: BTreeSet<String> = BTreeSet::new();
    for frame in frames {
        for name in frame.get_column_names() {
            if name != key && !names.insert(name.to_string()) {
                let label = ColumnLabel::from_column_id(name)
                    .map(|label| label.to_string())
                    .unwrap_or_else(|| name.to_string());
                return Err(AgrihandaError::schema(
                    context,
                    format!("column {label} appears in more than one frame"),
                ));
            }
        }
        keys.extend(
            frame
                .column(key)?
                .str()?
                .into_iter()
                .flatten()
                .map(String::from),
        );
    }
    let keys: Vec<String> = keys.into_iter().collect();
    let mut joined = DataFrame::new(vec![Series::new(key, keys)])?;
    for frame in frames {
        joined = joined.left_join(frame, [key], [key])?;
    }
    Ok(joined.sort([key], SortMultipleOptions::default())?)
}

/// Selects `key` first and every labelled column after it in label order.
pub(crate) fn order_by_label(frame: DataFrame, key: &str) -> AgrihandaResult<DataFrame> {
    let mut labels: Vec<ColumnLabel> = frame
        .get_column_names()
        .into_iter()
        .filter_map(ColumnLabel::from_column_id)
        .collect();
    labels.sort();
    let order: Vec<String> = std::iter::once(key.to_string())
        .chain(labels.iter().map(ColumnLabel::column_id))
        .collect();
    Ok(frame.select(order)?)
}

/// Drops every column except `key` that holds no value at all.
pub(crate) fn drop_empty_columns(frame: DataFrame, key: &str) -> AgrihandaResult<DataFrame> {
    let keep: Vec<String> = frame
        .get_columns()
        .iter()
        .filter(|series| series.name() == key || series.null_count() < series.len())
        .map(|series| series.name().to_string())
        .collect();
    let dropped = frame.width() - keep.len();
    if dropped > 0 {
        debug!("Dropping {dropped} empty columns");
    }
    Ok(frame.select(keep)?)
}

/// Cleans one element group. General columns come from the reference sheet, hazard-specific
/// columns from every hazard sheet; the frames are outer-joined on barangay name.
pub fn clean_group(
    group: &ElementGroup,
    workbook: &Workbook,
    config: &Config,
) -> AgrihandaResult<GroupTable> {
    let reference_name = group.reference_sheet.as_deref().ok_or_else(|| {
        AgrihandaError::missing_reference(&group.file_name, "reference sheet is blank")
    })?;
    let reference = workbook.sheet(reference_name).ok_or_else(|| {
        AgrihandaError::missing_reference(
            &group.file_name,
            format!("workbook has no sheet named '{reference_name}'"),
        )
    })?;
    let dictionary_sheet = workbook.dictionary().ok_or_else(|| {
        AgrihandaError::schema(
            &group.file_name,
            format!("workbook has no '{}' sheet", COL::DICTIONARY_SHEET),
        )
    })?;
    let dictionary = DataDictionary::from_sheet(
        dictionary_sheet,
        group.data_ncols,
        config.dictionary_width,
        &group.file_name,
    )?;

    let general = normalize_sheet(reference, &dictionary, group)?;
    let mut frames = vec![hazard_frame(
        &general,
        &dictionary,
        group,
        COL::ALL_HAZARDS,
        &config.list_delimiter,
        |entry| !entry.unique,
    )?];
    for sheet in workbook.data_sheets() {
        let normalized = normalize_sheet(sheet, &dictionary, group)?;
        frames.push(hazard_frame(
            &normalized,
            &dictionary,
            group,
            &normalize_label(&sheet.name),
            &config.list_delimiter,
            |entry| entry.unique,
        )?);
    }

    let joined = outer_join_on(&group.file_name, COL::BARANGAY_NAME, &frames)?;
    let frame = order_by_label(
        drop_empty_columns(joined, COL::BARANGAY_NAME)?,
        COL::BARANGAY_NAME,
    )?;
    info!(
        "Cleaned {}: {} barangays, {} columns",
        group.file_name,
        frame.height(),
        frame.width() - 1
    );
    Ok(GroupTable {
        name: group.file_name.clone(),
        frame,
    })
}
