//! The per-workbook data dictionary and the element-group manifest.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{AgrihandaError, AgrihandaResult};
use crate::normalize::{ensure_unique, normalize_label};
use crate::sheet::{Cell, RawSheet};
use crate::COL;

/// Description of one sheet column. Entry `i` of a dictionary describes column `i` of every data
/// sheet of the workbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub raw_name: String,
    /// Canonical disaster-risk aspect.
    pub aspect: String,
    /// Canonical detail, derived from the raw name.
    pub detail: String,
    pub data_type: String,
    pub is_list: bool,
    pub drop: bool,
    /// Whether the column varies per hazard. Non-unique columns are general.
    pub unique: bool,
}

impl DictionaryEntry {
    /// Whether this entry is the barangay key column.
    pub fn is_key(&self) -> bool {
        self.aspect == COL::INDEX_ASPECT && self.detail == COL::BARANGAY_DETAIL
    }

    /// Dropped and missing columns never reach the output.
    pub fn is_excluded(&self) -> bool {
        self.drop || self.data_type.eq_ignore_ascii_case(COL::DICT_MISSING_TYPE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataDictionary {
    pub entries: Vec<DictionaryEntry>,
}

impl DataDictionary {
    /// Parses the first `ncols` rows and the first `width` columns of a dictionary sheet.
    pub fn from_sheet(
        sheet: &RawSheet,
        ncols: usize,
        width: usize,
        context: &str,
    ) -> AgrihandaResult<Self> {
        let sheet = sheet.truncated(ncols, width);
        let required = |name: &str| {
            sheet.column_index(name).ok_or_else(|| {
                AgrihandaError::schema(context, format!("dictionary has no '{name}' column"))
            })
        };
        let name_idx = required(COL::DICT_COLUMN_NAME)?;
        let aspect_idx = required(COL::DICT_DISASTER_RISK_ASPECT)?;
        let data_type_idx = sheet.column_index(COL::DICT_DATA_TYPE);
        let is_list_idx = sheet.column_index(COL::DICT_IS_LIST);
        let drop_idx = sheet.column_index(COL::DICT_DROP);
        let unique_idx = sheet.column_index(COL::DICT_UNIQUE);
        let flag = |row: usize, idx: Option<usize>| {
            idx.map(|idx| sheet.cell(row, idx).is_truthy())
                .unwrap_or(false)
        };

        let mut entries = Vec::with_capacity(sheet.height());
        for row in 0..sheet.height() {
            let raw_name = sheet
                .cell(row, name_idx)
                .as_text()
                .ok_or_else(|| AgrihandaError::schema(context, format!("column {row} has no name")))?;
            let data_type = data_type_idx
                .and_then(|idx| sheet.cell(row, idx).as_text())
                .unwrap_or_default();
            let drop = flag(row, drop_idx);
            let excluded_type = data_type.trim().eq_ignore_ascii_case(COL::DICT_MISSING_TYPE);
            let aspect = match sheet.cell(row, aspect_idx).as_text() {
                Some(aspect) => normalize_label(&aspect),
                None if drop || excluded_type => String::new(),
                None => {
                    return Err(AgrihandaError::schema(
                        context,
                        format!("column '{raw_name}' has no disaster risk aspect"),
                    ))
                }
            };
            entries.push(DictionaryEntry {
                detail: normalize_label(&raw_name),
                raw_name,
                aspect,
                data_type: data_type.trim().to_string(),
                is_list: flag(row, is_list_idx),
                drop,
                unique: flag(row, unique_idx),
            });
        }

        ensure_unique(
            context,
            entries
                .iter()
                .filter(|entry| !entry.is_excluded())
                .map(|entry| (entry.raw_name.as_str(), (&entry.aspect, &entry.detail))),
        )?;
        debug!("{context}: {} dictionary entries", entries.len());
        Ok(Self { entries })
    }

    /// Position of the barangay key column.
    pub fn key_index(&self, context: &str) -> AgrihandaResult<usize> {
        self.entries
            .iter()
            .position(DictionaryEntry::is_key)
            .ok_or_else(|| {
                AgrihandaError::schema(
                    context,
                    format!(
                        "dictionary has no '{}' column with aspect '{}'",
                        COL::BARANGAY_DETAIL,
                        COL::INDEX_ASPECT
                    ),
                )
            })
    }

    /// Entries that are copied to the output, with their column positions.
    pub fn data_entries(&self) -> impl Iterator<Item = (usize, &DictionaryEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.is_key() && !entry.is_excluded())
    }
}

/// One `{sector}_{element}` workbook listed in the element-group manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementGroup {
    pub file_name: String,
    pub sector: String,
    pub element: String,
    pub data_nrows: usize,
    pub data_ncols: usize,
    pub reference_sheet: Option<String>,
}

impl ElementGroup {
    /// Derives sector and element from a `{sector}_{element}` file name.
    pub fn new(
        file_name: &str,
        data_nrows: usize,
        data_ncols: usize,
        reference_sheet: Option<String>,
    ) -> AgrihandaResult<Self> {
        let file_name = file_name.trim();
        let (sector, element) = file_name
            .split_once('_')
            .filter(|(sector, element)| !sector.is_empty() && !element.is_empty())
            .ok_or_else(|| {
                AgrihandaError::schema(
                    file_name,
                    "file name is not of the form '{sector}_{element}'",
                )
            })?;
        Ok(Self {
            file_name: file_name.to_string(),
            sector: normalize_label(sector),
            element: normalize_label(element),
            data_nrows,
            data_ncols,
            reference_sheet: reference_sheet
                .map(|sheet| sheet.trim().to_string())
                .filter(|sheet| !sheet.is_empty()),
        })
    }

    /// Parses every non-blank row of the manifest sheet.
    pub fn parse_all(manifest: &RawSheet) -> AgrihandaResult<Vec<Self>> {
        let context = manifest.name.as_str();
        let required = |name: &str| {
            manifest.column_index(name).ok_or_else(|| {
                AgrihandaError::schema(context, format!("manifest has no '{name}' column"))
            })
        };
        let file_idx = required(COL::GROUP_FILE_NAME)?;
        let nrows_idx = required(COL::GROUP_DATA_NROWS)?;
        let ncols_idx = required(COL::GROUP_DATA_NCOLS)?;
        let reference_idx = required(COL::GROUP_REFERENCE_SHEET)?;
        let count = |row: usize, idx: usize, name: &str| -> AgrihandaResult<usize> {
            match manifest.cell(row, idx) {
                Cell::Int(value) if *value >= 0 => Ok(*value as usize),
                Cell::Float(value) if *value >= 0.0 && value.fract() == 0.0 => Ok(*value as usize),
                other => Err(AgrihandaError::schema(
                    context,
                    format!("row {row}: '{name}' is not a count: {other:?}"),
                )),
            }
        };

        (0..manifest.height())
            .filter_map(|row| {
                manifest
                    .cell(row, file_idx)
                    .as_text()
                    .map(|file_name| (row, file_name))
            })
            .map(|(row, file_name)| {
                Self::new(
                    &file_name,
                    count(row, nrows_idx, COL::GROUP_DATA_NROWS)?,
                    count(row, ncols_idx, COL::GROUP_DATA_NCOLS)?,
                    manifest.cell(row, reference_idx).as_text(),
                )
            })
            .collect()
    }
}
