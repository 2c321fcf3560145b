//! In-memory spreadsheets and the loaders that fill them, either from `.xlsx` workbooks or from a
//! directory holding one `.csv` file per sheet.

use std::path::{Path, PathBuf};

use anyhow::anyhow;
use calamine::{open_workbook, DataType as XlsxCell, Reader, Xlsx};
use log::{debug, info};
use polars::prelude::*;

use crate::error::{AgrihandaError, AgrihandaResult};
use crate::COL;

/// A single spreadsheet cell as read from the input.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl Cell {
    /// Parses text the way a spreadsheet would show it: finite numbers become numeric cells and
    /// blank text becomes empty. "NaN" and "inf" stay text.
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Cell::Empty
        } else if let Ok(value) = trimmed.parse::<i64>() {
            Cell::Int(value)
        } else if let Some(value) = trimmed.parse::<f64>().ok().filter(|value| value.is_finite()) {
            Cell::Float(value)
        } else {
            Cell::Text(text.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(text) => text.trim().is_empty(),
            Cell::Float(value) => value.is_nan(),
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(value) => Some(*value as f64),
            Cell::Float(value) if !value.is_nan() => Some(*value),
            _ => None,
        }
    }

    /// Text rendering of the cell, `None` when empty.
    pub fn as_text(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        match self {
            Cell::Empty => None,
            Cell::Int(value) => Some(value.to_string()),
            Cell::Float(value) => Some(format_number(*value)),
            Cell::Text(text) => Some(text.clone()),
            Cell::Bool(value) => Some(if *value { "True" } else { "False" }.to_string()),
        }
    }

    /// Interprets a dictionary flag. Blank cells and zeros are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Cell::Empty => false,
            Cell::Int(value) => *value != 0,
            Cell::Float(value) => *value != 0.0 && !value.is_nan(),
            Cell::Bool(value) => *value,
            Cell::Text(text) => matches!(
                text.trim().to_ascii_lowercase().as_str(),
                "true" | "yes" | "y" | "1" | "x"
            ),
        }
    }
}

/// Integral floats print without a fractional part, matching how spreadsheets display them.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

impl From<&XlsxCell> for Cell {
    fn from(value: &XlsxCell) -> Self {
        match value {
            XlsxCell::Int(value) => Cell::Int(*value),
            XlsxCell::Float(value) | XlsxCell::DateTime(value) => Cell::Float(*value),
            XlsxCell::String(text) => Cell::Text(text.clone()),
            XlsxCell::Bool(value) => Cell::Bool(*value),
            XlsxCell::Empty => Cell::Empty,
            // Formula errors carry no usable value
            _ => Cell::Empty,
        }
    }
}

/// One sheet: a header row plus data rows. Rows may be ragged; missing cells read as empty.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSheet {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawSheet {
    pub fn new(name: impl Into<String>, header: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            header,
            rows,
        }
    }

    /// Builds a sheet whose first row is the header.
    pub fn from_rows(name: impl Into<String>, mut rows: Vec<Vec<Cell>>) -> Self {
        let header = if rows.is_empty() {
            vec![]
        } else {
            rows.remove(0)
                .iter()
                .map(|cell| cell.as_text().unwrap_or_default())
                .collect()
        };
        Self::new(name, header, rows)
    }

    /// Builds a sheet from a frame read with every column as text.
    pub fn from_frame(name: impl Into<String>, df: &DataFrame) -> AgrihandaResult<Self> {
        let header = df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        let mut rows = vec![Vec::with_capacity(df.width()); df.height()];
        for series in df.get_columns() {
            let as_text = series.cast(&DataType::String)?;
            for (row, value) in rows.iter_mut().zip(as_text.str()?.into_iter()) {
                row.push(value.map(Cell::from_text).unwrap_or(Cell::Empty));
            }
        }
        Ok(Self::new(name, header, rows))
    }

    pub fn width(&self) -> usize {
        self.header.len()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Index of a header, compared after trimming and ignoring case.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header
            .iter()
            .position(|header| header.trim().eq_ignore_ascii_case(name.trim()))
    }

    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        const EMPTY: &Cell = &Cell::Empty;
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .unwrap_or(EMPTY)
    }

    /// Keeps at most `nrows` data rows and `ncols` columns. Spreadsheets often carry trailing
    /// blank rows and columns outside the data area.
    pub fn truncated(&self, nrows: usize, ncols: usize) -> Self {
        Self {
            name: self.name.clone(),
            header: self.header.iter().take(ncols).cloned().collect(),
            rows: self
                .rows
                .iter()
                .take(nrows)
                .map(|row| row.iter().take(ncols).cloned().collect())
                .collect(),
        }
    }
}

/// The sheets of one `{sector}_{element}` workbook: a `dictionary` sheet plus one sheet per
/// hazard.
#[derive(Debug, Clone, PartialEq)]
pub struct Workbook {
    pub name: String,
    pub sheets: Vec<RawSheet>,
}

impl Workbook {
    pub fn new(name: impl Into<String>, sheets: Vec<RawSheet>) -> Self {
        Self {
            name: name.into(),
            sheets,
        }
    }

    /// Looks a sheet up by exact name, falling back to a case-insensitive match.
    pub fn sheet(&self, name: &str) -> Option<&RawSheet> {
        let name = name.trim();
        self.sheets
            .iter()
            .find(|sheet| sheet.name == name)
            .or_else(|| {
                self.sheets
                    .iter()
                    .find(|sheet| sheet.name.trim().eq_ignore_ascii_case(name))
            })
    }

    pub fn dictionary(&self) -> Option<&RawSheet> {
        self.sheet(COL::DICTIONARY_SHEET)
    }

    /// Every sheet except the data dictionary, in workbook order.
    pub fn data_sheets(&self) -> impl Iterator<Item = &RawSheet> {
        self.sheets
            .iter()
            .filter(|sheet| !sheet.name.trim().eq_ignore_ascii_case(COL::DICTIONARY_SHEET))
    }

    /// Opens `{input_dir}/{file_name}.xlsx`, or the directory `{input_dir}/{file_name}/` of CSV
    /// sheets when no workbook file exists.
    pub fn open(input_dir: &Path, file_name: &str) -> AgrihandaResult<Self> {
        let xlsx_path = input_dir.join(format!("{file_name}.xlsx"));
        let csv_dir = input_dir.join(file_name);
        if xlsx_path.is_file() {
            Self::from_xlsx(&xlsx_path)
        } else if csv_dir.is_dir() {
            Self::from_csv_dir(&csv_dir)
        } else {
            Err(anyhow!(
                "No workbook found for '{file_name}': expected {} or {}",
                xlsx_path.display(),
                csv_dir.display()
            )
            .into())
        }
    }

    pub fn from_xlsx(path: &Path) -> AgrihandaResult<Self> {
        info!("Reading workbook {}", path.display());
        let mut workbook: Xlsx<_> = open_workbook(path)?;
        let sheet_names = workbook.sheet_names().to_vec();
        let mut sheets = Vec::with_capacity(sheet_names.len());
        for sheet_name in sheet_names {
            let range = workbook
                .worksheet_range(&sheet_name)
                .ok_or_else(|| anyhow!("Missing sheet '{sheet_name}' in {}", path.display()))??;
            // A range starts at its first used cell; pad so that rows and columns keep their
            // spreadsheet positions.
            let (row_offset, column_offset) = range
                .start()
                .map(|(row, column)| (row as usize, column as usize))
                .unwrap_or((0, 0));
            let mut rows: Vec<Vec<Cell>> = vec![vec![]; row_offset];
            rows.extend(range.rows().map(|row| {
                std::iter::repeat(Cell::Empty)
                    .take(column_offset)
                    .chain(row.iter().map(Cell::from))
                    .collect()
            }));
            debug!("Sheet '{sheet_name}' has {} rows", rows.len());
            sheets.push(RawSheet::from_rows(sheet_name, rows));
        }
        Ok(Self::new(file_stem(path), sheets))
    }

    /// Reads every `.csv` file of a directory as one sheet named after the file stem, in file
    /// name order.
    pub fn from_csv_dir(dir: &Path) -> AgrihandaResult<Self> {
        info!("Reading CSV workbook {}", dir.display());
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| {
                path.extension()
                    .map(|ext| ext.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();
        let sheets = paths
            .iter()
            .map(|path| read_csv_sheet(path, &file_stem(path)))
            .collect::<AgrihandaResult<Vec<_>>>()?;
        Ok(Self::new(file_stem(dir), sheets))
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Reads a CSV file as a sheet, keeping every field as text so that typing is decided by the
/// normalizer rather than by schema inference.
pub fn read_csv_sheet(path: &Path, name: &str) -> AgrihandaResult<RawSheet> {
    debug!("Reading CSV sheet {}", path.display());
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    RawSheet::from_frame(name, &df)
}

/// Reads the first sheet of an `.xlsx` file, or a `.csv` file.
pub fn read_first_sheet(path: &Path) -> AgrihandaResult<RawSheet> {
    let is_csv = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    if is_csv {
        return read_csv_sheet(path, &file_stem(path));
    }
    Workbook::from_xlsx(path)?
        .sheets
        .into_iter()
        .next()
        .ok_or_else(|| AgrihandaError::from(anyhow!("Workbook {} has no sheets", path.display())))
}
