use std::io::{Cursor, Write};

use anyhow::{anyhow, Result};
use enum_dispatch::enum_dispatch;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::hierarchy::HierarchicalTable;
use crate::label::{ColumnLabel, Level};
use crate::COL;

/// Utility function to convert from polars `AnyValue` to `serde_json::Value`
/// Doesn't cover all types but most of them.
fn any_value_to_json(value: &AnyValue) -> Result<Value> {
    match value {
        AnyValue::Null => Ok(Value::Null),
        AnyValue::Boolean(b) => Ok(Value::Bool(*b)),
        AnyValue::String(s) => Ok(Value::String((*s).to_string())),
        AnyValue::StringOwned(s) => Ok(Value::String(s.to_string())),
        AnyValue::Int32(n) => Ok(json!(*n)),
        AnyValue::Int64(n) => Ok(json!(*n)),
        AnyValue::UInt32(n) => Ok(json!(*n)),
        AnyValue::UInt64(n) => Ok(json!(*n)),
        AnyValue::Float32(n) => Ok(json!(*n)),
        AnyValue::Float64(n) => Ok(json!(*n)),
        _ => Err(anyhow!("Failed to convert type")),
    }
}

/// Trait to define different output generators. Defines two
/// functions, format which generates a serialized string of the
/// `DataFrame` and save which generates a file with the generated
/// file
#[enum_dispatch]
pub trait OutputGenerator {
    fn save(&self, writer: &mut impl Write, df: &mut DataFrame) -> Result<()>;
    fn format(&self, df: &mut DataFrame) -> Result<String> {
        // Just creating an empty vec to store the buffered output
        let mut data: Vec<u8> = vec![];
        let mut buff = Cursor::new(&mut data);
        self.save(&mut buff, df)?;

        Ok(String::from_utf8(data)?)
    }
}

/// Enum of OutputFormatters one for each potential
/// output type
#[enum_dispatch(OutputGenerator)]
#[derive(Serialize, Deserialize, Debug)]
pub enum OutputFormatter {
    Csv(CSVFormatter),
    HierarchicalCsv(HierarchicalCSVFormatter),
    JsonRows(JsonRowsFormatter),
}

/// Format the results as a CSV file with a single header row
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct CSVFormatter;

impl OutputGenerator for CSVFormatter {
    fn save(&self, writer: &mut impl Write, df: &mut DataFrame) -> Result<()> {
        CsvWriter::new(writer).finish(df)?;
        Ok(())
    }
}

/// Format a hierarchical table frame as CSV with one header row per label level. The first cell
/// of each header row names the level; data rows start with the `BID`.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct HierarchicalCSVFormatter;

impl OutputGenerator for HierarchicalCSVFormatter {
    fn save(&self, writer: &mut impl Write, df: &mut DataFrame) -> Result<()> {
        let labels = df
            .get_column_names()
            .into_iter()
            .filter(|name| *name != COL::BID)
            .map(|name| {
                ColumnLabel::from_column_id(name)
                    .ok_or_else(|| anyhow!("'{name}' is not a column label"))
            })
            .collect::<Result<Vec<_>>>()?;
        {
            let mut header = csv::Writer::from_writer(&mut *writer);
            for level in Level::ALL {
                let name = level.to_string();
                header.write_record(
                    std::iter::once(name.as_str()).chain(labels.iter().map(|label| label.get(level))),
                )?;
            }
            header.flush()?;
        }
        CsvWriter::new(writer).include_header(false).finish(df)?;
        Ok(())
    }
}

/// Format the results as a JSON array with one object per row
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct JsonRowsFormatter;

impl OutputGenerator for JsonRowsFormatter {
    fn save(&self, writer: &mut impl Write, df: &mut DataFrame) -> Result<()> {
        let mut rows = vec![];
        for idx in 0..df.height() {
            let mut properties = serde_json::Map::new();
            for col in df.get_columns() {
                properties.insert(col.name().to_string(), any_value_to_json(&col.get(idx)?)?);
            }
            rows.push(Value::Object(properties));
        }
        serde_json::to_writer_pretty(&mut *writer, &rows)?;
        writeln!(writer)?;
        Ok(())
    }
}

/// Restores the "True"/"False" text that CSV schema inference reads as Boolean.
pub(crate) fn booleans_as_text(mut df: DataFrame) -> Result<DataFrame> {
    let names: Vec<String> = df
        .get_columns()
        .iter()
        .filter(|column| column.dtype() == &DataType::Boolean)
        .map(|column| column.name().to_string())
        .collect();
    for name in names {
        let text: StringChunked = df
            .column(&name)?
            .bool()?
            .into_iter()
            .map(|value| value.map(|flag| if flag { "True" } else { "False" }))
            .collect();
        df.with_column(text.into_series().with_name(&name))?;
    }
    Ok(df)
}

/// Reads a hierarchical CSV written by `HierarchicalCSVFormatter`.
pub fn read_hierarchical_csv(contents: &str) -> Result<HierarchicalTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(contents.as_bytes());
    let mut headers = vec![];
    let mut record = csv::StringRecord::new();
    for level in Level::ALL {
        if !reader.read_record(&mut record)? {
            return Err(anyhow!("Missing '{level}' header row"));
        }
        let mut fields = record.iter();
        if fields.next() != Some(level.to_string().as_str()) {
            return Err(anyhow!("Expected '{level}' header row"));
        }
        headers.push(fields.map(String::from).collect::<Vec<_>>());
    }
    let body_start = usize::try_from(reader.position().byte())?;
    let width = headers[0].len();
    if headers.iter().any(|fields| fields.len() != width) {
        return Err(anyhow!("Header rows have different lengths"));
    }
    let names: Vec<String> = std::iter::once(COL::BID.to_string())
        .chain((0..width).map(|column| {
            let components: Vec<&str> = headers.iter().map(|row| row[column].as_str()).collect();
            // Five header rows give five components
            ColumnLabel::from_components(&components)
                .map(|label| label.column_id())
                .unwrap_or_default()
        }))
        .collect();

    let body = contents.get(body_start..).unwrap_or_default();
    let mut df = if body.trim().is_empty() {
        DataFrame::new(
            names
                .iter()
                .map(|name| Series::new_empty(name, &DataType::String))
                .collect(),
        )?
    } else {
        let mut df = CsvReadOptions::default()
            .with_has_header(false)
            .with_infer_schema_length(None)
            .into_reader_with_file_handle(Cursor::new(body.as_bytes().to_vec()))
            .finish()?;
        let old: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        if old.len() != names.len() {
            return Err(anyhow!(
                "Data rows have {} fields, headers describe {}",
                old.len(),
                names.len()
            ));
        }
        for (old, new) in old.iter().zip(&names) {
            df.rename(old, new)?;
        }
        df
    };
    let bids = df.column(COL::BID)?.cast(&DataType::Int64)?;
    df.with_column(bids)?;
    let df = booleans_as_text(df)?;
    Ok(HierarchicalTable::from_frame(df)?)
}
