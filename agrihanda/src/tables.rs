//! The cleaned tables of one pipeline run, and their files.

use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;

use anyhow::Context;
use log::{debug, info};
use polars::prelude::*;

use crate::error::AgrihandaResult;
use crate::flatten::{flatten, FlatTable, LabelIndex};
use crate::formatters::{
    booleans_as_text, read_hierarchical_csv, CSVFormatter, HierarchicalCSVFormatter, OutputFormatter,
    OutputGenerator,
};
use crate::hierarchy::HierarchicalTable;
use crate::library::{divided_table, Library};

pub mod paths {
    pub const HIERARCHICAL: &str = "hierarchical_label_data.csv";
    pub const FLAT: &str = "flat_label_data.csv";
    pub const LABEL_INDEX: &str = "label_index.csv";
    pub const LIBRARY: &str = "library.csv";
    pub const DIVIDED_DIR: &str = "divided_database";
}

/// The hierarchical table and every projection derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Tables {
    pub hierarchical: HierarchicalTable,
    pub flat: FlatTable,
    pub label_index: LabelIndex,
    pub library: Library,
}

impl Tables {
    pub fn from_hierarchical(hierarchical: HierarchicalTable) -> AgrihandaResult<Self> {
        let (flat, label_index) = flatten(&hierarchical)?;
        let library = Library::from_labels(label_index.labels());
        Ok(Self {
            hierarchical,
            flat,
            label_index,
            library,
        })
    }

    /// Writes every table to `dir`, creating it if needed.
    pub fn write(&self, dir: &Path, write_divided: bool) -> AgrihandaResult<()> {
        std::fs::create_dir_all(dir)?;
        write_frame(
            &dir.join(paths::HIERARCHICAL),
            &HierarchicalCSVFormatter.into(),
            &mut self.hierarchical.frame().clone(),
        )?;
        let csv: OutputFormatter = CSVFormatter.into();
        write_frame(&dir.join(paths::FLAT), &csv, &mut self.flat.frame().clone())?;
        write_frame(
            &dir.join(paths::LABEL_INDEX),
            &csv,
            &mut self.label_index.to_frame()?,
        )?;
        write_frame(&dir.join(paths::LIBRARY), &csv, &mut self.library.to_frame()?)?;

        if write_divided {
            let divided_dir = dir.join(paths::DIVIDED_DIR);
            std::fs::create_dir_all(&divided_dir)?;
            for entry in self.library.entries() {
                let mut divided = divided_table(&self.hierarchical, entry)?;
                write_frame(
                    &divided_dir.join(format!("{}.csv", entry.sid)),
                    &csv,
                    &mut divided,
                )?;
            }
        }
        info!("Wrote tables to {}", dir.display());
        Ok(())
    }

    /// Reads the tables written by `write`. The hierarchical table is rebuilt from the flat table
    /// and the label index.
    pub fn read(dir: &Path) -> AgrihandaResult<Self> {
        let flat = FlatTable::from_frame(read_csv(&dir.join(paths::FLAT))?)?;
        let label_index = LabelIndex::from_frame(&read_csv(&dir.join(paths::LABEL_INDEX))?)?;
        let hierarchical = crate::flatten::unflatten(&flat, &label_index)?;
        let library = Library::from_labels(label_index.labels());
        debug!(
            "Read {} barangays and {} columns from {}",
            hierarchical.height(),
            label_index.len(),
            dir.display()
        );
        Ok(Self {
            hierarchical,
            flat,
            label_index,
            library,
        })
    }

    /// Reads only the hierarchical CSV.
    pub fn read_hierarchical(dir: &Path) -> AgrihandaResult<HierarchicalTable> {
        let path = dir.join(paths::HIERARCHICAL);
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(read_hierarchical_csv(&contents)?)
    }
}

fn write_frame(path: &Path, formatter: &OutputFormatter, df: &mut DataFrame) -> AgrihandaResult<()> {
    debug!("Writing {}", path.display());
    let mut writer = BufWriter::new(File::create(path)?);
    formatter
        .save(&mut writer, df)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

fn read_csv(path: &Path) -> AgrihandaResult<DataFrame> {
    debug!("Reading {}", path.display());
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(booleans_as_text(df)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::tests::sample_table;

    #[test]
    fn tables_should_write_and_read_back() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let tables = Tables::from_hierarchical(sample_table())?;
        tables.write(dir.path(), true)?;

        for file in [paths::HIERARCHICAL, paths::FLAT, paths::LABEL_INDEX, paths::LIBRARY] {
            assert!(dir.path().join(file).is_file(), "{file} missing");
        }
        assert!(dir.path().join(paths::DIVIDED_DIR).join("2.csv").is_file());

        let flat = std::fs::read_to_string(dir.path().join(paths::FLAT))?;
        assert!(flat.starts_with("BID,(Barangay),Agriculture/Crops/All Hazards/Exposure/Ecosystem"));
        let library = std::fs::read_to_string(dir.path().join(paths::LIBRARY))?;
        assert_eq!(library.lines().next(), Some("SID,Sector,Element,Hazard"));

        let read = Tables::read(dir.path())?;
        assert_eq!(read.label_index, tables.label_index);
        assert_eq!(read.library, tables.library);
        assert_eq!(read.hierarchical.bids(), vec![1, 2, 3, 4]);

        let hierarchical = Tables::read_hierarchical(dir.path())?;
        assert_eq!(hierarchical.labels(), tables.hierarchical.labels());
        Ok(())
    }

    #[test]
    fn boolean_looking_text_should_stay_text() -> anyhow::Result<()> {
        use crate::label::ColumnLabel;
        use crate::query::{CellValue, Lookup};

        let irrigated = ColumnLabel::new("Agriculture", "Crops", "Flood", "Exposure", "Irrigated");
        let table = HierarchicalTable::new(
            vec![1, 2],
            vec![
                (ColumnLabel::barangay(), Series::new("", &["Ambago", "Bading"])),
                (irrigated.clone(), Series::new("", &[Some("True"), Some("False")])),
            ],
        )?;
        let dir = tempfile::tempdir()?;
        Tables::from_hierarchical(table)?.write(dir.path(), false)?;

        let read = Tables::read(dir.path())?;
        assert_eq!(
            read.hierarchical.get_value(1, &irrigated),
            Lookup::Known(CellValue::Text("True".to_string()))
        );
        assert_eq!(
            read.hierarchical.column(&irrigated).map(|series| series.dtype().clone()),
            Some(DataType::String)
        );
        let hierarchical = Tables::read_hierarchical(dir.path())?;
        assert_eq!(
            hierarchical.get_value(2, &irrigated),
            Lookup::Known(CellValue::Text("False".to_string()))
        );
        Ok(())
    }
}
