//! Runs the cleaning stages in order and writes the outputs.

use log::{error, info, warn};
use serde::Serialize;

use crate::barangay::BarangayIds;
use crate::config::Config;
use crate::dictionary::ElementGroup;
use crate::error::{AgrihandaError, AgrihandaResult};
use crate::group::{clean_group, GroupTable};
use crate::hierarchy::{assign_barangay_ids, merge_groups};
use crate::sheet::{read_first_sheet, RawSheet, Workbook};
use crate::tables::Tables;
use crate::COL;

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub groups_cleaned: Vec<String>,
    /// Groups skipped because of a schema error, with the error message.
    pub groups_skipped: Vec<(String, String)>,
    pub barangays: usize,
    pub columns: usize,
}

pub struct Pipeline<'a> {
    config: &'a Config,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Reads the inputs named by the config, cleans them and writes the outputs.
    pub fn run(&self) -> AgrihandaResult<(Tables, RunReport)> {
        let manifest = read_first_sheet(&self.config.element_groups_path())?;
        let groups = ElementGroup::parse_all(&manifest)?;
        info!("{} element groups listed", groups.len());
        let inputs = groups
            .into_iter()
            .map(|group| {
                let workbook = Workbook::open(&self.config.input_dir, &group.file_name)?;
                Ok((group, workbook))
            })
            .collect::<AgrihandaResult<Vec<_>>>()?;
        let reference = self
            .config
            .barangay_reference_path()
            .map(|path| read_first_sheet(&path))
            .transpose()?;

        let (tables, report) = self.build(&inputs, reference.as_ref())?;
        tables.write(&self.config.output_dir, self.config.write_divided)?;
        Ok((tables, report))
    }

    /// Cleans in-memory inputs. Schema errors skip their group; any other error aborts.
    pub fn build(
        &self,
        inputs: &[(ElementGroup, Workbook)],
        reference: Option<&RawSheet>,
    ) -> AgrihandaResult<(Tables, RunReport)> {
        let mut report = RunReport::default();
        let mut cleaned: Vec<GroupTable> = vec![];
        for (group, workbook) in inputs {
            match clean_group(group, workbook, self.config) {
                Ok(table) => {
                    report.groups_cleaned.push(group.file_name.clone());
                    cleaned.push(table);
                }
                Err(err) if err.is_group_local() => {
                    error!("Skipping {}: {err}", group.file_name);
                    report
                        .groups_skipped
                        .push((group.file_name.clone(), err.to_string()));
                }
                Err(err) => return Err(err),
            }
        }
        if cleaned.is_empty() {
            return Err(AgrihandaError::NothingCleaned(format!(
                "{} groups skipped",
                report.groups_skipped.len()
            )));
        }

        let merged = merge_groups(&cleaned)?;
        let ids = match reference {
            Some(sheet) => BarangayIds::from_reference(sheet, &self.config.gid_pattern)?,
            None => {
                warn!("No barangay reference table, assigning IDs in name order");
                let names = merged.column(COL::BARANGAY_NAME)?.str()?;
                BarangayIds::sequential(names.into_iter().flatten())
            }
        };
        let hierarchical = assign_barangay_ids(merged, &ids)?;
        let tables = Tables::from_hierarchical(hierarchical)?;
        report.barangays = tables.hierarchical.height();
        report.columns = tables.label_index.len();
        info!(
            "Cleaned {} groups ({} skipped): {} barangays, {} columns",
            report.groups_cleaned.len(),
            report.groups_skipped.len(),
            report.barangays,
            report.columns
        );
        Ok((tables, report))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::group::tests::{crops_group, crops_workbook, text};
    use crate::label::ColumnLabel;
    use crate::tables::paths;

    fn broken_workbook() -> Workbook {
        let mut workbook = crops_workbook();
        workbook.name = "agriculture_livestock".into();
        workbook.sheets[0] = RawSheet::from_rows(
            COL::DICTIONARY_SHEET,
            vec![
                vec![text("column_name"), text("disaster_risk_aspect")],
                vec![text("Barangay"), text("Index")],
                vec![text("Heads"), text("Exposure")],
                vec![text("heads "), text("exposure")],
            ],
        );
        workbook
    }

    fn livestock_group() -> ElementGroup {
        ElementGroup::new("agriculture_livestock", 10, 3, Some("Flood".into())).unwrap()
    }

    #[test]
    fn schema_errors_skip_the_group() {
        let config = Config::default();
        let inputs = vec![
            (crops_group(), crops_workbook()),
            (livestock_group(), broken_workbook()),
        ];
        let (tables, report) = Pipeline::new(&config).build(&inputs, None).unwrap();
        assert_eq!(report.groups_cleaned, vec!["agriculture_crops"]);
        assert_eq!(report.groups_skipped.len(), 1);
        assert_eq!(report.barangays, 3);
        assert_eq!(tables.hierarchical.bids(), vec![1, 2, 3]);
        assert_eq!(
            tables.hierarchical.barangay_name(3),
            Some("Libertad".to_string())
        );
    }

    #[test]
    fn all_groups_failing_is_an_error() {
        let config = Config::default();
        let inputs = vec![(livestock_group(), broken_workbook())];
        let err = Pipeline::new(&config).build(&inputs, None).unwrap_err();
        assert!(matches!(err, AgrihandaError::NothingCleaned(_)));
    }

    #[test]
    fn missing_reference_aborts_the_run() {
        let config = Config::default();
        let group = ElementGroup::new("agriculture_crops", 10, 4, None).unwrap();
        let inputs = vec![(crops_group(), crops_workbook()), (group, crops_workbook())];
        let err = Pipeline::new(&config).build(&inputs, None).unwrap_err();
        assert!(matches!(err, AgrihandaError::MissingReference { .. }));
    }

    #[test]
    fn reference_table_assigns_ids() {
        let config = Config::default();
        let reference = RawSheet::new(
            "barangay_GIDs",
            vec![COL::REF_ORIG_NAME.into(), COL::REF_GID_3.into()],
            vec![
                vec![text("Ambago"), text("PHL.2.2.5_1")],
                vec![text("Bading"), text("PHL.2.2.2_1")],
                vec![text("Libertad"), text("PHL.2.2.9_1")],
            ],
        );
        let inputs = vec![(crops_group(), crops_workbook())];
        let (tables, _) = Pipeline::new(&config)
            .build(&inputs, Some(&reference))
            .unwrap();
        assert_eq!(tables.hierarchical.bids(), vec![2, 5, 9]);
        assert_eq!(tables.hierarchical.barangay_name(2), Some("Bading".to_string()));

        let partial = RawSheet::new(
            "barangay_GIDs",
            vec![COL::REF_ORIG_NAME.into(), COL::REF_GID_3.into()],
            vec![vec![text("Ambago"), text("PHL.2.2.5_1")]],
        );
        let err = Pipeline::new(&config)
            .build(&inputs, Some(&partial))
            .unwrap_err();
        assert!(matches!(err, AgrihandaError::UnknownBarangay(_)));
    }

    fn write_csv(path: &std::path::Path, rows: &[&str]) -> anyhow::Result<()> {
        let mut file = std::fs::File::create(path)?;
        for row in rows {
            writeln!(file, "{row}")?;
        }
        Ok(())
    }

    /// Input directory with a CSV manifest and one CSV workbook.
    fn write_inputs(dir: &std::path::Path) -> anyhow::Result<()> {
        write_csv(
            &dir.join("element_groups.csv"),
            &["file_name,data_nrows,data_ncols,reference_sheet", "agriculture_crops,10,4,Flood"],
        )?;
        let book = dir.join("agriculture_crops");
        std::fs::create_dir(&book)?;
        write_csv(
            &book.join("dictionary.csv"),
            &[
                "column_name,disaster_risk_aspect,data_type,is_list,drop,unique",
                "Barangay,Index,text,,,",
                "Ecosystem,Exposure,text,,,",
                "Crops,Exposure,text,1,,1",
                "Risk Score,Overall Risk,float,,,1",
            ],
        )?;
        write_csv(
            &book.join("Flood.csv"),
            &[
                "Barangay,Ecosystem,Crops,Risk Score",
                "ambago,lowland,\"rice, corn\",2.5",
                "Bading,upland,corn,1",
            ],
        )?;
        write_csv(
            &book.join("Drought.csv"),
            &[
                "Barangay,Ecosystem,Crops,Risk Score",
                "AMBAGO,lowland,,3",
                "Libertad,coastal,Rices,4",
            ],
        )?;
        Ok(())
    }

    #[test]
    fn rerun_produces_identical_outputs() -> anyhow::Result<()> {
        let input = tempfile::tempdir()?;
        let output = tempfile::tempdir()?;
        write_inputs(input.path())?;
        let config = Config {
            input_dir: input.path().to_path_buf(),
            output_dir: output.path().to_path_buf(),
            element_groups: "element_groups.csv".into(),
            barangay_reference: None,
            ..Default::default()
        };

        let (tables, report) = Pipeline::new(&config).run()?;
        assert_eq!(report.groups_cleaned, vec!["agriculture_crops"]);
        let flood_crops = ColumnLabel::new("Agriculture", "Crops", "Flood", "Exposure", "Crops_Corn");
        assert!(tables.label_index.flat_key(&flood_crops).is_some());

        let files = [
            paths::HIERARCHICAL,
            paths::FLAT,
            paths::LABEL_INDEX,
            paths::LIBRARY,
        ];
        let first: Vec<Vec<u8>> = files
            .iter()
            .map(|file| std::fs::read(output.path().join(file)))
            .collect::<Result<_, _>>()?;
        Pipeline::new(&config).run()?;
        let second: Vec<Vec<u8>> = files
            .iter()
            .map(|file| std::fs::read(output.path().join(file)))
            .collect::<Result<_, _>>()?;
        assert_eq!(first, second);

        let hierarchical = String::from_utf8(first[0].clone())?;
        assert!(hierarchical.starts_with("Sector,(Barangay),Agriculture"));
        assert!(hierarchical
            .lines()
            .nth(5)
            .is_some_and(|line| line.starts_with("1,Ambago,")));
        Ok(())
    }
}
