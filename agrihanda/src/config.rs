use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Directory holding the element-group manifest, the workbooks and the barangay reference.
    pub input_dir: PathBuf,
    /// Directory the cleaned tables are written to.
    pub output_dir: PathBuf,
    /// Manifest listing one `{sector}_{element}` workbook per row.
    pub element_groups: String,
    /// Table mapping barangay names to GADM identifiers. When absent, IDs are assigned in sorted
    /// name order.
    pub barangay_reference: Option<String>,
    /// Regex with one capture group extracting the numeric ID from a `GID_3` value.
    pub gid_pattern: String,
    /// Delimiter of multi-value list cells. Newlines always split as well.
    pub list_delimiter: String,
    /// Number of leading columns of the dictionary sheet that carry the data dictionary.
    pub dictionary_width: usize,
    /// Whether to write one sub-table per library entry next to the main outputs.
    pub write_divided: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            input_dir: "cleaning_inputs".into(),
            output_dir: "cleaning_outputs".into(),
            element_groups: "element_groups.xlsx".into(),
            barangay_reference: Some("barangay_GIDs_for_hierarchical_label_data.csv".into()),
            gid_pattern: r"PHL\.2\.2\.([0-9]+)_1".into(),
            list_delimiter: ",".into(),
            dictionary_width: 8,
            write_divided: true,
        }
    }
}

impl Config {
    pub fn element_groups_path(&self) -> PathBuf {
        self.input_dir.join(&self.element_groups)
    }

    pub fn barangay_reference_path(&self) -> Option<PathBuf> {
        self.barangay_reference
            .as_ref()
            .map(|file| self.input_dir.join(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_should_fill_defaults() {
        let config: Config = serde_json::from_str(r#"{"output_dir": "out"}"#).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.input_dir, PathBuf::from("cleaning_inputs"));
        assert_eq!(config.list_delimiter, ",");
    }

    #[test]
    fn reference_path_is_relative_to_inputs() {
        let config = Config {
            input_dir: "inputs".into(),
            barangay_reference: Some("ids.csv".into()),
            ..Default::default()
        };
        assert_eq!(
            config.barangay_reference_path(),
            Some(PathBuf::from("inputs/ids.csv"))
        );
    }
}
