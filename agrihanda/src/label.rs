//! The five-level column label and its two string encodings: the internal column id used as a
//! polars column name, and the `/`-joined flat key exposed to label-unaware consumers.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use strum_macros::{Display as StrumDisplay, EnumString};

use crate::COL;

/// Separator of the internal column id. Normalized label components never contain control
/// characters, so splitting on it is unambiguous.
const COLUMN_ID_SEPARATOR: &str = "\u{1f}";

/// Separator of the flat key.
pub const FLAT_KEY_SEPARATOR: &str = "/";

/// The levels of the label hierarchy, broadest first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, StrumDisplay,
    EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Level {
    #[strum(to_string = "Sector")]
    Sector,
    #[strum(to_string = "Element")]
    Element,
    #[strum(to_string = "Hazard")]
    Hazard,
    #[strum(to_string = "Disaster Risk Aspect", serialize = "aspect")]
    Aspect,
    #[strum(to_string = "Detail")]
    Detail,
}

impl Level {
    pub const ALL: [Level; 5] = [
        Level::Sector,
        Level::Element,
        Level::Hazard,
        Level::Aspect,
        Level::Detail,
    ];

    /// Name of the column holding this level in the label index.
    pub fn column_name(&self) -> &'static str {
        match self {
            Level::Sector => COL::SECTOR,
            Level::Element => COL::ELEMENT,
            Level::Hazard => COL::HAZARD,
            Level::Aspect => COL::DISASTER_RISK_ASPECT,
            Level::Detail => COL::DETAIL,
        }
    }

    pub fn depth(&self) -> usize {
        *self as usize
    }

    pub fn next(&self) -> Option<Level> {
        Level::ALL.get(self.depth() + 1).copied()
    }
}

/// Hierarchical label of one data column. The derived ordering (sector first, detail last) is the
/// column order of every table the pipeline writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnLabel {
    pub sector: String,
    pub element: String,
    pub hazard: String,
    pub aspect: String,
    pub detail: String,
}

impl ColumnLabel {
    pub fn new(
        sector: impl Into<String>,
        element: impl Into<String>,
        hazard: impl Into<String>,
        aspect: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            sector: sector.into(),
            element: element.into(),
            hazard: hazard.into(),
            aspect: aspect.into(),
            detail: detail.into(),
        }
    }

    /// The reserved label of the barangay-identity column.
    pub fn barangay() -> Self {
        Self::new(COL::BARANGAY_SECTOR, COL::NONE, COL::NONE, COL::NONE, COL::NONE)
    }

    pub fn is_barangay(&self) -> bool {
        *self == Self::barangay()
    }

    pub fn is_general(&self) -> bool {
        self.hazard == COL::ALL_HAZARDS
    }

    pub fn get(&self, level: Level) -> &str {
        match level {
            Level::Sector => &self.sector,
            Level::Element => &self.element,
            Level::Hazard => &self.hazard,
            Level::Aspect => &self.aspect,
            Level::Detail => &self.detail,
        }
    }

    pub fn components(&self) -> [&str; 5] {
        [
            &self.sector,
            &self.element,
            &self.hazard,
            &self.aspect,
            &self.detail,
        ]
    }

    pub fn from_components<S: AsRef<str>>(components: &[S]) -> Option<Self> {
        match components {
            [sector, element, hazard, aspect, detail] => Some(Self::new(
                sector.as_ref(),
                element.as_ref(),
                hazard.as_ref(),
                aspect.as_ref(),
                detail.as_ref(),
            )),
            _ => None,
        }
    }

    /// Same sector, element and hazard with a different aspect and detail.
    pub fn sibling(&self, aspect: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(&self.sector, &self.element, &self.hazard, aspect, detail)
    }

    /// Name of the polars column carrying this label inside a hierarchical table.
    pub(crate) fn column_id(&self) -> String {
        self.components().join(COLUMN_ID_SEPARATOR)
    }

    pub(crate) fn from_column_id(id: &str) -> Option<Self> {
        let parts: Vec<&str> = id.split(COLUMN_ID_SEPARATOR).collect();
        Self::from_components(&parts)
    }

    /// The flat key: components joined by `/` after stripping any `/` they contain. The barangay
    /// column is aliased to a short constant.
    pub fn flat_key(&self) -> String {
        if self.is_barangay() {
            return COL::BARANGAY_ALIAS.to_string();
        }
        self.components()
            .iter()
            .map(|component| component.replace(FLAT_KEY_SEPARATOR, ""))
            .collect::<Vec<_>>()
            .join(FLAT_KEY_SEPARATOR)
    }
}

impl Display for ColumnLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.flat_key())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn crops_label() -> ColumnLabel {
        ColumnLabel::new("Agriculture", "Crops", "Flood", "Exposure", "Area Planted")
    }

    #[test]
    fn column_id_should_round_trip() {
        let label = crops_label();
        assert_eq!(ColumnLabel::from_column_id(&label.column_id()), Some(label));
        assert_eq!(ColumnLabel::from_column_id("not a column id"), None);
    }

    #[test]
    fn flat_key_joins_components_and_strips_separators() {
        assert_eq!(
            crops_label().flat_key(),
            "Agriculture/Crops/Flood/Exposure/Area Planted"
        );
        let label = ColumnLabel::new("Agriculture", "Crops", "Flood", "Exposure", "Rice/Corn");
        assert_eq!(
            label.flat_key(),
            "Agriculture/Crops/Flood/Exposure/RiceCorn"
        );
        assert_eq!(ColumnLabel::barangay().flat_key(), COL::BARANGAY_ALIAS);
    }

    #[test]
    fn barangay_label_sorts_first() {
        let mut labels = vec![crops_label(), ColumnLabel::barangay()];
        labels.sort();
        assert!(labels[0].is_barangay());
    }

    #[test]
    fn level_should_parse_case_insensitively() {
        assert_eq!(Level::from_str("aspect").unwrap(), Level::Aspect);
        assert_eq!(
            Level::from_str("Disaster Risk Aspect").unwrap(),
            Level::Aspect
        );
        assert_eq!(Level::from_str("HAZARD").unwrap(), Level::Hazard);
        assert!(Level::from_str("subsector").is_err());
        assert_eq!(Level::Aspect.to_string(), COL::DISASTER_RISK_ASPECT);
        assert_eq!(Level::Detail.next(), None);
        assert_eq!(Level::Sector.next(), Some(Level::Element));
    }
}
