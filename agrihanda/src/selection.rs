//! Cascading selection of a column label, one level at a time.

use std::collections::BTreeSet;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{AgrihandaError, AgrihandaResult};
use crate::flatten::LabelIndex;
use crate::label::{ColumnLabel, Level};
use crate::COL;

/// Either the components chosen so far, broadest first, or a complete label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selection {
    Partial(Vec<String>),
    Complete(ColumnLabel),
}

impl Default for Selection {
    fn default() -> Self {
        Selection::Partial(vec![])
    }
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// The level the next choice applies to; `None` once complete.
    pub fn next_level(&self) -> Option<Level> {
        match self {
            Selection::Partial(prefix) => Level::ALL.get(prefix.len()).copied(),
            Selection::Complete(_) => None,
        }
    }

    fn matches(prefix: &[String], label: &ColumnLabel) -> bool {
        prefix
            .iter()
            .zip(label.components())
            .all(|(chosen, component)| chosen == component)
    }

    /// Sorted distinct values of the next level among labels matching the choices so far.
    pub fn options(&self, index: &LabelIndex) -> Vec<String> {
        let (Selection::Partial(prefix), Some(level)) = (self, self.next_level()) else {
            return vec![];
        };
        index
            .labels()
            .filter(|label| Self::matches(prefix, label))
            .map(|label| label.get(level).to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Advances by one level. Choosing the barangay sector completes the selection at once.
    pub fn choose(self, value: &str, index: &LabelIndex) -> AgrihandaResult<Selection> {
        let options = self.options(index);
        if !options.iter().any(|option| option == value) {
            return Err(AgrihandaError::InvalidSelection(format!(
                "'{value}' is not one of {options:?}"
            )));
        }
        let Selection::Partial(mut prefix) = self else {
            return Err(AgrihandaError::InvalidSelection(
                "selection is already complete".into(),
            ));
        };
        if prefix.is_empty() && value == COL::BARANGAY_SECTOR {
            return Ok(Selection::Complete(ColumnLabel::barangay()));
        }
        prefix.push(value.to_string());
        debug!("Selection is now {prefix:?}");
        match ColumnLabel::from_components(&prefix) {
            Some(label) => Ok(Selection::Complete(label)),
            None => Ok(Selection::Partial(prefix)),
        }
    }

    /// Applies a sequence of choices from the empty selection.
    pub fn walk<I, S>(values: I, index: &LabelIndex) -> AgrihandaResult<Selection>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        values
            .into_iter()
            .try_fold(Selection::new(), |selection, value| {
                selection.choose(value.as_ref(), index)
            })
    }

    pub fn label(&self) -> Option<&ColumnLabel> {
        match self {
            Selection::Complete(label) => Some(label),
            Selection::Partial(_) => None,
        }
    }

    /// Flat key of the completed label.
    pub fn flat_key(&self) -> Option<String> {
        self.label().map(ColumnLabel::flat_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::flatten;
    use crate::hierarchy::tests::sample_table;

    fn index() -> LabelIndex {
        flatten(&sample_table()).unwrap().1
    }

    #[test]
    fn selection_should_cascade() {
        let index = index();
        let selection = Selection::new();
        assert_eq!(selection.next_level(), Some(Level::Sector));
        assert_eq!(selection.options(&index), vec!["(Barangay)", "Agriculture"]);

        let selection = selection.choose("Agriculture", &index).unwrap();
        assert_eq!(selection.options(&index), vec!["Crops"]);
        let selection = selection.choose("Crops", &index).unwrap();
        assert_eq!(
            selection.options(&index),
            vec!["All Hazards", "Drought", "Flood"]
        );
        assert!(Selection::walk(["Flood"], &index).is_err());
        let selection = selection.choose("Flood", &index).unwrap();
        let selection = selection.choose("Exposure", &index).unwrap();
        assert_eq!(selection.next_level(), Some(Level::Detail));
        let selection = selection.choose("Score", &index).unwrap();
        assert_eq!(
            selection.flat_key().as_deref(),
            Some("Agriculture/Crops/Flood/Exposure/Score")
        );
        assert!(selection.options(&index).is_empty());
    }

    #[test]
    fn barangay_sector_completes_immediately() {
        let selection = Selection::walk(["(Barangay)"], &index()).unwrap();
        assert_eq!(selection, Selection::Complete(ColumnLabel::barangay()));
        assert_eq!(selection.flat_key().as_deref(), Some(COL::BARANGAY_ALIAS));
    }

    #[test]
    fn invalid_choice_is_rejected() {
        let index = index();
        let err = Selection::walk(["Agriculture", "Livestock"], &index).unwrap_err();
        assert!(matches!(err, AgrihandaError::InvalidSelection(_)));
        let complete = Selection::walk(["(Barangay)"], &index).unwrap();
        assert!(complete.choose("Agriculture", &index).is_err());
    }
}
