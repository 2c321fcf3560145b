//! Types and functions to perform filtering on the label index

use log::debug;
use nonempty::NonEmpty;
use polars::lazy::dsl::{col, lit, Expr};
use polars::prelude::{DataFrame, IntoLazy};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::AgrihandaResult;
use crate::flatten::LabelIndex;
use crate::label::{ColumnLabel, Level};
use crate::COL;

/// Combine multiple queries with AND. If there are no queries in the input list, returns None.
fn combine_exprs_with_and(exprs: Vec<Expr>) -> Option<Expr> {
    let mut query: Option<Expr> = None;
    for expr in exprs {
        query = if let Some(partial_query) = query {
            Some(partial_query.and(expr))
        } else {
            Some(expr)
        };
    }
    query
}

/// Same as `combine_exprs_with_or`, but takes a NonEmpty list instead of a Vec, and doesn't
/// return an Option.
fn combine_exprs_with_or1(exprs: NonEmpty<Expr>) -> Expr {
    let mut query: Expr = exprs.head;
    for expr in exprs.tail.into_iter() {
        query = query.or(expr);
    }
    query
}

/// Search in a column for a string literal (i.e. not a regex!). The search parameter can appear
/// anywhere in the column value.
fn filter_contains(column: &str, value: &str, case_sensitivity: &CaseSensitivity) -> Expr {
    let regex = match case_sensitivity {
        CaseSensitivity::Insensitive => format!("(?i){}", regex::escape(value)),
        CaseSensitivity::Sensitive => regex::escape(value).to_string(),
    };
    col(column).str().contains(lit(regex), false)
}

/// Search in a column for a string literal (i.e. not a regex!). The search parameter must be a
/// prefix of the column value.
fn filter_startswith(column: &str, value: &str, case_sensitivity: &CaseSensitivity) -> Expr {
    let regex = match case_sensitivity {
        CaseSensitivity::Insensitive => format!("(?i)^{}", regex::escape(value)),
        CaseSensitivity::Sensitive => format!("^{}", regex::escape(value)),
    };
    col(column).str().contains(lit(regex), false)
}

/// Search in a column for a string literal (i.e. not a regex!). The search parameter must match
/// the whole column value.
fn filter_exact(column: &str, value: &str, case_sensitivity: &CaseSensitivity) -> Expr {
    let regex = match case_sensitivity {
        CaseSensitivity::Insensitive => format!("(?i)^{}$", regex::escape(value)),
        CaseSensitivity::Sensitive => format!("^{}$", regex::escape(value)),
    };
    col(column).str().contains(lit(regex), false)
}

/// Search in a column for a regex
fn filter_regex(column: &str, value: &str, case_sensitivity: &CaseSensitivity) -> Expr {
    let regex = match case_sensitivity {
        CaseSensitivity::Insensitive => format!("(?i){}", value),
        CaseSensitivity::Sensitive => value.to_string(),
    };
    col(column).str().contains(lit(regex), false)
}

fn get_filter_fn(match_type: &MatchType) -> impl Fn(&str, &str, &CaseSensitivity) -> Expr {
    match match_type {
        MatchType::Regex => filter_regex,
        MatchType::Exact => filter_exact,
        MatchType::Contains => filter_contains,
        MatchType::Startswith => filter_startswith,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum MatchType {
    Regex,
    #[default]
    Exact,
    Contains,
    Startswith,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum CaseSensitivity {
    #[default]
    Insensitive,
    Sensitive,
}

/// Configuration for searching.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Whether string matching is exact or uses regex.
    pub match_type: MatchType,
    /// Whether matching is case sensitive or insensitive.
    pub case_sensitivity: CaseSensitivity,
}

/// Search over one level of the label hierarchy. A label matches if its component at `level`
/// matches any of `values`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LevelFilter {
    pub level: Level,
    pub values: NonEmpty<String>,
    #[serde(default)]
    pub config: SearchConfig,
}

/// Implementing conversion from `LevelFilter` to a polars expression enables a `LevelFilter` to be
/// passed to a polars dataframe for filtering results.
impl From<LevelFilter> for Expr {
    fn from(value: LevelFilter) -> Self {
        let filter_fn = get_filter_fn(&value.config.match_type);
        let column = value.level.column_name();
        let case_sensitivity = value.config.case_sensitivity;
        combine_exprs_with_or1(
            value
                .values
                .map(|v| filter_fn(column, &v, &case_sensitivity)),
        )
    }
}

/// This struct represents all the possible parameters one can search the label index with.
///
/// Filters are combined with an AND operation, so searching for both a hazard and an aspect only
/// returns labels that satisfy both. Values within one filter are combined with an OR operation.
#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct LabelSearchParams {
    pub filters: Vec<LevelFilter>,
    /// Whether the barangay column may appear in the results.
    #[serde(default)]
    pub include_barangay: bool,
}

impl From<LabelSearchParams> for Option<Expr> {
    fn from(value: LabelSearchParams) -> Self {
        let mut subexprs: Vec<Expr> = value.filters.into_iter().map(Expr::from).collect();
        if !value.include_barangay {
            subexprs.push(col(COL::FLAT_KEY).neq(lit(COL::BARANGAY_ALIAS)));
        }
        combine_exprs_with_and(subexprs)
    }
}

impl LabelSearchParams {
    pub fn search(self, index: &LabelIndex) -> AgrihandaResult<SearchResults> {
        debug!("Searching with request: {:?}", self);
        let expr: Option<Expr> = self.into();
        let full_results = index.to_frame()?.lazy();
        let result = match expr {
            Some(expr) => full_results.filter(expr),
            None => full_results,
        };
        Ok(SearchResults(result.collect()?))
    }
}

/// Rows of the label index matching a search.
#[derive(Clone, Debug)]
pub struct SearchResults(pub DataFrame);

impl SearchResults {
    pub fn labels(&self) -> AgrihandaResult<Vec<ColumnLabel>> {
        Ok(LabelIndex::from_frame(&self.0)?
            .labels()
            .cloned()
            .collect())
    }

    pub fn flat_keys(&self) -> AgrihandaResult<Vec<String>> {
        Ok(self
            .0
            .column(COL::FLAT_KEY)?
            .str()?
            .into_iter()
            .flatten()
            .map(String::from)
            .collect())
    }

    pub fn len(&self) -> usize {
        self.0.height()
    }

    pub fn is_empty(&self) -> bool {
        self.0.height() == 0
    }
}

#[cfg(test)]
mod tests {
    use nonempty::nonempty;

    use super::*;
    use crate::flatten::flatten;
    use crate::hierarchy::tests::sample_table;

    fn test_index() -> LabelIndex {
        flatten(&sample_table()).unwrap().1
    }

    fn test_from_args(
        filters: Vec<LevelFilter>,
        include_barangay: bool,
        expected: &[&str],
    ) -> anyhow::Result<()> {
        let params = LabelSearchParams {
            filters,
            include_barangay,
        };
        let results = params.search(&test_index())?;
        assert_eq!(results.flat_keys()?, expected);
        Ok(())
    }

    fn filter(level: Level, values: NonEmpty<String>, match_type: MatchType) -> LevelFilter {
        LevelFilter {
            level,
            values,
            config: SearchConfig {
                match_type,
                case_sensitivity: CaseSensitivity::Insensitive,
            },
        }
    }

    #[test]
    #[rustfmt::skip]
    fn test_search_request() -> anyhow::Result<()> {
        // 1. No filters, barangay excluded
        test_from_args(vec![], false, &[
            "Agriculture/Crops/All Hazards/Exposure/Ecosystem",
            "Agriculture/Crops/Drought/Exposure/Risk",
            "Agriculture/Crops/Flood/Exposure/Score",
        ])?;
        // 2. Exact, insensitive, OR within a level
        test_from_args(
            vec![filter(Level::Hazard, nonempty!["flood".into(), "DROUGHT".into()], MatchType::Exact)],
            false,
            &["Agriculture/Crops/Drought/Exposure/Risk", "Agriculture/Crops/Flood/Exposure/Score"],
        )?;
        // 3. AND across levels
        test_from_args(
            vec![
                filter(Level::Hazard, nonempty!["Flood".into(), "Drought".into()], MatchType::Exact),
                filter(Level::Detail, nonempty!["sc".into()], MatchType::Startswith),
            ],
            false,
            &["Agriculture/Crops/Flood/Exposure/Score"],
        )?;
        // 4. Regex on sector includes the barangay row when asked
        test_from_args(
            vec![filter(Level::Sector, nonempty![r"^\(".into()], MatchType::Regex)],
            true,
            &["(Barangay)"],
        )?;
        // 5. Contains
        test_from_args(
            vec![filter(Level::Hazard, nonempty!["hazard".into()], MatchType::Contains)],
            false,
            &["Agriculture/Crops/All Hazards/Exposure/Ecosystem"],
        )?;
        Ok(())
    }

    #[test]
    fn results_should_convert_to_labels() -> anyhow::Result<()> {
        let results = LabelSearchParams::default().search(&test_index())?;
        let labels = results.labels()?;
        assert_eq!(labels.len(), 3);
        assert!(labels.iter().all(|label| !label.is_barangay()));
        Ok(())
    }
}
