//! Expansion of delimited multi-value text fields into Yes/No indicator columns.

use std::collections::BTreeSet;

use polars::prelude::*;

use crate::normalize::{sanitize_key, title_case};
use crate::COL;

/// Canonical form of one list token: trimmed, case-folded, with a single trailing plural `s`
/// stripped, then title-cased and sanitized like a label.
pub fn normalize_token(token: &str) -> Option<String> {
    let folded = token.trim().to_lowercase();
    let singular = match folded.strip_suffix('s') {
        Some(stripped) if !stripped.is_empty() => stripped.trim_end(),
        _ => folded.as_str(),
    };
    if singular.is_empty() {
        None
    } else {
        Some(sanitize_key(&title_case(singular)))
    }
}

/// Distinct normalized tokens of a cell. Newlines always split, in addition to the delimiter.
pub fn split_tokens(value: &str, delimiter: &str) -> BTreeSet<String> {
    value
        .lines()
        .flat_map(|line| {
            if delimiter.is_empty() {
                vec![line]
            } else {
                line.split(delimiter).collect()
            }
        })
        .filter_map(normalize_token)
        .collect()
}

/// Expands a list column into one indicator column per distinct token, named
/// `{column}_{token}` and sorted by name. Rows that are null, blank or only delimiters are null in
/// every indicator.
pub fn expand_list_column(series: &Series, delimiter: &str) -> PolarsResult<Vec<Series>> {
    let text = series.cast(&DataType::String)?;
    let rows: Vec<Option<BTreeSet<String>>> = text
        .str()?
        .into_iter()
        .map(|value| {
            value
                .map(|value| split_tokens(value, delimiter))
                .filter(|tokens| !tokens.is_empty())
        })
        .collect();
    let all_tokens: BTreeSet<&String> = rows.iter().flatten().flatten().collect();

    Ok(all_tokens
        .into_iter()
        .map(|token| {
            let values: Vec<Option<&str>> = rows
                .iter()
                .map(|tokens| {
                    tokens.as_ref().map(|tokens| {
                        if tokens.contains(token) {
                            COL::YES
                        } else {
                            COL::NO
                        }
                    })
                })
                .collect();
            Series::new(&format!("{}_{token}", series.name()), values)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(series: &Series) -> Vec<Option<&str>> {
        series.str().unwrap().into_iter().collect()
    }

    #[test]
    fn list_column_should_expand_into_indicators() {
        let series = Series::new(
            "Crops",
            &[Some("Rice, Corn"), Some("Corn"), None, Some("")],
        );
        let indicators = expand_list_column(&series, ",").unwrap();
        let names: Vec<&str> = indicators.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["Crops_Corn", "Crops_Rice"]);
        assert_eq!(
            values(&indicators[0]),
            vec![Some("Yes"), Some("Yes"), None, None]
        );
        assert_eq!(
            values(&indicators[1]),
            vec![Some("Yes"), Some("No"), None, None]
        );
    }

    #[test]
    fn tokens_should_be_normalized() {
        assert_eq!(normalize_token(" RICES "), Some("Rice".to_string()));
        assert_eq!(normalize_token("s"), Some("S".to_string()));
        assert_eq!(normalize_token("   "), None);
        assert_eq!(normalize_token("fish/shrimps"), Some("Fish(slash)Shrimp".to_string()));
    }

    #[test]
    fn newlines_always_split() {
        let tokens = split_tokens("rice\ncorn; banana", ";");
        let tokens: Vec<&str> = tokens.iter().map(String::as_str).collect();
        assert_eq!(tokens, vec!["Banana", "Corn", "Rice"]);
    }

    #[test]
    fn delimiter_only_cells_are_null() {
        let series = Series::new("Crops", &[Some(" , ,"), Some("corn")]);
        let indicators = expand_list_column(&series, ",").unwrap();
        assert_eq!(indicators.len(), 1);
        assert_eq!(values(&indicators[0]), vec![None, Some("Yes")]);
    }
}
