//! Canonicalization of raw column names and cell values.

use std::collections::HashMap;

use polars::prelude::*;

use crate::error::{AgrihandaError, AgrihandaResult};
use crate::sheet::Cell;

/// Characters that break map and chart keys, and the tokens that replace them.
const UNSAFE_KEY_CHARACTERS: [(char, &str); 4] = [
    ('/', "(slash)"),
    ('.', "(dot)"),
    ('[', "(lb)"),
    (']', "(rb)"),
];

/// Replaces control characters with spaces, collapses whitespace runs and trims.
pub fn clean_whitespace(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Title case by the usual word rule: a letter is upper-cased when the preceding character is not
/// a letter, and lower-cased otherwise.
pub fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut previous_is_letter = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                result.extend(c.to_lowercase());
            } else {
                result.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            result.push(c);
            previous_is_letter = false;
        }
    }
    result
}

/// Replaces characters unsafe as keys with placeholder tokens.
pub fn sanitize_key(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match UNSAFE_KEY_CHARACTERS.iter().find(|(unsafe_char, _)| *unsafe_char == c) {
            Some((_, token)) => result.push_str(token),
            None => result.push(c),
        }
    }
    result
}

/// Canonical form of a label component.
pub fn normalize_label(raw: &str) -> String {
    sanitize_key(&title_case(&clean_whitespace(raw)))
}

/// Canonical form of a free-text value. Blank text is `None`.
pub fn normalize_value(raw: &str) -> Option<String> {
    let cleaned = clean_whitespace(raw);
    if cleaned.is_empty() {
        None
    } else {
        Some(title_case(&cleaned))
    }
}

/// Fails when two distinct raw names share a canonical name.
pub fn ensure_unique<'a, K, I>(context: &str, names: I) -> AgrihandaResult<()>
where
    K: std::hash::Hash + Eq + std::fmt::Debug,
    I: IntoIterator<Item = (&'a str, K)>,
{
    let mut seen: HashMap<K, &str> = HashMap::new();
    for (raw, canonical) in names {
        if let Some(previous) = seen.get(&canonical) {
            return Err(AgrihandaError::schema(
                context,
                format!("columns '{previous}' and '{raw}' both normalize to {canonical:?}"),
            ));
        }
        seen.insert(canonical, raw);
    }
    Ok(())
}

/// Builds a typed series from raw cells. A column whose non-empty cells are all numeric becomes
/// Int64 when every value is integral and Float64 otherwise; any other column becomes normalized
/// text.
pub fn typed_series(name: &str, cells: &[Cell]) -> Series {
    let numbers: Option<Vec<Option<f64>>> = cells
        .iter()
        .map(|cell| {
            if cell.is_empty() {
                Some(None)
            } else {
                cell.as_f64().map(Some)
            }
        })
        .collect();

    match numbers {
        Some(numbers) if numbers.iter().any(Option::is_some) => {
            let integral = numbers
                .iter()
                .flatten()
                .all(|value| value.fract() == 0.0 && value.abs() < i64::MAX as f64);
            if integral {
                let values: Vec<Option<i64>> = numbers
                    .into_iter()
                    .map(|value| value.map(|v| v as i64))
                    .collect();
                Series::new(name, values)
            } else {
                Series::new(name, numbers)
            }
        }
        _ => {
            let values: Vec<Option<String>> = cells
                .iter()
                .map(|cell| cell.as_text().and_then(|text| normalize_value(&text)))
                .collect();
            Series::new(name, values)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_should_normalize_identically() {
        let expected = Some("Rice".to_string());
        assert_eq!(normalize_value(" rice "), expected);
        assert_eq!(normalize_value("Rice"), expected);
        assert_eq!(normalize_value("RICE "), expected);
        assert_eq!(normalize_value("   "), None);
        assert_eq!(normalize_value(""), None);
    }

    #[test]
    fn title_case_follows_word_boundaries() {
        assert_eq!(title_case("area planted (ha)"), "Area Planted (Ha)");
        assert_eq!(title_case("o'neil"), "O'Neil");
        assert_eq!(title_case("2nd cropping"), "2Nd Cropping");
    }

    #[test]
    fn labels_should_be_sanitized() {
        assert_eq!(normalize_label("rice/corn"), "Rice(slash)Corn");
        assert_eq!(normalize_label("no. of farmers"), "No(dot) Of Farmers");
        assert_eq!(normalize_label("area [ha]"), "Area (lb)Ha(rb)");
        assert_eq!(normalize_label("  area\n\tplanted  "), "Area Planted");
    }

    #[test]
    fn duplicate_canonical_names_are_schema_errors() {
        let ok = ensure_unique("test", [("a", "A"), ("b", "B")]);
        assert!(ok.is_ok());
        let err = ensure_unique("test", [("area", "Area"), ("AREA ", "Area")]).unwrap_err();
        assert!(matches!(err, AgrihandaError::Schema { .. }));
    }

    #[test]
    fn columns_should_be_typed() {
        let ints = typed_series("a", &[Cell::Int(1), Cell::Empty, Cell::Float(3.0)]);
        assert_eq!(ints.dtype(), &DataType::Int64);
        assert_eq!(ints.null_count(), 1);

        let floats = typed_series("b", &[Cell::Int(1), Cell::Float(2.5)]);
        assert_eq!(floats.dtype(), &DataType::Float64);

        let text = typed_series(
            "c",
            &[Cell::Text(" rice ".into()), Cell::Int(4), Cell::Text(" ".into())],
        );
        assert_eq!(text.dtype(), &DataType::String);
        let values: Vec<Option<&str>> = text.str().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some("Rice"), Some("4"), None]);
    }
}
