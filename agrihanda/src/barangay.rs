//! Stable numeric barangay IDs.

use std::collections::BTreeMap;

use log::{debug, warn};
use regex::Regex;

use crate::error::{AgrihandaError, AgrihandaResult};
use crate::normalize::normalize_value;
use crate::sheet::RawSheet;
use crate::COL;

/// Maps normalized barangay names to their `BID`.
#[derive(Debug, Clone, PartialEq)]
pub enum BarangayIds {
    /// IDs read from a reference table; unknown names are errors.
    Reference(BTreeMap<String, i64>),
    /// IDs `1..=n` assigned in sorted name order.
    Sequential(BTreeMap<String, i64>),
}

/// Extracts the numeric ID captured by the first group of `pattern`.
pub fn gid_to_id(gid: &str, pattern: &Regex) -> Option<i64> {
    pattern
        .captures(gid.trim())
        .and_then(|captures| captures.get(1))
        .and_then(|id| id.as_str().parse().ok())
}

impl BarangayIds {
    /// Reads a reference table with `orig_name` and `GID_3` columns.
    pub fn from_reference(sheet: &RawSheet, gid_pattern: &str) -> AgrihandaResult<Self> {
        let pattern = Regex::new(gid_pattern)
            .map_err(|err| anyhow::anyhow!("Invalid GID pattern '{gid_pattern}': {err}"))?;
        let context = sheet.name.as_str();
        let required = |name: &str| {
            sheet.column_index(name).ok_or_else(|| {
                AgrihandaError::schema(context, format!("reference table has no '{name}' column"))
            })
        };
        let name_idx = required(COL::REF_ORIG_NAME)?;
        let gid_idx = required(COL::REF_GID_3)?;

        let mut ids = BTreeMap::new();
        for row in 0..sheet.height() {
            let Some(name) = sheet
                .cell(row, name_idx)
                .as_text()
                .and_then(|name| normalize_value(&name))
            else {
                continue;
            };
            let gid = sheet.cell(row, gid_idx).as_text().unwrap_or_default();
            let id = gid_to_id(&gid, &pattern).ok_or_else(|| {
                AgrihandaError::schema(
                    context,
                    format!("GID '{gid}' of '{name}' does not match '{gid_pattern}'"),
                )
            })?;
            if let Some(previous) = ids.insert(name.clone(), id) {
                if previous != id {
                    return Err(AgrihandaError::schema(
                        context,
                        format!("'{name}' has two IDs: {previous} and {id}"),
                    ));
                }
                warn!("'{name}' is listed twice in the reference table");
            }
        }
        debug!("Read {} barangay IDs from {context}", ids.len());
        Ok(Self::Reference(ids))
    }

    /// Assigns `1..=n` to the distinct names in sorted order.
    pub fn sequential<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sorted: std::collections::BTreeSet<String> =
            names.into_iter().map(Into::into).collect();
        Self::Sequential(sorted.into_iter().zip(1..).collect())
    }

    pub fn resolve(&self, name: &str) -> AgrihandaResult<i64> {
        let ids = match self {
            Self::Reference(ids) | Self::Sequential(ids) => ids,
        };
        let normalized = normalize_value(name).unwrap_or_default();
        ids.get(&normalized)
            .copied()
            .ok_or_else(|| AgrihandaError::UnknownBarangay(name.to_string()))
    }

    /// Resolves every name, failing when two names share an ID.
    pub fn resolve_all(&self, names: &[String]) -> AgrihandaResult<Vec<i64>> {
        let mut seen: BTreeMap<i64, &str> = BTreeMap::new();
        names
            .iter()
            .map(|name| {
                let id = self.resolve(name)?;
                if let Some(other) = seen.insert(id, name) {
                    return Err(AgrihandaError::schema(
                        COL::BID,
                        format!("'{other}' and '{name}' share ID {id}"),
                    ));
                }
                Ok(id)
            })
            .collect()
    }
}
