//! Error types.

pub type AgrihandaResult<T> = Result<T, AgrihandaError>;

#[derive(thiserror::Error, Debug)]
pub enum AgrihandaError {
    #[error("Schema error in {context}: {message}")]
    Schema { context: String, message: String },
    #[error("Missing reference sheet for group '{group}': {message}")]
    MissingReference { group: String, message: String },
    #[error("Barangay not found in reference table: {0}")]
    UnknownBarangay(String),
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),
    #[error("No element group could be cleaned: {0}")]
    NothingCleaned(String),
    #[error("Wrapped polars error: {0}")]
    PolarsError(#[from] polars::error::PolarsError),
    #[error("Wrapped calamine error: {0}")]
    CalamineError(#[from] calamine::XlsxError),
    #[error("Wrapped IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Wrapped anyhow error: {0}")]
    AnyhowError(#[from] anyhow::Error),
}

impl AgrihandaError {
    pub fn schema(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn missing_reference(group: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MissingReference {
            group: group.into(),
            message: message.into(),
        }
    }

    /// Errors that only invalidate one element group rather than the whole run.
    pub fn is_group_local(&self) -> bool {
        matches!(self, Self::Schema { .. })
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    #[test]
    fn test_anyhow() {
        let anyhow_error = anyhow!("An anyhow error");
        let error: AgrihandaError = anyhow_error.into();
        assert!(error.to_string().contains("An anyhow error"));
    }

    #[test]
    fn only_schema_errors_are_group_local() {
        assert!(AgrihandaError::schema("agriculture_crops", "duplicate column").is_group_local());
        assert!(!AgrihandaError::missing_reference("agriculture_crops", "blank").is_group_local());
        assert!(!AgrihandaError::UnknownBarangay("Ambago".into()).is_group_local());
    }
}
