use agrihanda::error::AgrihandaError;
use polars::error::PolarsError;

#[derive(thiserror::Error, Debug)]
pub enum AgrihandaCliError {
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
    #[error("serde JSON error: {0}")]
    SerdeJSONError(#[from] serde_json::Error),
    #[error("polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("agrihanda error: {0}")]
    AgrihandaError(#[from] AgrihandaError),
    #[error("std IO error: {0}")]
    IOError(#[from] std::io::Error),
}

pub type AgrihandaCliResult<T> = Result<T, AgrihandaCliError>;
