use thiserror::Error;

/// Failures of the windowing and decoding pipeline that callers
/// need to tell apart.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Format error: {0}")]
    Format(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("No raw result for feature {0}")]
    MissingResult(u64),
}
