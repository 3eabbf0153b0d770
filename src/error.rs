use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Unexpected filename format '{filename}': {reason}")]
    Format { filename: String, reason: String },

    #[error("No input CSVs found in: {dir}")]
    NoInput { dir: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn format(filename: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::Format {
            filename: filename.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
