use thiserror::Error;

/// Unified error type for the SQLGuard library.
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config references unset environment variable: {0}")]
    ConfigEnvVar(String),

    #[error("Invalid detection pattern #{index} ({pattern:?}): {source}")]
    InvalidPattern {
        index: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Pattern registry must contain at least one pattern")]
    EmptyRegistry,

    #[error("Invalid timing header name: {0:?}")]
    InvalidTimingHeader(String),

    #[error("Server error: {0}")]
    Server(String),
}

impl GuardError {
    /// Whether this error originates from the startup configuration
    /// (pattern list or config file) rather than from I/O at runtime.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            GuardError::ConfigParse(_)
                | GuardError::ConfigEnvVar(_)
                | GuardError::InvalidPattern { .. }
                | GuardError::EmptyRegistry
                | GuardError::InvalidTimingHeader(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, GuardError>;
