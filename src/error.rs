//! Error types for background replacement and QA operations

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Comprehensive error types for pipeline operations
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// HTTP transport errors from remote collaborators
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Forensic log or config (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A remote generator, replacer or model returned no usable result
    #[error("Remote call failed during {stage}: {message}")]
    RemoteCall { stage: String, message: String },

    /// Undecodable image, dimension mismatch or empty subject region
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// An artifact could not be persisted
    #[error("Artifact write failed: {0}")]
    ArtifactWrite(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Create a new remote call error for the named stage
    pub fn remote_call<S: Into<String>, M: Into<String>>(stage: S, message: M) -> Self {
        Self::RemoteCall {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Create a new malformed input error
    pub fn malformed_input<S: Into<String>>(msg: S) -> Self {
        Self::MalformedInput(msg.into())
    }

    /// Create a new artifact write error
    pub fn artifact_write<S: Into<String>>(msg: S) -> Self {
        Self::ArtifactWrite(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Create image decoding error naming which input could not be read
    pub fn decode_error(role: &str, error: &image::ImageError) -> Self {
        Self::MalformedInput(format!("Failed to decode {} image: {}", role, error))
    }

    /// Whether this error came from a remote collaborator
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteCall { .. } | Self::Http(_))
    }
}
