//! Error types for Mirra providers

/// Result type for provider calls
pub type ProviderResult<T> = Result<T, NativeError>;

/// Native-level failure raised by a provider
#[derive(Debug, Clone, thiserror::Error)]
pub enum NativeError {
    /// Type mismatch during argument conversion
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Expected type name
        expected: String,
        /// Actual type name
        got: String,
    },

    /// Invalid argument
    #[error("Argument error: {0}")]
    ArgumentError(String),

    /// The native call body raised an error
    #[error("Native call failed: {0}")]
    CallFailed(String),

    /// Provider-level error
    #[error("{0}")]
    ProviderError(String),
}

impl From<String> for NativeError {
    fn from(s: String) -> Self {
        NativeError::ProviderError(s)
    }
}

impl From<&str> for NativeError {
    fn from(s: &str) -> Self {
        NativeError::ProviderError(s.to_string())
    }
}
