//! Error types for the bridge core
//!
//! Two channels exist by design: the `BridgeResult`-returning outer calls
//! (resolve, bind, type construction, dispatch) fail hard, while per-member
//! population failures are logged and the member is omitted.

use mirra_sdk::NativeError;

/// Bridge error taxonomy
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Name does not resolve to any native scope, template, or global
    #[error("no such scope, template, or global: `{0}`")]
    Lookup(String),

    /// Type-level misuse (binding without a type, bad base)
    #[error("type error: {0}")]
    Type(String),

    /// Host-level type or metatype creation failed
    #[error("failed to construct proxy type: {0}")]
    Construction(String),

    /// No overload accepted the supplied arguments
    #[error("none of the {candidates} overload(s) of `{symbol}` matched the supplied arguments")]
    Dispatch {
        /// Dynamic-visible name of the overload set
        symbol: String,
        /// Number of candidates tried
        candidates: usize,
    },

    /// A native call body raised
    #[error(transparent)]
    Native(#[from] NativeError),

    /// A host-level signal interrupted a safe-mode native call
    #[error("native call interrupted by host signal")]
    Interrupted,
}

/// Bridge result alias
pub type BridgeResult<T> = Result<T, BridgeError>;
