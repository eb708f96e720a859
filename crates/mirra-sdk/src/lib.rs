//! Mirra SDK - Lightweight SDK for writing Mirra providers
//!
//! This crate provides the minimal types and traits needed to plug a native
//! library into the Mirra bridge without depending on the bridge core:
//!
//! - [`MetadataOracle`] — the reflection provider that answers "what are the
//!   bases/methods/members of scope X"
//! - [`ExecutionEngine`] — the marshalling engine that invokes a resolved
//!   native callable
//! - The boundary value and descriptor types both traits speak in
//!
//! The bridge core (`mirra-bridge`) consumes these traits as `Arc<dyn …>`;
//! providers implement them against this crate alone.

#![warn(missing_docs)]

mod engine;
mod error;
mod oracle;
mod types;
mod value;

pub use engine::{
    CallFlags, CallOutcome, ExecutionEngine, NativeResult, OwnershipPolicy, SignalSafety,
};
pub use error::{NativeError, ProviderResult};
pub use oracle::MetadataOracle;
pub use types::{BaseInfo, CallableId, MemberDesc, MethodDesc, ScopeId};
pub use value::{Address, BridgeValue};
