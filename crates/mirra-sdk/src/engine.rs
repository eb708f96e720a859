//! ExecutionEngine trait — the invocation seam
//!
//! The bridge selects an overload; the engine binds the actual arguments to
//! its formal parameters and performs the native call. Binding failure is a
//! distinguishable outcome, not an error: the bridge uses it to move on to
//! the next overload candidate.

use crate::{Address, BridgeValue, CallableId, NativeError, ScopeId};

/// Ownership policy for raw pointers returned without an explicit annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OwnershipPolicy {
    /// Creator calls hand ownership to the host, everything else stays
    /// native-owned
    #[default]
    Heuristic,
    /// Returned pointers stay native-owned unless annotated
    Strict,
}

/// Signal handling mode for the duration of a native call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignalSafety {
    /// No signal interposition; fastest path
    #[default]
    Fast,
    /// Return early with [`CallOutcome::Interrupted`] when a host-level
    /// signal fires mid-call
    Safe,
}

/// Invocation flags snapshot handed to the engine with every call.
///
/// These influence how a call runs, never which overload is selected.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallFlags {
    /// A successful call produces a host-owned new object
    pub is_creator: bool,
    /// Initializer semantics (placement into an existing instance)
    pub is_constructor: bool,
    /// Ownership policy for unannotated returned pointers
    pub ownership: OwnershipPolicy,
    /// The engine may release the host runtime lock for the call body
    pub release_runtime_lock: bool,
    /// Signal handling mode
    pub signal_safety: SignalSafety,
}

/// Result payload of a successful native call
#[derive(Debug, Clone, PartialEq)]
pub enum NativeResult {
    /// The call returned nothing
    Void,
    /// The call returned a primitive or string
    Scalar(BridgeValue),
    /// The call returned a native object
    Object {
        /// Address of the returned object
        address: Address,
        /// Declared (static) result type
        scope: ScopeId,
        /// Explicit ownership annotation, when the native signature carries
        /// one; `None` defers to the [`OwnershipPolicy`]
        host_owned: Option<bool>,
    },
}

/// Outcome of asking the engine to invoke one overload
#[derive(Debug)]
pub enum CallOutcome {
    /// Arguments bound and the call completed
    Value(NativeResult),
    /// The actual arguments do not bind to this overload's formals —
    /// try the next candidate
    NoBind,
    /// Arguments bound but the call body raised
    Raised(NativeError),
    /// A host-level signal fired under [`SignalSafety::Safe`]
    Interrupted,
}

/// Marshalling and invocation engine for resolved native callables.
///
/// The engine owns calling-convention details, argument conversion, and the
/// actual foreign call. When [`CallFlags::release_runtime_lock`] is set the
/// engine may run the call body with the host runtime lock released; it must
/// reacquire before returning.
pub trait ExecutionEngine: Send + Sync {
    /// Invoke `callable` with `args`, optionally on the instance at
    /// `receiver`.
    fn invoke(
        &self,
        callable: CallableId,
        receiver: Option<Address>,
        args: &[BridgeValue],
        flags: &CallFlags,
    ) -> CallOutcome;

    /// Default-construct an instance of `scope`.
    ///
    /// Used for scopes whose reflection data declares no accessible
    /// constructor; the bridge synthesizes an argument-less one.
    fn construct_default(&self, scope: ScopeId) -> CallOutcome;
}
