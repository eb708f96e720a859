//! Boundary values crossing between the host and the native side

use crate::ScopeId;

/// Raw native object address.
///
/// Addresses are opaque to the bridge: they are produced by the execution
/// engine, compared and adjusted (downcast offsets) by the bridge, and
/// handed back to the engine for invocation. A null address is a valid,
/// representable state (typed-null bindings rely on it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub usize);

impl Address {
    /// The null address
    pub const NULL: Address = Address(0);

    /// Check whether this is the null address
    #[inline]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Apply a signed byte offset (downcast adjustment)
    #[inline]
    pub fn offset(self, delta: isize) -> Address {
        Address((self.0 as isize + delta) as usize)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A value passed into or returned from a native call.
///
/// Primitives are stored inline; native objects travel as an address plus
/// the scope they are statically typed as. The bridge never inspects object
/// memory itself — only the execution engine does.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeValue {
    /// Null / absent value
    Null,
    /// Boolean
    Bool(bool),
    /// Integer (all native integer widths are widened at the boundary)
    Int(i64),
    /// Floating point
    Float(f64),
    /// String data
    Str(String),
    /// A native object reference: address + statically declared scope
    Object {
        /// Object address (may be null for typed nulls)
        address: Address,
        /// Scope id of the declared type
        scope: ScopeId,
    },
}

impl BridgeValue {
    /// True if this value is `Null` or a null-addressed object
    pub fn is_null(&self) -> bool {
        match self {
            BridgeValue::Null => true,
            BridgeValue::Object { address, .. } => address.is_null(),
            _ => false,
        }
    }

    /// Short type name used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            BridgeValue::Null => "null",
            BridgeValue::Bool(_) => "bool",
            BridgeValue::Int(_) => "int",
            BridgeValue::Float(_) => "float",
            BridgeValue::Str(_) => "string",
            BridgeValue::Object { .. } => "object",
        }
    }
}
