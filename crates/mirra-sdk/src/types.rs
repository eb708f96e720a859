//! Opaque handles and reflection descriptors
//!
//! These types carry the oracle's answers across the SDK boundary. They are
//! plain data: the bridge core interprets them, the oracle produces them.

use crate::Address;

/// Oracle-assigned identity of a native scope (namespace, class, or struct).
///
/// Immutable for the process lifetime. `ScopeId::INVALID` is the null
/// handle; the oracle names the process-wide global scope through
/// [`crate::MetadataOracle::global_scope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u64);

impl ScopeId {
    /// The null scope handle. Binding against it is an error.
    pub const INVALID: ScopeId = ScopeId(u64::MAX);

    /// Check whether this handle refers to a real scope
    #[inline]
    pub fn is_valid(self) -> bool {
        self != ScopeId::INVALID
    }
}

/// Oracle-assigned identity of one concrete native callable implementation.
///
/// Resolved once during proxy construction, then handed to the execution
/// engine on every invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallableId(pub u64);

/// One declared base of a scope, in native declaration order
#[derive(Debug, Clone)]
pub struct BaseInfo {
    /// Base class name (unqualified)
    pub name: String,
    /// Scope id of the base
    pub scope: ScopeId,
}

/// Reflection descriptor for one native method overload
#[derive(Debug, Clone)]
pub struct MethodDesc {
    /// Native spelling of the name (operators keep their native form)
    pub name: String,
    /// Callable handle for the execution engine
    pub callable: CallableId,
    /// Public visibility
    pub is_public: bool,
    /// Static / class-level method
    pub is_static: bool,
    /// Constructor
    pub is_constructor: bool,
    /// Template method (concrete instantiations also report true)
    pub is_template: bool,
    /// Number of template-free formal arguments
    pub arity: usize,
    /// Result type name as spelled by the native library
    pub result_type: String,
    /// Result is a non-const reference (assignment-through-index idiom)
    pub returns_reference: bool,
}

/// Reflection descriptor for one native data member
#[derive(Debug, Clone)]
pub struct MemberDesc {
    /// Member name
    pub name: String,
    /// Type name as spelled by the native library
    pub type_name: String,
    /// Public visibility
    pub is_public: bool,
    /// Static / class-level storage
    pub is_static: bool,
    /// Enumerator-valued constant
    pub is_enum_value: bool,
    /// Storage offset (instance members) or absolute address (statics).
    /// `None` marks an addressless pseudo-member.
    pub storage: Option<Address>,
}

impl MemberDesc {
    /// True if the member's type marks it as an anonymous-enum constant
    pub fn is_anonymous_enum(&self) -> bool {
        self.type_name.contains("(anonymous)") || self.type_name.contains("(unnamed)")
    }
}
