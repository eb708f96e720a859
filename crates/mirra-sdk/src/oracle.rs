//! MetadataOracle trait — the reflection provider interface
//!
//! The bridge core programs against this trait without knowing where the
//! metadata comes from (a reflection database, debug info, a hand-written
//! table in tests). All queries are read-only.

use crate::{Address, BaseInfo, MemberDesc, MethodDesc, ScopeId};

/// Read-only reflection queries the bridge consumes.
///
/// Implementations must be cheap to query repeatedly: the bridge caches
/// constructed proxies, not oracle answers. Handles returned from one query
/// (scope ids, callable ids) stay valid for the process lifetime.
pub trait MetadataOracle: Send + Sync {
    /// The process-wide global scope
    fn global_scope(&self) -> ScopeId;

    /// Resolve a fully qualified name (`"N::A"`) to a scope, if it is one
    fn resolve_scope(&self, qualified_name: &str) -> Option<ScopeId>;

    /// Unqualified name of a scope
    fn scope_name(&self, scope: ScopeId) -> Option<String>;

    /// Fully qualified name of a scope
    fn qualified_name(&self, scope: ScopeId) -> Option<String>;

    /// True if the scope is a namespace (not a class/struct)
    fn is_namespace(&self, scope: ScopeId) -> bool;

    /// Declared bases, in native declaration order
    fn bases(&self, scope: ScopeId) -> Vec<BaseInfo>;

    /// Number of declared methods (free functions for namespaces)
    fn method_count(&self, scope: ScopeId) -> usize;

    /// Descriptor of the method at `index`
    fn method(&self, scope: ScopeId, index: usize) -> Option<MethodDesc>;

    /// Descriptors of all declared data members
    fn members(&self, scope: ScopeId) -> Vec<MemberDesc>;

    /// True if `derived` is `base` or a transitive native subtype of it
    fn is_subtype(&self, derived: ScopeId, base: ScopeId) -> bool;

    /// True if the (possibly not yet instantiated) name denotes a template
    fn is_template(&self, qualified_name: &str) -> bool;

    /// Instantiate a template with concrete argument spellings.
    ///
    /// Returns the scope of the instantiation, or `None` if the template
    /// cannot be instantiated with these arguments.
    fn instantiate_template(&self, qualified_name: &str, args: &[String]) -> Option<ScopeId>;

    /// Run-time actual type of the object at `address`, declared as `declared`.
    ///
    /// Native objects are frequently returned through a base-class pointer
    /// but are really a derived instance. Returns `None` when no better type
    /// is known.
    fn actual_type(&self, declared: ScopeId, address: Address) -> Option<ScopeId>;

    /// Byte offset between `derived` and `declared` for the object at
    /// `address`, or `None` when the cast cannot be computed (incomplete
    /// type information).
    fn base_offset(&self, derived: ScopeId, declared: ScopeId, address: Address) -> Option<isize>;

    /// Global (non-member) data member by name
    fn global_member(&self, name: &str) -> Option<MemberDesc>;

    /// Global (non-member) function overloads by name
    fn global_overloads(&self, name: &str) -> Vec<MethodDesc>;
}
