//! Host-side dynamic object model
//!
//! Proxy types and proxy instances are the host-visible mirrors of native
//! scopes and native objects. A [`ProxyType`] owns an attribute dictionary
//! (methods, properties, nested types) and a freshly synthesized
//! [`MetaType`], so host-side subclassing still resolves to the right
//! native scope. A [`ProxyInstance`] wraps one native address plus the
//! ownership flags describing how the wrapped memory is held.

pub mod protocol;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use mirra_sdk::{Address, BridgeValue, ScopeId};

use crate::dispatch::{OverloadProxy, TemplateProxy};
use crate::navigator::TemplateStub;

/// Attribute-interception hook: consulted on dynamic lookup when enabled.
///
/// The scope proxy builder bypasses the hook while populating a type so
/// population runs at full speed and triggers no user-visible side effects.
pub type InterceptHook = Arc<dyn Fn(&ProxyType, &str) -> Option<Attribute> + Send + Sync>;

/// One entry in a proxy type's attribute dictionary
#[derive(Clone)]
pub enum Attribute {
    /// An overload set exposed as a single callable
    Method(OverloadProxy),
    /// A template aggregator (template + non-template pools)
    Template(Arc<TemplateProxy>),
    /// A data-member property
    Property(Property),
    /// A nested proxy type
    Type(Arc<ProxyType>),
    /// A callable template-instantiation stub (unresolved template name)
    TemplateStub(Arc<TemplateStub>),
    /// A plain constant value (enumerators)
    Value(BridgeValue),
}

impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Attribute::Method(m) => f.debug_tuple("Method").field(&m.name()).finish(),
            Attribute::Template(t) => f.debug_tuple("Template").field(&t.name()).finish(),
            Attribute::Property(p) => f.debug_tuple("Property").field(&p.name).finish(),
            Attribute::Type(t) => f.debug_tuple("Type").field(&t.name()).finish(),
            Attribute::TemplateStub(s) => {
                f.debug_tuple("TemplateStub").field(&s.qualified()).finish()
            }
            Attribute::Value(v) => f.debug_tuple("Value").field(v).finish(),
        }
    }
}

/// A data-member property descriptor.
///
/// Carries the reflection-provided storage location; reading and writing
/// the underlying memory is the execution engine's business.
#[derive(Debug, Clone)]
pub struct Property {
    /// Dynamic-visible name
    pub name: String,
    /// Native type name of the member
    pub type_name: String,
    /// Class-level storage (one location shared by all instances)
    pub is_static: bool,
    /// Byte offset into the instance (non-static) or absolute address
    /// (static). `None` only for addressless pseudo-members, which the
    /// builder normally skips.
    pub storage: Option<Address>,
}

impl Property {
    /// Absolute address of this member for the given instance.
    ///
    /// Statics ignore the instance. Instance members need a non-null
    /// instance address.
    pub fn address_for(&self, instance: Option<&ProxyInstance>) -> Option<Address> {
        if self.is_static {
            return self.storage;
        }
        let inst = instance?;
        if inst.address().is_null() {
            return None;
        }
        self.storage.map(|offset| Address(inst.address().0 + offset.0))
    }
}

/// Synthesized metatype of a proxy type.
///
/// Named `<ScopeName>_meta`, built from the metatypes of the proxy type's
/// bases, and stamped with the same scope id so host-side subclasses still
/// resolve to the native scope.
#[derive(Debug)]
pub struct MetaType {
    name: String,
    scope: Option<ScopeId>,
    bases: Vec<Arc<MetaType>>,
    module: RwLock<Option<String>>,
}

impl MetaType {
    /// Create a metatype with a synthetic module placeholder.
    ///
    /// The placeholder keeps the host from inferring a placement from the
    /// creation site; the hierarchy builder clears it immediately after
    /// creation.
    pub fn new(name: String, scope: Option<ScopeId>, bases: Vec<Arc<MetaType>>) -> Self {
        Self {
            name,
            scope,
            bases,
            module: RwLock::new(Some("mirra.internal".to_string())),
        }
    }

    /// Metatype name (`<ScopeName>_meta`)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Scope id stamped onto this metatype
    pub fn scope(&self) -> Option<ScopeId> {
        self.scope
    }

    /// Metatypes of the proxy type's bases
    pub fn bases(&self) -> &[Arc<MetaType>] {
        &self.bases
    }

    /// Remove the synthetic module placeholder
    pub fn clear_module(&self) {
        *self.module.write() = None;
    }

    /// Current module tag, if any
    pub fn module(&self) -> Option<String> {
        self.module.read().clone()
    }
}

/// Host-visible dynamic type mirroring one native scope.
///
/// Created once per scope and cached weakly; if nothing holds it, it can
/// be collected and is rebuilt on demand.
pub struct ProxyType {
    name: String,
    scope: Option<ScopeId>,
    bases: Vec<Arc<ProxyType>>,
    meta: Arc<MetaType>,
    attrs: RwLock<FxHashMap<String, Attribute>>,
    type_attrs: RwLock<FxHashMap<String, Attribute>>,
    qualified: RwLock<String>,
    intercept: AtomicBool,
    hook: RwLock<Option<InterceptHook>>,
    has_explicit_ctor: AtomicBool,
}

impl std::fmt::Debug for ProxyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyType")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("bases", &self.bases.iter().map(|b| b.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl ProxyType {
    /// Create a proxy type from its deduplicated base tuple and metatype
    pub fn new(
        name: String,
        scope: Option<ScopeId>,
        bases: Vec<Arc<ProxyType>>,
        meta: Arc<MetaType>,
    ) -> Self {
        Self {
            name,
            scope,
            bases,
            meta,
            attrs: RwLock::new(FxHashMap::default()),
            type_attrs: RwLock::new(FxHashMap::default()),
            qualified: RwLock::new(String::new()),
            intercept: AtomicBool::new(true),
            hook: RwLock::new(None),
            has_explicit_ctor: AtomicBool::new(false),
        }
    }

    /// Short (unqualified) type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mirrored scope id; `None` only for the fixed root base
    pub fn scope(&self) -> Option<ScopeId> {
        self.scope
    }

    /// Ordered, duplicate-free base tuple
    pub fn bases(&self) -> &[Arc<ProxyType>] {
        &self.bases
    }

    /// The synthesized metatype
    pub fn meta(&self) -> &Arc<MetaType> {
        &self.meta
    }

    /// Enclosing-scope qualified name this type was attached under
    pub fn qualified(&self) -> String {
        self.qualified.read().clone()
    }

    /// Tag the type with its enclosing scope's qualified name
    pub fn set_qualified(&self, qualified: impl Into<String>) {
        *self.qualified.write() = qualified.into();
    }

    /// True once an explicit native constructor was registered
    pub fn has_explicit_ctor(&self) -> bool {
        self.has_explicit_ctor.load(Ordering::Relaxed)
    }

    /// Record that an explicit native constructor exists
    pub fn mark_explicit_ctor(&self) {
        self.has_explicit_ctor.store(true, Ordering::Relaxed);
    }

    /// True if `self` transitively reaches `root` through its base chain
    pub fn reaches(&self, root: &Arc<ProxyType>) -> bool {
        if std::ptr::eq(self, Arc::as_ptr(root)) {
            return true;
        }
        self.bases.iter().any(|b| b.reaches(root))
    }

    /// Install the attribute-interception hook
    pub fn set_hook(&self, hook: Option<InterceptHook>) {
        *self.hook.write() = hook;
    }

    /// Enable or disable hook interception; returns the previous state
    pub fn set_intercept(&self, enabled: bool) -> bool {
        self.intercept.swap(enabled, Ordering::AcqRel)
    }

    /// Dictionary-only attribute lookup (no hook, no bases)
    pub fn attr(&self, name: &str) -> Option<Attribute> {
        self.attrs.read().get(name).cloned()
    }

    /// Insert an attribute into the dictionary
    pub fn set_attr(&self, name: impl Into<String>, attr: Attribute) {
        self.attrs.write().insert(name.into(), attr);
    }

    /// Type-level attribute lookup (statics exposed on the type itself)
    pub fn type_attr(&self, name: &str) -> Option<Attribute> {
        self.type_attrs.read().get(name).cloned()
    }

    /// Insert a type-level attribute
    pub fn set_type_attr(&self, name: impl Into<String>, attr: Attribute) {
        self.type_attrs.write().insert(name.into(), attr);
    }

    /// Dynamic lookup: interception hook (when enabled), then the
    /// dictionary, then the base chain in resolution order.
    pub fn lookup(&self, name: &str) -> Option<Attribute> {
        if self.intercept.load(Ordering::Acquire) {
            if let Some(hook) = self.hook.read().clone() {
                if let Some(found) = hook(self, name) {
                    return Some(found);
                }
            }
        }
        if let Some(found) = self.attr(name) {
            return Some(found);
        }
        self.bases.iter().find_map(|b| b.lookup(name))
    }

    /// Names currently present in the dictionary (diagnostics, tests)
    pub fn attr_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.attrs.read().keys().cloned().collect();
        names.sort();
        names
    }
}

/// Ownership flags of one bound instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstanceFlags {
    /// The wrapped memory is only borrowed (never registered, never freed
    /// by the host)
    pub is_reference: bool,
    /// The wrapped memory is a value copy owned by the host
    pub is_value: bool,
}

/// Host-visible wrapper of one native object.
///
/// Minted by the bridge's bind paths only, so the identity registry sees
/// every non-reference instance exactly once.
pub struct ProxyInstance {
    ty: Arc<ProxyType>,
    address: AtomicUsize,
    flags: InstanceFlags,
}

impl std::fmt::Debug for ProxyInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyInstance")
            .field("type", &self.ty.name())
            .field("address", &self.address())
            .field("flags", &self.flags)
            .finish()
    }
}

impl ProxyInstance {
    /// Wrap `address` as an instance of `ty`
    pub fn new(ty: Arc<ProxyType>, address: Address, flags: InstanceFlags) -> Self {
        Self {
            ty,
            address: AtomicUsize::new(address.0),
            flags,
        }
    }

    /// The instance's proxy type
    pub fn ty(&self) -> &Arc<ProxyType> {
        &self.ty
    }

    /// Current native address (null for typed-null instances)
    pub fn address(&self) -> Address {
        Address(self.address.load(Ordering::Acquire))
    }

    /// Replace the wrapped address (downcast adjustment, placement init)
    pub fn set_address(&self, address: Address) {
        self.address.store(address.0, Ordering::Release);
    }

    /// True for typed-null instances
    pub fn is_null(&self) -> bool {
        self.address().is_null()
    }

    /// Borrowed (bare reference) instance
    pub fn is_reference(&self) -> bool {
        self.flags.is_reference
    }

    /// Host-owned value copy
    pub fn is_value(&self) -> bool {
        self.flags.is_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_type(name: &str, scope: Option<ScopeId>, bases: Vec<Arc<ProxyType>>) -> Arc<ProxyType> {
        let meta_bases = bases.iter().map(|b| Arc::clone(b.meta())).collect();
        let meta = Arc::new(MetaType::new(format!("{}_meta", name), scope, meta_bases));
        Arc::new(ProxyType::new(name.to_string(), scope, bases, meta))
    }

    #[test]
    fn test_metatype_module_placeholder() {
        let meta = MetaType::new("A_meta".to_string(), Some(ScopeId(1)), Vec::new());
        assert!(meta.module().is_some());
        meta.clear_module();
        assert!(meta.module().is_none());
    }

    #[test]
    fn test_reaches_root() {
        let root = plain_type("BoundObject", None, Vec::new());
        let a = plain_type("A", Some(ScopeId(1)), vec![Arc::clone(&root)]);
        let b = plain_type("B", Some(ScopeId(2)), vec![Arc::clone(&a)]);
        assert!(b.reaches(&root));
        assert!(a.reaches(&root));

        let stray = plain_type("Stray", Some(ScopeId(3)), Vec::new());
        assert!(!stray.reaches(&root));
    }

    #[test]
    fn test_lookup_walks_bases() {
        let root = plain_type("BoundObject", None, Vec::new());
        let a = plain_type("A", Some(ScopeId(1)), vec![Arc::clone(&root)]);
        a.set_attr(
            "x",
            Attribute::Property(Property {
                name: "x".to_string(),
                type_name: "int".to_string(),
                is_static: false,
                storage: Some(Address(0)),
            }),
        );
        let b = plain_type("B", Some(ScopeId(2)), vec![Arc::clone(&a)]);
        assert!(b.attr("x").is_none());
        assert!(matches!(b.lookup("x"), Some(Attribute::Property(_))));
    }

    #[test]
    fn test_hook_bypass() {
        let ty = plain_type("A", Some(ScopeId(1)), Vec::new());
        ty.set_hook(Some(Arc::new(|_, name| {
            (name == "virtual_attr").then(|| Attribute::Value(BridgeValue::Int(7)))
        })));

        assert!(matches!(
            ty.lookup("virtual_attr"),
            Some(Attribute::Value(BridgeValue::Int(7)))
        ));

        let prev = ty.set_intercept(false);
        assert!(prev);
        assert!(ty.lookup("virtual_attr").is_none());
        ty.set_intercept(prev);
        assert!(ty.lookup("virtual_attr").is_some());
    }

    #[test]
    fn test_property_addressing() {
        let ty = plain_type("A", Some(ScopeId(1)), Vec::new());
        let inst = ProxyInstance::new(Arc::clone(&ty), Address(0x1000), InstanceFlags::default());

        let member = Property {
            name: "x".to_string(),
            type_name: "int".to_string(),
            is_static: false,
            storage: Some(Address(8)),
        };
        assert_eq!(member.address_for(Some(&inst)), Some(Address(0x1008)));
        assert_eq!(member.address_for(None), None);

        let static_member = Property {
            name: "count".to_string(),
            type_name: "int".to_string(),
            is_static: true,
            storage: Some(Address(0x2000)),
        };
        assert_eq!(static_member.address_for(None), Some(Address(0x2000)));
    }
}
