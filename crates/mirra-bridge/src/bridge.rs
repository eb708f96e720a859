//! Bridge facade
//!
//! Owns the metadata oracle, the execution engine, the per-scope proxy
//! type cache, the object identity registry, the pinning table, and the
//! module registry. Everything the hosting runtime consumes goes through
//! this type: `resolve`, `bind`, `bind_with_downcast`, `resolve_global`.

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, trace};

use mirra_sdk::{
    Address, BridgeValue, CallFlags, ExecutionEngine, MetadataOracle, NativeResult,
    OwnershipPolicy, ScopeId,
};

use crate::builder;
use crate::dispatch::{CallReturn, CallableKind, NativeCallable, OverloadProxy};
use crate::error::{BridgeError, BridgeResult};
use crate::hierarchy;
use crate::host::protocol::{self, PROTO_NEW};
use crate::host::{Attribute, InstanceFlags, MetaType, Property, ProxyInstance, ProxyType};
use crate::identity::{IdentityRegistry, PinningTable};
use crate::navigator::{self, Resolved};

/// Post-construction enrichment hook, run for every freshly materialized
/// non-namespace proxy type
pub type EnrichmentHook = Arc<dyn Fn(&Bridge, &Arc<ProxyType>) + Send + Sync>;

/// A resolved global (non-member) symbol
#[derive(Debug, Clone)]
pub enum GlobalSymbol {
    /// Global data member
    Data(Property),
    /// Global function overload set
    Functions(OverloadProxy),
}

/// The runtime bridge core.
///
/// All shared state lives behind sharded or read-write locks, so lookups
/// and the check-then-insert sequences of proxy construction are atomic
/// per key; a lost construction race adopts the winner's entry.
pub struct Bridge {
    oracle: Arc<dyn MetadataOracle>,
    engine: Arc<dyn ExecutionEngine>,
    root: Arc<ProxyType>,
    types: DashMap<ScopeId, Weak<ProxyType>>,
    identity: IdentityRegistry,
    pinning: RwLock<PinningTable>,
    modules: DashMap<String, Arc<ProxyType>>,
    enrichment: RwLock<Option<EnrichmentHook>>,
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("types", &self.types.len())
            .field("identity", &self.identity)
            .finish()
    }
}

impl Bridge {
    /// Create a bridge over the given providers.
    ///
    /// The fixed root proxy base (`BoundObject`) is created here; every
    /// proxy type built later reaches it as its first ancestor.
    pub fn new(oracle: Arc<dyn MetadataOracle>, engine: Arc<dyn ExecutionEngine>) -> Self {
        let root_meta = Arc::new(MetaType::new("BoundObject_meta".to_string(), None, Vec::new()));
        root_meta.clear_module();
        let root = Arc::new(ProxyType::new(
            "BoundObject".to_string(),
            None,
            Vec::new(),
            root_meta,
        ));
        Self {
            oracle,
            engine,
            root,
            types: DashMap::new(),
            identity: IdentityRegistry::new(),
            pinning: RwLock::new(PinningTable::new()),
            modules: DashMap::new(),
            enrichment: RwLock::new(None),
        }
    }

    /// The metadata oracle
    pub fn oracle(&self) -> &dyn MetadataOracle {
        self.oracle.as_ref()
    }

    /// The execution engine
    pub fn engine(&self) -> &dyn ExecutionEngine {
        self.engine.as_ref()
    }

    /// The fixed root proxy base
    pub fn root_type(&self) -> &Arc<ProxyType> {
        &self.root
    }

    /// The object identity registry
    pub fn identity(&self) -> &IdentityRegistry {
        &self.identity
    }

    /// Replace the pinning table
    pub fn set_pinning(&self, table: PinningTable) {
        *self.pinning.write() = table;
    }

    /// Add one pinning rule (source → destination)
    pub fn pin(&self, from: ScopeId, to: ScopeId) {
        self.pinning.write().add_rule(from, to);
    }

    /// Exempt a scope from pinning
    pub fn ignore_pinning(&self, scope: ScopeId) {
        self.pinning.write().ignore(scope);
    }

    /// Install the post-construction enrichment hook
    pub fn set_enrichment_hook(&self, hook: Option<EnrichmentHook>) {
        *self.enrichment.write() = hook;
    }

    pub(crate) fn run_enrichment(&self, ty: &Arc<ProxyType>) {
        let hook = self.enrichment.read().clone();
        if let Some(hook) = hook {
            hook(self, ty);
        }
    }

    // ========================================================================
    // Proxy type cache
    // ========================================================================

    /// Live cached proxy type for `scope`, pruning a dead entry
    pub(crate) fn cached_type(&self, scope: ScopeId) -> Option<Arc<ProxyType>> {
        if let Some(entry) = self.types.get(&scope) {
            if let Some(live) = entry.upgrade() {
                return Some(live);
            }
        } else {
            return None;
        }
        self.types.remove(&scope);
        None
    }

    /// Insert `ty` for `scope` unless a live entry already exists; returns
    /// the entry that won
    pub(crate) fn cache_type(&self, scope: ScopeId, ty: Arc<ProxyType>) -> Arc<ProxyType> {
        let mut winner = ty;
        let entry = self.types.entry(scope);
        match entry {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                if let Some(live) = occupied.get().upgrade() {
                    winner = live;
                } else {
                    occupied.insert(Arc::downgrade(&winner));
                }
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(Arc::downgrade(&winner));
            }
        }
        winner
    }

    /// Publish a namespace proxy under its fully qualified dotted path
    pub(crate) fn publish_module(&self, dotted: &str, ty: &Arc<ProxyType>) {
        self.modules.insert(dotted.to_string(), Arc::clone(ty));
    }

    /// Look up a published namespace proxy by dotted path
    pub fn lookup_module(&self, dotted: &str) -> Option<Arc<ProxyType>> {
        self.modules.get(dotted).map(|entry| Arc::clone(entry.value()))
    }

    /// Qualified native name of a proxy type (empty for the root and the
    /// global scope)
    pub(crate) fn qualified_name_of(&self, ty: &Arc<ProxyType>) -> String {
        ty.scope()
            .and_then(|scope| self.oracle.qualified_name(scope))
            .unwrap_or_default()
    }

    /// The process-wide global scope proxy, built on first use
    pub fn global_proxy(&self) -> BridgeResult<Arc<ProxyType>> {
        let scope = self.oracle.global_scope();
        if let Some(existing) = self.cached_type(scope) {
            return Ok(existing);
        }
        let built = hierarchy::build_proxy_type(self, scope)?;
        let ty = self.cache_type(scope, built);
        builder::populate(self, &ty)?;
        Ok(ty)
    }

    /// Resolve or create the proxy type for a scope id.
    ///
    /// Goes through full name resolution when the type is not cached, so
    /// enclosing scopes are created and the new type is attached to them.
    pub fn proxy_type_for(&self, scope: ScopeId) -> BridgeResult<Arc<ProxyType>> {
        if let Some(existing) = self.cached_type(scope) {
            return Ok(existing);
        }
        if scope == self.oracle.global_scope() {
            return self.global_proxy();
        }
        let qualified = self
            .oracle
            .qualified_name(scope)
            .ok_or_else(|| BridgeError::Type(format!("scope {:?} is not known to the oracle", scope)))?;
        match navigator::resolve(self, &qualified, None)? {
            Resolved::Type(ty) => Ok(ty),
            Resolved::Template(_) => Err(BridgeError::Lookup(qualified)),
        }
    }

    // ========================================================================
    // Name resolution
    // ========================================================================

    /// Resolve a qualified native name (`"N::A"`, `""` for the global
    /// scope) to a proxy type or template stub
    pub fn resolve(&self, name: &str) -> BridgeResult<Resolved> {
        navigator::resolve(self, name, None)
    }

    /// Resolve `name` inside the scope of `parent`
    pub fn resolve_with_parent(
        &self,
        name: &str,
        parent: &Arc<ProxyType>,
    ) -> BridgeResult<Resolved> {
        navigator::resolve(self, name, Some(parent))
    }

    /// Dynamic attribute lookup on a proxy type.
    ///
    /// Falls back to lazy namespace function materialization and to nested
    /// scope resolution when the dictionary misses.
    pub fn type_attr(&self, ty: &Arc<ProxyType>, name: &str) -> BridgeResult<Attribute> {
        if let Some(found) = ty.lookup(name) {
            return Ok(found);
        }
        if let Some(scope) = ty.scope() {
            if self.oracle.is_namespace(scope) {
                if let Some(found) = builder::materialize_namespace_method(self, ty, scope, name) {
                    return Ok(found);
                }
            }
            match navigator::resolve(self, name, Some(ty)) {
                Ok(Resolved::Type(nested)) => return Ok(Attribute::Type(nested)),
                Ok(Resolved::Template(stub)) => return Ok(Attribute::TemplateStub(stub)),
                Err(_) => {}
            }
        }
        Err(BridgeError::Lookup(format!("{}::{}", ty.name(), name)))
    }

    /// Resolve a global (non-member) data member or function set
    pub fn resolve_global(&self, name: &str) -> BridgeResult<GlobalSymbol> {
        if let Some(member) = self.oracle.global_member(name) {
            return Ok(GlobalSymbol::Data(Property {
                name: member.name.clone(),
                type_name: member.type_name.clone(),
                is_static: true,
                storage: member.storage,
            }));
        }
        let descriptors = self.oracle.global_overloads(name);
        if !descriptors.is_empty() {
            let scope = self.oracle.global_scope();
            let overloads = descriptors
                .iter()
                .map(|desc| {
                    Arc::new(NativeCallable::from_desc(
                        desc,
                        protocol::protocol_name(&desc.name).to_string(),
                        CallableKind::Free,
                        scope,
                    ))
                })
                .collect();
            return Ok(GlobalSymbol::Functions(OverloadProxy::new(name, overloads)));
        }
        Err(BridgeError::Lookup(name.to_string()))
    }

    // ========================================================================
    // Object binding
    // ========================================================================

    /// Wrap the native object at `address` in a proxy instance.
    ///
    /// Two bindings of the same live `(address, scope)` yield the same
    /// proxy. Non-null, non-reference instances register in the identity
    /// registry; that registration is the only way objects enter it.
    pub fn bind(
        &self,
        address: Address,
        scope: ScopeId,
        is_reference: bool,
        is_value: bool,
    ) -> BridgeResult<Arc<ProxyInstance>> {
        if !scope.is_valid() {
            return Err(BridgeError::Type("cannot bind object without a type".to_string()));
        }
        let ty = self.proxy_type_for(scope)?;

        if let Some(existing) = self.identity.lookup(address, scope) {
            trace!(%address, ?scope, "identity hit");
            return Ok(existing);
        }

        let instance = Arc::new(ProxyInstance::new(
            ty,
            address,
            InstanceFlags {
                is_reference,
                is_value,
            },
        ));
        if !address.is_null() && !is_reference {
            self.identity.register(address, scope, &instance);
        }
        Ok(instance)
    }

    /// Bind with runtime-type discovery and pinning.
    ///
    /// The oracle is asked for the actual runtime type of the object; when
    /// it differs from the declared scope the address is adjusted by the
    /// base offset. An uncomputable offset degrades to the declared type.
    /// Pinning rules substitute the destination type unless the declared or
    /// actual type is in the ignore set.
    pub fn bind_with_downcast(
        &self,
        address: Address,
        scope: ScopeId,
        is_reference: bool,
    ) -> BridgeResult<Arc<ProxyInstance>> {
        if !scope.is_valid() {
            return Err(BridgeError::Type("cannot bind object without a type".to_string()));
        }
        if address.is_null() {
            // typed-but-empty instance so overload resolution still sees a
            // typed null
            return self.bind(address, scope, is_reference, false);
        }

        let mut bound_address = address;
        let mut effective = scope;
        if !is_reference {
            if let Some(actual) = self.oracle.actual_type(scope, address) {
                if actual != scope {
                    match self.oracle.base_offset(actual, scope, address) {
                        Some(delta) => {
                            bound_address = address.offset(delta);
                            effective = actual;
                        }
                        None => {
                            debug!(
                                ?scope,
                                ?actual,
                                %address,
                                "downcast offset unknown, keeping declared type"
                            );
                        }
                    }
                }
            }
        }

        if let Some(existing) = self.identity.lookup(bound_address, effective) {
            return Ok(existing);
        }

        {
            let pinning = self.pinning.read();
            if !pinning.is_ignored(scope) && !pinning.is_ignored(effective) {
                if let Some(pinned) = pinning.substitute(effective, self.oracle.as_ref()) {
                    effective = pinned;
                }
            }
        }

        self.bind(bound_address, effective, is_reference, false)
    }

    /// Construct a new native instance through a proxy type's constructor
    pub fn construct(
        &self,
        ty: &Arc<ProxyType>,
        args: &[BridgeValue],
    ) -> BridgeResult<Arc<ProxyInstance>> {
        match self.type_attr(ty, PROTO_NEW)? {
            Attribute::Method(ctor) => match ctor.call(self, None, args)? {
                CallReturn::Instance(instance) => Ok(instance),
                _ => Err(BridgeError::Construction(format!(
                    "constructor of `{}` returned no object",
                    ty.name()
                ))),
            },
            _ => Err(BridgeError::Type(format!("`{}` is not constructible", ty.name()))),
        }
    }

    /// Route a native call result back into the host.
    ///
    /// Returned objects pass through `bind_with_downcast`; the ownership of
    /// an unannotated pointer follows the call context's policy.
    pub(crate) fn adopt_result(
        &self,
        result: NativeResult,
        flags: &CallFlags,
    ) -> BridgeResult<CallReturn> {
        match result {
            NativeResult::Void => Ok(CallReturn::Void),
            NativeResult::Scalar(value) => Ok(CallReturn::Scalar(value)),
            NativeResult::Object {
                address,
                scope,
                host_owned,
            } => {
                let owned = host_owned.unwrap_or(match flags.ownership {
                    OwnershipPolicy::Heuristic => flags.is_creator,
                    OwnershipPolicy::Strict => false,
                });
                let instance = self.bind_with_downcast(address, scope, !owned)?;
                Ok(CallReturn::Instance(instance))
            }
        }
    }
}
