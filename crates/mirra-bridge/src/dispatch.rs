//! Overload dispatch proxies
//!
//! An [`OverloadProxy`] aggregates any number of native callable
//! implementations behind one dynamically-invocable symbol. Dispatch walks
//! the candidates in a priority order computed once per overload set; the
//! first candidate whose formal-argument binding succeeds is invoked. The
//! [`TemplateProxy`] variant keeps template and non-template candidates in
//! two independent pools.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use mirra_sdk::{
    Address, BridgeValue, CallFlags, CallOutcome, CallableId, MethodDesc, OwnershipPolicy,
    ScopeId, SignalSafety,
};

use crate::bridge::Bridge;
use crate::error::{BridgeError, BridgeResult};
use crate::host::ProxyType;

/// Pluggable overload priority scorer; higher scores are tried first.
///
/// The tie-break rule beyond template-ness is deliberately not fixed:
/// installs a different scorer when richer native signature information is
/// available. Within one score class the order is stable, so native
/// declaration order is preserved.
pub type PriorityFn = fn(&NativeCallable) -> i64;

fn default_priority(callable: &NativeCallable) -> i64 {
    if callable.is_template {
        0
    } else {
        1
    }
}

/// Kind of a native callable, decided by the scope proxy builder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallableKind {
    /// Ordinary method invoked on an instance
    Instance,
    /// Static / class-level method
    Static,
    /// Free function (namespace scope)
    Free,
    /// Constructor
    Constructor,
}

/// One concrete overload candidate
#[derive(Debug, Clone)]
pub struct NativeCallable {
    /// Dynamic-visible name (post operator translation and mangling)
    pub name: String,
    /// Engine handle; `None` marks the synthesized default constructor
    pub callable: Option<CallableId>,
    /// Invocation kind
    pub kind: CallableKind,
    /// Owning scope
    pub scope: ScopeId,
    /// Number of template-free formal arguments
    pub arity: usize,
    /// Template method or concrete template instantiation
    pub is_template: bool,
    /// Native result type name
    pub result_type: String,
    /// Result is a non-const reference
    pub returns_reference: bool,
}

impl NativeCallable {
    /// Build a candidate from a reflection descriptor
    pub fn from_desc(desc: &MethodDesc, name: String, kind: CallableKind, scope: ScopeId) -> Self {
        Self {
            name,
            callable: Some(desc.callable),
            kind,
            scope,
            arity: desc.arity,
            is_template: desc.is_template,
            result_type: desc.result_type.clone(),
            returns_reference: desc.returns_reference,
        }
    }

    /// The synthesized argument-less constructor for scopes that declare
    /// no accessible constructor
    pub fn synthesized_ctor(scope: ScopeId) -> Self {
        Self {
            name: crate::host::protocol::PROTO_NEW.to_string(),
            callable: None,
            kind: CallableKind::Constructor,
            scope,
            arity: 0,
            is_template: false,
            result_type: String::new(),
            returns_reference: false,
        }
    }
}

/// Shared invocation context of one overload set.
///
/// Reference-counted and shared by every alias of the same logical set;
/// aliasing clones increment the count rather than copying the flags. The
/// `sorted` latch is one-way: once the priority order is computed it is
/// never recomputed.
pub struct CallContext {
    is_creator: bool,
    is_constructor: bool,
    ownership: OwnershipPolicy,
    release_runtime_lock: bool,
    signal_safety: SignalSafety,
    scorer: PriorityFn,
    sorted: AtomicBool,
}

impl std::fmt::Debug for CallContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallContext")
            .field("is_creator", &self.is_creator)
            .field("is_constructor", &self.is_constructor)
            .field("ownership", &self.ownership)
            .field("release_runtime_lock", &self.release_runtime_lock)
            .field("signal_safety", &self.signal_safety)
            .field("sorted", &self.sorted.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self {
            is_creator: false,
            is_constructor: false,
            ownership: OwnershipPolicy::default(),
            release_runtime_lock: false,
            signal_safety: SignalSafety::default(),
            scorer: default_priority,
            sorted: AtomicBool::new(false),
        }
    }
}

impl CallContext {
    /// Context for ordinary methods and free functions
    pub fn new() -> Self {
        Self::default()
    }

    /// Context with creator + constructor semantics
    pub fn for_constructor() -> Self {
        Self {
            is_creator: true,
            is_constructor: true,
            ..Self::default()
        }
    }

    /// Set the ownership policy for unannotated returned pointers
    pub fn with_ownership(mut self, policy: OwnershipPolicy) -> Self {
        self.ownership = policy;
        self
    }

    /// Allow the engine to release the host runtime lock for the call body
    pub fn with_lock_release(mut self, release: bool) -> Self {
        self.release_runtime_lock = release;
        self
    }

    /// Choose the signal handling mode
    pub fn with_signal_safety(mut self, mode: SignalSafety) -> Self {
        self.signal_safety = mode;
        self
    }

    /// Install a custom priority scorer
    pub fn with_scorer(mut self, scorer: PriorityFn) -> Self {
        self.scorer = scorer;
        self
    }

    /// Snapshot handed to the execution engine with every invocation
    pub fn flags(&self) -> CallFlags {
        CallFlags {
            is_creator: self.is_creator,
            is_constructor: self.is_constructor,
            ownership: self.ownership,
            release_runtime_lock: self.release_runtime_lock,
            signal_safety: self.signal_safety,
        }
    }

    /// True once the priority order has been computed
    pub fn is_sorted(&self) -> bool {
        self.sorted.load(Ordering::Acquire)
    }

    fn mark_sorted(&self) {
        self.sorted.store(true, Ordering::Release);
    }

    fn score(&self, callable: &NativeCallable) -> i64 {
        (self.scorer)(callable)
    }
}

/// Value returned to the host from a dispatched native call
#[derive(Debug, Clone)]
pub enum CallReturn {
    /// The call returned nothing
    Void,
    /// A primitive or string result
    Scalar(BridgeValue),
    /// A native object result, already routed through the identity registry
    Instance(Arc<crate::host::ProxyInstance>),
}

struct OverloadShared {
    name: String,
    overloads: RwLock<Vec<Arc<NativeCallable>>>,
    ctx: Arc<CallContext>,
}

/// A single dynamically-callable object over an ordered overload set.
///
/// Cloning shares the underlying info block (name, candidate list, call
/// context) — that is how one logical method is cheaply aliased under a
/// second protocol name without copying its overload set.
#[derive(Clone)]
pub struct OverloadProxy {
    shared: Arc<OverloadShared>,
}

impl std::fmt::Debug for OverloadProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverloadProxy")
            .field("name", &self.shared.name)
            .field("candidates", &self.len())
            .finish()
    }
}

impl OverloadProxy {
    /// Create an overload proxy over `overloads` with a default context
    pub fn new(name: impl Into<String>, overloads: Vec<Arc<NativeCallable>>) -> Self {
        Self::with_context(name, overloads, CallContext::new())
    }

    /// Create an overload proxy with an explicit call context
    pub fn with_context(
        name: impl Into<String>,
        overloads: Vec<Arc<NativeCallable>>,
        ctx: CallContext,
    ) -> Self {
        Self {
            shared: Arc::new(OverloadShared {
                name: name.into(),
                overloads: RwLock::new(overloads),
                ctx: Arc::new(ctx),
            }),
        }
    }

    /// Dynamic-visible name of the set
    pub fn name(&self) -> String {
        self.shared.name.clone()
    }

    /// Number of candidates
    pub fn len(&self) -> usize {
        self.shared.overloads.read().len()
    }

    /// True when the set holds no candidates
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The shared call context
    pub fn context(&self) -> &Arc<CallContext> {
        &self.shared.ctx
    }

    /// Append one candidate
    pub fn add_overload(&self, callable: Arc<NativeCallable>) {
        self.shared.overloads.write().push(callable);
    }

    /// Merge another proxy's candidate list into this one
    pub fn merge(&self, other: &OverloadProxy) {
        if Arc::ptr_eq(&self.shared, &other.shared) {
            return;
        }
        let mut mine = self.shared.overloads.write();
        mine.extend(other.shared.overloads.read().iter().cloned());
    }

    /// Alias this proxy under another dynamic name, sharing the info block
    pub fn share(&self) -> OverloadProxy {
        self.clone()
    }

    fn ensure_sorted(&self) {
        let ctx = &self.shared.ctx;
        if ctx.is_sorted() {
            return;
        }
        let mut overloads = self.shared.overloads.write();
        overloads.sort_by_key(|c| std::cmp::Reverse(ctx.score(c)));
        ctx.mark_sorted();
    }

    /// Invoke the best-matching overload.
    ///
    /// Candidates are tried in cached priority order; the first whose
    /// formal-argument binding succeeds wins. A `NoBind` outcome moves on
    /// to the next candidate; anything the call body raises propagates.
    pub fn call(
        &self,
        bridge: &Bridge,
        receiver: Option<Address>,
        args: &[BridgeValue],
    ) -> BridgeResult<CallReturn> {
        let mut tried = 0;
        match self.try_call_where(bridge, receiver, args, &mut tried, |_| true)? {
            Some(ret) => Ok(ret),
            None => Err(BridgeError::Dispatch {
                symbol: self.name(),
                candidates: tried,
            }),
        }
    }

    /// Try the candidates accepted by `filter`; `Ok(None)` means none bound.
    pub(crate) fn try_call_where(
        &self,
        bridge: &Bridge,
        receiver: Option<Address>,
        args: &[BridgeValue],
        tried: &mut usize,
        filter: impl Fn(&NativeCallable) -> bool,
    ) -> BridgeResult<Option<CallReturn>> {
        self.ensure_sorted();
        let candidates: Vec<Arc<NativeCallable>> = self.shared.overloads.read().clone();
        let flags = self.shared.ctx.flags();

        for candidate in candidates.iter().filter(|c| filter(c)) {
            *tried += 1;
            let outcome = match candidate.callable {
                Some(id) => bridge.engine().invoke(id, receiver, args, &flags),
                None => bridge.engine().construct_default(candidate.scope),
            };
            match outcome {
                CallOutcome::Value(result) => {
                    return bridge.adopt_result(result, &flags).map(Some);
                }
                CallOutcome::NoBind => continue,
                CallOutcome::Raised(err) => return Err(BridgeError::Native(err)),
                CallOutcome::Interrupted => return Err(BridgeError::Interrupted),
            }
        }
        Ok(None)
    }
}

/// Aggregator for a name that is a template.
///
/// Keeps the template candidates and any same-named non-template siblings
/// in two independent overload proxies. With explicit template arguments
/// the template pool is consulted first (exact instantiation spelling, then
/// any template candidate); without them ordinary resolution runs over the
/// non-template pool before falling back to the template pool.
pub struct TemplateProxy {
    name: String,
    proto_name: String,
    owner: RwLock<Weak<ProxyType>>,
    templated: OverloadProxy,
    plain: OverloadProxy,
}

impl std::fmt::Debug for TemplateProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateProxy")
            .field("name", &self.name)
            .field("templated", &self.templated.len())
            .field("plain", &self.plain.len())
            .finish()
    }
}

impl TemplateProxy {
    /// Create an empty aggregator for `name` (native spelling) exposed as
    /// `proto_name` (protocol spelling; identical for ordinary names)
    pub fn new(name: impl Into<String>, proto_name: impl Into<String>) -> Self {
        let name = name.into();
        let proto_name = proto_name.into();
        Self {
            templated: OverloadProxy::new(name.clone(), Vec::new()),
            plain: OverloadProxy::new(proto_name.clone(), Vec::new()),
            name,
            proto_name,
            owner: RwLock::new(Weak::new()),
        }
    }

    /// Native spelling of the template name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Protocol spelling the aggregator is exposed under
    pub fn proto_name(&self) -> &str {
        &self.proto_name
    }

    /// Record the proxy type this aggregator lives on
    pub fn set_owner(&self, owner: &Arc<ProxyType>) {
        *self.owner.write() = Arc::downgrade(owner);
    }

    /// The owning proxy type, while it is alive
    pub fn owner(&self) -> Option<Arc<ProxyType>> {
        self.owner.read().upgrade()
    }

    /// Append a candidate to the template pool
    pub fn add_template(&self, callable: Arc<NativeCallable>) {
        self.templated.add_overload(callable);
    }

    /// Append a candidate to the non-template pool
    pub fn add_overload(&self, callable: Arc<NativeCallable>) {
        self.plain.add_overload(callable);
    }

    /// Merge a plain overload proxy into the non-template pool
    pub fn absorb_plain(&self, other: &OverloadProxy) {
        self.plain.merge(other);
    }

    /// The non-template pool
    pub fn plain_pool(&self) -> &OverloadProxy {
        &self.plain
    }

    /// The template pool
    pub fn template_pool(&self) -> &OverloadProxy {
        &self.templated
    }

    /// Invoke with optional explicit template arguments
    pub fn call(
        &self,
        bridge: &Bridge,
        receiver: Option<Address>,
        template_args: Option<&[String]>,
        args: &[BridgeValue],
    ) -> BridgeResult<CallReturn> {
        let mut tried = 0;

        if let Some(targs) = template_args {
            let spelled = format!("{}<{}>", self.name, targs.join(", "));
            if let Some(ret) = self.templated.try_call_where(bridge, receiver, args, &mut tried, |c| {
                c.name == spelled
            })? {
                return Ok(ret);
            }
            if let Some(ret) = self.templated.try_call_where(bridge, receiver, args, &mut tried, |c| {
                c.name != spelled
            })? {
                return Ok(ret);
            }
        } else if let Some(ret) =
            self.plain.try_call_where(bridge, receiver, args, &mut tried, |_| true)?
        {
            return Ok(ret);
        }

        if template_args.is_none() {
            if let Some(ret) =
                self.templated.try_call_where(bridge, receiver, args, &mut tried, |_| true)?
            {
                return Ok(ret);
            }
        } else if let Some(ret) =
            self.plain.try_call_where(bridge, receiver, args, &mut tried, |_| true)?
        {
            return Ok(ret);
        }

        Err(BridgeError::Dispatch {
            symbol: self.proto_name.clone(),
            candidates: tried,
        })
    }
}
