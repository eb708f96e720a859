//! Shared test fixtures: a hand-written reflection oracle and a scripted
//! execution engine.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};

use mirra_sdk::{
    Address, BaseInfo, BridgeValue, CallFlags, CallOutcome, CallableId, ExecutionEngine,
    MemberDesc, MetadataOracle, MethodDesc, NativeResult, ScopeId,
};

pub const GLOBAL: ScopeId = ScopeId(0);

// ============================================================================
// Descriptor helpers
// ============================================================================

pub fn method(name: &str, callable: u64, arity: usize) -> MethodDesc {
    MethodDesc {
        name: name.to_string(),
        callable: CallableId(callable),
        is_public: true,
        is_static: false,
        is_constructor: false,
        is_template: false,
        arity,
        result_type: "void".to_string(),
        returns_reference: false,
    }
}

pub fn ctor(name: &str, callable: u64, arity: usize) -> MethodDesc {
    MethodDesc {
        is_constructor: true,
        ..method(name, callable, arity)
    }
}

pub fn member(name: &str, type_name: &str, offset: usize) -> MemberDesc {
    MemberDesc {
        name: name.to_string(),
        type_name: type_name.to_string(),
        is_public: true,
        is_static: false,
        is_enum_value: false,
        storage: Some(Address(offset)),
    }
}

fn short_name(qualified: &str) -> String {
    let mut depth = 0usize;
    let mut start = 0usize;
    let bytes = qualified.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' => depth += 1,
            b'>' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && i + 1 < bytes.len() && bytes[i + 1] == b':' => {
                start = i + 2;
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    qualified[start..].to_string()
}

// ============================================================================
// FixtureOracle
// ============================================================================

struct ScopeData {
    name: String,
    qualified: String,
    namespace: bool,
    bases: Vec<BaseInfo>,
    methods: Vec<MethodDesc>,
    members: Vec<MemberDesc>,
}

#[derive(Default)]
struct OracleData {
    scopes: FxHashMap<ScopeId, ScopeData>,
    by_name: FxHashMap<String, ScopeId>,
    templates: FxHashSet<String>,
    instantiations: FxHashMap<String, ScopeId>,
    actuals: FxHashMap<Address, ScopeId>,
    offsets: FxHashMap<(ScopeId, ScopeId), isize>,
    globals: FxHashMap<String, MemberDesc>,
    global_fns: FxHashMap<String, Vec<MethodDesc>>,
}

/// A reflection provider backed by hand-registered tables
pub struct FixtureOracle {
    data: RwLock<OracleData>,
    next_id: AtomicU64,
}

impl Default for FixtureOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureOracle {
    pub fn new() -> Self {
        let oracle = Self {
            data: RwLock::new(OracleData::default()),
            next_id: AtomicU64::new(1),
        };
        oracle.data.write().scopes.insert(
            GLOBAL,
            ScopeData {
                name: String::new(),
                qualified: String::new(),
                namespace: true,
                bases: Vec::new(),
                methods: Vec::new(),
                members: Vec::new(),
            },
        );
        oracle.data.write().by_name.insert(String::new(), GLOBAL);
        oracle
    }

    fn add_scope(&self, qualified: &str, namespace: bool) -> ScopeId {
        let id = ScopeId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut data = self.data.write();
        data.scopes.insert(
            id,
            ScopeData {
                name: short_name(qualified),
                qualified: qualified.to_string(),
                namespace,
                bases: Vec::new(),
                methods: Vec::new(),
                members: Vec::new(),
            },
        );
        data.by_name.insert(qualified.to_string(), id);
        id
    }

    pub fn add_namespace(&self, qualified: &str) -> ScopeId {
        self.add_scope(qualified, true)
    }

    pub fn add_class(&self, qualified: &str) -> ScopeId {
        self.add_scope(qualified, false)
    }

    /// Register `alias` as another qualified spelling of `scope`
    pub fn add_alias(&self, alias: &str, scope: ScopeId) {
        self.data.write().by_name.insert(alias.to_string(), scope);
    }

    pub fn add_base(&self, scope: ScopeId, base: ScopeId) {
        let mut data = self.data.write();
        let name = data.scopes[&base].name.clone();
        data.scopes
            .get_mut(&scope)
            .expect("unknown scope")
            .bases
            .push(BaseInfo { name, scope: base });
    }

    pub fn add_method(&self, scope: ScopeId, desc: MethodDesc) {
        self.data
            .write()
            .scopes
            .get_mut(&scope)
            .expect("unknown scope")
            .methods
            .push(desc);
    }

    pub fn add_member(&self, scope: ScopeId, desc: MemberDesc) {
        self.data
            .write()
            .scopes
            .get_mut(&scope)
            .expect("unknown scope")
            .members
            .push(desc);
    }

    pub fn add_template_name(&self, qualified: &str) {
        self.data.write().templates.insert(qualified.to_string());
    }

    pub fn add_instantiation(&self, qualified: &str, args: &[&str], scope: ScopeId) {
        let key = format!("{}<{}>", qualified, args.join(", "));
        self.data.write().instantiations.insert(key, scope);
    }

    pub fn set_actual(&self, address: Address, actual: ScopeId) {
        self.data.write().actuals.insert(address, actual);
    }

    pub fn set_offset(&self, derived: ScopeId, declared: ScopeId, delta: isize) {
        self.data.write().offsets.insert((derived, declared), delta);
    }

    pub fn add_global_member(&self, desc: MemberDesc) {
        self.data.write().globals.insert(desc.name.clone(), desc);
    }

    pub fn add_global_fn(&self, name: &str, desc: MethodDesc) {
        self.data
            .write()
            .global_fns
            .entry(name.to_string())
            .or_default()
            .push(desc);
    }
}

impl MetadataOracle for FixtureOracle {
    fn global_scope(&self) -> ScopeId {
        GLOBAL
    }

    fn resolve_scope(&self, qualified_name: &str) -> Option<ScopeId> {
        self.data.read().by_name.get(qualified_name).copied()
    }

    fn scope_name(&self, scope: ScopeId) -> Option<String> {
        self.data.read().scopes.get(&scope).map(|s| s.name.clone())
    }

    fn qualified_name(&self, scope: ScopeId) -> Option<String> {
        self.data.read().scopes.get(&scope).map(|s| s.qualified.clone())
    }

    fn is_namespace(&self, scope: ScopeId) -> bool {
        self.data.read().scopes.get(&scope).is_some_and(|s| s.namespace)
    }

    fn bases(&self, scope: ScopeId) -> Vec<BaseInfo> {
        self.data
            .read()
            .scopes
            .get(&scope)
            .map(|s| s.bases.clone())
            .unwrap_or_default()
    }

    fn method_count(&self, scope: ScopeId) -> usize {
        self.data.read().scopes.get(&scope).map_or(0, |s| s.methods.len())
    }

    fn method(&self, scope: ScopeId, index: usize) -> Option<MethodDesc> {
        self.data
            .read()
            .scopes
            .get(&scope)
            .and_then(|s| s.methods.get(index).cloned())
    }

    fn members(&self, scope: ScopeId) -> Vec<MemberDesc> {
        self.data
            .read()
            .scopes
            .get(&scope)
            .map(|s| s.members.clone())
            .unwrap_or_default()
    }

    fn is_subtype(&self, derived: ScopeId, base: ScopeId) -> bool {
        if derived == base {
            return true;
        }
        let data = self.data.read();
        let mut queue = vec![derived];
        let mut seen = FxHashSet::default();
        while let Some(current) = queue.pop() {
            if !seen.insert(current) {
                continue;
            }
            if current == base {
                return true;
            }
            if let Some(scope) = data.scopes.get(&current) {
                queue.extend(scope.bases.iter().map(|b| b.scope));
            }
        }
        false
    }

    fn is_template(&self, qualified_name: &str) -> bool {
        self.data.read().templates.contains(qualified_name)
    }

    fn instantiate_template(&self, qualified_name: &str, args: &[String]) -> Option<ScopeId> {
        let key = format!("{}<{}>", qualified_name, args.join(", "));
        self.data.read().instantiations.get(&key).copied()
    }

    fn actual_type(&self, _declared: ScopeId, address: Address) -> Option<ScopeId> {
        self.data.read().actuals.get(&address).copied()
    }

    fn base_offset(&self, derived: ScopeId, declared: ScopeId, _address: Address) -> Option<isize> {
        self.data.read().offsets.get(&(derived, declared)).copied()
    }

    fn global_member(&self, name: &str) -> Option<MemberDesc> {
        self.data.read().globals.get(name).cloned()
    }

    fn global_overloads(&self, name: &str) -> Vec<MethodDesc> {
        self.data
            .read()
            .global_fns
            .get(name)
            .cloned()
            .unwrap_or_default()
    }
}

// ============================================================================
// ScriptedEngine
// ============================================================================

type Handler = Box<dyn Fn(Option<Address>, &[BridgeValue], &CallFlags) -> CallOutcome + Send + Sync>;

/// An execution engine scripted per callable id.
///
/// Unregistered callables answer `NoBind`, which makes arity-gated overload
/// scripting trivial. Default construction fabricates fresh addresses.
pub struct ScriptedEngine {
    handlers: RwLock<FxHashMap<CallableId, Handler>>,
    calls: Mutex<Vec<(CallableId, usize)>>,
    next_address: AtomicUsize,
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(FxHashMap::default()),
            calls: Mutex::new(Vec::new()),
            next_address: AtomicUsize::new(0x5000_0000),
        }
    }

    pub fn on(
        &self,
        callable: u64,
        handler: impl Fn(Option<Address>, &[BridgeValue], &CallFlags) -> CallOutcome
            + Send
            + Sync
            + 'static,
    ) {
        self.handlers
            .write()
            .insert(CallableId(callable), Box::new(handler));
    }

    /// Script a handler that binds only at the given arity
    pub fn on_arity(&self, callable: u64, arity: usize, result: NativeResult) {
        self.on(callable, move |_, args, _| {
            if args.len() == arity {
                CallOutcome::Value(result.clone())
            } else {
                CallOutcome::NoBind
            }
        });
    }

    pub fn alloc_address(&self) -> Address {
        Address(self.next_address.fetch_add(0x40, Ordering::Relaxed))
    }

    /// Invocations seen so far, as (callable, argument count)
    pub fn calls(&self) -> Vec<(CallableId, usize)> {
        self.calls.lock().clone()
    }

    pub fn last_call(&self) -> Option<(CallableId, usize)> {
        self.calls.lock().last().copied()
    }
}

impl ExecutionEngine for ScriptedEngine {
    fn invoke(
        &self,
        callable: CallableId,
        receiver: Option<Address>,
        args: &[BridgeValue],
        flags: &CallFlags,
    ) -> CallOutcome {
        self.calls.lock().push((callable, args.len()));
        match self.handlers.read().get(&callable) {
            Some(handler) => handler(receiver, args, flags),
            None => CallOutcome::NoBind,
        }
    }

    fn construct_default(&self, scope: ScopeId) -> CallOutcome {
        CallOutcome::Value(NativeResult::Object {
            address: self.alloc_address(),
            scope,
            host_owned: Some(true),
        })
    }
}
