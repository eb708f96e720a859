//! Object identity registry and type pinning
//!
//! The registry enforces at-most-one-live-proxy per native object: it maps
//! `(address, actual runtime type)` to a weak reference on the proxy
//! instance. A dead weak reference is treated as a cache miss and pruned on
//! the spot, so collected proxies can be re-created on demand.
//!
//! Pinning substitutes one native type for another when binding returned
//! objects; the rules come from external configuration and are read-only
//! here.

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use mirra_sdk::{Address, MetadataOracle, ScopeId};

use crate::error::{BridgeError, BridgeResult};
use crate::host::ProxyInstance;

/// Weak map from native identity to the one live proxy wrapping it.
///
/// Keys pair the address with the *actual* runtime type, so an object
/// returned once as a base and once as its true derived type still meets
/// itself after downcasting normalizes both to the derived key.
#[derive(Default)]
pub struct IdentityRegistry {
    entries: DashMap<(Address, ScopeId), Weak<ProxyInstance>>,
}

impl std::fmt::Debug for IdentityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityRegistry")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl IdentityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the live proxy for `(address, scope)`, pruning a stale entry
    pub fn lookup(&self, address: Address, scope: ScopeId) -> Option<Arc<ProxyInstance>> {
        let key = (address, scope);
        if let Some(entry) = self.entries.get(&key) {
            if let Some(live) = entry.upgrade() {
                return Some(live);
            }
        } else {
            return None;
        }
        // stale: the proxy was collected since registration
        self.entries.remove(&key);
        None
    }

    /// Register a freshly bound instance under its identity key
    pub fn register(&self, address: Address, scope: ScopeId, instance: &Arc<ProxyInstance>) {
        self.entries.insert((address, scope), Arc::downgrade(instance));
    }

    /// Drop the entry for `(address, scope)`, if any
    pub fn unregister(&self, address: Address, scope: ScopeId) {
        self.entries.remove(&(address, scope));
    }

    /// Number of (possibly stale) entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries exist
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One pinning rule in external configuration, by type name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinningRuleConfig {
    /// Source type name; the rule also matches native subtypes
    pub from: String,
    /// Destination type name substituted at binding time
    pub to: String,
}

/// External pinning configuration document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PinningConfig {
    /// Substitution rules, applied in order; first match wins
    #[serde(default)]
    pub rules: Vec<PinningRuleConfig>,
    /// Type names exempt from pinning
    #[serde(default)]
    pub ignored: Vec<String>,
}

impl PinningConfig {
    /// Parse a configuration document from JSON
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Resolved pinning rules: (source scope → destination scope) plus the
/// ignore set
#[derive(Debug, Clone, Default)]
pub struct PinningTable {
    rules: Vec<(ScopeId, ScopeId)>,
    ignored: FxHashSet<ScopeId>,
}

impl PinningTable {
    /// Create an empty table (no substitution)
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a configuration document against the oracle.
    ///
    /// Unresolvable type names are a configuration error, reported as a
    /// lookup failure naming the offending type.
    pub fn from_config(config: &PinningConfig, oracle: &dyn MetadataOracle) -> BridgeResult<Self> {
        let mut table = PinningTable::new();
        for rule in &config.rules {
            let from = oracle
                .resolve_scope(&rule.from)
                .ok_or_else(|| BridgeError::Lookup(rule.from.clone()))?;
            let to = oracle
                .resolve_scope(&rule.to)
                .ok_or_else(|| BridgeError::Lookup(rule.to.clone()))?;
            table.add_rule(from, to);
        }
        for name in &config.ignored {
            let scope = oracle
                .resolve_scope(name)
                .ok_or_else(|| BridgeError::Lookup(name.clone()))?;
            table.ignore(scope);
        }
        Ok(table)
    }

    /// Add a substitution rule
    pub fn add_rule(&mut self, from: ScopeId, to: ScopeId) {
        self.rules.push((from, to));
    }

    /// Exempt a scope from pinning
    pub fn ignore(&mut self, scope: ScopeId) {
        self.ignored.insert(scope);
    }

    /// True if `scope` is exempt from pinning
    pub fn is_ignored(&self, scope: ScopeId) -> bool {
        self.ignored.contains(&scope)
    }

    /// The pinned destination for `scope`, if a rule matches it or one of
    /// its native supertypes
    pub fn substitute(&self, scope: ScopeId, oracle: &dyn MetadataOracle) -> Option<ScopeId> {
        for &(from, to) in &self.rules {
            if scope == from || oracle.is_subtype(scope, from) {
                return Some(to);
            }
        }
        None
    }

    /// True when no rules are configured
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
