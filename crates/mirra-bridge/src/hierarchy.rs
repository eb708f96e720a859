//! Class hierarchy builder
//!
//! Linearizes a scope's declared native bases into an ordered,
//! duplicate-free base tuple compatible with the host's single-metatype
//! object model, then constructs the proxy type and its metatype from that
//! tuple. The ordering pass is deliberately explicit (front/back insertion)
//! rather than a generic linearization: the host's resolution rules only
//! need subtype-before-base.

use std::sync::Arc;

use tracing::trace;

use mirra_sdk::ScopeId;

use crate::bridge::Bridge;
use crate::error::{BridgeError, BridgeResult};
use crate::host::{MetaType, ProxyType};

/// Resolve a scope's declared bases into the deduplicated, ordered tuple.
///
/// Each base resolves transitively through the bridge's type cache (building
/// recursively when needed). Duplicates are skipped by name; a base that is
/// a native subtype of an already-collected entry is inserted in front so
/// subtypes always precede their bases. An empty result degenerates to the
/// fixed root base; a non-empty result gets the root prepended unless its
/// first entry already reaches it.
pub(crate) fn build_base_list(
    bridge: &Bridge,
    scope: ScopeId,
) -> BridgeResult<Vec<Arc<ProxyType>>> {
    let declared = bridge.oracle().bases(scope);
    let mut ordered: Vec<Arc<ProxyType>> = Vec::new();

    for base in &declared {
        if ordered.iter().any(|t| t.name() == base.name) {
            continue;
        }
        let resolved = bridge.proxy_type_for(base.scope).map_err(|err| {
            BridgeError::Construction(format!(
                "base `{}` of scope {:?} failed to resolve: {}",
                base.name, scope, err
            ))
        })?;
        let precedes = ordered.iter().any(|entry| match entry.scope() {
            Some(existing) => existing != base.scope && bridge.oracle().is_subtype(base.scope, existing),
            None => false,
        });
        if precedes {
            ordered.insert(0, resolved);
        } else {
            ordered.push(resolved);
        }
    }

    let root = bridge.root_type();
    if ordered.is_empty() {
        ordered.push(Arc::clone(root));
    } else if !ordered[0].reaches(root) {
        ordered.insert(0, Arc::clone(root));
    }
    Ok(ordered)
}

/// Construct the proxy type (and its metatype) for `scope`.
///
/// Does not touch the bridge's caches and does not populate the dictionary;
/// the navigator owns cache insertion and population ordering.
pub(crate) fn build_proxy_type(bridge: &Bridge, scope: ScopeId) -> BridgeResult<Arc<ProxyType>> {
    let name = bridge
        .oracle()
        .scope_name(scope)
        .ok_or_else(|| BridgeError::Type(format!("scope {:?} is not known to the oracle", scope)))?;

    let bases = build_base_list(bridge, scope)?;
    trace!(
        name = %name,
        bases = ?bases.iter().map(|b| b.name().to_string()).collect::<Vec<_>>(),
        "building proxy type"
    );

    // Metatype from the bases' metatypes; the synthetic module placeholder
    // is cleared immediately so the host infers no placement from it.
    let meta_bases = bases.iter().map(|b| Arc::clone(b.meta())).collect();
    let meta = Arc::new(MetaType::new(format!("{}_meta", name), Some(scope), meta_bases));
    meta.clear_module();

    Ok(Arc::new(ProxyType::new(name, Some(scope), bases, meta)))
}
