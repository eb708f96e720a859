//! Global scope navigator
//!
//! Top-level name resolution: qualified native names split into scope
//! segments (template-argument regions stay opaque), enclosing scopes
//! created on demand, typedef aliases reusing the proxy already built for
//! their scope id, and unresolved template names answered with a callable
//! instantiation stub.

use std::sync::Arc;

use tracing::debug;

use crate::bridge::Bridge;
use crate::builder;
use crate::error::{BridgeError, BridgeResult};
use crate::hierarchy;
use crate::host::{Attribute, ProxyType};

/// Result of a top-level name resolution
#[derive(Debug, Clone)]
pub enum Resolved {
    /// The name denotes a (now materialized) native scope
    Type(Arc<ProxyType>),
    /// The name denotes a template that is not yet instantiated
    Template(Arc<TemplateStub>),
}

/// Callable stand-in for a template name without concrete arguments.
///
/// Instantiating it with concrete argument spellings asks the oracle for
/// the instantiation scope and re-enters ordinary resolution.
#[derive(Debug)]
pub struct TemplateStub {
    qualified: String,
}

impl TemplateStub {
    /// Create a stub for the fully qualified template name
    pub fn new(qualified: String) -> Self {
        Self { qualified }
    }

    /// Fully qualified template name
    pub fn qualified(&self) -> &str {
        &self.qualified
    }

    /// Instantiate with concrete template argument spellings
    pub fn instantiate(&self, bridge: &Bridge, args: &[String]) -> BridgeResult<Arc<ProxyType>> {
        let spelled = format!("{}<{}>", self.qualified, args.join(", "));
        let scope = bridge
            .oracle()
            .instantiate_template(&self.qualified, args)
            .ok_or_else(|| BridgeError::Lookup(spelled.clone()))?;
        let qualified = bridge
            .oracle()
            .qualified_name(scope)
            .ok_or_else(|| BridgeError::Lookup(spelled))?;
        match resolve(bridge, &qualified, None)? {
            Resolved::Type(ty) => Ok(ty),
            Resolved::Template(_) => Err(BridgeError::Lookup(qualified)),
        }
    }
}

/// Split a qualified name on `::`, treating `<…>` regions as opaque
pub(crate) fn split_scoped(name: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut chars = name.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '<' => {
                depth += 1;
                current.push(ch);
            }
            '>' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ':' if depth == 0 && chars.peek() == Some(&':') => {
                chars.next();
                segments.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    segments.push(current);
    segments
}

/// Resolve `name` to a proxy type or template stub.
///
/// With a `parent_hint` the lookup name is prefixed with the hint's
/// qualified scope name. The empty name is the process-wide global scope.
pub(crate) fn resolve(
    bridge: &Bridge,
    name: &str,
    parent_hint: Option<&Arc<ProxyType>>,
) -> BridgeResult<Resolved> {
    if name.is_empty() && parent_hint.is_none() {
        return Ok(Resolved::Type(bridge.global_proxy()?));
    }

    let full = match parent_hint {
        Some(parent) => {
            let prefix = bridge.qualified_name_of(parent);
            if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{}::{}", prefix, name)
            }
        }
        None => name.to_string(),
    };
    let segments = split_scoped(&full);
    let requested_short = segments.last().cloned().unwrap_or_else(|| full.clone());

    let scope = match bridge.oracle().resolve_scope(&full) {
        Some(scope) => scope,
        None => {
            if bridge.oracle().is_template(&full) {
                let parent = resolve_parent(bridge, &segments)?;
                if let Some(Attribute::TemplateStub(stub)) = parent.attr(&requested_short) {
                    return Ok(Resolved::Template(stub));
                }
                debug!(name = %full, "caching template instantiation stub");
                let stub = Arc::new(TemplateStub::new(full));
                parent.set_attr(
                    requested_short,
                    Attribute::TemplateStub(Arc::clone(&stub)),
                );
                return Ok(Resolved::Template(stub));
            }
            return Err(BridgeError::Lookup(full));
        }
    };

    // Identity-based reuse: a typedef alias of an already-bound scope must
    // not rebuild the proxy, only register the alias name.
    if let Some(existing) = bridge.cached_type(scope) {
        if existing.name() != requested_short {
            let parent = resolve_parent(bridge, &segments)?;
            parent.set_attr(requested_short, Attribute::Type(Arc::clone(&existing)));
        }
        return Ok(Resolved::Type(existing));
    }

    let parent = resolve_parent(bridge, &segments)?;

    let built = hierarchy::build_proxy_type(bridge, scope)?;
    // Record identity before population so self-referential members meet
    // the cache instead of rebuilding.
    let ty = bridge.cache_type(scope, built);
    builder::populate(bridge, &ty)?;

    let native_short = ty.name().to_string();
    parent.set_attr(native_short.clone(), Attribute::Type(Arc::clone(&ty)));
    if requested_short != native_short {
        parent.set_attr(requested_short, Attribute::Type(Arc::clone(&ty)));
    }
    ty.set_qualified(segments[..segments.len() - 1].join("::"));

    if bridge.oracle().is_namespace(scope) {
        bridge.publish_module(&segments.join("."), &ty);
    } else {
        bridge.run_enrichment(&ty);
    }

    debug!(name = %ty.name(), scope = ?scope, "materialized proxy type");
    Ok(Resolved::Type(ty))
}

/// Resolve the enclosing scope of a segment path, creating it on demand.
///
/// A path that is not one of ours (a foreign module boundary) falls back
/// to plain host lookup through the module registry.
fn resolve_parent(bridge: &Bridge, segments: &[String]) -> BridgeResult<Arc<ProxyType>> {
    if segments.len() <= 1 {
        return bridge.global_proxy();
    }
    let parent_path = segments[..segments.len() - 1].join("::");
    match resolve(bridge, &parent_path, None) {
        Ok(Resolved::Type(parent)) => Ok(parent),
        Ok(Resolved::Template(_)) => Err(BridgeError::Type(format!(
            "`{}` is an uninstantiated template and cannot enclose a scope",
            parent_path
        ))),
        Err(err) => {
            let dotted = segments[..segments.len() - 1].join(".");
            if let Some(foreign) = bridge.lookup_module(&dotted) {
                return Ok(foreign);
            }
            Err(err)
        }
    }
}
