//! Scope proxy builder
//!
//! Populates a freshly constructed proxy type's dictionary from its native
//! scope: methods wired into overload proxies, data members turned into
//! properties, and a constructor synthesized when the native type declares
//! none. Population is best-effort — a member that fails to resolve is
//! logged and omitted; only upstream construction failures are fatal.
//!
//! Namespaces are populated lazily: only data members are collected
//! eagerly, their functions materialize on first attribute access.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::debug;

use mirra_sdk::{MemberDesc, MethodDesc, ScopeId};

use crate::bridge::Bridge;
use crate::dispatch::{CallContext, CallableKind, NativeCallable, OverloadProxy, TemplateProxy};
use crate::error::{BridgeError, BridgeResult};
use crate::host::protocol::{
    self, is_destructor, is_indexing_or_call, mangle_private, PROTO_NEW, PROTO_SETITEM,
};
use crate::host::{Attribute, Property, ProxyType};

/// Strip template arguments from a native method spelling
fn template_base(name: &str) -> &str {
    name.split('<').next().unwrap_or(name)
}

/// Compute the dynamic-visible name for a method, or `None` when the
/// method must be skipped (malformed, destructor, non-public constructor).
fn dynamic_name(desc: &MethodDesc, scope_name: &str) -> Option<String> {
    if desc.name.is_empty() || is_destructor(&desc.name) {
        return None;
    }
    if desc.is_constructor {
        // non-public constructors are dropped entirely
        return desc.is_public.then(|| PROTO_NEW.to_string());
    }
    let mapped = protocol::protocol_name(template_base(&desc.name)).to_string();
    if desc.is_public {
        Some(mapped)
    } else {
        Some(mangle_private(scope_name, &mapped))
    }
}

fn callable_kind(desc: &MethodDesc, in_namespace: bool) -> CallableKind {
    if desc.is_constructor {
        CallableKind::Constructor
    } else if in_namespace {
        CallableKind::Free
    } else if desc.is_static {
        CallableKind::Static
    } else {
        CallableKind::Instance
    }
}

/// Populate `ty`'s dictionary from its native scope.
///
/// The attribute-interception hook is bypassed for the duration so
/// population runs at full speed and triggers no user-visible effects.
pub(crate) fn populate(bridge: &Bridge, ty: &Arc<ProxyType>) -> BridgeResult<()> {
    let scope = ty.scope().ok_or_else(|| {
        BridgeError::Construction("the root proxy base has no native scope".to_string())
    })?;

    let prev = ty.set_intercept(false);
    let in_namespace = bridge.oracle().is_namespace(scope);
    if !in_namespace {
        populate_methods(bridge, ty, scope);
    }
    populate_members(bridge, ty, scope);
    ty.set_intercept(prev);
    Ok(())
}

/// Eagerly enumerate and commit every declared method of a class scope
fn populate_methods(bridge: &Bridge, ty: &Arc<ProxyType>, scope: ScopeId) {
    let scope_name = ty.name().to_string();
    let mut accumulated: FxHashMap<String, Vec<Arc<NativeCallable>>> = FxHashMap::default();
    let mut commit_order: Vec<String> = Vec::new();

    let count = bridge.oracle().method_count(scope);
    for index in 0..count {
        let Some(desc) = bridge.oracle().method(scope, index) else {
            debug!(scope = ?scope, index, "skipping method with unreadable reflection data");
            continue;
        };
        let Some(name) = dynamic_name(&desc, &scope_name) else {
            continue;
        };

        if desc.is_template {
            ensure_template_aggregator(ty, scope, &desc, &name);
        }
        if desc.is_constructor {
            ty.mark_explicit_ctor();
        }

        let kind = callable_kind(&desc, false);
        let callable = Arc::new(NativeCallable::from_desc(&desc, name.clone(), kind, scope));
        push_accumulated(&mut accumulated, &mut commit_order, name, Arc::clone(&callable));

        // A non-const reference returned from the call or index operator is
        // the assignment-through-index idiom: register under "set element"
        // as well, sharing the same candidate.
        if desc.returns_reference && is_indexing_or_call(&desc.name) {
            push_accumulated(
                &mut accumulated,
                &mut commit_order,
                PROTO_SETITEM.to_string(),
                callable,
            );
        }
    }

    if !ty.has_explicit_ctor() {
        push_accumulated(
            &mut accumulated,
            &mut commit_order,
            PROTO_NEW.to_string(),
            Arc::new(NativeCallable::synthesized_ctor(scope)),
        );
    }

    commit_overloads(ty, accumulated, commit_order);
}

fn push_accumulated(
    accumulated: &mut FxHashMap<String, Vec<Arc<NativeCallable>>>,
    commit_order: &mut Vec<String>,
    name: String,
    callable: Arc<NativeCallable>,
) {
    let slot = accumulated.entry(name.clone()).or_default();
    if slot.is_empty() {
        commit_order.push(name);
    }
    slot.push(callable);
}

/// On first sighting of a template method, make sure a template aggregator
/// sits under its dynamic name, seeded with any already-present plain
/// overload. Processing continues afterwards so the concrete instantiation
/// is also accumulated as a plain candidate.
fn ensure_template_aggregator(
    ty: &Arc<ProxyType>,
    scope: ScopeId,
    desc: &MethodDesc,
    dyn_name: &str,
) {
    let aggregator = match ty.attr(dyn_name) {
        Some(Attribute::Template(existing)) => existing,
        other => {
            let created = Arc::new(TemplateProxy::new(
                template_base(&desc.name).to_string(),
                dyn_name.to_string(),
            ));
            created.set_owner(ty);
            if let Some(Attribute::Method(existing)) = other {
                created.absorb_plain(&existing);
            }
            ty.set_attr(dyn_name.to_string(), Attribute::Template(Arc::clone(&created)));
            created
        }
    };
    aggregator.add_template(Arc::new(NativeCallable::from_desc(
        desc,
        desc.name.clone(),
        CallableKind::Instance,
        scope,
    )));
}

/// Commit accumulated per-name candidate lists into the dictionary.
///
/// A template aggregator already present under a name absorbs the plain
/// candidates into its non-template pool instead of being overwritten.
fn commit_overloads(
    ty: &Arc<ProxyType>,
    mut accumulated: FxHashMap<String, Vec<Arc<NativeCallable>>>,
    commit_order: Vec<String>,
) {
    for name in commit_order {
        let Some(list) = accumulated.remove(&name) else {
            continue;
        };
        match ty.attr(&name) {
            Some(Attribute::Template(aggregator)) => {
                for callable in list {
                    aggregator.add_overload(callable);
                }
            }
            _ => {
                let ctx = if name == PROTO_NEW {
                    CallContext::for_constructor()
                } else {
                    CallContext::new()
                };
                let proxy = OverloadProxy::with_context(name.clone(), list, ctx);
                ty.set_attr(name, Attribute::Method(proxy));
            }
        }
    }
}

/// Turn declared data members into properties.
///
/// Instance level always; additionally at the type level when static.
fn populate_members(bridge: &Bridge, ty: &Arc<ProxyType>, scope: ScopeId) {
    for member in bridge.oracle().members(scope) {
        if !member.is_public {
            continue;
        }
        if member.is_enum_value && member.is_static {
            if member.storage.is_none() {
                // addressless pseudo-member from enum reflection
                continue;
            }
            if ty.attr(&member.name).is_some() {
                // already materialized as an enumerator constant
                continue;
            }
            if member.is_anonymous_enum() {
                debug!(member = %member.name, "materializing anonymous-enum constant as property");
            }
        } else if member.storage.is_none() {
            debug!(scope = ?scope, member = %member.name, "skipping member without storage");
            continue;
        }
        materialize_property(ty, &member);
    }
}

fn materialize_property(ty: &Arc<ProxyType>, member: &MemberDesc) {
    let prop = Property {
        name: member.name.clone(),
        type_name: member.type_name.clone(),
        is_static: member.is_static,
        storage: member.storage,
    };
    ty.set_attr(member.name.clone(), Attribute::Property(prop.clone()));
    if member.is_static {
        ty.set_type_attr(member.name.clone(), Attribute::Property(prop));
    }
}

/// Materialize a namespace function on first access.
///
/// Returns the committed attribute, or `None` when the namespace declares
/// no function under `name`.
pub(crate) fn materialize_namespace_method(
    bridge: &Bridge,
    ty: &Arc<ProxyType>,
    scope: ScopeId,
    name: &str,
) -> Option<Attribute> {
    let scope_name = ty.name().to_string();
    let mut plain: Vec<Arc<NativeCallable>> = Vec::new();
    let mut templated: Vec<Arc<NativeCallable>> = Vec::new();

    let count = bridge.oracle().method_count(scope);
    for index in 0..count {
        let Some(desc) = bridge.oracle().method(scope, index) else {
            continue;
        };
        let Some(dyn_name) = dynamic_name(&desc, &scope_name) else {
            continue;
        };
        if dyn_name != name {
            continue;
        }
        let callable = Arc::new(NativeCallable::from_desc(
            &desc,
            dyn_name,
            callable_kind(&desc, true),
            scope,
        ));
        if desc.is_template {
            templated.push(Arc::new(NativeCallable::from_desc(
                &desc,
                desc.name.clone(),
                CallableKind::Free,
                scope,
            )));
        }
        plain.push(callable);
    }

    if plain.is_empty() && templated.is_empty() {
        return None;
    }

    let prev = ty.set_intercept(false);
    let attr = if templated.is_empty() {
        Attribute::Method(OverloadProxy::new(name, plain))
    } else {
        let aggregator = Arc::new(TemplateProxy::new(name.to_string(), name.to_string()));
        aggregator.set_owner(ty);
        for callable in templated {
            aggregator.add_template(callable);
        }
        for callable in plain {
            aggregator.add_overload(callable);
        }
        Attribute::Template(aggregator)
    };
    ty.set_attr(name.to_string(), attr.clone());
    ty.set_intercept(prev);
    Some(attr)
}
