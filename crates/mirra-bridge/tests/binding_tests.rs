//! Object binding, identity, downcasting, and pinning

mod common;

use std::sync::Arc;

use common::{FixtureOracle, ScriptedEngine};
use mirra_bridge::{Bridge, BridgeError};
use mirra_sdk::{Address, ScopeId};

fn bridge_with(oracle: FixtureOracle) -> Bridge {
    Bridge::new(Arc::new(oracle), Arc::new(ScriptedEngine::new()))
}

#[test]
fn binding_same_object_twice_yields_same_proxy() {
    let oracle = FixtureOracle::new();
    let a = oracle.add_class("A");

    let bridge = bridge_with(oracle);
    let first = bridge.bind(Address(0x1000), a, false, false).unwrap();
    let second = bridge.bind(Address(0x1000), a, false, false).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(bridge.identity().len(), 1);
}

#[test]
fn binding_without_a_type_fails() {
    let oracle = FixtureOracle::new();
    let bridge = bridge_with(oracle);
    match bridge.bind(Address(0x1000), ScopeId::INVALID, false, false) {
        Err(BridgeError::Type(message)) => assert!(message.contains("without a type")),
        other => panic!("expected type error, got {:?}", other),
    }
}

#[test]
fn null_address_binds_as_typed_null() {
    let oracle = FixtureOracle::new();
    let a = oracle.add_class("A");

    let bridge = bridge_with(oracle);
    let instance = bridge.bind_with_downcast(Address::NULL, a, false).unwrap();
    assert!(instance.is_null());
    assert_eq!(instance.ty().scope(), Some(a));
    // typed nulls never enter the identity registry
    assert!(bridge.identity().is_empty());
}

#[test]
fn reference_bindings_are_not_registered() {
    let oracle = FixtureOracle::new();
    let a = oracle.add_class("A");

    let bridge = bridge_with(oracle);
    let first = bridge.bind(Address(0x1000), a, true, false).unwrap();
    let second = bridge.bind(Address(0x1000), a, true, false).unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(bridge.identity().is_empty());
}

#[test]
fn collected_proxy_can_be_rebound() {
    let oracle = FixtureOracle::new();
    let a = oracle.add_class("A");

    let bridge = bridge_with(oracle);
    {
        let _instance = bridge.bind(Address(0x1000), a, false, false).unwrap();
    }
    // the weak entry is stale now; rebinding mints a fresh proxy
    let rebound = bridge.bind(Address(0x1000), a, false, false).unwrap();
    assert_eq!(rebound.address(), Address(0x1000));
    assert_eq!(bridge.identity().len(), 1);
}

#[test]
fn downcast_adjusts_type_and_address() {
    let oracle = FixtureOracle::new();
    let base = oracle.add_class("Base");
    let derived = oracle.add_class("Derived");
    oracle.add_base(derived, base);
    oracle.set_actual(Address(0x2000), derived);
    oracle.set_offset(derived, base, -16);

    let bridge = bridge_with(oracle);
    let instance = bridge.bind_with_downcast(Address(0x2000), base, false).unwrap();
    assert_eq!(instance.ty().scope(), Some(derived));
    assert_eq!(instance.address(), Address(0x2000 - 16));

    // identity survives repeated crossings through the base pointer
    let again = bridge.bind_with_downcast(Address(0x2000), base, false).unwrap();
    assert!(Arc::ptr_eq(&instance, &again));
}

#[test]
fn unknown_offset_degrades_to_declared_type() {
    let oracle = FixtureOracle::new();
    let base = oracle.add_class("Base");
    let derived = oracle.add_class("Derived");
    oracle.add_base(derived, base);
    oracle.set_actual(Address(0x2000), derived);
    // no offset registered: incomplete type information

    let bridge = bridge_with(oracle);
    let instance = bridge.bind_with_downcast(Address(0x2000), base, false).unwrap();
    assert_eq!(instance.ty().scope(), Some(base));
    assert_eq!(instance.address(), Address(0x2000));
}

#[test]
fn pinned_type_substitutes_on_binding() {
    let oracle = FixtureOracle::new();
    let src = oracle.add_class("Src");
    let dst = oracle.add_class("Dst");

    let bridge = bridge_with(oracle);
    bridge.pin(src, dst);

    let instance = bridge.bind_with_downcast(Address(0x3000), src, false).unwrap();
    assert_eq!(instance.ty().scope(), Some(dst));
}

#[test]
fn pinning_applies_to_native_subtypes_of_the_source() {
    let oracle = FixtureOracle::new();
    let src = oracle.add_class("Src");
    let sub = oracle.add_class("SubSrc");
    oracle.add_base(sub, src);
    let dst = oracle.add_class("Dst");

    let bridge = bridge_with(oracle);
    bridge.pin(src, dst);

    let instance = bridge.bind_with_downcast(Address(0x3000), sub, false).unwrap();
    assert_eq!(instance.ty().scope(), Some(dst));
}

#[test]
fn ignored_scope_is_exempt_from_pinning() {
    let oracle = FixtureOracle::new();
    let src = oracle.add_class("Src");
    let dst = oracle.add_class("Dst");

    let bridge = bridge_with(oracle);
    bridge.pin(src, dst);
    bridge.ignore_pinning(src);

    let instance = bridge.bind_with_downcast(Address(0x3000), src, false).unwrap();
    assert_eq!(instance.ty().scope(), Some(src));
}

#[test]
fn bind_registers_under_the_actual_runtime_type() {
    let oracle = FixtureOracle::new();
    let base = oracle.add_class("Base");
    let derived = oracle.add_class("Derived");
    oracle.add_base(derived, base);
    oracle.set_actual(Address(0x4000), derived);
    oracle.set_offset(derived, base, 0);

    let bridge = bridge_with(oracle);
    let via_base = bridge.bind_with_downcast(Address(0x4000), base, false).unwrap();
    // binding directly as the derived type meets the same proxy
    let via_derived = bridge.bind(Address(0x4000), derived, false, false).unwrap();
    assert!(Arc::ptr_eq(&via_base, &via_derived));
}
