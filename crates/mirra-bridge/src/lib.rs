//! Mirra bridge core
//!
//! The proxy-construction and object-identity subsystem of the Mirra
//! runtime bridge. Given a reflection provider ([`mirra_sdk::MetadataOracle`])
//! and an invocation engine ([`mirra_sdk::ExecutionEngine`]), the bridge
//! mirrors native namespaces and classes into host-visible proxy types,
//! exposes overloaded native callables as single dynamic call targets, and
//! keeps native object addresses in a one-proxy-per-object identity map.
//!
//! ## Entry points
//!
//! - [`Bridge::resolve`] — qualified name → proxy type or template stub
//! - [`Bridge::bind`] / [`Bridge::bind_with_downcast`] — native address →
//!   proxy instance, identity preserved
//! - [`Bridge::resolve_global`] — global data member or function set
//!
//! ```ignore
//! let bridge = Bridge::new(oracle, engine);
//! let Resolved::Type(ty) = bridge.resolve("N::A")? else { … };
//! let obj = bridge.construct(&ty, &[])?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod bridge;
mod builder;
mod dispatch;
mod error;
mod hierarchy;
mod host;
mod identity;
mod navigator;

pub use bridge::{Bridge, EnrichmentHook, GlobalSymbol};
pub use dispatch::{
    CallContext, CallReturn, CallableKind, NativeCallable, OverloadProxy, PriorityFn,
    TemplateProxy,
};
pub use error::{BridgeError, BridgeResult};
pub use host::protocol::{PROTO_CALL, PROTO_GETITEM, PROTO_NEW, PROTO_SETITEM};
pub use host::{
    Attribute, InstanceFlags, InterceptHook, MetaType, Property, ProxyInstance, ProxyType,
};
pub use identity::{IdentityRegistry, PinningConfig, PinningRuleConfig, PinningTable};
pub use navigator::{Resolved, TemplateStub};
