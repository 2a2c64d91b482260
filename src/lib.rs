#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

//! Dependency-injection glue for tonic gRPC clients.
//!
//! This crate wires typed gRPC client stubs into an application's component
//! lifecycle. It does not implement any transport, retry, or load-balancing
//! logic of its own; all of that is delegated to tonic. What it does:
//!
//! - Components declare their injection points ([`GrpcClientBean`]) as an
//!   explicit, startup-time mapping of (member, [`GrpcClient`] config).
//! - [`GrpcClientInjector::post_process`] runs once per component: it resolves
//!   a named channel from the registered [`ChannelFactory`], decorates it with
//!   the declared [`ClientInterceptor`]s, builds the declared value (the raw
//!   [`GrpcChannel`] or a typed stub run through every [`StubTransformer`]),
//!   and assigns it into the component.
//! - Collaborators (channel factory, interceptors, transformers) live in a
//!   [`ComponentRegistry`] and are resolved by capability or by name.
//!
//! A default [`AddressChannelFactory`] maps logical channel names to static
//! address lists via [`ChannelsProperties`]; multi-address channels use tonic's
//! round-robin balancing. Channel construction is lazy and non-blocking, but
//! must run inside a tokio runtime because tonic spawns its connection worker
//! at channel creation.

pub mod channel;
pub mod config;
pub mod error;
pub mod factory;
pub mod inject;
pub mod injector;
pub mod interceptor;
pub mod registry;
pub mod transformer;

pub use channel::GrpcChannel;
pub use config::{ChannelProperties, ChannelsProperties};
pub use error::InjectError;
pub use factory::{AddressChannelFactory, ChannelFactory};
pub use inject::{Assigner, GrpcClient, GrpcClientBean, InjectionPoint, Member, TypeToken};
pub use injector::GrpcClientInjector;
pub use interceptor::{ClientInterceptor, GlobalInterceptorRegistry, InterceptorChain};
pub use registry::{ComponentRegistry, RegistryError};
pub use transformer::{BoxedStub, StubTransformer, TypedStubTransformer};
