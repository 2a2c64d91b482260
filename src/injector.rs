//! The injection post-processor.
//!
//! [`GrpcClientInjector::post_process`] is the single lifecycle hook this
//! crate exposes: the host calls it once per component before that component's
//! initialization completes. The pass is synchronous and side-effect-only;
//! any failure aborts initialization of that component.

use parking_lot::RwLock;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::channel::GrpcChannel;
use crate::error::InjectError;
use crate::factory::ChannelFactory;
use crate::inject::{GrpcClientBean, InjectionPoint, Member, TypeToken};
use crate::interceptor::resolve_interceptors;
use crate::registry::ComponentRegistry;
use crate::transformer::{BoxedStub, StubTransformer};

type StubFactory = Arc<dyn Fn(GrpcChannel) -> anyhow::Result<BoxedStub> + Send + Sync>;

/// Post-processes components, wiring gRPC clients into their declared
/// injection points.
///
/// The channel factory and the transformer list are obtained lazily from the
/// registry on first use and memoized for the injector's lifetime. First
/// access is safe under concurrent initialization threads; a racy first call
/// at worst re-fetches the same components (benign recomputation).
pub struct GrpcClientInjector {
    registry: Arc<ComponentRegistry>,
    channel_factory: OnceLock<Arc<dyn ChannelFactory>>,
    stub_transformers: OnceLock<Arc<[Arc<dyn StubTransformer>]>>,
    stub_factories: RwLock<HashMap<TypeId, StubFactory>>,
}

impl GrpcClientInjector {
    pub fn new(registry: Arc<ComponentRegistry>) -> Self {
        Self {
            registry,
            channel_factory: OnceLock::new(),
            stub_transformers: OnceLock::new(),
            stub_factories: RwLock::new(HashMap::new()),
        }
    }

    /// Register a stub type constructible from a channel, the equivalent of a
    /// public single-channel-argument constructor. Only registered stub types
    /// (and the raw [`GrpcChannel`]) are injectable.
    pub fn register_stub<S>(&self)
    where
        S: From<GrpcChannel> + Send + 'static,
    {
        self.stub_factories.write().insert(
            TypeId::of::<S>(),
            Arc::new(|channel| Ok(Box::new(S::from(channel)) as BoxedStub)),
        );
    }

    /// Register a stub type with a fallible constructor.
    pub fn register_stub_with<S, F>(&self, construct: F)
    where
        S: Send + 'static,
        F: Fn(GrpcChannel) -> anyhow::Result<S> + Send + Sync + 'static,
    {
        self.stub_factories.write().insert(
            TypeId::of::<S>(),
            Arc::new(move |channel| Ok(Box::new(construct(channel)?) as BoxedStub)),
        );
    }

    /// The lifecycle hook: computes and assigns a value for every injection
    /// point of `bean`, returning the mutated bean. A bean with no points is
    /// returned unchanged. Each point gets a freshly created channel; nothing
    /// is cached across beans.
    pub fn post_process<B: GrpcClientBean>(&self, mut bean: B) -> Result<B, InjectError> {
        for point in B::injection_points() {
            self.apply(&mut bean, &point)?;
        }
        Ok(bean)
    }

    fn apply<B>(&self, bean: &mut B, point: &InjectionPoint<B>) -> Result<(), InjectError> {
        let member = point.member;
        if let Member::Method { params, .. } = member {
            if params != 1 {
                return Err(InjectError::SetterArity {
                    member: member.to_string(),
                    found: params,
                });
            }
        }
        // Reject unsupported declared types before any channel or stub work.
        self.check_supported(member, point.declared)?;

        let name = point.client.name().to_owned();
        let interceptors = resolve_interceptors(&self.registry, &point.client, member)?;
        let channel = self
            .channel_factory()?
            .create_channel(&name, interceptors)
            .map_err(|source| InjectError::ChannelCreation {
                member: member.to_string(),
                name: name.clone(),
                source,
            })?;

        tracing::debug!(channel = %name, member = %member, "injecting grpc client");
        let value = self.value_for_member(&name, member, point.declared, channel)?;
        (point.assign)(bean, value)
    }

    fn check_supported(&self, member: Member, declared: TypeToken) -> Result<(), InjectError> {
        let supported = declared.id == TypeId::of::<GrpcChannel>()
            || self.stub_factories.read().contains_key(&declared.id);
        if supported {
            Ok(())
        } else {
            Err(InjectError::UnsupportedType {
                member: member.to_string(),
                type_name: declared.name,
            })
        }
    }

    /// Builds the exact value to inject: the channel itself for raw-channel
    /// points, otherwise a stub run through every registered transformer in
    /// order.
    fn value_for_member(
        &self,
        name: &str,
        member: Member,
        declared: TypeToken,
        channel: GrpcChannel,
    ) -> Result<BoxedStub, InjectError> {
        if declared.id == TypeId::of::<GrpcChannel>() {
            return Ok(Box::new(channel));
        }

        let construct = self.stub_factories.read().get(&declared.id).cloned();
        let Some(construct) = construct else {
            return Err(InjectError::UnsupportedType {
                member: member.to_string(),
                type_name: declared.name,
            });
        };
        let mut stub = construct(channel).map_err(|source| InjectError::StubCreation {
            member: member.to_string(),
            name: name.to_owned(),
            type_name: declared.name,
            source,
        })?;
        for transformer in self.stub_transformers().iter() {
            stub = transformer.transform(name, stub);
            if stub.as_ref().type_id() != declared.id {
                return Err(InjectError::Internal {
                    member: member.to_string(),
                    name: name.to_owned(),
                    detail: format!("a transformer changed the stub type, expected {}", declared.name),
                });
            }
        }
        Ok(stub)
    }

    /// Lazy getter for the channel factory. Memoized after the first
    /// successful resolution.
    fn channel_factory(&self) -> Result<Arc<dyn ChannelFactory>, InjectError> {
        if let Some(factory) = self.channel_factory.get() {
            return Ok(factory.clone());
        }
        let factory = self
            .registry
            .get_one::<dyn ChannelFactory>()
            .map_err(|source| InjectError::MissingChannelFactory { source })?;
        Ok(self.channel_factory.get_or_init(|| factory).clone())
    }

    /// Lazy getter for the stub transformers, in registration order.
    fn stub_transformers(&self) -> Arc<[Arc<dyn StubTransformer>]> {
        self.stub_transformers
            .get_or_init(|| self.registry.get_all::<dyn StubTransformer>().into())
            .clone()
    }
}
