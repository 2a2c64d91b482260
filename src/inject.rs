//! Injection markers and points.
//!
//! Runtime reflection is re-architected as explicit, startup-time
//! registration: a component type implements [`GrpcClientBean`] and returns
//! the list of its injection points, each pairing a member descriptor with a
//! [`GrpcClient`] configuration and an assigner for the declared target type.

use std::any::{self, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::error::InjectError;
use crate::interceptor::ClientInterceptor;
use crate::transformer::BoxedStub;

/// Configuration for one injected client: the logical channel name plus the
/// interceptors to attach. Immutable once built.
#[derive(Debug, Clone)]
pub struct GrpcClient {
    name: Arc<str>,
    interceptor_types: Vec<TypeRef>,
    interceptor_names: Vec<Arc<str>>,
}

/// A by-type interceptor reference: the concrete type for registry resolution
/// and a constructor for the direct-construction fallback.
#[derive(Clone)]
pub(crate) struct TypeRef {
    pub(crate) type_name: &'static str,
    pub(crate) type_id: TypeId,
    pub(crate) construct: Arc<dyn Fn() -> anyhow::Result<Arc<dyn ClientInterceptor>> + Send + Sync>,
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

impl GrpcClient {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            interceptor_types: Vec::new(),
            interceptor_names: Vec::new(),
        }
    }

    /// The logical channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reference an interceptor by type. Resolved from the registry when any
    /// interceptor is registered there, default-constructed otherwise.
    #[must_use]
    pub fn interceptor<I>(mut self) -> Self
    where
        I: ClientInterceptor + Default,
    {
        self.interceptor_types.push(TypeRef {
            type_name: any::type_name::<I>(),
            type_id: TypeId::of::<I>(),
            construct: Arc::new(|| Ok(Arc::new(I::default()) as Arc<dyn ClientInterceptor>)),
        });
        self
    }

    /// Reference an interceptor by type with a fallible constructor for the
    /// direct-construction fallback.
    #[must_use]
    pub fn interceptor_with<I, F>(mut self, construct: F) -> Self
    where
        I: ClientInterceptor,
        F: Fn() -> anyhow::Result<I> + Send + Sync + 'static,
    {
        self.interceptor_types.push(TypeRef {
            type_name: any::type_name::<I>(),
            type_id: TypeId::of::<I>(),
            construct: Arc::new(move || Ok(Arc::new(construct()?) as Arc<dyn ClientInterceptor>)),
        });
        self
    }

    /// Reference an interceptor registered under a name.
    #[must_use]
    pub fn interceptor_named(mut self, name: impl Into<Arc<str>>) -> Self {
        self.interceptor_names.push(name.into());
        self
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        self.name.clone()
    }

    pub(crate) fn type_refs(&self) -> &[TypeRef] {
        &self.interceptor_types
    }

    pub(crate) fn name_refs(&self) -> &[Arc<str>] {
        &self.interceptor_names
    }
}

/// The member a value is injected into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Member {
    Field { name: &'static str },
    /// A setter method; `params` is its declared parameter count. The injector
    /// rejects any count other than one before doing any channel work.
    Method { name: &'static str, params: usize },
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Field { name } => write!(f, "field `{name}`"),
            Member::Method { name, .. } => write!(f, "method `{name}`"),
        }
    }
}

/// Runtime token for the declared type of an injection target.
#[derive(Debug, Clone, Copy)]
pub struct TypeToken {
    pub(crate) id: TypeId,
    pub(crate) name: &'static str,
}

impl TypeToken {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: any::type_name::<T>(),
        }
    }
}

/// Writes a computed value into a component. Receives the bean and the
/// type-erased value; a downcast failure is an internal error.
pub type Assigner<B> = Box<dyn Fn(&mut B, BoxedStub) -> Result<(), InjectError> + Send + Sync>;

/// One injection point of a component type: member descriptor, client
/// configuration, declared target type, and the assigner.
pub struct InjectionPoint<B> {
    pub(crate) member: Member,
    pub(crate) client: GrpcClient,
    pub(crate) declared: TypeToken,
    pub(crate) assign: Assigner<B>,
}

impl<B> InjectionPoint<B> {
    /// A field-style point: the value is assigned directly.
    pub fn field<T, F>(name: &'static str, client: GrpcClient, assign: F) -> Self
    where
        T: Send + 'static,
        F: Fn(&mut B, T) + Send + Sync + 'static,
    {
        Self::typed(Member::Field { name }, client, assign)
    }

    /// A setter-style point. Single-argument by construction; descriptors with
    /// other arities can only come through [`InjectionPoint::from_descriptor`].
    pub fn setter<T, F>(name: &'static str, client: GrpcClient, assign: F) -> Self
    where
        T: Send + 'static,
        F: Fn(&mut B, T) + Send + Sync + 'static,
    {
        Self::typed(Member::Method { name, params: 1 }, client, assign)
    }

    fn typed<T, F>(member: Member, client: GrpcClient, assign: F) -> Self
    where
        T: Send + 'static,
        F: Fn(&mut B, T) + Send + Sync + 'static,
    {
        let channel_name = client.name_arc();
        let assigner: Assigner<B> = Box::new(move |bean, value| match value.downcast::<T>() {
            Ok(value) => {
                assign(bean, *value);
                Ok(())
            }
            Err(_) => Err(InjectError::Internal {
                member: member.to_string(),
                name: channel_name.to_string(),
                detail: format!(
                    "computed value does not match declared type {}",
                    any::type_name::<T>()
                ),
            }),
        });
        Self::from_descriptor(member, client, TypeToken::of::<T>(), assigner)
    }

    /// Raw registration door for metadata- or codegen-driven producers. The
    /// injector validates the member descriptor (e.g. setter arity) at
    /// processing time, before any channel is created.
    pub fn from_descriptor(
        member: Member,
        client: GrpcClient,
        declared: TypeToken,
        assign: Assigner<B>,
    ) -> Self {
        Self {
            member,
            client,
            declared,
            assign,
        }
    }

    pub fn member(&self) -> Member {
        self.member
    }

    pub fn client(&self) -> &GrpcClient {
        &self.client
    }
}

/// A component type with gRPC client injection points.
///
/// There is no inheritance to scan: a type that embeds other injectable parts
/// concatenates their point lists (mapping the assigners through the embedding
/// accessor) in its own `injection_points`.
pub trait GrpcClientBean: Sized {
    fn injection_points() -> Vec<InjectionPoint<Self>>;
}
