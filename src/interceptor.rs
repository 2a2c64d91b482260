//! Client interceptor capability and resolution.
//!
//! Interceptors are behavior decorators applied to a channel at construction
//! time. This module defines the capability trait, the chain adapter that
//! plugs into tonic's `with_interceptor`, the process-wide registry of global
//! interceptors (applied by the channel factory, not by the resolver), and the
//! resolution of the references declared on a [`GrpcClient`] marker.

use parking_lot::RwLock;
use std::any::Any;
use std::sync::Arc;
use tonic::{Request, Status};

use crate::error::InjectError;
use crate::inject::{GrpcClient, Member};
use crate::registry::ComponentRegistry;

/// A behavior decorator for outgoing requests on an injected channel.
///
/// Implementations see the request metadata and extensions (never the message)
/// and may mutate or reject the request. `as_any` enables by-concrete-type
/// resolution from the [`ComponentRegistry`].
pub trait ClientInterceptor: Send + Sync + 'static {
    fn intercept(&self, request: Request<()>) -> Result<Request<()>, Status>;

    fn as_any(&self) -> &dyn Any;
}

/// Runs `request` metadata and extensions through `interceptors` in order,
/// leaving the message untouched.
pub(crate) fn run_chain<T>(
    interceptors: &[Arc<dyn ClientInterceptor>],
    request: Request<T>,
) -> Result<Request<T>, Status> {
    let (metadata, extensions, message) = request.into_parts();
    let mut probe = Request::from_parts(metadata, extensions, ());
    for interceptor in interceptors {
        probe = interceptor.intercept(probe)?;
    }
    let (metadata, extensions, ()) = probe.into_parts();
    Ok(Request::from_parts(metadata, extensions, message))
}

/// An ordered interceptor chain usable wherever tonic expects an
/// [`tonic::service::Interceptor`], e.g. `MyClient::with_interceptor`.
#[derive(Clone)]
pub struct InterceptorChain(Arc<[Arc<dyn ClientInterceptor>]>);

impl InterceptorChain {
    pub(crate) fn new(interceptors: Arc<[Arc<dyn ClientInterceptor>]>) -> Self {
        Self(interceptors)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl tonic::service::Interceptor for InterceptorChain {
    fn call(&mut self, request: Request<()>) -> Result<Request<()>, Status> {
        run_chain(&self.0, request)
    }
}

/// Process-wide interceptors applied by the channel factory to every channel,
/// in registration order. Per-injection-point interceptors are appended after
/// these by the factory.
#[derive(Default)]
pub struct GlobalInterceptorRegistry {
    interceptors: RwLock<Vec<Arc<dyn ClientInterceptor>>>,
}

impl GlobalInterceptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, interceptor: Arc<dyn ClientInterceptor>) {
        self.interceptors.write().push(interceptor);
    }

    /// Snapshot of the registered interceptors, in registration order.
    pub fn interceptors(&self) -> Vec<Arc<dyn ClientInterceptor>> {
        self.interceptors.read().clone()
    }
}

/// Resolves the interceptors declared on a [`GrpcClient`] marker.
///
/// By-type references come first, then by-name references; declaration order is
/// preserved within each group. By-type references are resolved from the
/// registry whenever *any* interceptor is registered under the capability;
/// only a fully empty registry falls back to direct construction. Global
/// interceptors are not handled here, the channel factory applies them.
pub(crate) fn resolve_interceptors(
    registry: &ComponentRegistry,
    client: &GrpcClient,
    member: Member,
) -> Result<Vec<Arc<dyn ClientInterceptor>>, InjectError> {
    let type_refs = client.type_refs();
    let name_refs = client.name_refs();
    let mut resolved = Vec::with_capacity(type_refs.len() + name_refs.len());

    let managed = registry.get_all::<dyn ClientInterceptor>();
    for type_ref in type_refs {
        if managed.is_empty() {
            let interceptor =
                (type_ref.construct)().map_err(|source| InjectError::InterceptorCreation {
                    member: member.to_string(),
                    reference: type_ref.type_name.to_owned(),
                    source,
                })?;
            resolved.push(interceptor);
        } else {
            let interceptor = managed
                .iter()
                .find(|i| i.as_any().type_id() == type_ref.type_id)
                .cloned()
                .ok_or_else(|| InjectError::UnresolvedInterceptor {
                    member: member.to_string(),
                    reference: type_ref.type_name.to_owned(),
                    source: None,
                })?;
            resolved.push(interceptor);
        }
    }
    for name in name_refs {
        let interceptor = registry
            .get_named::<dyn ClientInterceptor>(name)
            .map_err(|source| InjectError::UnresolvedInterceptor {
                member: member.to_string(),
                reference: format!("'{name}'"),
                source: Some(source),
            })?;
        resolved.push(interceptor);
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::metadata::MetadataValue;

    struct Tag(&'static str);

    impl Tag {
        fn arc(tag: &'static str) -> Arc<dyn ClientInterceptor> {
            Arc::new(Tag(tag))
        }
    }

    impl ClientInterceptor for Tag {
        fn intercept(&self, mut request: Request<()>) -> Result<Request<()>, Status> {
            request
                .metadata_mut()
                .append("x-tag", MetadataValue::from_static(self.0));
            Ok(request)
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn chain_runs_in_order_and_preserves_message() {
        let chain: Vec<Arc<dyn ClientInterceptor>> = vec![Tag::arc("one"), Tag::arc("two")];
        let request = Request::new(42u32);

        let out = run_chain(&chain, request).unwrap();
        let tags: Vec<_> = out.metadata().get_all("x-tag").iter().collect();
        assert_eq!(tags, vec!["one", "two"], "interceptors must run in order");
        assert_eq!(*out.get_ref(), 42, "message must pass through untouched");
    }

    #[test]
    fn chain_propagates_rejection() {
        struct Deny;
        impl ClientInterceptor for Deny {
            fn intercept(&self, _request: Request<()>) -> Result<Request<()>, Status> {
                Err(Status::permission_denied("nope"))
            }
            fn as_any(&self) -> &dyn Any {
                self
            }
        }

        let chain: Vec<Arc<dyn ClientInterceptor>> = vec![Arc::new(Deny), Tag::arc("late")];
        let err = run_chain(&chain, Request::new(())).unwrap_err();
        assert_eq!(err.code(), tonic::Code::PermissionDenied);
    }

    #[test]
    fn global_registry_keeps_registration_order() {
        let registry = GlobalInterceptorRegistry::new();
        registry.add(Tag::arc("a"));
        registry.add(Tag::arc("b"));

        let snapshot = registry.interceptors();
        assert_eq!(snapshot.len(), 2);

        let out = run_chain(&snapshot, Request::new(())).unwrap();
        let tags: Vec<_> = out.metadata().get_all("x-tag").iter().collect();
        assert_eq!(tags, vec!["a", "b"]);
    }
}
