//! The injectable channel handle.

use std::fmt;
use std::sync::Arc;
use tonic::service::interceptor::InterceptedService;
use tonic::transport::Channel;
use tonic::{Request, Status};

use crate::interceptor::{run_chain, ClientInterceptor, InterceptorChain};

/// A named communication handle: a tonic transport [`Channel`] plus the
/// interceptors resolved for it at construction time.
///
/// Cheap to clone; clones share the underlying transport and interceptor list.
/// The interceptors are carried here so that the external RPC runtime applies
/// them — typically via [`GrpcChannel::intercepted`] or by passing
/// [`GrpcChannel::interceptor_chain`] to a generated client's
/// `with_interceptor` constructor.
#[derive(Clone)]
pub struct GrpcChannel {
    name: Arc<str>,
    transport: Channel,
    interceptors: Arc<[Arc<dyn ClientInterceptor>]>,
}

impl GrpcChannel {
    pub fn new(
        name: impl Into<Arc<str>>,
        transport: Channel,
        interceptors: Vec<Arc<dyn ClientInterceptor>>,
    ) -> Self {
        Self {
            name: name.into(),
            transport,
            interceptors: interceptors.into(),
        }
    }

    /// The logical name this channel was created for.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The underlying tonic transport.
    pub fn transport(&self) -> &Channel {
        &self.transport
    }

    /// The interceptors attached to this channel, in application order
    /// (global interceptors first, then per-injection-point ones).
    pub fn interceptors(&self) -> &[Arc<dyn ClientInterceptor>] {
        &self.interceptors
    }

    /// The interceptors as a single tonic [`tonic::service::Interceptor`].
    pub fn interceptor_chain(&self) -> InterceptorChain {
        InterceptorChain::new(self.interceptors.clone())
    }

    /// The transport wrapped with this channel's interceptor chain, ready to
    /// back a generated client.
    pub fn intercepted(&self) -> InterceptedService<Channel, InterceptorChain> {
        InterceptedService::new(self.transport.clone(), self.interceptor_chain())
    }

    /// Runs a request through the interceptor chain without sending it.
    pub fn intercept<T>(&self, request: Request<T>) -> Result<Request<T>, Status> {
        run_chain(&self.interceptors, request)
    }
}

impl fmt::Debug for GrpcChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrpcChannel")
            .field("name", &self.name)
            .field("interceptors", &self.interceptors.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;
    use tonic::metadata::MetadataValue;
    use tonic::transport::Endpoint;

    struct Stamp;
    impl ClientInterceptor for Stamp {
        fn intercept(&self, mut request: Request<()>) -> Result<Request<()>, Status> {
            request
                .metadata_mut()
                .insert("x-stamp", MetadataValue::from_static("yes"));
            Ok(request)
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[tokio::test]
    async fn clones_share_transport_and_interceptors() {
        let transport = Endpoint::from_static("http://127.0.0.1:50051").connect_lazy();
        let channel = GrpcChannel::new("echo", transport, vec![Arc::new(Stamp)]);

        let clone = channel.clone();
        assert_eq!(clone.name(), "echo");
        assert_eq!(clone.interceptors().len(), 1);
        assert!(
            std::ptr::eq(
                channel.interceptors().as_ptr(),
                clone.interceptors().as_ptr()
            ),
            "clones must share the interceptor list"
        );
    }

    #[tokio::test]
    async fn intercept_applies_chain_to_request() {
        let transport = Endpoint::from_static("http://127.0.0.1:50051").connect_lazy();
        let channel = GrpcChannel::new("echo", transport, vec![Arc::new(Stamp)]);

        let out = channel.intercept(Request::new("payload")).unwrap();
        assert_eq!(out.metadata().get("x-stamp").unwrap(), "yes");
        assert_eq!(*out.get_ref(), "payload");
    }
}
