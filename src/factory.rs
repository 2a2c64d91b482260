//! Channel factories.
//!
//! The [`ChannelFactory`] capability maps a logical name plus the resolved
//! interceptor list to a live [`GrpcChannel`]. The default
//! [`AddressChannelFactory`] builds channels from statically configured
//! address lists; transport behavior (balancing, reconnects) is tonic's.

use anyhow::Context;
use std::sync::Arc;
use tonic::transport::{Channel, Endpoint};

use crate::channel::GrpcChannel;
use crate::config::{ChannelProperties, ChannelsProperties};
use crate::interceptor::{ClientInterceptor, GlobalInterceptorRegistry};

/// Produces a channel for a logical service name.
///
/// `interceptors` is the list resolved from the injection point; the factory
/// is responsible for applying global interceptors in addition. Construction
/// must be non-blocking; failures are fatal for the injection pass.
pub trait ChannelFactory: Send + Sync + 'static {
    fn create_channel(
        &self,
        name: &str,
        interceptors: Vec<Arc<dyn ClientInterceptor>>,
    ) -> anyhow::Result<GrpcChannel>;
}

/// Builds a tonic `Endpoint` with the configured timeouts and keepalive stack.
fn build_endpoint(
    address: &str,
    props: &ChannelProperties,
) -> Result<Endpoint, tonic::transport::Error> {
    let endpoint = Endpoint::from_shared(address.to_owned())?
        .connect_timeout(props.connect_timeout())
        .timeout(props.rpc_timeout())
        .tcp_keepalive(Some(props.tcp_keepalive()))
        .http2_keep_alive_interval(props.http2_keepalive_interval())
        .keep_alive_timeout(props.keepalive_timeout())
        .keep_alive_while_idle(true);

    Ok(endpoint)
}

/// Default factory: resolves names through [`ChannelsProperties`] and connects
/// lazily. A single address yields a plain channel; multiple addresses use
/// tonic's round-robin `balance_list`.
///
/// Must be called inside a tokio runtime: tonic spawns the channel's buffer
/// worker at construction, even for lazy connections.
pub struct AddressChannelFactory {
    properties: ChannelsProperties,
    global_interceptors: Arc<GlobalInterceptorRegistry>,
}

impl AddressChannelFactory {
    pub fn new(
        properties: ChannelsProperties,
        global_interceptors: Arc<GlobalInterceptorRegistry>,
    ) -> Self {
        Self {
            properties,
            global_interceptors,
        }
    }
}

impl ChannelFactory for AddressChannelFactory {
    fn create_channel(
        &self,
        name: &str,
        interceptors: Vec<Arc<dyn ClientInterceptor>>,
    ) -> anyhow::Result<GrpcChannel> {
        let props = self.properties.channel(name);
        anyhow::ensure!(
            !props.addresses.is_empty(),
            "no addresses configured for channel '{name}'"
        );

        let mut endpoints = Vec::with_capacity(props.addresses.len());
        for address in &props.addresses {
            let endpoint = build_endpoint(address, props)
                .with_context(|| format!("invalid address '{address}' for channel '{name}'"))?;
            endpoints.push(endpoint);
        }
        let transport = if endpoints.len() == 1 {
            endpoints[0].connect_lazy()
        } else {
            Channel::balance_list(endpoints.into_iter())
        };

        let mut all = self.global_interceptors.interceptors();
        let global = all.len();
        all.extend(interceptors);

        tracing::debug!(
            channel = name,
            addresses = props.addresses.len(),
            global_interceptors = global,
            interceptors = all.len(),
            "created grpc channel"
        );

        Ok(GrpcChannel::new(name, transport, all))
    }
}
