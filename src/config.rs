//! Per-channel transport properties.
//!
//! Maps a logical channel name to its addresses and transport knobs. The host
//! application deserializes this from its own configuration source; unknown
//! channel names fall back to the `default` entry.

use serde::Deserialize;
use std::{collections::HashMap, time::Duration};

const DEFAULT_ADDRESS: &str = "http://127.0.0.1:9090";

/// Transport settings for one logical channel.
///
/// Timeout and keepalive defaults follow the production client stack:
/// 10s connect timeout, 30s per-RPC timeout, 30s TCP and HTTP/2 keepalive,
/// 10s keepalive timeout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChannelProperties {
    /// Target addresses, e.g. `http://billing.internal:9090`. More than one
    /// address enables tonic's round-robin balancing.
    pub addresses: Vec<String>,

    pub connect_timeout_ms: u64,
    pub rpc_timeout_ms: u64,
    pub tcp_keepalive_secs: u64,
    pub http2_keepalive_interval_secs: u64,
    pub keepalive_timeout_secs: u64,
}

impl Default for ChannelProperties {
    fn default() -> Self {
        Self {
            addresses: vec![DEFAULT_ADDRESS.to_owned()],
            connect_timeout_ms: 10_000,
            rpc_timeout_ms: 30_000,
            tcp_keepalive_secs: 30,
            http2_keepalive_interval_secs: 30,
            keepalive_timeout_secs: 10,
        }
    }
}

impl ChannelProperties {
    /// Replace the address list.
    #[must_use]
    pub fn with_addresses<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.addresses = addresses.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn with_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    pub fn tcp_keepalive(&self) -> Duration {
        Duration::from_secs(self.tcp_keepalive_secs)
    }

    pub fn http2_keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.http2_keepalive_interval_secs)
    }

    pub fn keepalive_timeout(&self) -> Duration {
        Duration::from_secs(self.keepalive_timeout_secs)
    }
}

/// Properties for all configured channels plus the fallback entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChannelsProperties {
    /// Fallback used for channel names without an explicit entry.
    pub default: ChannelProperties,

    /// Per-name overrides, keyed by logical channel name.
    pub channels: HashMap<String, ChannelProperties>,
}

impl ChannelsProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Properties for `name`, falling back to the default entry.
    pub fn channel(&self, name: &str) -> &ChannelProperties {
        self.channels.get(name).unwrap_or(&self.default)
    }

    #[must_use]
    pub fn with_channel(mut self, name: impl Into<String>, properties: ChannelProperties) -> Self {
        self.channels.insert(name.into(), properties);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let props = ChannelProperties::default();
        assert_eq!(props.addresses, vec![DEFAULT_ADDRESS.to_owned()]);
        assert_eq!(props.connect_timeout(), Duration::from_secs(10));
        assert_eq!(props.rpc_timeout(), Duration::from_secs(30));
        assert_eq!(props.tcp_keepalive(), Duration::from_secs(30));
        assert_eq!(props.http2_keepalive_interval(), Duration::from_secs(30));
        assert_eq!(props.keepalive_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn deserializes_with_partial_overrides() {
        let value = serde_json::json!({
            "channels": {
                "billing": {
                    "addresses": ["http://billing-1:9090", "http://billing-2:9090"],
                    "rpc_timeout_ms": 5000
                }
            }
        });
        let props: ChannelsProperties = serde_json::from_value(value).unwrap();

        let billing = props.channel("billing");
        assert_eq!(billing.addresses.len(), 2);
        assert_eq!(billing.rpc_timeout(), Duration::from_secs(5));
        // unspecified fields keep defaults
        assert_eq!(billing.connect_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn unknown_names_fall_back_to_default() {
        let props = ChannelsProperties::new().with_channel(
            "known",
            ChannelProperties::default().with_addresses(["http://known:9090"]),
        );

        assert_eq!(props.channel("known").addresses, vec!["http://known:9090"]);
        assert_eq!(
            props.channel("unknown").addresses,
            vec![DEFAULT_ADDRESS.to_owned()]
        );
    }

    #[test]
    fn builders_update_timeouts() {
        let props = ChannelProperties::default()
            .with_connect_timeout(Duration::from_secs(3))
            .with_rpc_timeout(Duration::from_secs(7));
        assert_eq!(props.connect_timeout(), Duration::from_secs(3));
        assert_eq!(props.rpc_timeout(), Duration::from_secs(7));
    }
}
