//! The client object that owns the process-wide managers

use std::sync::Arc;

use crate::auth::{Credentials, StaticCredentials};
use crate::cache::SweepHandle;
use crate::channels::ChannelManager;
use crate::config::{ClientOptions, ConfigError};
use crate::transport::{HttpTransport, Transport};

/// Entry point for API access
///
/// Options are fixed once the client is built.
pub struct Client {
    options: ClientOptions,
    channels: ChannelManager,
}

impl Client {
    /// Creates a client that talks HTTP with a fixed access token
    pub fn new(options: ClientOptions, token: impl Into<String>) -> Result<Self, ConfigError> {
        let credentials = Arc::new(StaticCredentials::new(token, options.client_id.clone()));
        Self::with_transport(options, credentials, Arc::new(HttpTransport::new()))
    }

    /// Creates a client with custom credentials and transport
    pub fn with_transport(
        options: ClientOptions,
        credentials: Arc<dyn Credentials>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ConfigError> {
        options.validate()?;
        let channels = ChannelManager::new(&options, credentials, transport);
        Ok(Self { options, channels })
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn channels(&self) -> &ChannelManager {
        &self.channels
    }

    /// Starts the background sweeps configured in the options
    ///
    /// Keep the returned handles alive for as long as sweeping should run.
    pub fn spawn_sweepers(&self) -> Vec<SweepHandle> {
        self.channels.spawn_sweeper().into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Expiry;
    use crate::config::{CacheSetting, CacheSettings};
    use crate::testing::{channel_body, FakeTransport, Reply};

    fn options() -> ClientOptions {
        ClientOptions {
            client_id: "cid".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_requires_client_id() {
        let result = Client::new(ClientOptions::default(), "tok");
        assert!(matches!(result, Err(ConfigError::MissingClientId)));
    }

    #[test]
    fn test_channel_cache_uses_resolved_options() {
        let options = ClientOptions {
            ttl: CacheSettings {
                channels: Some(CacheSetting::Enabled(false)),
            },
            ..options()
        };
        let client = Client::new(options, "tok").unwrap();

        let config = client.channels().cache().config();
        assert_eq!(config.ttl, Expiry::Never);
        assert_eq!(config.update_interval, Expiry::HOUR);
    }

    #[tokio::test]
    async fn test_client_fetches_through_its_transport() {
        let transport = FakeTransport::new(vec![Reply::Respond(200, channel_body("7", "Seven"))]);
        let client = Client::with_transport(
            options(),
            Arc::new(StaticCredentials::new("tok", "cid")),
            transport.clone(),
        )
        .unwrap();

        let channel = client.channels().fetch("7", false).await.unwrap().unwrap();

        assert_eq!(channel.title, "Seven");
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_spawn_sweepers_skips_disabled_caches() {
        let options = ClientOptions {
            update: CacheSettings {
                channels: Some(CacheSetting::Enabled(false)),
            },
            ..options()
        };
        let client = Client::new(options, "tok").unwrap();

        assert!(client.spawn_sweepers().is_empty());
    }

    #[tokio::test]
    async fn test_spawn_sweepers_with_defaults() {
        let client = Client::new(options(), "tok").unwrap();
        assert_eq!(client.spawn_sweepers().len(), 1);
    }
}
