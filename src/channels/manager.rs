//! Channel lookups and updates against the Helix `/channels` endpoint
//!
//! Lookups are served from the channel cache when possible and fall back to a
//! network fetch bounded by [`REQUEST_DEADLINE`]. Updates always go to the
//! network and leave the cache untouched.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{Channel, ModifyChannel};
use crate::auth::{auth_headers, Credentials};
use crate::cache::{CacheManager, SweepHandle};
use crate::config::ClientOptions;
use crate::error::ChannelError;
use crate::transport::{
    send_with_deadline, Method, Transport, TransportError, TransportRequest, TransportResponse,
    REQUEST_DEADLINE,
};

/// Response envelope of the `/channels` endpoint
#[derive(Debug, Deserialize)]
struct ChannelsResponse {
    data: Option<Vec<serde_json::Value>>,
}

/// Caches channels and fetches or modifies them remotely
pub struct ChannelManager {
    cache: CacheManager<Channel>,
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn Credentials>,
    base_url: String,
    suppress_rejections: bool,
}

impl ChannelManager {
    pub fn new(
        options: &ClientOptions,
        credentials: Arc<dyn Credentials>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            cache: CacheManager::new(options.channel_cache_config()),
            transport,
            credentials,
            base_url: options.base_url.trim_end_matches('/').to_string(),
            suppress_rejections: options.suppress_rejections,
        }
    }

    /// The underlying cache, for reads, enumeration and manual writes
    pub fn cache(&self) -> &CacheManager<Channel> {
        &self.cache
    }

    /// Returns a cached channel without touching the network
    pub fn get(&self, id: &str) -> Option<Arc<Channel>> {
        self.cache.get(id)
    }

    pub fn has(&self, id: &str) -> bool {
        self.cache.has(id)
    }

    /// Starts the background expiry sweep for the channel cache
    pub fn spawn_sweeper(&self) -> Option<SweepHandle> {
        self.cache.spawn_sweeper()
    }

    /// Fetches a channel, using the cache unless `force` is set
    ///
    /// # Returns
    /// * `Ok(Some(channel))` - From the cache, or freshly fetched and cached
    /// * `Ok(None)` - No such channel, or the request failed while rejections
    ///   are suppressed
    /// * `Err(ChannelError::Aborted)` - No response within the deadline
    /// * `Err(ChannelError::RequestFailed)` - Error status, unreadable body or
    ///   transport failure
    pub async fn fetch(&self, id: &str, force: bool) -> Result<Option<Arc<Channel>>, ChannelError> {
        if !force {
            if let Some(channel) = self.cache.get(id) {
                debug!(id, "channel cache hit");
                return Ok(Some(channel));
            }
        }

        debug!(id, force, "fetching channel");
        match self.request_channel(id).await {
            Ok(Some(channel)) => Ok(Some(self.cache.insert_fetched(channel))),
            Ok(None) => {
                debug!(id, "channel not found");
                Ok(None)
            }
            Err(error) => self.reject(id, error),
        }
    }

    /// Sends a partial update for a channel
    ///
    /// Returns the raw response whatever its status. Fails with
    /// `InvalidArguments` before any request is made when `options` sets no
    /// field. The cache is not updated; call `fetch(id, true)` to pick up the
    /// change.
    pub async fn modify(
        &self,
        id: &str,
        options: &ModifyChannel,
    ) -> Result<Option<TransportResponse>, ChannelError> {
        let payload = options.to_payload()?;

        let mut request = TransportRequest::new(Method::Patch, self.channel_url(id))
            .header("Content-Type", "application/json")
            .body(payload);
        request.headers.extend(auth_headers(self.credentials.as_ref()));

        debug!(id, "modifying channel");
        match send_with_deadline(self.transport.as_ref(), request, REQUEST_DEADLINE).await {
            Ok(response) => {
                debug!(id, status = response.status, "channel modify response");
                Ok(Some(response))
            }
            Err(TransportError::Timeout) => self.reject(
                id,
                ChannelError::Aborted("request to modify channel was aborted".to_string()),
            ),
            Err(TransportError::Failed(reason)) => {
                debug!(id, %reason, "channel modify transport failure");
                self.reject(
                    id,
                    ChannelError::RequestFailed("failed to modify the channel".to_string()),
                )
            }
        }
    }

    /// Performs one bounded fetch; `Ok(None)` means no matching record
    async fn request_channel(&self, id: &str) -> Result<Option<Channel>, ChannelError> {
        let mut request = TransportRequest::new(Method::Get, self.channel_url(id));
        request.headers.extend(auth_headers(self.credentials.as_ref()));

        let response = send_with_deadline(self.transport.as_ref(), request, REQUEST_DEADLINE)
            .await
            .map_err(|error| match error {
                TransportError::Timeout => {
                    ChannelError::Aborted("request to fetch channel was aborted".to_string())
                }
                TransportError::Failed(reason) => {
                    debug!(id, %reason, "channel fetch transport failure");
                    ChannelError::RequestFailed("failed to fetch channel".to_string())
                }
            })?;

        let envelope: ChannelsResponse = serde_json::from_str(&response.body).map_err(|_| {
            ChannelError::RequestFailed(format!(
                "failed to fetch channel: unreadable response (status {})",
                response.status
            ))
        })?;

        let Some(data) = envelope.data else {
            return Err(ChannelError::RequestFailed(format!(
                "unable to fetch channel (status {})",
                response.status
            )));
        };

        let Some(record) = data.into_iter().next().filter(|record| !record.is_null()) else {
            return Ok(None);
        };

        if !response.is_success() {
            return Err(ChannelError::RequestFailed(format!(
                "unable to fetch channel (status {})",
                response.status
            )));
        }

        let channel: Channel = serde_json::from_value(record).map_err(|e| {
            ChannelError::RequestFailed(format!("failed to fetch channel: invalid record: {}", e))
        })?;
        Ok(Some(channel))
    }

    /// Applies the suppress-rejections option to a request failure
    fn reject<T>(&self, id: &str, error: ChannelError) -> Result<Option<T>, ChannelError> {
        if self.suppress_rejections && error.is_suppressible() {
            warn!(id, %error, "suppressed channel request failure");
            Ok(None)
        } else {
            Err(error)
        }
    }

    fn channel_url(&self, id: &str) -> String {
        format!(
            "{}/channels?broadcaster_id={}",
            self.base_url,
            urlencoding::encode(id)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticCredentials;
    use crate::testing::{channel_body, FakeTransport, Reply};
    use std::time::Duration;

    fn manager_with(transport: Arc<FakeTransport>, suppress_rejections: bool) -> ChannelManager {
        let options = ClientOptions {
            client_id: "cid".to_string(),
            base_url: "https://api.example.test/helix/".to_string(),
            suppress_rejections,
            ..Default::default()
        };
        ChannelManager::new(
            &options,
            Arc::new(StaticCredentials::new("tok", "cid")),
            transport,
        )
    }

    #[tokio::test]
    async fn test_fetch_decodes_and_caches() {
        let transport = FakeTransport::new(vec![Reply::Respond(200, channel_body("42", "Hello"))]);
        let manager = manager_with(transport.clone(), false);

        let channel = manager.fetch("42", false).await.unwrap().expect("channel");

        assert_eq!(channel.title, "Hello");
        assert!(manager.has("42"));
        assert_eq!(manager.get("42").unwrap().broadcaster_id, "42");
    }

    #[tokio::test]
    async fn test_fetch_builds_authorized_get_request() {
        let transport = FakeTransport::new(vec![Reply::Respond(200, channel_body("42", "Hello"))]);
        let manager = manager_with(transport.clone(), false);

        manager.fetch("42", false).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.method, Method::Get);
        assert_eq!(
            request.url,
            "https://api.example.test/helix/channels?broadcaster_id=42"
        );
        assert_eq!(request.header_value("authorization"), Some("Bearer tok"));
        assert_eq!(request.header_value("client-id"), Some("cid"));
        assert!(request.body.is_none());
    }

    #[tokio::test]
    async fn test_fetch_encodes_identifier() {
        let transport = FakeTransport::new(vec![]);
        let manager = manager_with(transport.clone(), false);

        manager.fetch("a b&c", false).await.unwrap();

        assert!(transport.requests()[0]
            .url
            .ends_with("broadcaster_id=a%20b%26c"));
    }

    #[tokio::test]
    async fn test_second_fetch_is_served_from_cache() {
        let transport = FakeTransport::new(vec![Reply::Respond(200, channel_body("42", "Hello"))]);
        let manager = manager_with(transport.clone(), false);

        let first = manager.fetch("42", false).await.unwrap().unwrap();
        let second = manager.fetch("42", false).await.unwrap().unwrap();

        assert_eq!(transport.calls(), 1, "Second fetch should not hit the network");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_forced_fetch_hits_network_and_replaces_entry() {
        let transport = FakeTransport::new(vec![
            Reply::Respond(200, channel_body("42", "Old")),
            Reply::Respond(200, channel_body("42", "New")),
        ]);
        let manager = manager_with(transport.clone(), false);

        manager.fetch("42", false).await.unwrap();
        assert!(manager.has("42"));
        let inserted_at = manager.cache().entry_metadata("42").unwrap().inserted_at;

        let refreshed = manager.fetch("42", true).await.unwrap().unwrap();

        assert_eq!(transport.calls(), 2);
        assert_eq!(refreshed.title, "New");
        assert_eq!(manager.get("42").unwrap().title, "New");
        let metadata = manager.cache().entry_metadata("42").unwrap();
        assert_eq!(metadata.inserted_at, inserted_at);
        assert!(metadata.last_refreshed_at >= metadata.inserted_at);
    }

    #[tokio::test]
    async fn test_empty_data_is_not_found_even_without_suppression() {
        let transport = FakeTransport::new(vec![Reply::Respond(200, r#"{"data":[]}"#.to_string())]);
        let manager = manager_with(transport, false);

        let result = manager.fetch("404", false).await;

        assert_eq!(result, Ok(None));
        assert!(!manager.has("404"));
    }

    #[tokio::test]
    async fn test_empty_data_with_error_status_is_not_found() {
        let transport = FakeTransport::new(vec![Reply::Respond(500, r#"{"data":[]}"#.to_string())]);
        let manager = manager_with(transport, false);

        assert_eq!(manager.fetch("42", false).await, Ok(None));
    }

    #[tokio::test]
    async fn test_null_record_is_not_found() {
        let transport =
            FakeTransport::new(vec![Reply::Respond(200, r#"{"data":[null]}"#.to_string())]);
        let manager = manager_with(transport, false);

        assert_eq!(manager.fetch("7", false).await, Ok(None));
        assert!(!manager.has("7"));
    }

    #[tokio::test]
    async fn test_error_status_with_record_is_request_failed() {
        let transport = FakeTransport::new(vec![Reply::Respond(503, channel_body("42", "Hello"))]);
        let manager = manager_with(transport, false);

        let err = manager.fetch("42", false).await.unwrap_err();

        assert!(matches!(err, ChannelError::RequestFailed(_)));
        assert!(err.to_string().contains("unable to fetch channel"));
        assert!(!manager.has("42"));
    }

    #[tokio::test]
    async fn test_error_body_without_data_is_request_failed() {
        let body = r#"{"error":"Unauthorized","status":401,"message":"Invalid OAuth token"}"#;
        let transport = FakeTransport::new(vec![Reply::Respond(401, body.to_string())]);
        let manager = manager_with(transport, false);

        let err = manager.fetch("42", false).await.unwrap_err();

        assert!(matches!(err, ChannelError::RequestFailed(_)));
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_unreadable_body_is_request_failed() {
        let transport = FakeTransport::new(vec![Reply::Respond(200, "<html>".to_string())]);
        let manager = manager_with(transport, false);

        let err = manager.fetch("42", false).await.unwrap_err();
        assert!(matches!(err, ChannelError::RequestFailed(_)));
    }

    #[tokio::test]
    async fn test_transport_failure_is_request_failed() {
        let transport = FakeTransport::new(vec![Reply::Fail(TransportError::Failed(
            "connection reset".to_string(),
        ))]);
        let manager = manager_with(transport, false);

        let err = manager.fetch("42", false).await.unwrap_err();
        assert_eq!(
            err,
            ChannelError::RequestFailed("failed to fetch channel".to_string())
        );
    }

    #[tokio::test]
    async fn test_transport_timeout_is_aborted() {
        let transport = FakeTransport::new(vec![Reply::Fail(TransportError::Timeout)]);
        let manager = manager_with(transport, false);

        let err = manager.fetch("42", false).await.unwrap_err();
        assert!(matches!(err, ChannelError::Aborted(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_response_is_aborted_and_request_dropped() {
        let transport = FakeTransport::new(vec![Reply::Slow(
            Duration::from_millis(1500),
            channel_body("42", "Late"),
        )]);
        let manager = manager_with(transport.clone(), false);

        let started = tokio::time::Instant::now();
        let err = manager.fetch("42", false).await.unwrap_err();

        assert_eq!(
            err,
            ChannelError::Aborted("request to fetch channel was aborted".to_string())
        );
        assert!(started.elapsed() >= REQUEST_DEADLINE);
        assert!(started.elapsed() < Duration::from_millis(1500));
        assert_eq!(transport.in_flight(), 0, "In-flight request should be cancelled");
        assert!(!manager.has("42"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_response_within_deadline_succeeds() {
        let transport = FakeTransport::new(vec![Reply::Slow(
            Duration::from_millis(900),
            channel_body("42", "Just in time"),
        )]);
        let manager = manager_with(transport.clone(), false);

        let channel = manager.fetch("42", false).await.unwrap().unwrap();

        assert_eq!(channel.title, "Just in time");
        assert_eq!(transport.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_suppressed_failures_return_none() {
        let transport = FakeTransport::new(vec![
            Reply::Slow(Duration::from_secs(5), channel_body("1", "Late")),
            Reply::Respond(500, channel_body("2", "Broken")),
            Reply::Fail(TransportError::Failed("dns".to_string())),
        ]);
        let manager = manager_with(transport.clone(), true);

        assert_eq!(manager.fetch("1", false).await, Ok(None));
        assert_eq!(manager.fetch("2", false).await, Ok(None));
        assert_eq!(manager.fetch("3", false).await, Ok(None));
        assert_eq!(transport.calls(), 3);
        assert!(manager.cache().is_empty());
    }

    #[tokio::test]
    async fn test_modify_sends_wire_payload() {
        let transport = FakeTransport::new(vec![Reply::Respond(204, String::new())]);
        let manager = manager_with(transport.clone(), false);

        let response = manager
            .modify("42", &ModifyChannel::new().title("New Title"))
            .await
            .unwrap()
            .expect("response");

        assert_eq!(response.status, 204);
        let request = &transport.requests()[0];
        assert_eq!(request.method, Method::Patch);
        assert_eq!(
            request.url,
            "https://api.example.test/helix/channels?broadcaster_id=42"
        );
        assert_eq!(request.body.as_deref(), Some(r#"{"title":"New Title"}"#));
        assert_eq!(request.header_value("content-type"), Some("application/json"));
        assert_eq!(request.header_value("authorization"), Some("Bearer tok"));
        assert_eq!(request.header_value("client-id"), Some("cid"));
    }

    #[tokio::test]
    async fn test_modify_without_fields_fails_before_network() {
        let transport = FakeTransport::new(vec![]);
        let manager = manager_with(transport.clone(), true);

        let result = manager.modify("42", &ModifyChannel::new()).await;

        assert_eq!(
            result,
            Err(ChannelError::InvalidArguments(
                "no options were provided".to_string()
            ))
        );
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_modify_returns_error_statuses() {
        let transport = FakeTransport::new(vec![Reply::Respond(400, r#"{"message":"bad"}"#.to_string())]);
        let manager = manager_with(transport, false);

        let response = manager
            .modify("42", &ModifyChannel::new().delay(5))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(response.status, 400);
        assert_eq!(response.body, r#"{"message":"bad"}"#);
    }

    #[tokio::test(start_paused = true)]
    async fn test_modify_timeout_is_aborted() {
        let transport = FakeTransport::new(vec![Reply::Slow(Duration::from_secs(2), String::new())]);
        let manager = manager_with(transport.clone(), false);

        let err = manager
            .modify("42", &ModifyChannel::new().title("x"))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ChannelError::Aborted("request to modify channel was aborted".to_string())
        );
        assert_eq!(transport.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_modify_failure_respects_suppression() {
        let failing = || Reply::Fail(TransportError::Failed("refused".to_string()));

        let strict = manager_with(FakeTransport::new(vec![failing()]), false);
        assert_eq!(
            strict.modify("42", &ModifyChannel::new().title("x")).await,
            Err(ChannelError::RequestFailed(
                "failed to modify the channel".to_string()
            ))
        );

        let lenient = manager_with(FakeTransport::new(vec![failing()]), true);
        assert_eq!(
            lenient.modify("42", &ModifyChannel::new().title("x")).await,
            Ok(None)
        );
    }

    #[tokio::test]
    async fn test_modify_leaves_cache_untouched() {
        let transport = FakeTransport::new(vec![
            Reply::Respond(200, channel_body("42", "Old")),
            Reply::Respond(204, String::new()),
        ]);
        let manager = manager_with(transport, false);

        manager.fetch("42", false).await.unwrap();
        manager
            .modify("42", &ModifyChannel::new().title("New"))
            .await
            .unwrap();

        assert_eq!(manager.get("42").unwrap().title, "Old");
    }
}
