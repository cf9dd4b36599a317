//! Scripted transport for unit tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::transport::{Transport, TransportError, TransportRequest, TransportResponse};

/// What the fake transport does for one request
#[derive(Debug, Clone)]
pub enum Reply {
    Respond(u16, String),
    Fail(TransportError),
    /// Responds with 200 and the body after sleeping
    Slow(Duration, String),
}

/// Records requests and replays scripted replies in order
///
/// Once the script runs out, every request gets `{"data":[]}`.
#[derive(Default)]
pub struct FakeTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<TransportRequest>>,
    in_flight: Arc<AtomicUsize>,
}

/// Decrements the in-flight counter when the send future finishes or is dropped
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FakeTransport {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().clone()
    }

    /// Requests currently awaiting a reply
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        self.requests.lock().push(request);
        let reply = self
            .replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Reply::Respond(200, r#"{"data":[]}"#.to_string()));

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let _guard = InFlight(self.in_flight.clone());

        match reply {
            Reply::Respond(status, body) => Ok(TransportResponse { status, body }),
            Reply::Fail(error) => Err(error),
            Reply::Slow(delay, body) => {
                tokio::time::sleep(delay).await;
                Ok(TransportResponse { status: 200, body })
            }
        }
    }
}

/// A `/channels` response body holding one record
pub fn channel_body(id: &str, title: &str) -> String {
    serde_json::json!({
        "data": [{
            "broadcaster_id": id,
            "broadcaster_login": format!("user{id}"),
            "broadcaster_name": format!("User{id}"),
            "broadcaster_language": "en",
            "game_id": "509670",
            "game_name": "Science & Technology",
            "title": title,
            "delay": 0,
            "tags": []
        }]
    })
    .to_string()
}
