//! Credentials attached to every API request
//!
//! Acquiring and refreshing tokens is the owning application's job; this
//! crate only reads whatever the current values are.

/// Supplies the bearer token and client identifier for requests
pub trait Credentials: Send + Sync {
    /// OAuth access token, sent as `Authorization: Bearer <token>`
    fn token(&self) -> String;

    /// Application client identifier, sent as `Client-Id`
    fn client_id(&self) -> String;
}

/// Fixed credentials, e.g. from the command line or environment
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    token: String,
    client_id: String,
}

impl StaticCredentials {
    pub fn new(token: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            client_id: client_id.into(),
        }
    }
}

impl Credentials for StaticCredentials {
    fn token(&self) -> String {
        self.token.clone()
    }

    fn client_id(&self) -> String {
        self.client_id.clone()
    }
}

/// Headers carrying the credentials
pub(crate) fn auth_headers(credentials: &dyn Credentials) -> Vec<(String, String)> {
    vec![
        (
            "Authorization".to_string(),
            format!("Bearer {}", credentials.token()),
        ),
        ("Client-Id".to_string(), credentials.client_id()),
    ]
}
