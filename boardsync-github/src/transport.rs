//! HTTP transport for GraphQL requests.
//!
//! [`Transport`] is the seam between the client and the network: the client
//! builds payloads and interprets responses, the transport only moves JSON.

use std::time::Duration;

use serde_json::Value;

use boardsync_sync::RemoteError;

pub const GRAPHQL_URL: &str = "https://api.github.com/graphql";

const USER_AGENT: &str = concat!("boardsync/", env!("CARGO_PKG_VERSION"));

pub trait Transport {
    /// POST a GraphQL payload; return the decoded response body.
    fn post(&mut self, payload: &Value) -> Result<Value, RemoteError>;
}

/// [`Transport`] over a blocking `ureq` agent.
pub struct HttpTransport {
    agent: ureq::Agent,
    token: String,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(token: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(30))
            .build();
        Self {
            agent,
            token: token.into(),
            endpoint: GRAPHQL_URL.to_string(),
        }
    }

    /// Point at another GraphQL endpoint (GitHub Enterprise).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl Transport for HttpTransport {
    fn post(&mut self, payload: &Value) -> Result<Value, RemoteError> {
        let response = self
            .agent
            .post(&self.endpoint)
            .set("User-Agent", USER_AGENT)
            .set("Authorization", &format!("Bearer {}", self.token))
            .send_json(payload);

        match response {
            Ok(resp) => resp
                .into_json::<Value>()
                .map_err(|e| RemoteError::Transport(format!("failed to read response: {e}"))),
            Err(ureq::Error::Status(code, resp)) => {
                let rate_limited = resp.header("x-ratelimit-remaining") == Some("0")
                    || resp.header("retry-after").is_some();
                let body = resp.into_string().unwrap_or_default();
                Err(status_error(code, rate_limited, &body))
            }
            Err(ureq::Error::Transport(e)) => Err(RemoteError::Transport(e.to_string())),
        }
    }
}

/// Map a non-2xx HTTP status to a [`RemoteError`].
pub fn status_error(code: u16, rate_limited: bool, body: &str) -> RemoteError {
    let detail = format!("HTTP {code}: {}", body.trim());
    match code {
        429 => RemoteError::RateLimited(detail),
        403 if rate_limited => RemoteError::RateLimited(detail),
        401 | 403 => RemoteError::Unauthorized(detail),
        500..=599 => RemoteError::Transport(detail),
        _ => RemoteError::Api(detail),
    }
}
