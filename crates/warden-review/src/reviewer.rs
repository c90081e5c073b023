//! Risk reviewer trait and the HTTP implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error};

use crate::context::ReviewContext;
use crate::error::{ReviewError, ReviewResult};

/// An external service that assesses the risk of a request.
///
/// Implementations return the reviewer's raw JSON answer. Decoding is done
/// by the gateway so that every reviewer goes through the same strict checks.
#[async_trait]
pub trait RiskReviewer: Send + Sync {
    /// Reviewer name, used in logs.
    fn name(&self) -> &str;

    /// Ask for a review of one request.
    async fn review(&self, context: &ReviewContext) -> ReviewResult<Value>;
}

/// Reviewer reached over HTTP: the context is POSTed as JSON and the
/// response body is expected to hold `decision`, `riskScore` and `reasons`.
#[derive(Debug, Clone)]
pub struct HttpRiskReviewer {
    client: Client,
    endpoint: String,
    bearer_token: Option<String>,
}

impl HttpRiskReviewer {
    /// Create a reviewer for the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::Transport`] if the endpoint is not a valid URL.
    pub fn new(endpoint: impl Into<String>) -> ReviewResult<Self> {
        let endpoint = endpoint.into();
        url::Url::parse(&endpoint)
            .map_err(|e| ReviewError::Transport(format!("invalid endpoint '{endpoint}': {e}")))?;
        Ok(Self {
            client: Client::new(),
            endpoint,
            bearer_token: None,
        })
    }

    /// Send `Authorization: Bearer <token>` with each review.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// The endpoint reviews are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RiskReviewer for HttpRiskReviewer {
    fn name(&self) -> &str {
        "http"
    }

    async fn review(&self, context: &ReviewContext) -> ReviewResult<Value> {
        debug!(
            endpoint = %self.endpoint,
            operation = %context.operation_id,
            "requesting risk review"
        );

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json");

        if let Some(ref token) = self.bearer_token {
            let mut auth_value =
                reqwest::header::HeaderValue::try_from(format!("Bearer {token}")).map_err(|e| {
                    ReviewError::Transport(format!("invalid bearer token characters: {e}"))
                })?;
            auth_value.set_sensitive(true);
            request = request.header("Authorization", auth_value);
        }

        let response = request
            .json(context)
            .send()
            .await
            .map_err(|e| ReviewError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "risk reviewer error");
            let status_code = status.as_u16();
            return Err(ReviewError::Transport(format!("HTTP {status_code}: {body}")));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ReviewError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use warden_core::{HttpVerb, InvocationRequest};

    /// Serve exactly one HTTP response on a local port and return its URL
    /// together with a handle yielding the raw request that was received.
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let raw = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            raw
        });
        (format!("http://{addr}/review"), handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    fn context() -> ReviewContext {
        let request = InvocationRequest::new("shop", "createOrder", HttpVerb::Post, "/orders")
            .with_json_arguments(json!({"amount": 5, "token": "tok-abcdef"}));
        ReviewContext::from_request(&request)
    }

    #[test]
    fn test_rejects_invalid_endpoint() {
        assert!(matches!(
            HttpRiskReviewer::new("not a url"),
            Err(ReviewError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_posts_context_and_returns_body() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"decision":"ALLOW","riskScore":12,"reasons":["read only"]}"#,
        )
        .await;

        let reviewer = HttpRiskReviewer::new(url).unwrap().with_bearer_token("s3cret");
        let body = reviewer.review(&context()).await.unwrap();
        assert_eq!(body["decision"], json!("ALLOW"));

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /review"));
        assert!(raw.to_ascii_lowercase().contains("authorization: bearer s3cret"));
        assert!(raw.contains("\"operationId\":\"createOrder\""));
        assert!(!raw.contains("tok-abcdef"));
    }

    #[tokio::test]
    async fn test_error_status_is_transport_error() {
        let (url, server) = serve_once("503 Service Unavailable", r#"{"error":"busy"}"#).await;
        let err = HttpRiskReviewer::new(url)
            .unwrap()
            .review(&context())
            .await
            .unwrap_err();
        server.await.unwrap();
        assert_eq!(
            err,
            ReviewError::Transport(r#"HTTP 503: {"error":"busy"}"#.to_string())
        );
    }

    #[tokio::test]
    async fn test_non_json_body_is_invalid_response() {
        let (url, server) = serve_once("200 OK", "definitely not json").await;
        let err = HttpRiskReviewer::new(url)
            .unwrap()
            .review(&context())
            .await
            .unwrap_err();
        server.await.unwrap();
        assert!(matches!(err, ReviewError::InvalidResponse(_)));
    }
}
