use std::pin::Pin;
use std::time::{Duration, Instant};

use futures::Stream;
use futures::stream::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, StatusCode, header};
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::decode::decode_text_stream;
use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};

/// Base URL used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5050";

/// Header carrying the credential.
pub const API_KEY_HEADER: &str = "x-api-key";

const CHAT_PATH: &str = "chat";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// A stream of decoded response text, in arrival order.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Something that can carry one prompt to the chat endpoint and stream the reply.
///
/// The session talks to the endpoint only through this trait so tests can substitute a
/// scripted transport.
#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync {
    /// Issues one request for `prompt`, authorized by `credential`.
    ///
    /// Fails before yielding anything if the endpoint cannot be reached, answers with a
    /// non-success status, or has no body.  Otherwise returns the body as text
    /// fragments; a failure while reading ends the stream with an error item.
    async fn stream_chat(&self, prompt: &str, credential: &str) -> Result<TextStream>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    prompt: &'a str,
}

/// Client for the chat endpoint.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: ReqwestClient,
    endpoint: Url,
}

impl ChatClient {
    /// Create a new client for the endpoint under `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_options(base_url, None)
    }

    /// Create a new client with a custom connect timeout.
    pub fn with_options(base_url: &str, connect_timeout: Option<Duration>) -> Result<Self> {
        let endpoint = chat_endpoint(base_url)?;
        let client = ReqwestClient::builder()
            .connect_timeout(connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT))
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self { client, endpoint })
    }

    /// The full URL requests are sent to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn headers(credential: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        let credential = HeaderValue::from_str(credential).map_err(|_| {
            Error::validation(
                "API key contains characters that cannot be sent in a header",
                Some(API_KEY_HEADER.to_string()),
            )
        })?;
        headers.insert(API_KEY_HEADER, credential);
        Ok(headers)
    }
}

#[async_trait::async_trait]
impl ChatTransport for ChatClient {
    async fn stream_chat(&self, prompt: &str, credential: &str) -> Result<TextStream> {
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let result = self.open_stream(prompt, credential).await;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        if result.is_err() {
            CLIENT_REQUEST_ERRORS.click();
        }
        result
    }
}

impl ChatClient {
    async fn open_stream(&self, prompt: &str, credential: &str) -> Result<TextStream> {
        let headers = Self::headers(credential)?;
        debug!(endpoint = %self.endpoint, "sending chat request");

        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(headers)
            .json(&ChatRequest { prompt })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::timeout(format!("Request timed out: {}", e), None)
                } else if e.is_connect() {
                    Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
                }
            })?;

        let status = response.status();
        debug!(%status, "chat response received");
        if !status.is_success() {
            return Err(Error::api(
                status.as_u16(),
                status.canonical_reason().unwrap_or_default(),
            ));
        }
        if status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT {
            return Err(Error::missing_body(format!(
                "endpoint answered {status} with no body"
            )));
        }

        let bytes = response.bytes_stream().map(|result| {
            result.map_err(|e| {
                Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e)))
            })
        });
        Ok(Box::pin(decode_text_stream(Box::pin(bytes))))
    }
}

/// Resolves the chat endpoint under `base_url`, keeping any path prefix.
///
/// ```
/// # use palaver::chat_endpoint;
/// assert_eq!(chat_endpoint("http://localhost:5050").unwrap().as_str(), "http://localhost:5050/chat");
/// assert_eq!(chat_endpoint("https://example.com/api/").unwrap().as_str(), "https://example.com/api/chat");
/// ```
pub fn chat_endpoint(base_url: &str) -> Result<Url> {
    let mut base = Url::parse(base_url.trim())?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(Error::validation(
            format!("base URL must be http or https, got {}", base.scheme()),
            Some("base_url".to_string()),
        ));
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join(CHAT_PATH)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_from_bare_origin() {
        let client = ChatClient::new("http://localhost:5050").unwrap();
        assert_eq!(client.endpoint().as_str(), "http://localhost:5050/chat");
    }

    #[test]
    fn endpoint_keeps_path_prefix() {
        assert_eq!(
            chat_endpoint("https://example.com/v1").unwrap().as_str(),
            "https://example.com/v1/chat"
        );
        assert_eq!(
            chat_endpoint(" https://example.com/v1/ ").unwrap().as_str(),
            "https://example.com/v1/chat"
        );
    }

    #[test]
    fn endpoint_rejects_bad_urls() {
        assert!(matches!(chat_endpoint("not a url"), Err(Error::Url { .. })));
        assert!(chat_endpoint("ftp://example.com").unwrap_err().is_validation());
    }

    #[test]
    fn headers_carry_credential() {
        let headers = ChatClient::headers("abc123").unwrap();
        assert_eq!(headers.get(API_KEY_HEADER).unwrap(), "abc123");
        assert_eq!(
            headers.get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn headers_reject_control_characters() {
        assert!(ChatClient::headers("abc\n123").unwrap_err().is_validation());
    }

    #[test]
    fn request_body_shape() {
        let body = serde_json::to_value(ChatRequest { prompt: "Hello" }).unwrap();
        assert_eq!(body, serde_json::json!({"prompt": "Hello"}));
    }
}
