//! XRPC client implementation
//!
//! This module implements the small slice of the XRPC protocol the labeler
//! needs: queries (GET), procedures (POST), bearer authentication, service
//! proxying and plain blob downloads for embedded images.

use reqwest::{Client as ReqwestClient, Response as ReqwestResponse};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

// =============================================================================
// Error Types
// =============================================================================

/// XRPC error with HTTP status and message
///
/// Status `0` is used for failures that never produced an HTTP response
/// (connection refused, timeouts, unreadable bodies).
///
/// # Examples
/// ```
/// use atproto_client::xrpc::XrpcError;
///
/// let error = XrpcError::new(404, "NotFound", "Record not found");
/// assert_eq!(error.status(), 404);
/// assert!(!error.is_network_error());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XrpcError {
    /// HTTP status code
    status: u16,
    /// Error code (e.g., "InvalidRequest", "NotFound")
    error: String,
    /// Human-readable error message
    message: String,
}

impl XrpcError {
    /// Create a new XRPC error
    pub fn new(status: u16, error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            message: message.into(),
        }
    }

    /// Get the HTTP status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Get the error code
    pub fn error(&self) -> &str {
        &self.error
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Check if this is a transport-level failure rather than a server verdict
    pub fn is_network_error(&self) -> bool {
        matches!(
            self.status,
            0 | 408 | 425 | 429 | 500 | 502 | 503 | 504 | 522 | 524
        )
    }

    /// Check if the server rejected our credentials
    pub fn is_auth_error(&self) -> bool {
        matches!(self.status, 401 | 403)
    }
}

impl std::fmt::Display for XrpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "XRPC error {}: {} - {}",
            self.status, self.error, self.message
        )
    }
}

impl std::error::Error for XrpcError {}

/// Standard XRPC error response format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XrpcErrorResponse {
    /// Error code
    pub error: String,
    /// Error message
    #[serde(default)]
    pub message: String,
}

// =============================================================================
// Request Types
// =============================================================================

/// HTTP method for XRPC requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET request (used for queries)
    Get,
    /// POST request (used for procedures)
    Post,
}

impl HttpMethod {
    /// Method name as sent on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// XRPC request parameters
#[derive(Debug, Clone)]
pub struct XrpcRequest {
    /// HTTP method
    pub method: HttpMethod,
    /// NSID path (e.g., "app.bsky.feed.getPosts")
    pub nsid: String,
    /// Query parameters; repeated keys are allowed (`uris=a&uris=b`)
    pub params: Vec<(String, String)>,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Request body (for POST)
    pub body: Option<Vec<u8>>,
    /// Encoding type (e.g., "application/json")
    pub encoding: Option<String>,
}

impl XrpcRequest {
    /// Create a new GET request (query)
    pub fn query(nsid: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            nsid: nsid.into(),
            params: Vec::new(),
            headers: HashMap::new(),
            body: None,
            encoding: None,
        }
    }

    /// Create a new POST request (procedure)
    pub fn procedure(nsid: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            nsid: nsid.into(),
            params: Vec::new(),
            headers: HashMap::new(),
            body: None,
            encoding: Some("application/json".to_string()),
        }
    }

    /// Add a query parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Add a header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Route the request through a service proxy (`atproto-proxy` header)
    ///
    /// `service_did` is the DID of the target service and `service_id` the
    /// fragment naming the endpoint in its DID document, e.g.
    /// `atproto_labeler`.
    pub fn proxy(self, service_did: &str, service_id: &str) -> Self {
        self.header(PROXY_HEADER, format!("{service_did}#{service_id}"))
    }

    /// Set the request body from JSON
    pub fn json_body<T: Serialize>(mut self, value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        self.body = Some(body);
        self.encoding = Some("application/json".to_string());
        Ok(self)
    }
}

/// Header used by PDS instances to forward a request to another service
pub const PROXY_HEADER: &str = "atproto-proxy";

// =============================================================================
// Response Types
// =============================================================================

/// XRPC response
#[derive(Debug, Clone)]
pub struct XrpcResponse<T> {
    /// HTTP status code
    pub status: u16,
    /// Response data
    pub data: T,
}

impl<T> XrpcResponse<T> {
    /// Create a new response
    pub fn new(status: u16, data: T) -> Self {
        Self { status, data }
    }

    /// Check if the response is successful (2xx status)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// =============================================================================
// Client Configuration
// =============================================================================

/// Configuration for XRPC client
#[derive(Debug, Clone)]
pub struct XrpcClientConfig {
    /// Base service URL (e.g., "https://bsky.social")
    pub service_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Custom headers to include in all requests
    pub default_headers: HashMap<String, String>,
}

impl Default for XrpcClientConfig {
    fn default() -> Self {
        Self {
            service_url: "https://bsky.social".to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("sci-labeler/{}", env!("CARGO_PKG_VERSION")),
            default_headers: HashMap::new(),
        }
    }
}

impl XrpcClientConfig {
    /// Create a new config with a service URL
    pub fn new(service_url: impl Into<String>) -> Self {
        let service_url: String = service_url.into();
        Self {
            service_url: service_url.trim_end_matches('/').to_string(),
            ..Default::default()
        }
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Add a default header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }
}

// =============================================================================
// XRPC Client Implementation
// =============================================================================

/// XRPC client for making requests to AT Protocol services
///
/// # Examples
/// ```
/// use atproto_client::xrpc::{XrpcClient, XrpcClientConfig, XrpcRequest};
///
/// async fn example() -> Result<(), Box<dyn std::error::Error>> {
///     let client = XrpcClient::new(XrpcClientConfig::new("https://bsky.social"))?;
///
///     let request = XrpcRequest::query("com.atproto.identity.resolveHandle")
///         .param("handle", "alice.bsky.social");
///     let response = client.query::<serde_json::Value>(request).await?;
///     println!("{}", response.data);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct XrpcClient {
    /// HTTP client
    client: ReqwestClient,
    /// Configuration
    config: XrpcClientConfig,
    /// Bearer token attached to every request once a session exists
    access_token: Option<String>,
}

impl XrpcClient {
    /// Create a new XRPC client
    pub fn new(config: XrpcClientConfig) -> Result<Self, XrpcError> {
        let client = ReqwestClient::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| XrpcError::new(0, "ClientBuild", e.to_string()))?;

        Ok(Self {
            client,
            config,
            access_token: None,
        })
    }

    /// Attach a bearer token to all subsequent requests
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = Some(token.into());
    }

    /// Whether a bearer token is attached
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Make a query request (GET)
    pub async fn query<T>(&self, request: XrpcRequest) -> Result<XrpcResponse<T>, XrpcError>
    where
        T: for<'de> Deserialize<'de>,
    {
        self.execute_request(request).await
    }

    /// Make a procedure request (POST)
    pub async fn procedure<T>(&self, request: XrpcRequest) -> Result<XrpcResponse<T>, XrpcError>
    where
        T: for<'de> Deserialize<'de>,
    {
        self.execute_request(request).await
    }

    /// Download raw bytes from an absolute URL (CDN image links)
    ///
    /// Non-2xx responses are reported as errors carrying the HTTP status.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, XrpcError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            XrpcError::new(0, "NetworkError", format!("Request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(XrpcError::new(
                status.as_u16(),
                "FetchFailed",
                format!("GET {} returned {}", url, status),
            ));
        }

        let bytes = response.bytes().await.map_err(|e| {
            XrpcError::new(0, "ParseError", format!("Failed to read body: {}", e))
        })?;
        Ok(bytes.to_vec())
    }

    /// Execute an XRPC request
    async fn execute_request<T>(&self, request: XrpcRequest) -> Result<XrpcResponse<T>, XrpcError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url = format!("{}/xrpc/{}", self.config.service_url, request.nsid);
        tracing::debug!(method = request.method.as_str(), %url, "xrpc request");

        let mut req = match request.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
        };

        if !request.params.is_empty() {
            req = req.query(&request.params);
        }

        for (key, value) in &self.config.default_headers {
            req = req.header(key, value);
        }

        if let Some(token) = &self.access_token {
            req = req.bearer_auth(token);
        }

        for (key, value) in &request.headers {
            req = req.header(key, value);
        }

        if let Some(body) = request.body {
            if let Some(encoding) = &request.encoding {
                req = req.header("Content-Type", encoding);
            }
            req = req.body(body);
        }

        let response = req.send().await.map_err(|e| {
            XrpcError::new(0, "NetworkError", format!("Request failed: {}", e))
        })?;

        self.parse_response(response).await
    }

    /// Parse reqwest response into XrpcResponse
    async fn parse_response<T>(&self, response: ReqwestResponse) -> Result<XrpcResponse<T>, XrpcError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let status = response.status().as_u16();

        if !response.status().is_success() {
            let error_body = response.text().await.unwrap_or_default();

            return match serde_json::from_str::<XrpcErrorResponse>(&error_body) {
                Ok(error_response) => Err(XrpcError::new(
                    status,
                    error_response.error,
                    error_response.message,
                )),
                Err(_) => Err(XrpcError::new(
                    status,
                    "Unknown",
                    format!("HTTP {}: {}", status, error_body),
                )),
            };
        }

        let body = response.text().await.map_err(|e| {
            XrpcError::new(0, "ParseError", format!("Failed to read response: {}", e))
        })?;

        // Procedures such as emitEvent may answer with an empty body
        let body = if body.trim().is_empty() { "null" } else { body.as_str() };

        let data: T = serde_json::from_str(body).map_err(|e| {
            XrpcError::new(0, "ParseError", format!("Failed to parse JSON: {}", e))
        })?;

        Ok(XrpcResponse::new(status, data))
    }

    /// Get the client configuration
    pub fn config(&self) -> &XrpcClientConfig {
        &self.config
    }

    /// Get the service URL
    pub fn service_url(&self) -> &str {
        &self.config.service_url
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xrpc_error_network() {
        let error = XrpcError::new(503, "ServiceUnavailable", "Service is down");
        assert_eq!(error.status(), 503);
        assert_eq!(error.error(), "ServiceUnavailable");
        assert_eq!(error.message(), "Service is down");
        assert!(error.is_network_error());
        assert!(!error.is_auth_error());
    }

    #[test]
    fn test_xrpc_error_transport_failure_is_network() {
        let error = XrpcError::new(0, "NetworkError", "connection refused");
        assert!(error.is_network_error());
    }

    #[test]
    fn test_xrpc_error_auth() {
        let error = XrpcError::new(401, "AuthRequired", "no token");
        assert!(error.is_auth_error());
        assert!(!error.is_network_error());
    }

    #[test]
    fn test_xrpc_request_query_keeps_repeated_params() {
        let req = XrpcRequest::query("app.bsky.feed.getPosts")
            .param("uris", "at://did:plc:a/app.bsky.feed.post/1")
            .param("uris", "at://did:plc:a/app.bsky.feed.post/2");

        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.params.len(), 2);
        assert!(req.encoding.is_none());
    }

    #[test]
    fn test_xrpc_request_proxy_header() {
        let req = XrpcRequest::procedure("tools.ozone.moderation.emitEvent")
            .proxy("did:plc:labeler", "atproto_labeler");

        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(
            req.headers.get(PROXY_HEADER),
            Some(&"did:plc:labeler#atproto_labeler".to_string())
        );
    }

    #[test]
    fn test_xrpc_request_json_body() {
        #[derive(Serialize)]
        struct TestData {
            foo: String,
        }

        let req = XrpcRequest::procedure("test.method")
            .json_body(&TestData {
                foo: "bar".to_string(),
            })
            .unwrap();

        let body_str = String::from_utf8(req.body.unwrap()).unwrap();
        assert_eq!(body_str, r#"{"foo":"bar"}"#);
        assert_eq!(req.encoding.as_deref(), Some("application/json"));
    }

    #[test]
    fn test_xrpc_response_success() {
        assert!(XrpcResponse::new(200, ()).is_success());
        assert!(!XrpcResponse::new(400, ()).is_success());
    }

    #[test]
    fn test_client_config_default() {
        let config = XrpcClientConfig::default();
        assert_eq!(config.service_url, "https://bsky.social");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("sci-labeler/"));
    }

    #[test]
    fn test_client_config_trims_trailing_slash() {
        let config = XrpcClientConfig::new("https://pds.example.com/")
            .with_timeout(Duration::from_secs(5))
            .with_header("X-Custom", "value");

        assert_eq!(config.service_url, "https://pds.example.com");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(
            config.default_headers.get("X-Custom"),
            Some(&"value".to_string())
        );
    }

    #[test]
    fn test_xrpc_client_new() {
        let mut client = XrpcClient::new(
            XrpcClientConfig::new("https://bsky.social").with_user_agent("TestAgent/1.0"),
        )
        .unwrap();

        assert_eq!(client.service_url(), "https://bsky.social");
        assert_eq!(client.config().user_agent, "TestAgent/1.0");
        assert!(!client.is_authenticated());

        client.set_access_token("jwt");
        assert!(client.is_authenticated());
    }
}
