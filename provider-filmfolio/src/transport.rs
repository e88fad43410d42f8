//! Resilient API transport
//!
//! Every JSON call to the Filmfolio service funnels through
//! [`ApiTransport::send`], which owns the full recovery policy:
//!
//! - No response: bounded retry with exponential backoff (`2^attempt`
//!   seconds), at most [`MAX_RETRIES`] retries after the first request
//!   (four requests in total).
//! - 401: exactly one refresh-and-retry per call; a second 401 fails
//!   `AuthExpired` without another refresh.
//! - 429: wait the server-specified `Retry-After` (default 60s when the
//!   header is missing or non-numeric) and retry; never counts against the
//!   network-retry budget.
//! - 5xx: retried like a missing response, surfaced as `Api` once the
//!   budget is spent.
//! - Other 4xx: definitive, fails `Api` with the message extracted from
//!   the body's `error` or `message` field.
//!
//! The raw byte-upload path does not go through here; it is a plain PUT in
//! the connector with none of the JSON error parsing.

use crate::error::{FilmfolioError, Result};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use core_auth::TokenSource;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

/// Retries allowed beyond the first request for the no-response/5xx
/// budget.
pub const MAX_RETRIES: u32 = 3;

/// Wait applied when a 429 carries no usable Retry-After header.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Per-request transport timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One logical API call, before the policy layer.
pub struct ApiRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: Option<Value>,
    /// Tunneled verb for hosts that only pass GET/POST through
    /// (`X-HTTP-Method-Override`); the request itself goes out as `method`.
    pub override_method: Option<&'static str>,
    pub authenticated: bool,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            body: None,
            override_method: None,
            authenticated: true,
        }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            body: Some(body),
            override_method: None,
            authenticated: true,
        }
    }

    /// PATCH tunneled over POST.
    pub fn patch(url: impl Into<String>, body: Value) -> Self {
        Self {
            override_method: Some("PATCH"),
            ..Self::post(url, body)
        }
    }

    /// DELETE tunneled over POST.
    pub fn delete(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            body: None,
            override_method: Some("DELETE"),
            authenticated: true,
        }
    }
}

/// The retrying, rate-limit-aware JSON transport.
pub struct ApiTransport {
    http: Arc<dyn HttpClient>,
    auth: Arc<dyn TokenSource>,
}

impl ApiTransport {
    pub fn new(http: Arc<dyn HttpClient>, auth: Arc<dyn TokenSource>) -> Self {
        Self { http, auth }
    }

    /// Execute one logical call under the full recovery policy.
    ///
    /// Returns the parsed JSON body, or `None` for an empty success body.
    #[instrument(skip(self, request), fields(url = %request.url))]
    pub async fn send(&self, request: &ApiRequest) -> Result<Option<Value>> {
        let mut failures: u32 = 0;
        let mut refreshed = false;

        loop {
            let outbound = self.build_request(request).await?;

            let response = match self.http.execute(outbound).await {
                Ok(response) => response,
                Err(e) => {
                    failures += 1;
                    if failures > MAX_RETRIES {
                        warn!(attempts = failures, error = %e, "Request failed with no response, budget spent");
                        return Err(FilmfolioError::Network {
                            attempts: failures,
                            message: e.to_string(),
                        });
                    }
                    let backoff = Duration::from_secs(2u64.pow(failures));
                    warn!(retry = failures, backoff_secs = backoff.as_secs(), error = %e, "No response, retrying");
                    sleep(backoff).await;
                    continue;
                }
            };

            let status = response.status;

            if response.is_success() {
                debug!(status, "API call succeeded");
                if response.body.is_empty() {
                    return Ok(None);
                }
                let value: Value = response
                    .json()
                    .map_err(|e| FilmfolioError::InvalidResponse(e.to_string()))?;
                return Ok(Some(value));
            }

            match status {
                401 if request.authenticated && !refreshed => {
                    refreshed = true;
                    debug!("Received 401, attempting credential refresh");
                    match self.auth.refresh().await {
                        Ok(true) => continue,
                        Ok(false) => return Err(FilmfolioError::AuthExpired),
                        Err(_) => return Err(FilmfolioError::AuthExpired),
                    }
                }
                401 => return Err(FilmfolioError::AuthExpired),
                429 => {
                    // Server-directed pacing; does not touch the retry budget.
                    let wait = retry_after_secs(&response);
                    warn!(wait_secs = wait, "Rate limited, honoring Retry-After");
                    sleep(Duration::from_secs(wait)).await;
                    continue;
                }
                _ if response.is_server_error() => {
                    failures += 1;
                    if failures > MAX_RETRIES {
                        let message = extract_error_message(&response);
                        warn!(status, attempts = failures, "Server error persisted, budget spent");
                        return Err(FilmfolioError::Api { status, message });
                    }
                    let backoff = Duration::from_secs(2u64.pow(failures));
                    warn!(status, retry = failures, backoff_secs = backoff.as_secs(), "Server error, retrying");
                    sleep(backoff).await;
                    continue;
                }
                _ => {
                    let message = extract_error_message(&response);
                    warn!(status, message = %message, "API call rejected");
                    return Err(FilmfolioError::Api { status, message });
                }
            }
        }
    }

    async fn build_request(&self, request: &ApiRequest) -> Result<HttpRequest> {
        let mut outbound = HttpRequest::new(request.method, &request.url)
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT);

        if request.authenticated {
            // Read fresh on every attempt so a mid-call refresh is picked up.
            let token = self.auth.access_token().await?;
            outbound = outbound.bearer_token(&token);
        }

        if let Some(verb) = request.override_method {
            outbound = outbound.header("X-HTTP-Method-Override", verb);
        }

        if let Some(body) = &request.body {
            outbound = outbound
                .json(body)
                .map_err(|e| FilmfolioError::InvalidResponse(e.to_string()))?;
        }

        Ok(outbound)
    }
}

fn retry_after_secs(response: &bridge_traits::http::HttpResponse) -> u64 {
    response
        .header("Retry-After")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

/// Best-effort human-readable message from an error body.
fn extract_error_message(response: &bridge_traits::http::HttpResponse) -> String {
    if let Ok(value) = response.json::<Value>() {
        for key in ["error", "message"] {
            if let Some(message) = value.get(key).and_then(Value::as_str) {
                return message.to_string();
            }
        }
    }
    response
        .text()
        .ok()
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| format!("HTTP {}", response.status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::HttpResponse;
    use bytes::Bytes;
    use mockall::mock;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    mock! {
        pub Http {}

        #[async_trait::async_trait]
        impl HttpClient for Http {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    struct StubTokenSource {
        token: Mutex<String>,
        refresh_succeeds: bool,
        refresh_calls: AtomicU32,
    }

    impl StubTokenSource {
        fn new(token: &str) -> Self {
            Self {
                token: Mutex::new(token.to_string()),
                refresh_succeeds: true,
                refresh_calls: AtomicU32::new(0),
            }
        }

        fn failing_refresh(token: &str) -> Self {
            Self {
                refresh_succeeds: false,
                ..Self::new(token)
            }
        }
    }

    #[async_trait::async_trait]
    impl TokenSource for StubTokenSource {
        async fn access_token(&self) -> core_auth::Result<String> {
            Ok(self.token.lock().unwrap().clone())
        }

        async fn refresh(&self) -> core_auth::Result<bool> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            if self.refresh_succeeds {
                *self.token.lock().unwrap() = "refreshed_token".to_string();
                Ok(true)
            } else {
                Ok(false)
            }
        }
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn response_with_header(status: u16, name: &str, value: &str) -> HttpResponse {
        let mut headers = HashMap::new();
        headers.insert(name.to_string(), value.to_string());
        HttpResponse {
            status,
            headers,
            body: Bytes::new(),
        }
    }

    fn transport(http: MockHttp, auth: StubTokenSource) -> ApiTransport {
        ApiTransport::new(Arc::new(http), Arc::new(auth))
    }

    #[tokio::test]
    async fn test_success_returns_parsed_body() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .times(1)
            .returning(|request| {
                assert_eq!(
                    request.headers.get("Authorization").map(String::as_str),
                    Some("Bearer t1")
                );
                Ok(response(200, r#"{"data": {"id": "r1"}}"#))
            });

        let transport = transport(http, StubTokenSource::new("t1"));
        let value = transport
            .send(&ApiRequest::get("https://api.test/rolls"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(value["data"]["id"], "r1");
    }

    #[tokio::test]
    async fn test_empty_success_body_is_none() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(response(204, "")));

        let transport = transport(http, StubTokenSource::new("t1"));
        let value = transport
            .send(&ApiRequest::delete("https://api.test/photographs/p1"))
            .await
            .unwrap();
        assert!(value.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_response_retries_with_exponential_backoff() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .times(4)
            .returning(|_| Err(BridgeError::OperationFailed("connection refused".into())));

        let transport = transport(http, StubTokenSource::new("t1"));
        let started = tokio::time::Instant::now();
        let err = transport
            .send(&ApiRequest::get("https://api.test/rolls"))
            .await
            .unwrap_err();

        assert!(matches!(err, FilmfolioError::Network { attempts: 4, .. }));
        // 2s, 4s, 8s between the four requests
        assert_eq!(started.elapsed(), Duration::from_secs(14));
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_transient_failures_then_success_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut http = MockHttp::new();
        let counter = calls.clone();
        http.expect_execute().times(4).returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) < 3 {
                Err(BridgeError::OperationFailed("connection refused".into()))
            } else {
                Ok(response(200, r#"{"ok": true}"#))
            }
        });

        let transport = transport(http, StubTokenSource::new("t1"));
        let started = tokio::time::Instant::now();
        let value = transport
            .send(&ApiRequest::get("https://api.test/rolls"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(value["ok"], true);
        // The last allowed retry lands after the full 2s + 4s + 8s backoff.
        assert_eq!(started.elapsed(), Duration::from_secs(14));
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_recovers_within_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut http = MockHttp::new();
        let counter = calls.clone();
        http.expect_execute().times(4).returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) < 3 {
                Ok(response(503, ""))
            } else {
                Ok(response(200, r#"{"ok": true}"#))
            }
        });

        let transport = transport(http, StubTokenSource::new("t1"));
        let value = transport
            .send(&ApiRequest::get("https://api.test/rolls"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn test_401_refreshes_once_and_retries_with_new_token() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut http = MockHttp::new();
        let counter = calls.clone();
        http.expect_execute().times(2).returning(move |request| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(response(401, ""))
            } else {
                assert_eq!(
                    request.headers.get("Authorization").map(String::as_str),
                    Some("Bearer refreshed_token")
                );
                Ok(response(200, r#"{"ok": true}"#))
            }
        });

        let auth = StubTokenSource::new("stale");
        let transport = ApiTransport::new(Arc::new(http), Arc::new(auth));
        let value = transport
            .send(&ApiRequest::get("https://api.test/rolls"))
            .await
            .unwrap();
        assert!(value.is_some());
    }

    #[tokio::test]
    async fn test_second_consecutive_401_fails_without_second_refresh() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .times(2)
            .returning(|_| Ok(response(401, "")));

        let auth = Arc::new(StubTokenSource::new("stale"));
        let transport = ApiTransport::new(Arc::new(http), auth.clone());
        let err = transport
            .send(&ApiRequest::get("https://api.test/rolls"))
            .await
            .unwrap_err();

        assert!(matches!(err, FilmfolioError::AuthExpired));
        assert_eq!(auth.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_401_with_failed_refresh_is_auth_expired() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(response(401, "")));

        let auth = Arc::new(StubTokenSource::failing_refresh("stale"));
        let transport = ApiTransport::new(Arc::new(http), auth.clone());
        let err = transport
            .send(&ApiRequest::get("https://api.test/rolls"))
            .await
            .unwrap_err();

        assert!(matches!(err, FilmfolioError::AuthExpired));
        assert_eq!(auth.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_429_waits_server_specified_duration() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut http = MockHttp::new();
        let counter = calls.clone();
        http.expect_execute().times(2).returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(response_with_header(429, "Retry-After", "5"))
            } else {
                Ok(response(200, r#"{"ok": true}"#))
            }
        });

        let transport = transport(http, StubTokenSource::new("t1"));
        let started = tokio::time::Instant::now();
        transport
            .send(&ApiRequest::get("https://api.test/rolls"))
            .await
            .unwrap();
        assert_eq!(started.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_429_without_header_waits_default_60s() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut http = MockHttp::new();
        let counter = calls.clone();
        http.expect_execute().times(2).returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(response(429, ""))
            } else {
                Ok(response(200, r#"{"ok": true}"#))
            }
        });

        let transport = transport(http, StubTokenSource::new("t1"));
        let started = tokio::time::Instant::now();
        transport
            .send(&ApiRequest::get("https://api.test/rolls"))
            .await
            .unwrap();
        assert_eq!(started.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_429_does_not_consume_retry_budget() {
        // Three rate-limit responses followed by four dropped connections:
        // the budget only starts counting at the first dropped connection.
        let calls = Arc::new(AtomicU32::new(0));
        let mut http = MockHttp::new();
        let counter = calls.clone();
        http.expect_execute().times(7).returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) < 3 {
                Ok(response_with_header(429, "Retry-After", "1"))
            } else {
                Err(BridgeError::OperationFailed("connection refused".into()))
            }
        });

        let transport = transport(http, StubTokenSource::new("t1"));
        let err = transport
            .send(&ApiRequest::get("https://api.test/rolls"))
            .await
            .unwrap_err();
        assert!(matches!(err, FilmfolioError::Network { attempts: 4, .. }));
    }

    #[tokio::test]
    async fn test_4xx_is_definitive_with_body_message() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(response(404, r#"{"error": "roll not found"}"#)));

        let transport = transport(http, StubTokenSource::new("t1"));
        let err = transport
            .send(&ApiRequest::get("https://api.test/rolls/missing"))
            .await
            .unwrap_err();

        match err {
            FilmfolioError::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "roll not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_4xx_message_falls_back_to_message_field() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(response(422, r#"{"message": "name required"}"#)));

        let transport = transport(http, StubTokenSource::new("t1"));
        let err = transport
            .send(&ApiRequest::post("https://api.test/rolls", serde_json::json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, FilmfolioError::Api { status: 422, ref message } if message == "name required"));
    }

    #[tokio::test]
    async fn test_override_header_and_json_body() {
        let mut http = MockHttp::new();
        http.expect_execute().times(1).returning(|request| {
            assert_eq!(request.method, HttpMethod::Post);
            assert_eq!(
                request.headers.get("X-HTTP-Method-Override").map(String::as_str),
                Some("PATCH")
            );
            assert_eq!(
                request.headers.get("Content-Type").map(String::as_str),
                Some("application/json")
            );
            Ok(response(200, r#"{"ok": true}"#))
        });

        let transport = transport(http, StubTokenSource::new("t1"));
        transport
            .send(&ApiRequest::patch(
                "https://api.test/photographs/p1",
                serde_json::json!({"data": {}}),
            ))
            .await
            .unwrap();
    }
}
