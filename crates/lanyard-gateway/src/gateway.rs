//! The gateway core: one shared HTTP client plus the two interceptor
//! behaviors (bearer attach outbound, refresh-and-replay inbound).

use std::sync::Arc;
use std::time::Instant;

use lanyard_protocol::ApiEnvelope;
use lanyard_session::TokenSource;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{GatewayConfig, GatewayError, ResourceClient};

/// Façade over the REST API. Hand out one per application; it is cheap
/// to clone and every [`ResourceClient`] carved off it shares the same
/// HTTP connection pool and token source.
///
/// The type parameter is the token seam: in production it is the session
/// coordinator, in tests a fake. The gateway never looks inside tokens —
/// it attaches whatever the source serves and asks the source to refresh
/// when the server says the token expired.
pub struct RequestGateway<S: TokenSource> {
    http: reqwest::Client,
    source: Arc<S>,
    config: GatewayConfig,
}

impl<S: TokenSource> Clone for RequestGateway<S> {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            source: Arc::clone(&self.source),
            config: self.config.clone(),
        }
    }
}

impl<S: TokenSource> RequestGateway<S> {
    /// Builds the gateway and its HTTP client.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Transport`] if the TLS backend fails to
    /// initialize.
    pub fn new(source: Arc<S>, config: GatewayConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            source,
            config,
        })
    }

    /// A sub-client rooted at `/<name>`, for resource groups beyond the
    /// named ones below.
    pub fn resource(&self, name: &str) -> ResourceClient<S> {
        ResourceClient::new(self.clone(), name)
    }

    /// Profile and account endpoints (`/users/...`).
    pub fn users(&self) -> ResourceClient<S> {
        self.resource("users")
    }

    /// Card collection endpoints (`/cards/...`).
    pub fn cards(&self) -> ResourceClient<S> {
        self.resource("cards")
    }

    /// Clan roster endpoints (`/clans/...`).
    pub fn clans(&self) -> ResourceClient<S> {
        self.resource("clans")
    }

    /// Chat history endpoints (`/chat/...`).
    pub fn chat(&self) -> ResourceClient<S> {
        self.resource("chat")
    }

    /// Runs one logical request: send, and on a 401-expired answer,
    /// refresh once and replay once.
    pub(crate) async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, GatewayError> {
        let value = match self
            .send_once(&method, path, body.as_ref(), self.source.access_token())
            .await
        {
            Ok(value) => value,
            Err(err) if err.is_token_expired() => {
                tracing::debug!(path, "access token expired, refreshing and replaying");
                let token = match self.source.refresh().await {
                    Ok(token) => token,
                    Err(refresh_err) => {
                        tracing::warn!(error = %refresh_err, "token refresh failed");
                        return Err(GatewayError::AuthExpired(refresh_err));
                    }
                };
                // One replay only; a second expiry with a fresh token is
                // terminal.
                self.send_once(&method, path, body.as_ref(), Some(token))
                    .await?
            }
            Err(err) => return Err(err),
        };
        serde_json::from_value(value).map_err(GatewayError::Decode)
    }

    async fn send_once(
        &self,
        method: &Method,
        path: &str,
        body: Option<&Value>,
        token: Option<String>,
    ) -> Result<Value, GatewayError> {
        let url = format!("{}{}", self.config.base_url, path);
        let mut request = self.http.request(method.clone(), &url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let started = Instant::now();
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        tracing::debug!(
            %method,
            path,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "gateway request"
        );

        match serde_json::from_str::<ApiEnvelope<Value>>(&text) {
            Ok(envelope) if status.is_success() && envelope.success => {
                Ok(envelope.data.unwrap_or(Value::Null))
            }
            // Either a non-2xx status or `success: false` inside a 2xx.
            Ok(envelope) => Err(GatewayError::Api {
                status: status.as_u16(),
                code: envelope.code,
                message: envelope
                    .message
                    .unwrap_or_else(|| format!("request failed with status {status}")),
            }),
            Err(e) if status.is_success() => Err(GatewayError::Decode(e)),
            Err(_) => Err(GatewayError::Api {
                status: status.as_u16(),
                code: None,
                message: format!("request failed with status {status}"),
            }),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use lanyard_protocol::{ErrorCode, UserProfile};
    use lanyard_session::SessionError;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex as StdMutex;
    use wiremock::matchers::{body_json, header, method as http_method, path as url_path};
    use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

    /// Fake token seam: serves one token, rotates to `at-fresh` on
    /// refresh, counts refresh calls.
    struct FakeSource {
        token: StdMutex<Option<String>>,
        refreshes: AtomicU32,
        fail_refresh: bool,
    }

    impl FakeSource {
        fn with_token(token: &str) -> Arc<Self> {
            Arc::new(Self {
                token: StdMutex::new(Some(token.to_string())),
                refreshes: AtomicU32::new(0),
                fail_refresh: false,
            })
        }

        fn without_token() -> Arc<Self> {
            Arc::new(Self {
                token: StdMutex::new(None),
                refreshes: AtomicU32::new(0),
                fail_refresh: false,
            })
        }

        fn failing(token: &str) -> Arc<Self> {
            Arc::new(Self {
                token: StdMutex::new(Some(token.to_string())),
                refreshes: AtomicU32::new(0),
                fail_refresh: true,
            })
        }

        fn refresh_count(&self) -> u32 {
            self.refreshes.load(Ordering::SeqCst)
        }
    }

    impl TokenSource for FakeSource {
        fn access_token(&self) -> Option<String> {
            self.token.lock().unwrap().clone()
        }

        async fn refresh(&self) -> Result<String, SessionError> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            if self.fail_refresh {
                return Err(SessionError::NoStoredSession);
            }
            let fresh = "at-fresh".to_string();
            *self.token.lock().unwrap() = Some(fresh.clone());
            Ok(fresh)
        }
    }

    /// Matches requests that carry no Authorization header at all.
    struct NoAuthHeader;

    impl Match for NoAuthHeader {
        fn matches(&self, request: &Request) -> bool {
            !request.headers.contains_key("authorization")
        }
    }

    fn gateway(server: &MockServer, source: &Arc<FakeSource>) -> RequestGateway<FakeSource> {
        RequestGateway::new(Arc::clone(source), GatewayConfig::new(server.uri())).unwrap()
    }

    fn ok_body(data: Value) -> Value {
        json!({"success": true, "data": data})
    }

    fn fail_body(code: &str, message: &str) -> Value {
        json!({"success": false, "code": code, "message": message})
    }

    fn profile_json() -> Value {
        json!({"id": "alice-id", "display_name": "Alice", "level": 12})
    }

    // =====================================================================
    // Happy path
    // =====================================================================

    #[tokio::test]
    async fn test_get_attaches_bearer_token_and_unwraps_envelope() {
        let server = MockServer::start().await;
        Mock::given(http_method("GET"))
            .and(url_path("/users/profile"))
            .and(header("authorization", "Bearer at-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(profile_json())))
            .expect(1)
            .mount(&server)
            .await;
        let source = FakeSource::with_token("at-1");
        let gateway = gateway(&server, &source);

        let profile: UserProfile = gateway.users().get("/profile").await.unwrap();

        assert_eq!(profile.display_name, "Alice");
        assert_eq!(profile.level, 12);
        assert_eq!(source.refresh_count(), 0);
    }

    #[tokio::test]
    async fn test_request_without_token_omits_authorization_header() {
        let server = MockServer::start().await;
        Mock::given(http_method("GET"))
            .and(url_path("/users/motd"))
            .and(NoAuthHeader)
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(json!({"motd": "hi"}))))
            .expect(1)
            .mount(&server)
            .await;
        let source = FakeSource::without_token();
        let gateway = gateway(&server, &source);

        let value: Value = gateway.users().get("/motd").await.unwrap();

        assert_eq!(value, json!({"motd": "hi"}));
    }

    #[tokio::test]
    async fn test_post_sends_json_body() {
        let server = MockServer::start().await;
        Mock::given(http_method("POST"))
            .and(url_path("/chat/messages"))
            .and(body_json(json!({"text": "o/"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(json!({"id": 1}))))
            .expect(1)
            .mount(&server)
            .await;
        let source = FakeSource::with_token("at-1");
        let gateway = gateway(&server, &source);

        let value: Value = gateway
            .chat()
            .post("/messages", &json!({"text": "o/"}))
            .await
            .unwrap();

        assert_eq!(value, json!({"id": 1}));
    }

    // =====================================================================
    // Refresh-and-replay
    // =====================================================================

    #[tokio::test]
    async fn test_expired_token_refreshes_and_replays_once() {
        let server = MockServer::start().await;
        // The stale token gets a 401-expired once...
        Mock::given(http_method("GET"))
            .and(url_path("/users/profile"))
            .and(header("authorization", "Bearer at-stale"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(fail_body("TOKEN_EXPIRED", "access token expired")),
            )
            .expect(1)
            .mount(&server)
            .await;
        // ...and the replay with the fresh token succeeds.
        Mock::given(http_method("GET"))
            .and(url_path("/users/profile"))
            .and(header("authorization", "Bearer at-fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body(profile_json())))
            .expect(1)
            .mount(&server)
            .await;
        let source = FakeSource::with_token("at-stale");
        let gateway = gateway(&server, &source);

        let profile: UserProfile = gateway.users().get("/profile").await.unwrap();

        assert_eq!(profile.display_name, "Alice");
        assert_eq!(source.refresh_count(), 1);
    }

    #[tokio::test]
    async fn test_second_expiry_after_refresh_is_terminal() {
        let server = MockServer::start().await;
        // The server claims expiry no matter which token it sees.
        Mock::given(http_method("GET"))
            .and(url_path("/users/profile"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(fail_body("TOKEN_EXPIRED", "access token expired")),
            )
            .expect(2)
            .mount(&server)
            .await;
        let source = FakeSource::with_token("at-stale");
        let gateway = gateway(&server, &source);

        let err = gateway
            .users()
            .get::<UserProfile>("/profile")
            .await
            .unwrap_err();

        // Exactly two requests (checked by the mock) and one refresh: the
        // replay is never itself replayed.
        assert!(err.is_token_expired());
        assert_eq!(source.refresh_count(), 1);
    }

    #[tokio::test]
    async fn test_revoked_token_passes_through_without_refresh() {
        let server = MockServer::start().await;
        Mock::given(http_method("GET"))
            .and(url_path("/users/profile"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(fail_body("TOKEN_REVOKED", "revoked")),
            )
            .expect(1)
            .mount(&server)
            .await;
        let source = FakeSource::with_token("at-1");
        let gateway = gateway(&server, &source);

        let err = gateway
            .users()
            .get::<UserProfile>("/profile")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GatewayError::Api {
                status: 401,
                code: Some(ErrorCode::TokenRevoked),
                ..
            }
        ));
        assert_eq!(source.refresh_count(), 0, "revoked must not trigger refresh");
    }

    #[tokio::test]
    async fn test_refresh_failure_is_terminal_auth_expired() {
        let server = MockServer::start().await;
        Mock::given(http_method("GET"))
            .and(url_path("/users/profile"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(fail_body("TOKEN_EXPIRED", "access token expired")),
            )
            .expect(1)
            .mount(&server)
            .await;
        let source = FakeSource::failing("at-stale");
        let gateway = gateway(&server, &source);

        let err = gateway
            .users()
            .get::<UserProfile>("/profile")
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::AuthExpired(_)));
        assert_eq!(source.refresh_count(), 1);
    }

    // =====================================================================
    // Pass-through errors
    // =====================================================================

    #[tokio::test]
    async fn test_server_error_passes_through() {
        let server = MockServer::start().await;
        // A proxy-style error page, not even an envelope.
        Mock::given(http_method("GET"))
            .and(url_path("/cards/collection"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .expect(1)
            .mount(&server)
            .await;
        let source = FakeSource::with_token("at-1");
        let gateway = gateway(&server, &source);

        let err = gateway
            .cards()
            .get::<Value>("/collection")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GatewayError::Api {
                status: 502,
                code: None,
                ..
            }
        ));
        assert_eq!(source.refresh_count(), 0);
    }

    #[tokio::test]
    async fn test_success_false_envelope_is_an_api_error() {
        let server = MockServer::start().await;
        Mock::given(http_method("GET"))
            .and(url_path("/clans/roster"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(fail_body("RATE_LIMITED", "slow down")),
            )
            .mount(&server)
            .await;
        let source = FakeSource::with_token("at-1");
        let gateway = gateway(&server, &source);

        let err = gateway.clans().get::<Value>("/roster").await.unwrap_err();

        assert!(matches!(
            err,
            GatewayError::Api {
                status: 200,
                code: Some(ErrorCode::RateLimited),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(http_method("GET"))
            .and(url_path("/users/profile"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;
        let source = FakeSource::with_token("at-1");
        let gateway = gateway(&server, &source);

        let err = gateway
            .users()
            .get::<UserProfile>("/profile")
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Decode(_)));
    }

    #[tokio::test]
    async fn test_missing_data_for_typed_caller_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(http_method("GET"))
            .and(url_path("/users/profile"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .mount(&server)
            .await;
        let source = FakeSource::with_token("at-1");
        let gateway = gateway(&server, &source);

        let err = gateway
            .users()
            .get::<UserProfile>("/profile")
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Decode(_)));
    }
}
