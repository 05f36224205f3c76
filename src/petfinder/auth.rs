//! OAuth client-credentials token lifecycle for the Petfinder API.
//!
//! Tokens are cached per client id for the life of the `TokenManager`
//! and refreshed 60 seconds before Petfinder says they expire. The cache
//! slot for a client id is locked across the exchange, so concurrent
//! callers wait for a single refresh instead of issuing their own.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::models::petfinder::TokenResponse;

/// Refresh this long before the server-side expiry.
pub const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"****")
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Petfinder authentication failed: {status}")]
    Rejected { status: String },

    #[error("token request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Source of "now". Injected so expiry can be tested without waiting.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    /// Already reduced by the safety margin.
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn from_response(resp: TokenResponse, issued_at: DateTime<Utc>) -> Self {
        let expires_at = issued_at + Duration::seconds(resp.expires_in)
            - Duration::seconds(EXPIRY_MARGIN_SECS);
        Self {
            access_token: resp.access_token,
            token_type: resp.token_type,
            expires_in: resp.expires_in,
            expires_at,
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

type TokenSlot = Arc<Mutex<Option<AccessToken>>>;

pub struct TokenManager {
    http: reqwest::Client,
    token_url: String,
    clock: Arc<dyn Clock>,
    cache: DashMap<String, TokenSlot>,
}

impl TokenManager {
    pub fn new(http: reqwest::Client, api_url: &str) -> Self {
        Self::with_clock(http, api_url, Arc::new(SystemClock))
    }

    pub fn with_clock(http: reqwest::Client, api_url: &str, clock: Arc<dyn Clock>) -> Self {
        Self {
            http,
            token_url: format!("{}/oauth2/token", api_url.trim_end_matches('/')),
            clock,
            cache: DashMap::new(),
        }
    }

    /// Return the cached token if still valid, otherwise exchange the
    /// credentials for a new one. Failures are not retried here.
    pub async fn get_valid_token(&self, creds: &Credentials) -> Result<AccessToken, AuthError> {
        let slot = self.slot(&creds.client_id);
        let mut cached = slot.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.is_valid_at(self.clock.now()) {
                return Ok(token.clone());
            }
            tracing::debug!(client_id = %creds.client_id, "Petfinder token expired, refreshing");
        }

        let token = self.exchange(creds).await?;
        *cached = Some(token.clone());
        Ok(token)
    }

    /// Drop the cached token, e.g. after the API answered 401.
    pub async fn invalidate(&self, client_id: &str) {
        if let Some(slot) = self.cache.get(client_id).map(|s| s.value().clone()) {
            *slot.lock().await = None;
        }
    }

    fn slot(&self, client_id: &str) -> TokenSlot {
        self.cache
            .entry(client_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .value()
            .clone()
    }

    async fn exchange(&self, creds: &Credentials) -> Result<AccessToken, AuthError> {
        tracing::info!(client_id = %creds.client_id, "Requesting Petfinder access token");

        let resp = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", creds.client_id.as_str()),
                ("client_secret", creds.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(status = %status, "Petfinder token exchange rejected");
            return Err(AuthError::Rejected {
                status: status.to_string(),
            });
        }

        let body: TokenResponse = resp.json().await?;
        Ok(AccessToken::from_response(body, self.clock.now()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Clock that only moves when told to.
    pub struct ManualClock(std::sync::Mutex<DateTime<Utc>>);

    impl ManualClock {
        pub fn new(start: DateTime<Utc>) -> Self {
            Self(std::sync::Mutex::new(start))
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now = *now + by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn creds() -> Credentials {
        Credentials {
            client_id: "client-abc".into(),
            client_secret: "s3cret".into(),
        }
    }

    async fn token_endpoint(server: &MockServer, expires_in: i64) {
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_id=client-abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token_type": "Bearer",
                "expires_in": expires_in,
                "access_token": "tok-1"
            })))
            .mount(server)
            .await;
    }

    #[test]
    fn test_expiry_includes_margin() {
        let issued = Utc::now();
        let token = AccessToken::from_response(
            TokenResponse {
                token_type: "Bearer".into(),
                expires_in: 3600,
                access_token: "x".into(),
            },
            issued,
        );
        assert_eq!(token.expires_at, issued + Duration::seconds(3540));
        assert!(token.is_valid_at(issued + Duration::seconds(3539)));
        // Strictly before: the boundary itself is already invalid.
        assert!(!token.is_valid_at(issued + Duration::seconds(3540)));
    }

    #[tokio::test]
    async fn test_token_reused_until_expiry() {
        let server = MockServer::start().await;
        token_endpoint(&server, 3600).await;

        let clock = Arc::new(ManualClock::new(Utc::now()));
        let manager = TokenManager::with_clock(reqwest::Client::new(), &server.uri(), clock.clone());

        let first = manager.get_valid_token(&creds()).await.unwrap();
        let second = manager.get_valid_token(&creds()).await.unwrap();
        assert_eq!(first.access_token, second.access_token);
        assert_eq!(server.received_requests().await.unwrap().len(), 1);

        // Past expires_in - margin
        clock.advance(Duration::seconds(3541));
        manager.get_valid_token(&creds()).await.unwrap();
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rejected_exchange_carries_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let manager = TokenManager::new(reqwest::Client::new(), &server.uri());
        let err = manager.get_valid_token(&creds()).await.unwrap_err();
        match err {
            AuthError::Rejected { status } => assert!(status.contains("401")),
            other => panic!("expected Rejected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_exchange() {
        let server = MockServer::start().await;
        token_endpoint(&server, 3600).await;

        let manager = Arc::new(TokenManager::new(reqwest::Client::new(), &server.uri()));
        let mut handles = Vec::new();
        for _ in 0..5 {
            let m = manager.clone();
            handles.push(tokio::spawn(async move { m.get_valid_token(&creds()).await }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let server = MockServer::start().await;
        token_endpoint(&server, 3600).await;

        let manager = TokenManager::new(reqwest::Client::new(), &server.uri());
        manager.get_valid_token(&creds()).await.unwrap();
        manager.invalidate("client-abc").await;
        manager.get_valid_token(&creds()).await.unwrap();

        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }
}
