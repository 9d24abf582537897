//! API client for the tr-site Django REST API.
//!
//! This module provides the `AuthApi` trait used by the authenticator and
//! `DjangoClient`, which implements it over HTTP.

use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::{Credentials, Registration, Session};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default `Authorization` scheme (Django REST framework `TokenAuthentication`)
pub const DEFAULT_AUTH_SCHEME: &str = "Token";

const LOGIN_PATH: &str = "auth/login/";
const REGISTER_PATH: &str = "auth/register/";
const LOGOUT_PATH: &str = "auth/logout/";

/// The remote authentication API.
///
/// Implementations attach the token given to `set_auth_token` to every
/// request they send afterwards.
pub trait AuthApi: Send + Sync + 'static {
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<Session, ApiError>> + Send;

    fn register(
        &self,
        profile: &Registration,
    ) -> impl Future<Output = Result<Session, ApiError>> + Send;

    /// Invalidate `token` on the server. With `None` the request is sent
    /// unauthenticated.
    fn logout(&self, token: Option<String>) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Set (or with `None`, drop) the token for subsequent requests
    fn set_auth_token(&self, token: Option<&str>);

    /// The token currently attached to requests
    fn auth_token(&self) -> Option<String>;
}

/// API client for the Django backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling,
/// and clones share the configured token.
#[derive(Clone)]
pub struct DjangoClient {
    client: Client,
    base_url: String,
    scheme: String,
    token: Arc<RwLock<Option<String>>>,
}

impl DjangoClient {
    /// Create a new API client for the given base URL (e.g. `https://host/api`)
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_scheme(base_url, DEFAULT_AUTH_SCHEME)
    }

    /// Create a client that uses `scheme` in the `Authorization` header
    pub fn with_scheme(base_url: &str, scheme: &str) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            scheme: scheme.to_string(),
            token: Arc::new(RwLock::new(None)),
        })
    }

    /// The token currently attached to requests
    pub fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn auth_headers(&self, token: Option<&str>) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        if let Some(token) = token {
            let value = header::HeaderValue::from_str(&format!("{} {}", self.scheme, token))
                .map_err(|_| ApiError::InvalidResponse("token is not a valid header value".into()))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn send_post<B: Serialize>(
        &self,
        url: &str,
        body: &B,
        token: Option<&str>,
    ) -> Result<reqwest::Response, ApiError> {
        let response = self
            .client
            .post(url)
            .headers(self.auth_headers(token)?)
            .json(body)
            .send()
            .await?;
        Self::check_response(response).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, url: &str, body: &B) -> Result<T, ApiError> {
        let token = self.token();
        let response = self.send_post(url, body, token.as_deref()).await?;
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", url, e)))
    }

    async fn post_session<B: Serialize>(&self, path: &str, body: &B) -> Result<Session, ApiError> {
        let url = self.url(path);
        debug!(url = %url, "Requesting session");
        let session: Session = self.post(&url, body).await?;
        if !session.is_valid() {
            return Err(ApiError::InvalidResponse(format!("Empty token in response from {}", url)));
        }
        Ok(session)
    }
}

impl AuthApi for DjangoClient {
    async fn login(&self, credentials: &Credentials) -> Result<Session, ApiError> {
        self.post_session(LOGIN_PATH, credentials).await
    }

    async fn register(&self, profile: &Registration) -> Result<Session, ApiError> {
        self.post_session(REGISTER_PATH, profile).await
    }

    async fn logout(&self, token: Option<String>) -> Result<(), ApiError> {
        let url = self.url(LOGOUT_PATH);
        debug!(url = %url, authenticated = token.is_some(), "Logging out");
        // Logout responds with an empty body
        self.send_post(&url, &serde_json::json!({}), token.as_deref()).await?;
        Ok(())
    }

    fn set_auth_token(&self, token: Option<&str>) {
        match self.token.write() {
            Ok(mut guard) => *guard = token.map(str::to_string),
            Err(_) => warn!("Token lock poisoned, auth token not updated"),
        }
    }

    fn auth_token(&self) -> Option<String> {
        self.token()
    }
}
