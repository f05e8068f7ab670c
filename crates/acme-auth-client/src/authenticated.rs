//! Bearer-token requests that recover once from a stale access token.

use crate::error::{ApiError, AuthError, AuthResult};
use crate::session::SessionController;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, IntoUrl, Method, Request, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Retries allowed per logical request after a 401.
pub const MAX_AUTH_RETRIES: u32 = 1;

/// HTTP client that attaches the session's access token to every request.
#[derive(Clone)]
pub struct AuthenticatedClient {
    session: Arc<SessionController>,
    http_client: Client,
}

impl AuthenticatedClient {
    pub fn new(session: Arc<SessionController>, http_client: Client) -> Self {
        Self {
            session,
            http_client,
        }
    }

    pub fn session(&self) -> &Arc<SessionController> {
        &self.session
    }

    /// Start building a request for [`fetch`](Self::fetch).
    pub fn request<U: IntoUrl>(&self, method: Method, url: U) -> RequestBuilder {
        self.http_client.request(method, url)
    }

    /// Send `request` with `Authorization: Bearer <access token>`.
    ///
    /// A 401 triggers one token refresh and one resend. A second 401 is
    /// returned like any other status; non-2xx responses are never turned
    /// into errors here. If the refresh fails the session is cleared and
    /// [`AuthError::SessionExpired`] returned.
    pub async fn fetch(&self, request: Request) -> AuthResult<Response> {
        let mut retries = 0;

        loop {
            let access_token = self
                .session
                .access_token()
                .ok_or(AuthError::NotAuthenticated)?;

            let mut attempt = request.try_clone().ok_or(AuthError::RequestNotCloneable)?;
            let mut bearer = HeaderValue::from_str(&format!("Bearer {}", access_token))?;
            bearer.set_sensitive(true);
            attempt.headers_mut().insert(AUTHORIZATION, bearer);

            let response = self.http_client.execute(attempt).await?;

            if response.status() != StatusCode::UNAUTHORIZED || retries >= MAX_AUTH_RETRIES {
                return Ok(response);
            }
            retries += 1;

            debug!(url = %request.url(), "Request unauthorized, refreshing access token");
            if let Err(e) = self.session.refresh_access_token().await {
                warn!(url = %request.url(), error = %e, "Refresh failed, session expired");
                self.session.logout();
                return Err(AuthError::SessionExpired);
            }
        }
    }

    /// Authenticated JSON call.
    ///
    /// Non-2xx responses become [`AuthError::Api`], built from the error
    /// envelope or, failing that, from the status line. An empty 2xx body
    /// decodes as JSON `null`.
    pub async fn json<T, B>(
        &self,
        method: Method,
        url: impl IntoUrl,
        body: Option<&B>,
    ) -> AuthResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut builder = self
            .http_client
            .request(method, url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = self.fetch(builder.build()?).await?;

        if !response.status().is_success() {
            return Err(ApiError::from_response(response).await.into());
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(serde_json::from_slice(b"null")?);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: impl IntoUrl) -> AuthResult<T> {
        self.json::<T, ()>(Method::GET, url, None).await
    }

    pub async fn post_json<T, B>(&self, url: impl IntoUrl, body: &B) -> AuthResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.json(Method::POST, url, Some(body)).await
    }
}
