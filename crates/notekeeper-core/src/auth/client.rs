//! Authenticated request pipeline.
//!
//! `AuthClient::call` attaches the session's bearer token, and when the
//! server rejects a token the store still believes in, exchanges it once at
//! the refresh endpoint and replays the request with the new token.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::{ApiError, ApiRequest, ApiResponse, Transport};
use crate::models::AuthResponse;

use super::SessionStore;

/// Server route that trades a rejected token for a fresh one
pub const REFRESH_PATH: &str = "/api/auth/refresh";

/// Per-call progress. `Retrying` only leads to a terminal state, so a call
/// makes at most one refresh and at most two requests to its endpoint.
enum CallState {
    Initial,
    AwaitingRefresh { stale_token: String, rejected: ApiError },
    Retrying { token: String },
    Done(ApiResponse),
    Failed(ApiError),
}

/// What the refresh step produced.
enum Refreshed {
    /// A token to retry with, from our own refresh or a concurrent one.
    Token(String),
    /// A concurrent refresh failed and cleared the session.
    LoggedOut,
}

pub struct AuthClient<T, S: ?Sized> {
    transport: T,
    store: Arc<S>,
    refresh_path: String,
    // Held for the duration of a refresh so concurrent rejections share it.
    refresh_lock: Mutex<()>,
}

impl<T, S> AuthClient<T, S>
where
    T: Transport,
    S: SessionStore + ?Sized,
{
    pub fn new(transport: T, store: Arc<S>) -> Self {
        Self {
            transport,
            store,
            refresh_path: REFRESH_PATH.to_string(),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Execute one logical request on behalf of the caller.
    ///
    /// Only the `Authorization` header of `request` is touched. Errors other
    /// than 401/403 are returned untouched, as are 401/403 when there is no
    /// token or the store already considers it expired.
    pub async fn call(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut state = CallState::Initial;
        loop {
            state = match state {
                CallState::Initial => {
                    let token = self.store.token();
                    if let Some(ref token) = token {
                        request.set_bearer(token)?;
                    }
                    match self.transport.request(request.clone()).await {
                        Ok(response) => CallState::Done(response),
                        Err(e) if !e.is_auth_rejection() => CallState::Failed(e),
                        Err(e) => match token {
                            Some(stale_token) if !self.store.is_token_expired() => {
                                CallState::AwaitingRefresh {
                                    stale_token,
                                    rejected: e,
                                }
                            }
                            _ => {
                                debug!(endpoint = %request.endpoint, "Auth rejected with no usable token");
                                CallState::Failed(e)
                            }
                        },
                    }
                }
                CallState::AwaitingRefresh {
                    stale_token,
                    rejected,
                } => match self.refresh(&stale_token).await {
                    Ok(Refreshed::Token(token)) => CallState::Retrying { token },
                    Ok(Refreshed::LoggedOut) => CallState::Failed(rejected),
                    Err(e) => CallState::Failed(e),
                },
                CallState::Retrying { token } => {
                    request.set_bearer(&token)?;
                    debug!(endpoint = %request.endpoint, "Retrying with refreshed token");
                    match self.transport.request(request.clone()).await {
                        Ok(response) => CallState::Done(response),
                        Err(e) => CallState::Failed(e),
                    }
                }
                CallState::Done(response) => return Ok(response),
                CallState::Failed(e) => return Err(e),
            };
        }
    }

    /// Exchange `stale_token` for a new one, or reuse the result of a
    /// refresh that completed while we waited for the lock.
    async fn refresh(&self, stale_token: &str) -> Result<Refreshed, ApiError> {
        let _guard = self.refresh_lock.lock().await;

        match self.store.token() {
            None => return Ok(Refreshed::LoggedOut),
            Some(current) if current != stale_token => {
                debug!("Token already refreshed by a concurrent request");
                return Ok(Refreshed::Token(current));
            }
            Some(_) => {}
        }

        info!("Token rejected, attempting refresh");
        match self.request_refresh(stale_token).await {
            Ok(auth) => {
                self.store.set_auth(auth.user, auth.token.clone());
                Ok(Refreshed::Token(auth.token))
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, logging out");
                self.store.logout();
                Err(e)
            }
        }
    }

    async fn request_refresh(&self, stale_token: &str) -> Result<AuthResponse, ApiError> {
        let mut request = ApiRequest::post(self.refresh_path.as_str());
        request.set_bearer(stale_token)?;
        let response = self.transport.request(request).await?;
        response.json()
    }
}
