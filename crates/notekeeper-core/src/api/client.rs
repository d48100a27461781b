//! Typed client for the notes server's auth and notes routes.
//!
//! Register and login go straight to the transport; everything that needs
//! a session goes through `AuthClient` so a rejected token is refreshed
//! transparently.

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::auth::{AuthClient, SessionStore};
use crate::models::{AuthResponse, Credentials, Note, NoteInput};

use super::{ApiError, ApiRequest, Transport};

// ============================================================================
// Constants
// ============================================================================

const REGISTER_PATH: &str = "/api/auth/register";
const LOGIN_PATH: &str = "/api/auth/login";
const NOTES_PATH: &str = "/api/notes";

pub struct NotesApi<T, S: ?Sized> {
    auth: AuthClient<T, S>,
}

impl<T, S> NotesApi<T, S>
where
    T: Transport,
    S: SessionStore + ?Sized,
{
    pub fn new(auth: AuthClient<T, S>) -> Self {
        Self { auth }
    }

    pub fn auth(&self) -> &AuthClient<T, S> {
        &self.auth
    }

    pub fn is_logged_in(&self) -> bool {
        self.auth.store().token().is_some()
    }

    // ===== Account =====

    /// Create an account and start a session for it
    pub async fn register(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let credentials = Credentials::new(email, password);
        credentials.validate_register()?;
        self.authenticate(REGISTER_PATH, &credentials).await
    }

    /// Log in and start a session
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let credentials = Credentials::new(email, password);
        credentials.validate_login()?;
        self.authenticate(LOGIN_PATH, &credentials).await
    }

    /// End the local session. The server keeps no session state.
    pub fn logout(&self) {
        self.auth.store().logout();
    }

    async fn authenticate(&self, path: &str, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        let request = ApiRequest::post(path).json(credentials)?;
        let response = self.auth.transport().request(request).await?;
        let auth: AuthResponse = response.json()?;

        info!(email = %credentials.email, "Authenticated");
        self.auth.store().set_auth(auth.user.clone(), auth.token.clone());
        Ok(auth)
    }

    // ===== Notes =====

    /// All notes of the current user, most recently updated first
    pub async fn list_notes(&self) -> Result<Vec<Note>, ApiError> {
        self.send(ApiRequest::get(NOTES_PATH)).await
    }

    pub async fn get_note(&self, id: &str) -> Result<Note, ApiError> {
        self.send(ApiRequest::get(note_path(id)?)).await
    }

    pub async fn create_note(&self, input: &NoteInput) -> Result<Note, ApiError> {
        input.validate()?;
        self.send(ApiRequest::post(NOTES_PATH).json(input)?).await
    }

    pub async fn update_note(&self, id: &str, input: &NoteInput) -> Result<Note, ApiError> {
        input.validate()?;
        self.send(ApiRequest::put(note_path(id)?).json(input)?).await
    }

    pub async fn delete_note(&self, id: &str) -> Result<(), ApiError> {
        let _: serde_json::Value = self.send(ApiRequest::delete(note_path(id)?)).await?;
        Ok(())
    }

    async fn send<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R, ApiError> {
        if self.auth.store().token().is_none() {
            return Err(ApiError::NotAuthenticated);
        }
        debug!(method = %request.method, endpoint = %request.endpoint, "Notes request");
        self.auth.call(request).await?.json()
    }
}

fn note_path(id: &str) -> Result<String, ApiError> {
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(ApiError::Validation(format!("Invalid note id: {:?}", id)));
    }
    Ok(format!("{}/{}", NOTES_PATH, id))
}
