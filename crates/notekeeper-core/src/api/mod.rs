//! REST API module for the notes service.
//!
//! This module provides the `Transport` seam over HTTP, the `ApiError`
//! taxonomy, and `NotesApi`, the typed client for the auth and notes routes.
//!
//! The server uses JWT bearer token authentication; tokens are obtained
//! from the register/login endpoints and renewed through `/api/auth/refresh`.

pub mod client;
pub mod error;
pub mod transport;

pub use client::NotesApi;
pub use error::ApiError;
pub use reqwest::{Method, StatusCode};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};
