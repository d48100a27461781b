//! Core library for notekeeper, a client for a multi-user notes service.
//!
//! - `api`: HTTP transport, error taxonomy and the typed `NotesApi`
//! - `auth`: session store and the token-refreshing request pipeline
//! - `store`: local mirror of the user's notes
//! - `models`: users, notes and auth payloads
//! - `config`: server address and remembered login

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ApiError, HttpTransport, NotesApi};
pub use auth::{AuthClient, Session, SessionStore};
pub use config::Config;
pub use store::NotesStore;
