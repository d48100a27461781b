//! Authentication module for managing user sessions and authenticated calls.
//!
//! This module provides:
//! - `SessionStore`: the auth store contract (token, expiry, set/clear)
//! - `Session`: shared session persisted to disk, tokens valid for 7 days
//! - `AuthClient`: request pipeline that refreshes a rejected token once
//!   and replays the request

pub mod client;
pub mod session;

pub use client::{AuthClient, REFRESH_PATH};
pub use session::{Session, SessionData, SessionStore};
