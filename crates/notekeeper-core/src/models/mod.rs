//! Data models for the notes service.
//!
//! - `User`, `AuthResponse`, `Credentials`: account and auth payloads
//! - `Note`, `NoteInput`: notes and their editable fields

pub mod note;
pub mod user;

pub use note::{Note, NoteInput};
pub use user::{AuthResponse, Credentials, User};
