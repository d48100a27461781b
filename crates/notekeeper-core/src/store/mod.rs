//! Client-side state mirrored from the server.

pub mod notes;

pub use notes::NotesStore;
