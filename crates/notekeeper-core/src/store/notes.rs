use tracing::{debug, warn};

use crate::api::{ApiError, NotesApi, Transport};
use crate::auth::SessionStore;
use crate::models::{Note, NoteInput};

/// Local mirror of the current user's notes.
///
/// Every mutation hits the server first; the local list only changes once
/// the server has accepted it.
#[derive(Debug, Default)]
pub struct NotesStore {
    notes: Vec<Note>,
    error: Option<String>,
}

impl NotesStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn note(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    /// Message from the last failed fetch
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Replace the local list with the server's. Failures are recorded in
    /// `error` and leave the previous list in place. Without a session the
    /// list is emptied.
    pub async fn fetch<T, S>(&mut self, api: &NotesApi<T, S>)
    where
        T: Transport,
        S: SessionStore + ?Sized,
    {
        if !api.is_logged_in() {
            self.clear();
            return;
        }

        self.error = None;

        match api.list_notes().await {
            Ok(notes) => {
                debug!(count = notes.len(), "Notes fetched");
                self.notes = notes;
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch notes");
                self.error = Some(e.server_message());
            }
        }
    }

    pub async fn create<T, S>(&mut self, api: &NotesApi<T, S>, input: &NoteInput) -> Result<Note, ApiError>
    where
        T: Transport,
        S: SessionStore + ?Sized,
    {
        let note = api.create_note(input).await?;
        self.notes.insert(0, note.clone());
        Ok(note)
    }

    pub async fn update<T, S>(
        &mut self,
        api: &NotesApi<T, S>,
        id: &str,
        input: &NoteInput,
    ) -> Result<Note, ApiError>
    where
        T: Transport,
        S: SessionStore + ?Sized,
    {
        let note = api.update_note(id, input).await?;
        if let Some(slot) = self.notes.iter_mut().find(|n| n.id == id) {
            *slot = note.clone();
        }
        Ok(note)
    }

    pub async fn delete<T, S>(&mut self, api: &NotesApi<T, S>, id: &str) -> Result<(), ApiError>
    where
        T: Transport,
        S: SessionStore + ?Sized,
    {
        api.delete_note(id).await?;
        self.notes.retain(|n| n.id != id);
        Ok(())
    }

    /// Drop everything, e.g. after logout
    pub fn clear(&mut self) {
        self.notes.clear();
        self.error = None;
    }
}
