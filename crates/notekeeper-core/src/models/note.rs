use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::ApiError;

/// Maximum title length accepted by the notes routes.
const MAX_TITLE_LENGTH: usize = 255;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Note {
    /// First line of the content, for list views
    pub fn preview(&self, max_chars: usize) -> String {
        let first_line = self.content.lines().next().unwrap_or("");
        if first_line.chars().count() <= max_chars {
            first_line.to_string()
        } else {
            let cut: String = first_line.chars().take(max_chars).collect();
            format!("{}...", cut)
        }
    }
}

/// Title/content pair for create and update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteInput {
    pub title: String,
    pub content: String,
}

impl NoteInput {
    /// Build a trimmed input; call `validate` before sending.
    pub fn new(title: &str, content: &str) -> Self {
        Self {
            title: title.trim().to_string(),
            content: content.trim().to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        let title_len = self.title.trim().chars().count();
        if title_len == 0 {
            return Err(ApiError::Validation("Title is required".to_string()));
        }
        if title_len > MAX_TITLE_LENGTH {
            return Err(ApiError::Validation(format!(
                "Title must be at most {} characters",
                MAX_TITLE_LENGTH
            )));
        }
        if self.content.trim().is_empty() {
            return Err(ApiError::Validation("Content is required".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_parses_server_body() {
        let json = r#"{"id":"n1","title":"x","content":"hello","createdAt":"2025-01-02T03:04:05.000Z","updatedAt":"2025-01-03T03:04:05.000Z","userId":"u1"}"#;
        let note: Note = serde_json::from_str(json).unwrap();
        assert_eq!(note.id, "n1");
        assert_eq!(note.content, "hello");
        assert!(note.updated_at > note.created_at);
    }

    #[test]
    fn test_note_parses_minimal_body() {
        let notes: Vec<Note> = serde_json::from_str(r#"[{"id":"n1","title":"x"}]"#).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "x");
        assert_eq!(notes[0].content, "");
    }

    #[test]
    fn test_preview() {
        let note = Note {
            id: "n1".into(),
            title: "t".into(),
            content: "first line is long\nsecond".into(),
            created_at: None,
            updated_at: None,
        };
        assert_eq!(note.preview(100), "first line is long");
        assert_eq!(note.preview(5), "first...");
    }

    #[test]
    fn test_note_input_trims() {
        let input = NoteInput::new("  Title ", "\n body \n");
        assert_eq!(input.title, "Title");
        assert_eq!(input.content, "body");
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_note_input_validation() {
        assert!(NoteInput::new("   ", "body").validate().is_err());
        assert!(NoteInput::new("title", "  ").validate().is_err());
        assert!(NoteInput::new(&"t".repeat(255), "body").validate().is_ok());
        assert!(NoteInput::new(&"t".repeat(256), "body").validate().is_err());
    }
}
