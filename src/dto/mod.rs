use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Note;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn format_time(time: &DateTime<Utc>) -> String {
    time.format(TIME_FORMAT).to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NoteResponse {
    /// Note ID
    pub id: i64,
    /// Path or URL of the attached image, empty when there is none
    pub img: String,
    /// Note title
    pub title: String,
    /// Note content
    pub content: String,
    /// Creation time, `YYYY-MM-DD HH:MM:SS` UTC
    pub created_time: String,
    /// Last update time, null if the note was never updated
    pub updated_time: Option<String>,
}

impl From<Note> for NoteResponse {
    fn from(note: Note) -> Self {
        Self {
            id: note.id,
            img: note.img,
            title: note.title,
            content: note.content,
            created_time: format_time(&note.created_time),
            updated_time: note.updated_time.as_ref().map(format_time),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateNoteRequest {
    /// Note title
    #[serde(default)]
    pub title: String,
    /// Note content
    pub content: String,
    /// Path or URL of the attached image
    #[serde(default)]
    pub img: String,
    /// Accepted for compatibility, the server sets timestamps itself
    #[serde(default, rename = "createdAt")]
    pub created_at: Option<String>,
    /// Accepted for compatibility, the server sets timestamps itself
    #[serde(default, rename = "updatedAt")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateNoteRequest {
    /// Note title
    #[serde(default)]
    pub title: String,
    /// Note content
    pub content: String,
    /// Path or URL of the attached image
    #[serde(default)]
    pub img: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NoteEnvelope {
    pub message: String,
    pub note_info: NoteResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotesEnvelope {
    pub message: String,
    pub notes: Vec<NoteResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[serde(rename = "error message")]
    pub error_message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalyzeNoteForm {
    /// What the model should do with the note
    #[serde(default)]
    pub request: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalyzeNoteResponse {
    pub message: String,
    /// Raw Gemini response serialized as JSON
    pub result: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    #[test]
    fn note_response_formats_timestamps() {
        let note = Note {
            id: 3,
            title: "t".to_string(),
            content: "c".to_string(),
            img: String::new(),
            created_time: Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 15).unwrap(),
            updated_time: None,
        };

        let json = serde_json::to_value(NoteResponse::from(note)).unwrap();

        assert_eq!(json["created_time"], "2024-05-01 08:30:15");
        assert!(json["updated_time"].is_null());
    }

    #[test]
    fn create_request_defaults_optional_fields() {
        let request: CreateNoteRequest = serde_json::from_str(r#"{"content": "only"}"#).unwrap();

        assert_eq!(request.title, "");
        assert_eq!(request.img, "");
        assert!(request.created_at.is_none());
    }

    #[test]
    fn create_request_requires_content() {
        assert!(serde_json::from_str::<CreateNoteRequest>(r#"{"title": "t"}"#).is_err());
    }

    #[test]
    fn error_response_uses_spaced_key() {
        let json = serde_json::to_value(ErrorResponse {
            error_message: "boom".to_string(),
        })
        .unwrap();

        assert_eq!(json, serde_json::json!({"error message": "boom"}));
    }
}
