use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub img: String,
    pub created_time: DateTime<Utc>,
    /// `None` until the note is updated for the first time
    pub updated_time: Option<DateTime<Utc>>,
}
