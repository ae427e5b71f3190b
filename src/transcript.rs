//! JSON record of a finished conversation

use crate::chat::{is_approved, ChatMessage};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct Transcript {
    pub id: Uuid,
    pub input: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub approved: bool,
    pub responses: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new(
        id: Uuid,
        input: impl Into<String>,
        started_at: DateTime<Utc>,
        responses: Vec<ChatMessage>,
    ) -> Self {
        Self {
            id,
            input: input.into(),
            started_at,
            completed_at: Utc::now(),
            approved: is_approved(&responses),
            responses,
        }
    }

    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        crate::artifact::write_artifact(path, &json)
    }
}
