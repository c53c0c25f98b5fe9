//! Render generations: job records owned by the remote server.

use serde::{Deserialize, Serialize};

use crate::instruction::Instruction;

/// A render job as handed out by the job server. The server owns the
/// record; the worker mirrors the status locally only to drive its own
/// transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    #[serde(rename = "_id")]
    pub id: String,

    /// The timeline instruction to render.
    pub config: Instruction,

    #[serde(default)]
    pub status: GenerationStatus,
}

/// Server-visible job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationStatus {
    #[default]
    Queued,
    ResolvingMedia,
    Rendering,
    Done,
}

impl GenerationStatus {
    /// The wire string for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationStatus::Queued => "QUEUED",
            GenerationStatus::ResolvingMedia => "RESOLVING_MEDIA",
            GenerationStatus::Rendering => "RENDERING",
            GenerationStatus::Done => "DONE",
        }
    }
}

/// A registered media record, as returned by media registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRecord {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,

    /// Media kind tag (e.g. "video").
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(rename = "total_size", default)]
    pub total_size: u64,
}
