//! Character profile and reference material types
//!
//! A `CharacterProfile` is the immutable input of a process: identity of the
//! fictional character plus an ordered list of user-supplied reference items.

use serde::{Deserialize, Serialize};

/// Sentinel location for file/image references whose bytes arrive as
/// multipart parts alongside the profile. Rewritten to a stored-file path
/// during upload handling, before the pipeline starts.
pub const PENDING_UPLOAD: &str = "PENDING_UPLOAD";

/// Reference material kind
///
/// Wire values match the frontend contract (`file` for documents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    /// Uploaded document (text, PDF)
    File,
    /// Uploaded image
    Image,
    /// Web page to crawl
    Url,
    /// Free-text search intent, resolved via the research provider
    Search,
}

/// One unit of user-supplied evidence about a character
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceItem {
    /// Optional client-side identifier (opaque, unused server-side)
    #[serde(default)]
    pub id: Option<String>,

    /// Reference kind
    pub resource_type: ReferenceKind,

    /// Reliability weight 1..4 (low/medium/high/certain)
    pub reliability_score: u8,

    /// Resolution location: file path, URL, or (for search) the rendered
    /// search-intent text. `PENDING_UPLOAD` until upload handling rewrites it.
    pub resource_url: String,

    /// Display name for the UI
    #[serde(default)]
    pub file_name: Option<String>,
}

/// Immutable character profile submitted by the user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterProfile {
    pub character_name: String,
    #[serde(default)]
    pub character_aliases: Vec<String>,
    #[serde(default)]
    pub source_work_name: String,
    #[serde(default)]
    pub source_work_aliases: Vec<String>,
    #[serde(default)]
    pub user_requirement: String,
    #[serde(default)]
    pub reference: Vec<ReferenceItem>,
}

/// Structured character card produced by the generative model
///
/// The synthesizer parses the model output leniently (raw JSON object
/// extraction); this type documents the expected shape and is used by
/// downstream consumers of the artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterCard {
    pub name: String,
    pub description: String,
    pub personality: String,
    pub scenario: String,
    pub first_mes: String,
    pub mes_example: String,
}

/// Human label for a reliability weight, used in generation prompts.
///
/// 5 is reserved for the synthesis task itself and never appears in
/// material prompts.
pub fn reliability_label(score: u8) -> &'static str {
    match score {
        0 | 1 => "low",
        2 => "medium",
        3 => "high",
        _ => "certain",
    }
}
