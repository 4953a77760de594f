//! Data models for exports, conversations, messages, and media assets
//!
//! This module contains all data structures used throughout the application,
//! both the persisted rows and the aggregate views served by the dashboard.

use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One uploaded ZIP archive and the scope for everything derived from it
#[derive(Debug, Clone, Serialize)]
pub struct Export {
    /// Export identifier (UUID)
    pub id: String,
    /// User-supplied display name
    pub name: String,
    /// Filename of the uploaded archive
    pub original_filename: String,
    /// Upload timestamp (UTC)
    pub created_at: NaiveDateTime,
}

/// A conversation imported from an export
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    /// Conversation identifier (UUID)
    pub id: String,
    /// Owning export
    pub export_id: String,
    /// Identifier carried in the export JSON, if any
    pub external_id: Option<String>,
    /// Conversation title ("Untitled" when the export carries none)
    pub title: String,
    /// Category label; never empty, defaults to `uncategorized`
    pub category: String,
    /// Creation date from the export, if parseable
    pub conversation_date: Option<NaiveDateTime>,
    /// Import timestamp (UTC)
    pub created_at: NaiveDateTime,
}

/// A single message within a conversation
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    /// Message identifier (UUID)
    pub id: String,
    /// Owning export
    pub export_id: String,
    /// Owning conversation
    pub conversation_id: String,
    /// Author role ("unknown" when the export carries none)
    pub role: String,
    /// Message text content
    pub content: String,
    /// Zero-based order within the conversation
    pub position: i64,
    /// Message timestamp from the export, if parseable
    pub created_at: Option<NaiveDateTime>,
}

/// Media kind inferred from a file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// Image files (png, jpg, ...)
    Image,
    /// Audio files (mp3, wav, ...)
    Audio,
    /// Any other extracted file
    File,
}

const IMAGE_EXTS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp", "svg"];
const AUDIO_EXTS: &[&str] = &["mp3", "wav", "m4a", "ogg", "flac", "aac"];
// Entries that are export metadata, not user media.
const IGNORE_EXTS: &[&str] = &["json", "html", "md"];

impl AssetKind {
    /// Classify a filename by extension. Returns `None` for entries that
    /// should not be stored as media at all.
    #[must_use]
    pub fn classify(file_name: &str) -> Option<Self> {
        let ext = Path::new(file_name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if IGNORE_EXTS.contains(&ext.as_str()) {
            return None;
        }
        if IMAGE_EXTS.contains(&ext.as_str()) {
            return Some(Self::Image);
        }
        if AUDIO_EXTS.contains(&ext.as_str()) {
            return Some(Self::Audio);
        }
        Some(Self::File)
    }

    /// Database representation of the kind
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Audio => "audio",
            Self::File => "file",
        }
    }

    /// Parse the database representation back into a kind.
    ///
    /// The column is only ever written from [`Self::as_str`]; anything else
    /// is treated as a plain file.
    #[must_use]
    pub fn from_db(value: &str) -> Self {
        match value {
            "image" => Self::Image,
            "audio" => Self::Audio,
            _ => Self::File,
        }
    }
}

/// A non-JSON file extracted from an export's ZIP
#[derive(Debug, Clone, Serialize)]
pub struct Asset {
    /// Asset identifier (UUID)
    pub id: String,
    /// Owning export
    pub export_id: String,
    /// Best-effort link to a conversation mentioning the filename
    pub conversation_id: Option<String>,
    /// Best-effort link to the mentioning message
    pub message_id: Option<String>,
    /// Media kind
    pub kind: AssetKind,
    /// Filename inside the archive
    pub original_name: String,
    /// Stored path relative to the storage root
    pub storage_path: String,
    /// File size in bytes
    pub byte_size: i64,
    /// SHA-256 checksum of the file content
    pub checksum_sha256: String,
    /// Extraction timestamp (UTC)
    pub created_at: NaiveDateTime,
}

/// Everything produced by one import run, persisted in a single transaction
#[derive(Debug)]
pub struct ImportBundle {
    /// The export record
    pub export: Export,
    /// Conversations with their ordered messages
    pub conversations: Vec<(Conversation, Vec<Message>)>,
    /// Extracted media assets (already written to disk)
    pub assets: Vec<Asset>,
}

/// Conversation count for one category label within an export
#[derive(Debug, Clone, Serialize)]
pub struct CategoryCount {
    /// Category label
    pub category: String,
    /// Number of conversations carrying the label
    pub conversations: i64,
}

/// A conversation with its messages, as rendered on the dashboard
#[derive(Debug, Serialize)]
pub struct ConversationView {
    /// The conversation row
    #[serde(flatten)]
    pub conversation: Conversation,
    /// Messages in position order
    pub messages: Vec<Message>,
}

/// The per-export dashboard payload
#[derive(Debug, Serialize)]
pub struct Dashboard {
    /// The export being browsed
    pub export: Export,
    /// Conversations matching the active filters, newest first
    pub conversations: Vec<ConversationView>,
    /// Category sidebar: counts over the whole export, unfiltered
    pub categories: Vec<CategoryCount>,
    /// Image gallery entries
    pub images: Vec<Asset>,
    /// Audio list entries
    pub audio: Vec<Asset>,
    /// Remaining attachment table entries
    pub files: Vec<Asset>,
    /// The category filter that was applied, if any
    pub selected_category: Option<String>,
    /// The search term that was applied, if any
    pub query: Option<String>,
}

/// Optional dashboard filters taken from the query string
#[derive(Debug, Default, Deserialize)]
pub struct DashboardFilter {
    /// Exact category label to filter by
    pub category: Option<String>,
    /// Substring to search message content for
    pub q: Option<String>,
}
