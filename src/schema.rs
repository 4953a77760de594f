//! Database schema definitions
//!
//! This module provides constants for table and column names used with rusqlite.
//! The SQL itself lives under `migrations/` and is applied at startup.

/// Exports table schema
pub mod exports {
    /// Table name
    pub const TABLE: &str = "exports";
    /// Primary key column
    pub const ID: &str = "id";
    /// User-supplied display name column
    pub const NAME: &str = "name";
    /// Original upload filename column
    pub const ORIGINAL_FILENAME: &str = "original_filename";
    /// Upload timestamp column
    pub const CREATED_AT: &str = "created_at";
}

/// Conversations table schema
pub mod conversations {
    /// Table name
    pub const TABLE: &str = "conversations";
    /// Primary key column
    pub const ID: &str = "id";
    /// Foreign key to exports table
    pub const EXPORT_ID: &str = "export_id";
    /// Identifier carried in the export JSON
    pub const EXTERNAL_ID: &str = "external_id";
    /// Conversation title column
    pub const TITLE: &str = "title";
    /// Category label column (the only mutable column)
    pub const CATEGORY: &str = "category";
    /// Conversation creation date from the export
    pub const CONVERSATION_DATE: &str = "conversation_date";
    /// Import timestamp column
    pub const CREATED_AT: &str = "created_at";
}

/// Messages table schema
pub mod messages {
    /// Table name
    pub const TABLE: &str = "messages";
    /// Primary key column
    pub const ID: &str = "id";
    /// Foreign key to exports table
    pub const EXPORT_ID: &str = "export_id";
    /// Foreign key to conversations table
    pub const CONVERSATION_ID: &str = "conversation_id";
    /// Author role column (user, assistant, ...)
    pub const ROLE: &str = "role";
    /// Message text content column
    pub const CONTENT: &str = "content";
    /// Order of the message within its conversation
    pub const POSITION: &str = "position";
    /// Message timestamp column (nullable)
    pub const CREATED_AT: &str = "created_at";
}

/// Assets table schema
pub mod assets {
    /// Table name
    pub const TABLE: &str = "assets";
    /// Primary key column
    pub const ID: &str = "id";
    /// Foreign key to exports table
    pub const EXPORT_ID: &str = "export_id";
    /// Advisory link to a conversation (nullable, filename heuristic)
    pub const CONVERSATION_ID: &str = "conversation_id";
    /// Advisory link to a message (nullable, filename heuristic)
    pub const MESSAGE_ID: &str = "message_id";
    /// Media kind column (image, audio, file)
    pub const KIND: &str = "kind";
    /// Original filename inside the archive
    pub const ORIGINAL_NAME: &str = "original_name";
    /// Path relative to the storage root
    pub const STORAGE_PATH: &str = "storage_path";
    /// File size in bytes column
    pub const BYTE_SIZE: &str = "byte_size";
    /// SHA-256 checksum column
    pub const CHECKSUM_SHA256: &str = "checksum_sha256";
    /// Extraction timestamp column
    pub const CREATED_AT: &str = "created_at";
}
