//! Repository pattern for data access
//!
//! All reads and writes against the export tables go through
//! [`ExportRepository`]. Every query except the export listing is scoped by
//! export identifier; nothing here ever crosses export boundaries.

use rusqlite::{params, OptionalExtension, Row, ToSql};
use tracing::debug;

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{
    Asset, AssetKind, CategoryCount, Conversation, Export, ImportBundle, Message,
};
use crate::schema::{assets, conversations, exports, messages};

/// Data access layer over the export tables
#[derive(Clone)]
pub struct ExportRepository {
    db: Database,
}

impl ExportRepository {
    /// Create a repository over the given database
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Persist everything produced by one import run in a single transaction.
    ///
    /// Media files are already on disk at this point; a failure here leaves
    /// orphaned files but no partial rows.
    pub fn persist_import(&self, bundle: &ImportBundle) -> Result<()> {
        let mut conn = self.db.get_connection()?;
        let tx = conn.transaction()?;

        tx.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}, {}) VALUES (?, ?, ?, ?)",
                exports::TABLE,
                exports::ID,
                exports::NAME,
                exports::ORIGINAL_FILENAME,
                exports::CREATED_AT
            ),
            params![
                bundle.export.id,
                bundle.export.name,
                bundle.export.original_filename,
                bundle.export.created_at
            ],
        )?;

        for (conversation, msgs) in &bundle.conversations {
            tx.execute(
                &format!(
                    "INSERT INTO {} ({}, {}, {}, {}, {}, {}, {}) VALUES (?, ?, ?, ?, ?, ?, ?)",
                    conversations::TABLE,
                    conversations::ID,
                    conversations::EXPORT_ID,
                    conversations::EXTERNAL_ID,
                    conversations::TITLE,
                    conversations::CATEGORY,
                    conversations::CONVERSATION_DATE,
                    conversations::CREATED_AT
                ),
                params![
                    conversation.id,
                    conversation.export_id,
                    conversation.external_id,
                    conversation.title,
                    conversation.category,
                    conversation.conversation_date,
                    conversation.created_at
                ],
            )?;

            for message in msgs {
                tx.execute(
                    &format!(
                        "INSERT INTO {} ({}, {}, {}, {}, {}, {}, {}) VALUES (?, ?, ?, ?, ?, ?, ?)",
                        messages::TABLE,
                        messages::ID,
                        messages::EXPORT_ID,
                        messages::CONVERSATION_ID,
                        messages::ROLE,
                        messages::CONTENT,
                        messages::POSITION,
                        messages::CREATED_AT
                    ),
                    params![
                        message.id,
                        message.export_id,
                        message.conversation_id,
                        message.role,
                        message.content,
                        message.position,
                        message.created_at
                    ],
                )?;
            }
        }

        for asset in &bundle.assets {
            tx.execute(
                &format!(
                    "INSERT INTO {} ({}, {}, {}, {}, {}, {}, {}, {}, {}, {}) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    assets::TABLE,
                    assets::ID,
                    assets::EXPORT_ID,
                    assets::CONVERSATION_ID,
                    assets::MESSAGE_ID,
                    assets::KIND,
                    assets::ORIGINAL_NAME,
                    assets::STORAGE_PATH,
                    assets::BYTE_SIZE,
                    assets::CHECKSUM_SHA256,
                    assets::CREATED_AT
                ),
                params![
                    asset.id,
                    asset.export_id,
                    asset.conversation_id,
                    asset.message_id,
                    asset.kind.as_str(),
                    asset.original_name,
                    asset.storage_path,
                    asset.byte_size,
                    asset.checksum_sha256,
                    asset.created_at
                ],
            )?;
        }

        tx.commit()?;
        debug!(export_id = bundle.export.id, "import persisted");
        Ok(())
    }

    /// Get all exports, newest first
    pub fn list_exports(&self) -> Result<Vec<Export>> {
        let conn = self.db.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} ORDER BY {} DESC",
            exports::TABLE,
            exports::CREATED_AT
        ))?;

        let rows = stmt.query_map([], map_export)?;
        let mut results = Vec::new();
        for export in rows {
            results.push(export?);
        }

        Ok(results)
    }

    /// Get an export by id
    pub fn get_export(&self, export_id: &str) -> Result<Option<Export>> {
        let conn = self.db.get_connection()?;
        let export = conn
            .query_row(
                &format!(
                    "SELECT * FROM {} WHERE {} = ?",
                    exports::TABLE,
                    exports::ID
                ),
                params![export_id],
                map_export,
            )
            .optional()?;

        Ok(export)
    }

    /// Get conversations in an export, optionally filtered by exact category
    /// label and/or a case-insensitive substring match on message content.
    /// Ordered by conversation date (falling back to import time), newest
    /// first.
    pub fn conversations(
        &self,
        export_id: &str,
        category: Option<&str>,
        search: Option<&str>,
    ) -> Result<Vec<Conversation>> {
        let conn = self.db.get_connection()?;

        let mut query = format!(
            "SELECT * FROM {} WHERE {} = ?",
            conversations::TABLE,
            conversations::EXPORT_ID
        );
        let mut query_params: Vec<Box<dyn ToSql>> = vec![Box::new(export_id.to_string())];

        if let Some(label) = category {
            query.push_str(&format!(" AND {} = ?", conversations::CATEGORY));
            query_params.push(Box::new(label.to_string()));
        }

        if let Some(term) = search {
            query.push_str(&format!(
                " AND EXISTS (SELECT 1 FROM {msgs} WHERE {msgs}.{conv_id} = {convs}.{id} \
                 AND lower({msgs}.{content}) LIKE ?)",
                msgs = messages::TABLE,
                conv_id = messages::CONVERSATION_ID,
                convs = conversations::TABLE,
                id = conversations::ID,
                content = messages::CONTENT
            ));
            query_params.push(Box::new(format!("%{}%", term.to_lowercase())));
        }

        query.push_str(&format!(
            " ORDER BY COALESCE({}, {}) DESC",
            conversations::CONVERSATION_DATE,
            conversations::CREATED_AT
        ));

        let param_refs: Vec<&dyn ToSql> = query_params.iter().map(Box::as_ref).collect();
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt.query_map(&param_refs[..], map_conversation)?;

        let mut results = Vec::new();
        for conversation in rows {
            results.push(conversation?);
        }

        Ok(results)
    }

    /// Get a conversation by id, scoped to an export
    pub fn get_conversation(
        &self,
        export_id: &str,
        conversation_id: &str,
    ) -> Result<Option<Conversation>> {
        let conn = self.db.get_connection()?;
        let conversation = conn
            .query_row(
                &format!(
                    "SELECT * FROM {} WHERE {} = ? AND {} = ?",
                    conversations::TABLE,
                    conversations::ID,
                    conversations::EXPORT_ID
                ),
                params![conversation_id, export_id],
                map_conversation,
            )
            .optional()?;

        Ok(conversation)
    }

    /// Get the messages of a conversation in position order
    pub fn messages_for_conversation(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let conn = self.db.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} WHERE {} = ? ORDER BY {} ASC",
            messages::TABLE,
            messages::CONVERSATION_ID,
            messages::POSITION
        ))?;

        let rows = stmt.query_map(params![conversation_id], map_message)?;
        let mut results = Vec::new();
        for message in rows {
            results.push(message?);
        }

        Ok(results)
    }

    /// Category sidebar: conversation counts per category within an export
    pub fn category_counts(&self, export_id: &str) -> Result<Vec<CategoryCount>> {
        let conn = self.db.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {cat}, COUNT(*) AS conversation_count FROM {table} \
             WHERE {export} = ? GROUP BY {cat} ORDER BY {cat} ASC",
            cat = conversations::CATEGORY,
            table = conversations::TABLE,
            export = conversations::EXPORT_ID
        ))?;

        let rows = stmt.query_map(params![export_id], |row| {
            Ok(CategoryCount {
                category: row.get(0)?,
                conversations: row.get(1)?,
            })
        })?;

        let mut results = Vec::new();
        for count in rows {
            results.push(count?);
        }

        Ok(results)
    }

    /// Get all media assets of an export, newest first
    pub fn assets_for_export(&self, export_id: &str) -> Result<Vec<Asset>> {
        let conn = self.db.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} WHERE {} = ? ORDER BY {} DESC",
            assets::TABLE,
            assets::EXPORT_ID,
            assets::CREATED_AT
        ))?;

        let rows = stmt.query_map(params![export_id], map_asset)?;
        let mut results = Vec::new();
        for asset in rows {
            results.push(asset?);
        }

        Ok(results)
    }

    /// Get a media asset by id, scoped to an export
    pub fn get_asset(&self, export_id: &str, asset_id: &str) -> Result<Option<Asset>> {
        let conn = self.db.get_connection()?;
        let asset = conn
            .query_row(
                &format!(
                    "SELECT * FROM {} WHERE {} = ? AND {} = ?",
                    assets::TABLE,
                    assets::ID,
                    assets::EXPORT_ID
                ),
                params![asset_id, export_id],
                map_asset,
            )
            .optional()?;

        Ok(asset)
    }

    /// Rename a category within an export.
    ///
    /// Updates every conversation carrying the old label; a no-op when the
    /// label is absent. Returns the number of conversations updated.
    pub fn rename_category(&self, export_id: &str, old: &str, new: &str) -> Result<usize> {
        if self.get_export(export_id)?.is_none() {
            return Err(AppError::NotFound(format!("export {export_id}")));
        }

        let conn = self.db.get_connection()?;
        let updated = conn.execute(
            &format!(
                "UPDATE {} SET {} = ? WHERE {} = ? AND {} = ?",
                conversations::TABLE,
                conversations::CATEGORY,
                conversations::EXPORT_ID,
                conversations::CATEGORY
            ),
            params![new, export_id, old],
        )?;

        debug!(export_id, old, new, updated, "category renamed");
        Ok(updated)
    }

    /// Move one conversation to a target category (existing or brand new)
    pub fn move_conversation(
        &self,
        export_id: &str,
        conversation_id: &str,
        target: &str,
    ) -> Result<()> {
        let conn = self.db.get_connection()?;
        let updated = conn.execute(
            &format!(
                "UPDATE {} SET {} = ? WHERE {} = ? AND {} = ?",
                conversations::TABLE,
                conversations::CATEGORY,
                conversations::ID,
                conversations::EXPORT_ID
            ),
            params![target, conversation_id, export_id],
        )?;

        if updated == 0 {
            return Err(AppError::NotFound(format!(
                "conversation {conversation_id} in export {export_id}"
            )));
        }

        debug!(export_id, conversation_id, target, "conversation moved");
        Ok(())
    }

    /// Count conversations in an export
    pub fn count_conversations(&self, export_id: &str) -> Result<i64> {
        let conn = self.db.get_connection()?;
        let count = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE {} = ?",
                conversations::TABLE,
                conversations::EXPORT_ID
            ),
            params![export_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Count messages in an export
    pub fn count_messages(&self, export_id: &str) -> Result<i64> {
        let conn = self.db.get_connection()?;
        let count = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE {} = ?",
                messages::TABLE,
                messages::EXPORT_ID
            ),
            params![export_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

/// Map a database row to an Export
fn map_export(row: &Row) -> rusqlite::Result<Export> {
    Ok(Export {
        id: row.get(exports::ID)?,
        name: row.get(exports::NAME)?,
        original_filename: row.get(exports::ORIGINAL_FILENAME)?,
        created_at: row.get(exports::CREATED_AT)?,
    })
}

/// Map a database row to a Conversation
fn map_conversation(row: &Row) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(conversations::ID)?,
        export_id: row.get(conversations::EXPORT_ID)?,
        external_id: row.get(conversations::EXTERNAL_ID)?,
        title: row.get(conversations::TITLE)?,
        category: row.get(conversations::CATEGORY)?,
        conversation_date: row.get(conversations::CONVERSATION_DATE)?,
        created_at: row.get(conversations::CREATED_AT)?,
    })
}

/// Map a database row to a Message
fn map_message(row: &Row) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(messages::ID)?,
        export_id: row.get(messages::EXPORT_ID)?,
        conversation_id: row.get(messages::CONVERSATION_ID)?,
        role: row.get(messages::ROLE)?,
        content: row.get(messages::CONTENT)?,
        position: row.get(messages::POSITION)?,
        created_at: row.get(messages::CREATED_AT)?,
    })
}

/// Map a database row to an Asset
fn map_asset(row: &Row) -> rusqlite::Result<Asset> {
    let kind: String = row.get(assets::KIND)?;
    Ok(Asset {
        id: row.get(assets::ID)?,
        export_id: row.get(assets::EXPORT_ID)?,
        conversation_id: row.get(assets::CONVERSATION_ID)?,
        message_id: row.get(assets::MESSAGE_ID)?,
        kind: AssetKind::from_db(&kind),
        original_name: row.get(assets::ORIGINAL_NAME)?,
        storage_path: row.get(assets::STORAGE_PATH)?,
        byte_size: row.get(assets::BYTE_SIZE)?,
        checksum_sha256: row.get(assets::CHECKSUM_SHA256)?,
        created_at: row.get(assets::CREATED_AT)?,
    })
}
