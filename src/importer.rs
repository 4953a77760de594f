//! Import pipeline: ZIP upload to persisted export
//!
//! The pipeline runs synchronously inside the upload request. It validates
//! the archive, parses `conversations.json`, classifies each conversation,
//! extracts media to a per-export directory, and persists everything in one
//! transaction scoped to a freshly minted export identifier.
//!
//! Validation failures abort before any row is written. Filesystem writes
//! happen before the database transaction and are not atomic with it; a
//! failure in between can leave orphaned files, which is accepted and
//! logged.

use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Read, Seek};
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;
use zip::ZipArchive;

use crate::categorize;
use crate::db::Database;
use crate::error::{AppError, Result};
use crate::logging::OperationTimer;
use crate::metrics::MetricsCollector;
use crate::models::{Asset, AssetKind, Conversation, Export, ImportBundle, Message};
use crate::repository::ExportRepository;
use crate::validation::InputValidator;

/// The conversations file every export must carry
const CONVERSATIONS_FILE: &str = "conversations.json";

/// Raw conversation as it appears in the export JSON. Everything is optional;
/// real exports are messy, including literal `null` mapping nodes and
/// timestamps written as strings.
#[derive(Debug, Deserialize)]
struct RawConversation {
    id: Option<String>,
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient_epoch")]
    create_time: Option<f64>,
    // BTreeMap keeps tie-breaking deterministic when timestamps are absent.
    mapping: Option<BTreeMap<String, Option<RawNode>>>,
}

#[derive(Debug, Deserialize)]
struct RawNode {
    message: Option<RawMessage>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    author: Option<RawAuthor>,
    content: Option<RawContent>,
    #[serde(default, deserialize_with = "lenient_epoch")]
    create_time: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawAuthor {
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawContent {
    parts: Option<Vec<serde_json::Value>>,
}

/// Synchronous upload-to-export pipeline.
///
/// The call boundary is deliberately narrow (`run(zip_bytes, ..) -> export
/// id`) so a future move to background execution only changes the caller.
pub struct ImportPipeline {
    repo: ExportRepository,
    storage_root: PathBuf,
}

impl ImportPipeline {
    /// Create a pipeline writing to the given database and storage root
    pub fn new(db: Database, storage_root: impl Into<PathBuf>) -> Self {
        Self {
            repo: ExportRepository::new(db),
            storage_root: storage_root.into(),
        }
    }

    /// Run the full import and return the new export identifier
    pub fn run(&self, zip_bytes: &[u8], name: &str, original_filename: &str) -> Result<String> {
        let timer = OperationTimer::new("import");

        let mut archive = ZipArchive::new(Cursor::new(zip_bytes))
            .map_err(|e| AppError::Validation(format!("not a valid ZIP archive: {e}")))?;

        let conversations_entry = find_conversations_entry(&mut archive)?;
        let raw_conversations = parse_conversations(&mut archive, &conversations_entry)?;

        let export_id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();
        let export = Export {
            id: export_id.clone(),
            name: name.to_string(),
            original_filename: original_filename.to_string(),
            created_at: now,
        };

        let mut assets = self.extract_assets(&mut archive, &export_id, &conversations_entry, now)?;
        let conversations = build_conversations(raw_conversations, &export_id, now, &mut assets);

        let bundle = ImportBundle {
            export,
            conversations,
            assets,
        };
        self.repo.persist_import(&bundle)?;

        let message_count: usize = bundle.conversations.iter().map(|(_, m)| m.len()).sum();
        info!(
            export_id,
            conversations = bundle.conversations.len(),
            messages = message_count,
            assets = bundle.assets.len(),
            "import complete"
        );

        let elapsed_ms = timer.finish();
        MetricsCollector::record_import(
            bundle.conversations.len(),
            message_count,
            bundle.assets.len(),
            Duration::from_millis(u64::try_from(elapsed_ms).unwrap_or(u64::MAX)),
        );

        Ok(export_id)
    }

    /// Extract every media entry to the per-export assets directory.
    ///
    /// Stored names are prefixed with the asset id so original filenames can
    /// never collide. Entries with unsafe paths are skipped, not fatal.
    fn extract_assets<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        export_id: &str,
        conversations_entry: &str,
        now: NaiveDateTime,
    ) -> Result<Vec<Asset>> {
        let assets_dir = self
            .storage_root
            .join("exports")
            .join(export_id)
            .join("assets");
        fs::create_dir_all(&assets_dir)?;

        let mut results = Vec::new();
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            if !entry.is_file() || entry.name() == conversations_entry {
                continue;
            }
            if entry.enclosed_name().is_none() {
                warn!(entry = entry.name(), "skipping archive entry with unsafe path");
                continue;
            }

            let original_name = InputValidator::sanitize_file_name(entry.name());
            let Some(kind) = AssetKind::classify(&original_name) else {
                continue;
            };

            let mut data = Vec::new();
            entry.read_to_end(&mut data)?;

            let asset_id = Uuid::new_v4().to_string();
            let stored_name = format!("{asset_id}_{original_name}");
            fs::write(assets_dir.join(&stored_name), &data)?;

            results.push(Asset {
                id: asset_id,
                export_id: export_id.to_string(),
                conversation_id: None,
                message_id: None,
                kind,
                original_name,
                storage_path: format!("exports/{export_id}/assets/{stored_name}"),
                byte_size: i64::try_from(data.len()).unwrap_or(i64::MAX),
                checksum_sha256: hex::encode(Sha256::digest(&data)),
                created_at: now,
            });
        }

        Ok(results)
    }
}

/// Locate `conversations.json` at any depth inside the archive
fn find_conversations_entry<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<String> {
    for index in 0..archive.len() {
        let entry = archive.by_index(index)?;
        let is_conversations = entry
            .enclosed_name()
            .and_then(|p| p.file_name().map(|f| f == CONVERSATIONS_FILE))
            .unwrap_or(false);
        if entry.is_file() && is_conversations {
            return Ok(entry.name().to_string());
        }
    }

    Err(AppError::Validation(format!(
        "missing {CONVERSATIONS_FILE} in ZIP export"
    )))
}

/// Read and parse the conversations file. The top-level value must be a list.
fn parse_conversations<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    entry_name: &str,
) -> Result<Vec<RawConversation>> {
    let mut text = String::new();
    archive
        .by_name(entry_name)?
        .read_to_string(&mut text)
        .map_err(|e| AppError::Validation(format!("could not read {CONVERSATIONS_FILE}: {e}")))?;

    let value: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| AppError::Validation(format!("{CONVERSATIONS_FILE} is not valid JSON: {e}")))?;
    if !value.is_array() {
        return Err(AppError::Validation(format!(
            "{CONVERSATIONS_FILE} must contain a list"
        )));
    }

    serde_json::from_value(value).map_err(|e| {
        AppError::Validation(format!("unexpected {CONVERSATIONS_FILE} structure: {e}"))
    })
}

/// Turn raw conversations into persistable rows: order messages, detect the
/// category, and annotate assets whose filename is mentioned in message text.
fn build_conversations(
    raw_conversations: Vec<RawConversation>,
    export_id: &str,
    now: NaiveDateTime,
    assets: &mut [Asset],
) -> Vec<(Conversation, Vec<Message>)> {
    let mut results = Vec::with_capacity(raw_conversations.len());

    for raw in raw_conversations {
        let conversation_id = Uuid::new_v4().to_string();
        let title = raw
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Untitled".to_string());

        let mut nodes: Vec<RawMessage> = raw
            .mapping
            .unwrap_or_default()
            .into_values()
            .filter_map(|node| node?.message)
            .collect();
        // Messages without a timestamp sort last, like the export viewer does.
        nodes.sort_by(|a, b| {
            a.create_time
                .unwrap_or(f64::INFINITY)
                .total_cmp(&b.create_time.unwrap_or(f64::INFINITY))
        });

        let mut msgs = Vec::with_capacity(nodes.len());
        for (position, node) in nodes.into_iter().enumerate() {
            let content = join_parts(node.content);
            let role = node
                .author
                .and_then(|a| a.role)
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| "unknown".to_string());
            let message_id = Uuid::new_v4().to_string();

            if !content.is_empty() {
                link_assets(assets, &content, &conversation_id, &message_id);
            }

            msgs.push(Message {
                id: message_id,
                export_id: export_id.to_string(),
                conversation_id: conversation_id.clone(),
                role,
                content,
                position: position as i64,
                created_at: parse_epoch(node.create_time),
            });
        }

        let category = categorize::detect_category(&title, msgs.iter().map(|m| m.content.as_str()));

        results.push((
            Conversation {
                id: conversation_id,
                export_id: export_id.to_string(),
                external_id: raw.id,
                title,
                category: category.to_string(),
                conversation_date: parse_epoch(raw.create_time),
                created_at: now,
            },
            msgs,
        ));
    }

    results
}

/// Best-effort media link: a case-insensitive mention of the original
/// filename in message text annotates the asset with the first mentioning
/// message. No match is not an error.
fn link_assets(assets: &mut [Asset], content: &str, conversation_id: &str, message_id: &str) {
    let lowered = content.to_lowercase();
    for asset in assets.iter_mut() {
        if asset.message_id.is_none() && lowered.contains(&asset.original_name.to_lowercase()) {
            asset.conversation_id = Some(conversation_id.to_string());
            asset.message_id = Some(message_id.to_string());
        }
    }
}

/// Join content parts into one text block; non-string parts are stringified,
/// nulls are dropped.
fn join_parts(content: Option<RawContent>) -> String {
    content
        .and_then(|c| c.parts)
        .unwrap_or_default()
        .iter()
        .filter_map(|part| match part {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Accept epoch timestamps written as numbers or numeric strings; anything
/// else reads as absent instead of failing the whole import.
fn lenient_epoch<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Convert float epoch seconds into a naive UTC timestamp
fn parse_epoch(ts: Option<f64>) -> Option<NaiveDateTime> {
    let ts = ts?;
    if !ts.is_finite() {
        return None;
    }

    // Floor keeps the subsecond part non-negative for pre-epoch instants.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (secs, nanos) = (ts.floor() as i64, ((ts - ts.floor()) * 1e9) as u32);
    DateTime::<Utc>::from_timestamp(secs, nanos).map(|dt| dt.naive_utc())
}
