//! Shared helpers for integration tests

#![allow(dead_code)]

use std::io::{Cursor, Write};

use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use chatvault::db::Database;
use chatvault::importer::ImportPipeline;

/// Create a temporary database; the returned directory owns its lifetime
pub fn setup_db() -> (TempDir, Database) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");
    let db = Database::new(&db_path, 2).expect("Failed to create database");
    (temp_dir, db)
}

/// Build an in-memory ZIP archive from (entry name, content) pairs
pub fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for (name, content) in entries {
        writer.start_file(*name, options).expect("start zip entry");
        writer.write_all(content).expect("write zip entry");
    }

    writer.finish().expect("finish zip").into_inner()
}

/// A small export with three conversations: one categorized by message
/// content, one by title, one left uncategorized.
pub fn sample_conversations() -> serde_json::Value {
    serde_json::json!([
        {
            "id": "conv-apartment",
            "title": "Apartment hunting",
            "create_time": 1_700_000_300.0,
            "mapping": {
                "n1": {
                    "message": {
                        "author": {"role": "user"},
                        "content": {"parts": ["Here is the lease my landlord sent over"]},
                        "create_time": 1_700_000_310.0
                    }
                },
                "n2": {
                    "message": {
                        "author": {"role": "assistant"},
                        "content": {"parts": ["Read the renewal clause before signing"]},
                        "create_time": 1_700_000_320.0
                    }
                }
            }
        },
        {
            "id": "conv-dog",
            "title": "Dog training schedule",
            "create_time": 1_700_000_200.0,
            "mapping": {
                "n1": {
                    "message": {
                        "author": {"role": "user"},
                        "content": {"parts": ["The puppy keeps chewing shoes"]},
                        "create_time": 1_700_000_210.0
                    }
                }
            }
        },
        {
            "id": "conv-trip",
            "title": "Trip planning",
            "create_time": 1_700_000_100.0,
            "mapping": {
                "n1": {
                    "message": {
                        "author": {"role": "user"},
                        "content": {"parts": ["Pack snacks for the drive"]},
                        "create_time": 1_700_000_110.0
                    }
                }
            }
        }
    ])
}

/// Build a ZIP holding the sample conversations plus the given media entries
pub fn sample_zip(media: &[(&str, &[u8])]) -> Vec<u8> {
    let conversations = serde_json::to_vec(&sample_conversations()).expect("serialize fixture");
    let mut entries: Vec<(&str, &[u8])> = vec![("conversations.json", conversations.as_slice())];
    entries.extend_from_slice(media);
    build_zip(&entries)
}

/// Import the sample export and return its id
pub fn import_sample(db: &Database, storage_root: &std::path::Path) -> String {
    let pipeline = ImportPipeline::new(db.clone(), storage_root);
    pipeline
        .run(&sample_zip(&[]), "Sample Export", "sample.zip")
        .expect("import sample export")
}
