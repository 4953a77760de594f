//! Integration tests for the import pipeline

mod common;

use sha2::{Digest, Sha256};

use chatvault::error::AppError;
use chatvault::importer::ImportPipeline;
use chatvault::models::AssetKind;
use chatvault::repository::ExportRepository;

use common::{build_zip, import_sample, sample_zip, setup_db};

#[test]
fn test_import_persists_counts() {
    let (temp_dir, db) = setup_db();
    let export_id = import_sample(&db, temp_dir.path());

    let repo = ExportRepository::new(db);
    let export = repo
        .get_export(&export_id)
        .expect("query export")
        .expect("export exists");
    assert_eq!(export.name, "Sample Export");
    assert_eq!(export.original_filename, "sample.zip");

    assert_eq!(repo.count_conversations(&export_id).unwrap(), 3);
    assert_eq!(repo.count_messages(&export_id).unwrap(), 4);
}

#[test]
fn test_import_detects_categories() {
    let (temp_dir, db) = setup_db();
    let export_id = import_sample(&db, temp_dir.path());

    let repo = ExportRepository::new(db);
    let conversations = repo.conversations(&export_id, None, None).expect("query");

    let category_of = |title: &str| {
        conversations
            .iter()
            .find(|c| c.title == title)
            .unwrap_or_else(|| panic!("missing conversation {title}"))
            .category
            .clone()
    };

    // "lease" in message content, "dog" in the title, nothing for the trip.
    assert_eq!(category_of("Apartment hunting"), "housing court case");
    assert_eq!(category_of("Dog training schedule"), "dog");
    assert_eq!(category_of("Trip planning"), "uncategorized");
}

#[test]
fn test_messages_ordered_by_timestamp() {
    let (temp_dir, db) = setup_db();

    // Node keys deliberately ordered against the timestamps.
    let conversations = serde_json::json!([
        {
            "id": "c1",
            "title": "Ordering",
            "create_time": 1_700_000_000.0,
            "mapping": {
                "a-first-key": {
                    "message": {
                        "author": {"role": "assistant"},
                        "content": {"parts": ["second"]},
                        "create_time": 1_700_000_020.0
                    }
                },
                "z-last-key": {
                    "message": {
                        "author": {"role": "user"},
                        "content": {"parts": ["first"]},
                        "create_time": 1_700_000_010.0
                    }
                },
                "m-no-time": {
                    "message": {
                        "author": {"role": "user"},
                        "content": {"parts": ["third, no timestamp"]}
                    }
                }
            }
        }
    ]);
    let zip_bytes = build_zip(&[(
        "conversations.json",
        serde_json::to_vec(&conversations).unwrap().as_slice(),
    )]);

    let pipeline = ImportPipeline::new(db.clone(), temp_dir.path());
    let export_id = pipeline.run(&zip_bytes, "Ordering", "ordering.zip").unwrap();

    let repo = ExportRepository::new(db);
    let conversation = &repo.conversations(&export_id, None, None).unwrap()[0];
    let messages = repo.messages_for_conversation(&conversation.id).unwrap();

    let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["first", "second", "third, no timestamp"]);
    let positions: Vec<i64> = messages.iter().map(|m| m.position).collect();
    assert_eq!(positions, vec![0, 1, 2]);
}

#[test]
fn test_import_extracts_and_links_media() {
    let (temp_dir, db) = setup_db();
    let storage_root = temp_dir.path().join("storage");

    let photo = b"not really a png".as_slice();
    let conversations = serde_json::json!([
        {
            "id": "c1",
            "title": "Dog photos",
            "create_time": 1_700_000_000.0,
            "mapping": {
                "n1": {
                    "message": {
                        "author": {"role": "user"},
                        "content": {"parts": ["I attached Dog.PNG for the vet"]},
                        "create_time": 1_700_000_010.0
                    }
                }
            }
        }
    ]);
    let zip_bytes = build_zip(&[
        (
            "conversations.json",
            serde_json::to_vec(&conversations).unwrap().as_slice(),
        ),
        ("media/dog.png", photo),
        ("media/voice.mp3", b"audio bytes".as_slice()),
        ("chat.html", b"<html></html>".as_slice()),
    ]);

    let pipeline = ImportPipeline::new(db.clone(), &storage_root);
    let export_id = pipeline.run(&zip_bytes, "Media", "media.zip").unwrap();

    let repo = ExportRepository::new(db);
    let assets = repo.assets_for_export(&export_id).unwrap();
    // The html entry is export metadata and must not be stored.
    assert_eq!(assets.len(), 2);

    let image = assets
        .iter()
        .find(|a| a.kind == AssetKind::Image)
        .expect("image asset");
    assert_eq!(image.original_name, "dog.png");
    assert_eq!(image.byte_size, photo.len() as i64);
    assert_eq!(image.checksum_sha256, hex::encode(Sha256::digest(photo)));

    // Extracted file is on disk under the export's storage directory.
    let stored = std::fs::read(storage_root.join(&image.storage_path)).unwrap();
    assert_eq!(stored, photo);

    // Filename is mentioned in a message (case-insensitively), so the asset
    // carries the link; the audio file is mentioned nowhere.
    let conversation = &repo.conversations(&export_id, None, None).unwrap()[0];
    assert_eq!(image.conversation_id.as_deref(), Some(conversation.id.as_str()));
    assert!(image.message_id.is_some());

    let audio = assets.iter().find(|a| a.kind == AssetKind::Audio).unwrap();
    assert!(audio.conversation_id.is_none());
    assert!(audio.message_id.is_none());
}

#[test]
fn test_import_rejects_missing_conversations_file() {
    let (temp_dir, db) = setup_db();
    let zip_bytes = build_zip(&[("readme.txt", b"no conversations here".as_slice())]);

    let pipeline = ImportPipeline::new(db.clone(), temp_dir.path());
    let err = pipeline
        .run(&zip_bytes, "Broken", "broken.zip")
        .expect_err("must reject");
    assert!(matches!(err, AppError::Validation(_)));

    // Nothing was persisted.
    let repo = ExportRepository::new(db);
    assert!(repo.list_exports().unwrap().is_empty());
}

#[test]
fn test_import_rejects_invalid_archive() {
    let (temp_dir, db) = setup_db();

    let pipeline = ImportPipeline::new(db, temp_dir.path());
    let err = pipeline
        .run(b"definitely not a zip", "Broken", "broken.zip")
        .expect_err("must reject");
    assert!(matches!(err, AppError::Validation(_)));
}

#[test]
fn test_import_rejects_invalid_json() {
    let (temp_dir, db) = setup_db();
    let zip_bytes = build_zip(&[("conversations.json", b"{not json".as_slice())]);

    let pipeline = ImportPipeline::new(db, temp_dir.path());
    let err = pipeline
        .run(&zip_bytes, "Broken", "broken.zip")
        .expect_err("must reject");
    assert!(matches!(err, AppError::Validation(_)));
}

#[test]
fn test_import_rejects_non_list_json() {
    let (temp_dir, db) = setup_db();
    let zip_bytes = build_zip(&[("conversations.json", b"{\"not\": \"a list\"}".as_slice())]);

    let pipeline = ImportPipeline::new(db, temp_dir.path());
    let err = pipeline
        .run(&zip_bytes, "Broken", "broken.zip")
        .expect_err("must reject");
    assert!(matches!(err, AppError::Validation(_)));
}

#[test]
fn test_import_tolerates_null_mapping_nodes() {
    let (temp_dir, db) = setup_db();

    let conversations = serde_json::json!([
        {
            "id": "c1",
            "title": "Sparse mapping",
            "create_time": 1_700_000_000.0,
            "mapping": {
                "n1": null,
                "n2": {"message": null},
                "n3": {
                    "message": {
                        "author": {"role": "user"},
                        "content": {"parts": ["still here"]},
                        "create_time": 1_700_000_010.0
                    }
                }
            }
        }
    ]);
    let zip_bytes = build_zip(&[(
        "conversations.json",
        serde_json::to_vec(&conversations).unwrap().as_slice(),
    )]);

    let pipeline = ImportPipeline::new(db.clone(), temp_dir.path());
    let export_id = pipeline.run(&zip_bytes, "Sparse", "sparse.zip").unwrap();

    // Null nodes are dropped; the real message survives.
    let repo = ExportRepository::new(db);
    assert_eq!(repo.count_conversations(&export_id).unwrap(), 1);
    let conversation = &repo.conversations(&export_id, None, None).unwrap()[0];
    let messages = repo.messages_for_conversation(&conversation.id).unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "still here");
}

#[test]
fn test_import_tolerates_non_numeric_timestamps() {
    let (temp_dir, db) = setup_db();

    let conversations = serde_json::json!([
        {
            "id": "c1",
            "title": "Odd timestamps",
            "create_time": "not-a-float",
            "mapping": {
                "n1": {
                    "message": {
                        "author": {"role": "user"},
                        "content": {"parts": ["first"]},
                        "create_time": "1700000010.5"
                    }
                },
                "n2": {
                    "message": {
                        "author": {"role": "assistant"},
                        "content": {"parts": ["second"]},
                        "create_time": "garbage"
                    }
                }
            }
        }
    ]);
    let zip_bytes = build_zip(&[(
        "conversations.json",
        serde_json::to_vec(&conversations).unwrap().as_slice(),
    )]);

    let pipeline = ImportPipeline::new(db.clone(), temp_dir.path());
    let export_id = pipeline.run(&zip_bytes, "Odd", "odd.zip").unwrap();

    let repo = ExportRepository::new(db);
    let conversation = &repo.conversations(&export_id, None, None).unwrap()[0];
    // Unparseable conversation timestamp reads as absent.
    assert!(conversation.conversation_date.is_none());

    let messages = repo.messages_for_conversation(&conversation.id).unwrap();
    assert_eq!(messages.len(), 2);
    // Numeric string parses; garbage sorts last with no timestamp.
    assert_eq!(messages[0].content, "first");
    assert!(messages[0].created_at.is_some());
    assert_eq!(messages[1].content, "second");
    assert!(messages[1].created_at.is_none());
}

#[test]
fn test_untitled_conversation_gets_default_title() {
    let (temp_dir, db) = setup_db();
    let conversations = serde_json::json!([
        {"id": "c1", "create_time": 1_700_000_000.0, "mapping": {}}
    ]);
    let zip_bytes = build_zip(&[(
        "conversations.json",
        serde_json::to_vec(&conversations).unwrap().as_slice(),
    )]);

    let pipeline = ImportPipeline::new(db.clone(), temp_dir.path());
    let export_id = pipeline.run(&zip_bytes, "Untitled", "untitled.zip").unwrap();

    let repo = ExportRepository::new(db);
    let conversations = repo.conversations(&export_id, None, None).unwrap();
    assert_eq!(conversations[0].title, "Untitled");
    assert_eq!(conversations[0].category, "uncategorized");
}

#[test]
fn test_repeated_upload_creates_separate_exports() {
    let (temp_dir, db) = setup_db();
    let first = import_sample(&db, temp_dir.path());
    let second = import_sample(&db, temp_dir.path());
    assert_ne!(first, second);

    let repo = ExportRepository::new(db);
    assert_eq!(repo.list_exports().unwrap().len(), 2);
    assert_eq!(repo.count_conversations(&first).unwrap(), 3);
    assert_eq!(repo.count_conversations(&second).unwrap(), 3);

    // Queries stay scoped to one export.
    let zip_bytes = sample_zip(&[]);
    assert!(!zip_bytes.is_empty());
    let from_first = repo.conversations(&first, None, None).unwrap();
    assert!(from_first.iter().all(|c| c.export_id == first));
}
