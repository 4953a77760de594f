//! ChatVault - Chat Export Archive and Dashboard
//!
//! A single-user web application for archiving chat export ZIPs and browsing
//! them through a JSON dashboard.
//!
//! # Features
//!
//! - Import ZIP exports (conversations.json plus media)
//! - Keyword-based conversation categorization
//! - Full-export message search
//! - Media extraction with checksums and per-export storage
//! - Category rename and per-conversation moves

/// Keyword-based conversation categorization
pub mod categorize;
/// Configuration management
pub mod config;
/// Database operations and connection pooling
pub mod db;
/// Error types and HTTP error responses
pub mod error;
/// Import pipeline turning ZIP uploads into persisted exports
pub mod importer;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Repository pattern for data access
pub mod repository;
/// Database schema definitions
pub mod schema;
/// HTTP server and request handlers
pub mod server;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use db::Database;
pub use error::{AppError, Result};
pub use importer::ImportPipeline;
pub use repository::ExportRepository;
