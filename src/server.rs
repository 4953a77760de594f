//! HTTP server and request handlers
//!
//! All responses are JSON except media downloads (raw bytes) and the upload
//! endpoint, which answers with a redirect to the new export's dashboard so
//! a plain HTML form can drive it.

use std::path::PathBuf;

use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Redirect};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::AppConfig;
use crate::db::Database;
use crate::error::{AppError, Result};
use crate::importer::ImportPipeline;
use crate::metrics::MetricsCollector;
use crate::models::{AssetKind, ConversationView, Dashboard, DashboardFilter, Export};
use crate::repository::ExportRepository;
use crate::validation::InputValidator;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    /// Database handle (pooled)
    pub db: Database,
    /// Root directory for extracted media
    pub storage_root: PathBuf,
    /// Upload size cap in bytes
    pub max_upload_bytes: usize,
}

/// Rename form body: the new label for a category
#[derive(Debug, Deserialize)]
pub struct RenameForm {
    /// New category label
    pub name: String,
}

/// Move form body: the category a conversation should end up in
#[derive(Debug, Deserialize)]
pub struct MoveForm {
    /// Target category label
    pub category: String,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let max_upload_bytes = state.max_upload_bytes;

    Router::new()
        .route("/", get(list_exports))
        .route("/uploads", post(upload_export))
        .route("/exports/{export_id}", get(export_dashboard))
        .route("/exports/{export_id}/media/{media_id}", get(download_media))
        .route(
            "/exports/{export_id}/categories/{label}/rename",
            post(rename_category),
        )
        .route(
            "/exports/{export_id}/conversations/{conversation_id}/move",
            post(move_conversation),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn serve(config: &AppConfig) -> Result<()> {
    let db = Database::new(
        std::path::Path::new(&config.database.path),
        config.database.max_connections,
    )?;
    let storage_root = PathBuf::from(&config.storage.root);
    std::fs::create_dir_all(&storage_root)?;

    let state = AppState {
        db,
        storage_root,
        max_upload_bytes: config.max_upload_bytes(),
    };
    let app = router(state);

    let listener = TcpListener::bind(&config.server.listen_addr)
        .await
        .map_err(AppError::Storage)?;
    info!(addr = %config.server.listen_addr, "listening");

    axum::serve(listener, app).await.map_err(AppError::Storage)
}

/// GET / - all uploaded exports, newest first
async fn list_exports(State(state): State<AppState>) -> Result<Json<Vec<Export>>> {
    let repo = ExportRepository::new(state.db);
    Ok(Json(repo.list_exports()?))
}

/// POST /uploads - accept a ZIP archive and import it
async fn upload_export(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut name: Option<String> = None;
    let mut file_name: Option<String> = None;
    let mut file_bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        match field.name() {
            Some("name") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("invalid name field: {e}")))?;
                if !value.trim().is_empty() {
                    name = Some(value.trim().to_string());
                }
            }
            Some("file") => {
                file_name = field.file_name().map(ToString::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("could not read upload: {e}")))?;
                file_bytes = Some(bytes.to_vec());
            }
            _ => {}
        }
    }

    let file_name = file_name
        .ok_or_else(|| AppError::Validation("missing file field in upload".to_string()))?;
    let file_bytes = file_bytes
        .ok_or_else(|| AppError::Validation("missing file field in upload".to_string()))?;

    InputValidator::validate_upload_filename(&file_name)?;
    let name = name.unwrap_or_else(|| default_export_name(&file_name));
    InputValidator::validate_export_name(&name)?;

    // The import is CPU and disk bound; keep it off the async workers.
    let pipeline = ImportPipeline::new(state.db, state.storage_root);
    let export_id = tokio::task::spawn_blocking(move || {
        pipeline.run(&file_bytes, &name, &file_name)
    })
    .await
    .map_err(|e| AppError::Other(format!("import task failed: {e}")))??;

    Ok(Redirect::to(&format!("/exports/{export_id}")))
}

/// GET /exports/{id} - the dashboard payload, optionally filtered
async fn export_dashboard(
    State(state): State<AppState>,
    Path(export_id): Path<String>,
    Query(filter): Query<DashboardFilter>,
) -> Result<Json<Dashboard>> {
    let category = filter
        .category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    let query = filter
        .q
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty());
    if let Some(q) = &query {
        InputValidator::validate_search_query(q)?;
    }

    let repo = ExportRepository::new(state.db);
    let export = repo
        .get_export(&export_id)?
        .ok_or_else(|| AppError::NotFound(format!("export {export_id} not found")))?;

    let conversations = repo.conversations(&export_id, category.as_deref(), query.as_deref())?;
    let mut views = Vec::with_capacity(conversations.len());
    for conversation in conversations {
        let messages = repo.messages_for_conversation(&conversation.id)?;
        views.push(ConversationView {
            conversation,
            messages,
        });
    }

    let categories = repo.category_counts(&export_id)?;

    let mut images = Vec::new();
    let mut audio = Vec::new();
    let mut files = Vec::new();
    for asset in repo.assets_for_export(&export_id)? {
        match asset.kind {
            AssetKind::Image => images.push(asset),
            AssetKind::Audio => audio.push(asset),
            AssetKind::File => files.push(asset),
        }
    }

    Ok(Json(Dashboard {
        export,
        conversations: views,
        categories,
        images,
        audio,
        files,
        selected_category: category,
        query,
    }))
}

/// GET /exports/{id}/media/{media_id} - stream one stored asset back
async fn download_media(
    State(state): State<AppState>,
    Path((export_id, media_id)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    let repo = ExportRepository::new(state.db);
    let asset = repo
        .get_asset(&export_id, &media_id)?
        .ok_or_else(|| AppError::NotFound(format!("media {media_id} not found")))?;

    let bytes = tokio::fs::read(state.storage_root.join(&asset.storage_path))
        .await
        .map_err(AppError::Storage)?;

    let disposition = format!(
        "inline; filename=\"{}\"",
        asset.original_name.replace('"', "")
    );
    Ok((
        [
            (CONTENT_TYPE, content_type_for(&asset.original_name).to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

/// POST /exports/{id}/categories/{label}/rename - relabel every conversation
/// in a category
async fn rename_category(
    State(state): State<AppState>,
    Path((export_id, label)): Path<(String, String)>,
    Form(form): Form<RenameForm>,
) -> Result<impl IntoResponse> {
    let new_label = form.name.trim().to_string();
    InputValidator::validate_category_label(&new_label)?;

    let repo = ExportRepository::new(state.db);
    let updated = repo.rename_category(&export_id, &label, &new_label)?;
    info!(export_id, from = label, to = new_label, updated, "category renamed");
    MetricsCollector::record_category_change("rename");

    Ok(Redirect::to(&format!("/exports/{export_id}")))
}

/// POST /exports/{id}/conversations/{cid}/move - reassign one conversation
async fn move_conversation(
    State(state): State<AppState>,
    Path((export_id, conversation_id)): Path<(String, String)>,
    Form(form): Form<MoveForm>,
) -> Result<impl IntoResponse> {
    let category = form.category.trim().to_string();
    InputValidator::validate_category_label(&category)?;

    let repo = ExportRepository::new(state.db);
    repo.move_conversation(&export_id, &conversation_id, &category)?;
    info!(export_id, conversation_id, to = category, "conversation moved");
    MetricsCollector::record_category_change("move");

    Ok(Redirect::to(&format!("/exports/{export_id}")))
}

/// Default display name for an upload: the filename with its `.zip`
/// extension stripped, matching the case-insensitive upload check
fn default_export_name(file_name: &str) -> String {
    match file_name.len().checked_sub(4) {
        Some(cut)
            if file_name.is_char_boundary(cut)
                && file_name[cut..].eq_ignore_ascii_case(".zip") =>
        {
            file_name[..cut].to_string()
        }
        _ => file_name.to_string(),
    }
}

/// Content type for a media download, by extension
fn content_type_for(file_name: &str) -> &'static str {
    let ext = std::path::Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "m4a" => "audio/mp4",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "aac" => "audio/aac",
        _ => "application/octet-stream",
    }
}
