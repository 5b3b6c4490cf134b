use super::{DeleteStrategy, PortfolioError};
use crate::AppState;
use crate::auth::require_api_key;
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::HeaderMap,
    response::Response,
};
use serde_json::{Value, json};

/// Path segment selecting the file-by-file delete.
const SAFE_DELETE_SEGMENT: &str = "safe";

fn authorize(app_state: &AppState, headers: &HeaderMap) -> Result<(), PortfolioError> {
    require_api_key(headers, app_state.config.app.api_key.as_deref())?;
    Ok(())
}

pub async fn create_item_handler(
    State(app_state): State<AppState>,
    Path(category): Path<String>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<Value>, PortfolioError> {
    authorize(&app_state, &headers)?;

    let upload = app_state.store.stage(multipart).await?;
    let created = app_state.store.create_item(&category, upload).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Files uploaded successfully",
        "folder": created.folder,
        "files": created.files,
    })))
}

pub async fn edit_item_handler(
    State(app_state): State<AppState>,
    Path((category, folder)): Path<(String, String)>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<Value>, PortfolioError> {
    authorize(&app_state, &headers)?;

    let upload = app_state.store.stage(multipart).await?;
    let edited = app_state.store.edit_item(&category, &folder, upload).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Update successful",
        "category": edited.category,
        "folder": edited.folder,
        "files": edited.files,
    })))
}

pub async fn list_category_handler(
    State(app_state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<Value>, PortfolioError> {
    let folders = app_state.store.list_category(&category).await?;
    Ok(Json(json!({
        "success": true,
        "category": category.trim(),
        "folders": folders,
    })))
}

pub async fn list_all_handler(
    State(app_state): State<AppState>,
) -> Result<Json<Value>, PortfolioError> {
    let uploads = app_state.store.list_all().await?;
    Ok(Json(json!({ "success": true, "uploads": uploads })))
}

pub async fn count_handler(
    State(app_state): State<AppState>,
) -> Result<Json<Value>, PortfolioError> {
    let counts = app_state.store.count().await?;
    Ok(Json(json!({
        "success": true,
        "totalCount": counts.total_count,
        "countsByCategory": counts.counts_by_category,
    })))
}

async fn delete_with(
    app_state: &AppState,
    category: &str,
    folder: &str,
    strategy: DeleteStrategy,
) -> Result<Json<Value>, PortfolioError> {
    let outcome = app_state
        .store
        .delete_item(category, folder, strategy)
        .await?;

    let mut body = json!({
        "success": true,
        "message": "Portfolio item deleted successfully",
        "deletedFolder": outcome.deleted_folder,
        "deletedCategory": outcome.deleted_category,
        "filesDeleted": outcome.files_deleted,
    });
    if !outcome.failed_files.is_empty() {
        body["failedFiles"] = json!(outcome.failed_files);
    }
    Ok(Json(body))
}

pub async fn delete_item_handler(
    State(app_state): State<AppState>,
    Path((category, folder)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<Value>, PortfolioError> {
    authorize(&app_state, &headers)?;
    delete_with(&app_state, &category, &folder, DeleteStrategy::Recursive).await
}

/// `DELETE /api/uploads/{category}/{folder}/safe`. Any other trailing segment
/// names no route.
pub async fn delete_item_variant_handler(
    State(app_state): State<AppState>,
    Path((category, folder, variant)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Result<Json<Value>, PortfolioError> {
    authorize(&app_state, &headers)?;
    if variant != SAFE_DELETE_SEGMENT {
        return Err(PortfolioError::NotFound("Not found"));
    }
    delete_with(&app_state, &category, &folder, DeleteStrategy::FileByFile).await
}

pub async fn file_handler(
    State(app_state): State<AppState>,
    Path((category, folder, filename)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Result<Response, PortfolioError> {
    app_state
        .store
        .serve_file(&category, &folder, &filename, &headers)
        .await
}
