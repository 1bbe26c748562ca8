//! Query/Control API (C13) — stateless axum handlers translating HTTP
//! into calls against C8–C12. Pagination is page/size, not cursor-based;
//! the tree build is synchronous (§4.13).

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use archivum_core::dto::{
    CodeProjectDuplicateGroupDto, CodeProjectDuplicateMemberDto, CompleteScanRequest,
    DuplicateGroupDto, FileBatchDto, FileDto, ResolveDuplicateGroupRequest, SetFolderZoneRequest,
    SourceDto,
};
use archivum_core::model::{DuplicateGroupStatus, FileStatus};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::IngestError;
use crate::ingest::{self, SourceLocks};
use crate::{store, tree_service, zone_service};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub locks: SourceLocks,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/sources", post(create_source).get(list_sources))
        .route("/api/sources/{id}", get(get_source))
        .route("/api/sources/{id}/tree", get(get_tree))
        .route("/api/sources/{id}/folders/{*path}", patch(set_folder_zone))
        .route("/api/sources/{id}/complete", post(complete_scan))
        .route("/api/files/batch", post(ingest_batch))
        .route("/api/files", get(list_files))
        .route("/api/files/{id}", patch(patch_file))
        .route("/api/duplicates", get(list_duplicates))
        .route("/api/duplicates/{group_id}/resolve", post(resolve_duplicate))
        .route("/api/code-projects/bulk", post(ingest_code_projects))
        .route("/api/code-projects", get(list_code_projects))
        .route("/api/code-projects/duplicates", get(list_code_project_duplicates))
        .route(
            "/api/code-projects/duplicates/{group_id}/resolve",
            post(resolve_code_project_duplicate),
        )
        .with_state(Arc::new(state))
}

type SharedState = State<Arc<AppState>>;

// ---------------------------------------------------------------------------
// Error mapping (§7)
// ---------------------------------------------------------------------------

pub struct ApiError(IngestError);

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            IngestError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
            IngestError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            IngestError::InvalidState(m) => (StatusCode::CONFLICT, m.clone()),
            IngestError::Integrity(m) => (StatusCode::UNPROCESSABLE_ENTITY, m.clone()),
            IngestError::Store(e) => {
                tracing::error!(error = %e, "store error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

async fn create_source(
    State(state): SharedState,
    Json(body): Json<SourceDto>,
) -> ApiResult<(StatusCode, Json<SourceDto>)> {
    let source = ingest::create_source(&state.pool, body.into()).await?;
    Ok((StatusCode::CREATED, Json(source.into())))
}

async fn list_sources(State(state): SharedState) -> ApiResult<Json<Vec<SourceDto>>> {
    let sources = store::list_sources(&state.pool).await?;
    Ok(Json(sources.into_iter().map(SourceDto::from).collect()))
}

async fn get_source(
    State(state): SharedState,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SourceDto>> {
    let source = store::find_source(&state.pool, id)
        .await?
        .ok_or_else(|| IngestError::NotFound(format!("source {id}")))?;
    Ok(Json(source.into()))
}

async fn get_tree(
    State(state): SharedState,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let tree = tree_service::build_tree(&state.pool, id).await?;
    Ok(Json(serde_json::to_value(tree).unwrap_or(Value::Null)))
}

#[derive(Deserialize)]
struct CompleteScanPath {
    id: Uuid,
}

async fn complete_scan(
    State(state): SharedState,
    Path(CompleteScanPath { id }): Path<CompleteScanPath>,
    Json(body): Json<CompleteScanRequest>,
) -> ApiResult<StatusCode> {
    ingest::complete_scan(
        &state.pool,
        &state.locks,
        id,
        body.total_files,
        body.total_size,
        body.success,
    )
    .await?;
    Ok(StatusCode::OK)
}

async fn set_folder_zone(
    State(state): SharedState,
    Path((id, path)): Path<(Uuid, String)>,
    Json(body): Json<SetFolderZoneRequest>,
) -> ApiResult<StatusCode> {
    let decoded = urlencoding_decode(&path);
    zone_service::set_folder_zone(&state.pool, id, &decoded, body.zone).await?;
    Ok(StatusCode::OK)
}

fn urlencoding_decode(s: &str) -> String {
    s.replace("%2F", "/").replace("%2f", "/")
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

async fn ingest_batch(
    State(state): SharedState,
    Json(body): Json<FileBatchDto>,
) -> ApiResult<StatusCode> {
    let files = body.files.into_iter().map(Into::into).collect();
    ingest::ingest_batch(&state.pool, &state.locks, body.source_id, files).await?;
    Ok(StatusCode::CREATED)
}

#[derive(Deserialize)]
struct FileListQuery {
    source_id: Option<Uuid>,
    extension: Option<String>,
    is_duplicate: Option<bool>,
}

async fn list_files(
    State(state): SharedState,
    Query(q): Query<FileListQuery>,
) -> ApiResult<Json<Vec<FileDto>>> {
    let files = if let Some(source_id) = q.source_id {
        store::list_files_for_source(&state.pool, source_id).await?
    } else {
        Vec::new()
    };
    let filtered = files
        .into_iter()
        .filter(|f| q.extension.as_deref().map_or(true, |ext| f.extension == ext))
        .filter(|f| q.is_duplicate.map_or(true, |d| f.is_duplicate == d))
        .map(FileDto::from)
        .collect();
    Ok(Json(filtered))
}

#[derive(Deserialize)]
struct PatchFileRequest {
    status: Option<FileStatus>,
}

async fn patch_file(
    State(state): SharedState,
    Path(id): Path<Uuid>,
    Json(body): Json<PatchFileRequest>,
) -> ApiResult<StatusCode> {
    store::patch_file_status(&state.pool, id, body.status).await?;
    Ok(StatusCode::OK)
}

// ---------------------------------------------------------------------------
// Duplicates
// ---------------------------------------------------------------------------

async fn list_duplicates(State(state): SharedState) -> ApiResult<Json<Vec<DuplicateGroupDto>>> {
    let groups = store::list_duplicate_groups(&state.pool).await?;
    Ok(Json(groups.into_iter().map(DuplicateGroupDto::from).collect()))
}

async fn resolve_duplicate(
    State(state): SharedState,
    Path(group_id): Path<Uuid>,
    Json(body): Json<ResolveDuplicateGroupRequest>,
) -> ApiResult<StatusCode> {
    let status = body.status.unwrap_or(DuplicateGroupStatus::Resolved);
    store::resolve_duplicate_group(&state.pool, group_id, body.kept_file_id, status).await?;
    Ok(StatusCode::OK)
}

// ---------------------------------------------------------------------------
// Code projects
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct CodeProjectBulkQuery {
    source_id: Option<Uuid>,
}

async fn ingest_code_projects(
    State(state): SharedState,
    Query(q): Query<CodeProjectBulkQuery>,
    Json(body): Json<Vec<archivum_core::dto::CodeProjectDto>>,
) -> ApiResult<StatusCode> {
    let source_id = body
        .first()
        .map(|p| p.source_id)
        .or(q.source_id)
        .unwrap_or_default();
    let projects = body.into_iter().map(Into::into).collect();
    ingest::ingest_code_projects(&state.pool, &state.locks, source_id, projects).await?;
    Ok(StatusCode::CREATED)
}

async fn list_code_projects(
    State(state): SharedState,
) -> ApiResult<Json<Vec<archivum_core::dto::CodeProjectDto>>> {
    let projects = store::list_code_projects(&state.pool).await?;
    Ok(Json(projects.into_iter().map(Into::into).collect()))
}

async fn list_code_project_duplicates(
    State(state): SharedState,
) -> ApiResult<Json<Vec<CodeProjectDuplicateGroupDto>>> {
    let groups = store::list_code_project_duplicate_groups(&state.pool).await?;
    let dtos = groups
        .into_iter()
        .map(|(group, members)| CodeProjectDuplicateGroupDto {
            id: group.id,
            identifier: group.identifier,
            status: group.status,
            members: members.into_iter().map(CodeProjectDuplicateMemberDto::from).collect(),
        })
        .collect();
    Ok(Json(dtos))
}

#[derive(Deserialize)]
struct ResolveCodeProjectDuplicateRequest {
    status: DuplicateGroupStatus,
}

async fn resolve_code_project_duplicate(
    State(state): SharedState,
    Path(group_id): Path<Uuid>,
    Json(body): Json<ResolveCodeProjectDuplicateRequest>,
) -> ApiResult<StatusCode> {
    store::resolve_code_project_duplicate_group(&state.pool, group_id, body.status).await?;
    Ok(StatusCode::OK)
}
