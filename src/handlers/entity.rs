// Generic CRUD handlers.
//
// One handler set serves every resource; the entity kind arrives through a
// route-layer `Extension` and selects the descriptor that drives
// validation and persistence. The flow is always the same: validate the
// payload, hash any secret fields, let the store do the work, wrap the
// result in the envelope.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::auth::hash_password;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::schema::{self, EntityKind};
use crate::AppState;

const DEFAULT_PAGE_SIZE: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// POST /<resource>
pub async fn create(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(payload) = payload.map_err(bad_json)?;
    let mut fields = schema::validate_create(kind, &payload)
        .map_err(|details| ApiError::validation("Validation failed", details))?;
    hash_secret_fields(kind, &mut fields, state.config.security.bcrypt_cost)?;

    let record = state.db.insert(kind, &fields).await?;
    Ok(ApiResponse::created(record))
}

/// GET /<resource> - newest first, limit clamped to the configured ceiling.
pub async fn list(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Value> {
    let Query(query) = query.map_err(bad_query)?;
    // clamp panics when min > max
    let ceiling = state.config.api.max_page_size.max(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, ceiling);
    let offset = query.offset.unwrap_or(0).max(0);

    let records = state.db.list(kind, limit, offset).await?;
    let meta = json!({ "count": records.len(), "limit": limit, "offset": offset });
    Ok(ApiResponse::success(Value::Array(records)).with_meta(meta))
}

/// GET /<resource>/:id
pub async fn fetch(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let id = path_id("id", &id)?;
    let record = state
        .db
        .fetch(kind, id)
        .await?
        .ok_or_else(|| not_found(kind, id))?;
    Ok(ApiResponse::success(record))
}

/// PATCH /<resource>/:id - whitelisted partial update.
pub async fn update(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let id = path_id("id", &id)?;
    let Json(payload) = payload.map_err(bad_json)?;
    let mut fields = schema::validate_update(kind, &payload)
        .map_err(|details| ApiError::validation("Validation failed", details))?;
    hash_secret_fields(kind, &mut fields, state.config.security.bcrypt_cost)?;

    let record = state
        .db
        .update(kind, id, &fields)
        .await?
        .ok_or_else(|| not_found(kind, id))?;
    Ok(ApiResponse::success(record))
}

/// DELETE /<resource>/:id - returns the removed record.
pub async fn remove(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let id = path_id("id", &id)?;
    let record = state
        .db
        .delete(kind, id)
        .await?
        .ok_or_else(|| not_found(kind, id))?;
    Ok(ApiResponse::success(record))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttachTagRequest {
    pub tag_id: Uuid,
}

/// POST /documents/:id/tags
pub async fn attach_tag(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<AttachTagRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let document_id = path_id("id", &id)?;
    let Json(request) = payload.map_err(bad_json)?;

    ensure_document_exists(&state, document_id).await?;
    state.db.attach_tag(document_id, request.tag_id).await?;

    Ok(ApiResponse::created(json!({
        "document_id": document_id,
        "tag_id": request.tag_id,
    })))
}

/// GET /documents/:id/tags
pub async fn list_tags(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let document_id = path_id("id", &id)?;

    ensure_document_exists(&state, document_id).await?;
    let tags = state.db.document_tags(document_id).await?;

    let meta = json!({ "count": tags.len() });
    Ok(ApiResponse::success(Value::Array(tags)).with_meta(meta))
}

/// DELETE /documents/:id/tags/:tag_id
pub async fn detach_tag(
    State(state): State<AppState>,
    Path((id, tag_id)): Path<(String, String)>,
) -> ApiResult<Value> {
    let document_id = path_id("id", &id)?;
    let tag_id = path_id("tag_id", &tag_id)?;

    let removed = state.db.detach_tag(document_id, tag_id).await?;
    if !removed {
        return Err(ApiError::not_found(format!(
            "tag {tag_id} is not attached to document {document_id}"
        )));
    }

    Ok(ApiResponse::success(json!({
        "document_id": document_id,
        "tag_id": tag_id,
        "detached": true,
    })))
}

fn bad_json(rejection: JsonRejection) -> ApiError {
    ApiError::bad_request(format!("Invalid JSON body: {rejection}"))
}

fn bad_query(rejection: QueryRejection) -> ApiError {
    ApiError::bad_request(format!("Invalid query string: {rejection}"))
}

fn path_id(field: &'static str, raw: &str) -> Result<Uuid, ApiError> {
    schema::parse_id(field, raw)
        .map_err(|error| ApiError::validation("Invalid path parameter", vec![error]))
}

fn not_found(kind: EntityKind, id: Uuid) -> ApiError {
    ApiError::not_found(format!("{} {} not found", kind.label(), id))
}

async fn ensure_document_exists(state: &AppState, document_id: Uuid) -> Result<(), ApiError> {
    state
        .db
        .fetch(EntityKind::Document, document_id)
        .await?
        .ok_or_else(|| not_found(EntityKind::Document, document_id))?;
    Ok(())
}

/// Replaces secret field values with their bcrypt hashes before they reach
/// the store.
fn hash_secret_fields(
    kind: EntityKind,
    fields: &mut Map<String, Value>,
    cost: u32,
) -> Result<(), ApiError> {
    for name in kind.secret_fields() {
        if let Some(value) = fields.get_mut(name) {
            let plain = value
                .as_str()
                .ok_or_else(|| ApiError::internal("Secret field lost its value"))?
                .to_owned();
            let hashed = hash_password(&plain, cost).map_err(|err| {
                tracing::error!("password hashing failed: {}", err);
                ApiError::internal("Failed to process credentials")
            })?;
            *value = Value::String(hashed);
        }
    }
    Ok(())
}
