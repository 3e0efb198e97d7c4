// Router assembly.
//
// Three groups: open endpoints (banner, health), rate-limited public auth
// endpoints (login, registration), and the bearer-gated resource routers
// generated from the entity registry.

use axum::extract::{Extension, State};
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post};
use axum::Router;
use serde_json::{json, Map, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::ApiError;
use crate::handlers::{auth, entity};
use crate::middleware::{limit_requests, require_auth, ApiResponse, ApiResult};
use crate::schema::EntityKind;
use crate::AppState;

pub fn app(state: AppState) -> Router {
    let mut protected = Router::new();
    for kind in EntityKind::ALL {
        protected = protected.merge(resource_routes(kind));
    }
    let protected = protected
        .route("/documents/:id/tags", post(entity::attach_tag).get(entity::list_tags))
        .route("/documents/:id/tags/:tag_id", delete(entity::detach_tag))
        .layer(from_fn_with_state(state.clone(), require_auth));

    let public = Router::new()
        .route("/login", post(auth::login))
        // registration shares the login rate limit but skips the auth gate
        .route("/profiles", post(entity::create).layer(Extension(EntityKind::Profile)))
        .layer(from_fn_with_state(state.clone(), limit_requests));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public)
        .merge(protected)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CRUD routes for one entity, tagged with its kind so the generic
/// handlers know which descriptor applies.
fn resource_routes(kind: EntityKind) -> Router<AppState> {
    let collection = if kind == EntityKind::Profile {
        // POST /profiles is public registration, mounted separately
        get(entity::list)
    } else {
        get(entity::list).post(entity::create)
    };

    Router::new()
        .route(&format!("/{}", kind.path_segment()), collection)
        .route(
            &format!("/{}/:id", kind.path_segment()),
            get(entity::fetch).patch(entity::update).delete(entity::remove),
        )
        .layer(Extension(kind))
}

async fn root() -> ApiResponse<Value> {
    let mut endpoints = Map::new();
    endpoints.insert("login".into(), Value::String("POST /login (public)".into()));
    endpoints.insert("register".into(), Value::String("POST /profiles (public)".into()));
    endpoints.insert("health".into(), Value::String("GET /health (public)".into()));
    for kind in EntityKind::ALL {
        let path = kind.path_segment();
        endpoints.insert(path.to_string(), Value::String(format!("/{path}[/:id] (protected)")));
    }
    endpoints.insert(
        "document_tags".into(),
        Value::String("/documents/:id/tags[/:tag_id] (protected)".into()),
    );

    ApiResponse::success(json!({
        "name": "Conversa API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": endpoints,
    }))
}

async fn health(State(state): State<AppState>) -> ApiResult<Value> {
    state.db.health_check().await.map_err(|err| {
        tracing::error!("health check failed: {}", err);
        ApiError::unavailable("database unavailable")
    })?;

    Ok(ApiResponse::success(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
        "database": "ok",
    })))
}
