// Login endpoint.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::auth::{self, Claims};
use crate::database::ProfileCredentials;
use crate::error::ApiError;
use crate::schema::EntityKind;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /login - verify credentials and issue a JWT.
///
/// Success and failure both use the flat auth body shape, not the
/// envelope. Bad email and bad password are indistinguishable on purpose.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload
        .map_err(|rejection| ApiError::bad_request(format!("Invalid JSON body: {rejection}")))?;

    let credentials = state
        .db
        .find_profile_by_email(&request.email)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !auth::verify_password(&request.password, &credentials.profile_password).unwrap_or(false) {
        return Err(invalid_credentials());
    }

    let claims = Claims::new(
        credentials.id,
        credentials.profile_role.clone(),
        state.config.security.jwt_expiry_hours,
    );
    let token = auth::generate_token(&claims, &state.config.security.jwt_secret).map_err(|err| {
        tracing::error!("token generation failed: {}", err);
        ApiError::internal("Failed to issue token")
    })?;

    record_login(&state, &credentials).await;

    Ok(Json(json!({
        "message": "Login realizado com sucesso",
        "token": token,
        "userData": {
            "user_id": credentials.id,
            "user_role": credentials.profile_role,
        }
    })))
}

fn invalid_credentials() -> ApiError {
    ApiError::unauthorized("Email ou senha inválidos")
}

/// Appends a login row to the activity trail. Best effort: a failure here
/// must not fail the login.
async fn record_login(state: &AppState, credentials: &ProfileCredentials) {
    let mut fields = Map::new();
    fields.insert("profile_id".into(), Value::String(credentials.id.to_string()));
    fields.insert("action".into(), Value::String("login".into()));
    fields.insert(
        "description".into(),
        Value::String("Login realizado com sucesso".into()),
    );

    if let Err(err) = state.db.insert(EntityKind::ActivityLog, &fields).await {
        tracing::warn!("failed to record login activity: {}", err);
    }
}
