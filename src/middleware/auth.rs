use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::{self, Claims};
use crate::error::ApiError;
use crate::AppState;

/// Authenticated profile context extracted from the JWT.
#[derive(Clone, Debug)]
pub struct AuthProfile {
    pub profile_id: Uuid,
    pub role: String,
}

impl From<Claims> for AuthProfile {
    fn from(claims: Claims) -> Self {
        Self { profile_id: claims.sub, role: claims.role }
    }
}

/// Bearer-token gate for protected routes.
///
/// Rejections short-circuit with 401 and the flat `{"message"}` body; on
/// success an [`AuthProfile`] is attached to the request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("Acesso negado. Token não fornecido."))?;

    let claims = auth::verify_token(&token, &state.config.security.jwt_secret).map_err(|err| {
        tracing::debug!("rejected bearer token: {}", err);
        ApiError::unauthorized("Acesso negado. Token inválido ou expirado.")
    })?;

    request.extensions_mut().insert(AuthProfile::from(claims));
    Ok(next.run(request).await)
}

/// Pulls the token out of `Authorization: Bearer <token>`.
fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get("authorization")?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_a_bearer_token() {
        let headers = headers_with("Bearer abc.def.ghi");
        assert_eq!(extract_bearer_token(&headers), Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn missing_header_yields_none() {
        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn non_bearer_schemes_are_refused() {
        let headers = headers_with("Basic dXNlcjpwYXNz");
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn empty_tokens_are_refused() {
        let headers = headers_with("Bearer   ");
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn auth_profile_carries_claim_identity() {
        let claims = Claims::new(Uuid::new_v4(), "admin", 1);
        let profile = AuthProfile::from(claims.clone());
        assert_eq!(profile.profile_id, claims.sub);
        assert_eq!(profile.role, "admin");
    }
}
