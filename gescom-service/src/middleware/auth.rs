use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};

use service_core::error::AppError;

use crate::services::jwt::Claims;
use crate::services::Operator;
use crate::AppState;

/// Requires a valid bearer token and stores its claims in the request
/// extensions for the handlers.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| {
            AppError::Unauthorized(anyhow::anyhow!("Jeton d'authentification manquant"))
        })?;

    let claims = state.jwt.validate_token(token)?;
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Extractor handing the authenticated claims to handlers.
pub struct AuthUser(pub Claims);

impl AuthUser {
    /// Audit identity for writes performed by this request.
    pub fn operator(&self) -> Result<Operator, AppError> {
        Ok(Operator {
            id: self.0.user_id()?,
            name: self.0.username.clone(),
        })
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts.extensions.get::<Claims>().cloned().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!("Auth claims missing from request extensions"))
        })?;

        Ok(AuthUser(claims))
    }
}
