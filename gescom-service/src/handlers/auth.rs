use axum::{extract::State, Json};
use mongodb::bson::doc;
use validator::Validate;

use service_core::error::AppError;

use crate::dtos::users::{LoginRequest, LoginResponse, UserResponse};
use crate::middleware::AuthUser;
use crate::services::DomainError;
use crate::AppState;

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    request.validate()?;

    let (token, expires_in, user) = state.auth.login(request).await?;

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in,
        user: UserResponse::from(user),
    }))
}

/// Echoes the account behind the bearer token.
pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<UserResponse>, AppError> {
    let user_id = auth.0.user_id()?;
    let user = state
        .db
        .users()
        .find_one(doc! { "_id": user_id.to_string() }, None)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| DomainError::NotFound("Utilisateur introuvable".to_string()))?;

    if !user.active {
        return Err(AppError::Unauthorized(anyhow::anyhow!("Compte desactive")));
    }

    Ok(Json(UserResponse::from(user)))
}
