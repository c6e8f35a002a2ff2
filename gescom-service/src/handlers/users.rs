use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::FindOptions;
use uuid::Uuid;
use validator::Validate;

use service_core::error::AppError;

use crate::dtos::users::{CreateUserRequest, UpdateUserRequest, UserResponse};
use crate::middleware::AuthUser;
use crate::models::{Capability, User};
use crate::services::database::is_duplicate_key;
use crate::services::DomainError;
use crate::utils::password::{hash_password, Password};
use crate::AppState;

pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    auth.0.require(Capability::ManageUsers)?;

    let options = FindOptions::builder().sort(doc! { "username": 1 }).build();
    let mut cursor = state
        .db
        .users()
        .find(None, options)
        .await
        .map_err(AppError::from)?;

    let mut users = Vec::new();
    while let Some(user) = cursor.try_next().await.map_err(AppError::from)? {
        users.push(UserResponse::from(user));
    }
    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, AppError> {
    auth.0.require(Capability::ManageUsers)?;

    let user = find_user(&state, id).await?;
    Ok(Json(UserResponse::from(user)))
}

pub async fn create_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    auth.0.require(Capability::ManageUsers)?;
    request.validate()?;

    let hash = hash_password(&Password::new(request.password))?;
    let user = User::new(
        request.username,
        request.email,
        request.display_name,
        request.role,
        hash,
    );

    match state.db.users().insert_one(&user, None).await {
        Ok(_) => {}
        Err(e) if is_duplicate_key(&e) => {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Nom d'utilisateur ou email deja utilise"
            )));
        }
        Err(e) => return Err(AppError::from(e)),
    }

    tracing::info!(user_id = %user.id, username = %user.username, role = user.role.as_str(), "User created");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    auth.0.require(Capability::ManageUsers)?;
    request.validate()?;

    let mut set = doc! { "updated_at": mongodb::bson::DateTime::now() };
    if let Some(email) = request.email {
        set.insert("email", email);
    }
    if let Some(display_name) = request.display_name {
        set.insert("display_name", display_name);
    }
    if let Some(role) = request.role {
        set.insert("role", role.as_str());
    }
    if let Some(active) = request.active {
        set.insert("active", active);
    }
    if let Some(password) = request.password {
        set.insert("password_hash", hash_password(&Password::new(password))?);
    }

    let result = state
        .db
        .users()
        .update_one(doc! { "_id": id.to_string() }, doc! { "$set": set }, None)
        .await;
    match result {
        Ok(r) if r.matched_count == 0 => {
            return Err(DomainError::NotFound("Utilisateur introuvable".to_string()).into());
        }
        Ok(_) => {}
        Err(e) if is_duplicate_key(&e) => {
            return Err(AppError::Conflict(anyhow::anyhow!("Email deja utilise")));
        }
        Err(e) => return Err(AppError::from(e)),
    }

    let user = find_user(&state, id).await?;
    Ok(Json(UserResponse::from(user)))
}

/// Deactivates the account. Tokens already issued fail at `/auth/me`
/// and on the next login; records keep their operator references.
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.0.require(Capability::ManageUsers)?;

    if auth.0.user_id()? == id {
        return Err(DomainError::NotApplicable(
            "Impossible de desactiver son propre compte".to_string(),
        )
        .into());
    }

    let result = state
        .db
        .users()
        .update_one(
            doc! { "_id": id.to_string() },
            doc! { "$set": { "active": false, "updated_at": mongodb::bson::DateTime::now() } },
            None,
        )
        .await
        .map_err(AppError::from)?;
    if result.matched_count == 0 {
        return Err(DomainError::NotFound("Utilisateur introuvable".to_string()).into());
    }

    tracing::info!(user_id = %id, "User deactivated");
    Ok(StatusCode::NO_CONTENT)
}

async fn find_user(state: &AppState, id: Uuid) -> Result<User, AppError> {
    state
        .db
        .users()
        .find_one(doc! { "_id": id.to_string() }, None)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| DomainError::NotFound("Utilisateur introuvable".to_string()).into())
}
