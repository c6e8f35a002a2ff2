use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Role, User};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 3, max = 50, message = "Le nom d'utilisateur doit faire 3 a 50 caracteres"))]
    pub username: String,

    #[validate(email(message = "Email invalide"))]
    pub email: String,

    #[validate(length(min = 1, max = 100, message = "Le nom complet est obligatoire"))]
    pub display_name: String,

    pub role: Role,

    #[validate(length(min = 8, max = 128, message = "Le mot de passe doit faire au moins 8 caracteres"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(email(message = "Email invalide"))]
    pub email: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Le nom complet est obligatoire"))]
    pub display_name: Option<String>,

    pub role: Option<Role>,
    pub active: Option<bool>,

    #[validate(length(min = 8, max = 128, message = "Le mot de passe doit faire au moins 8 caracteres"))]
    pub password: Option<String>,
}

/// `username` also accepts the account email.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Identifiant requis"))]
    pub username: String,

    #[validate(length(min = 1, message = "Mot de passe requis"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            display_name: user.display_name,
            role: user.role,
            active: user.active,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}
