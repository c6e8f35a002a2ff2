//! Authentication: credential checks, token issuance and the
//! first-run administrator bootstrap.

use mongodb::bson::doc;
use secrecy::{ExposeSecret, Secret};

use service_core::error::AppError;

use crate::dtos::users::LoginRequest;
use crate::models::{Role, User};
use crate::services::database::GescomDb;
use crate::services::jwt::JwtService;
use crate::utils::password::{hash_password, verify_password, Password};

#[derive(Clone)]
pub struct AuthService {
    db: GescomDb,
    jwt: JwtService,
}

impl AuthService {
    pub fn new(db: GescomDb, jwt: JwtService) -> Self {
        Self { db, jwt }
    }

    /// Checks credentials and issues a token. The identifier matches
    /// either username or email; failures are deliberately uniform so
    /// callers cannot probe which accounts exist.
    pub async fn login(&self, request: LoginRequest) -> Result<(String, i64, User), AppError> {
        let identifier = request.username.trim();
        let user = self
            .db
            .users()
            .find_one(
                doc! { "$or": [ { "username": identifier }, { "email": identifier } ] },
                None,
            )
            .await
            .map_err(AppError::from)?;

        let user = match user {
            Some(user) => user,
            None => {
                metrics::counter!("logins_total", "outcome" => "failure").increment(1);
                return Err(AppError::Unauthorized(anyhow::anyhow!(
                    "Identifiants invalides"
                )));
            }
        };

        let password = Password::new(request.password);
        let valid = verify_password(&password, &user.password_hash)?;
        if !valid || !user.active {
            metrics::counter!("logins_total", "outcome" => "failure").increment(1);
            return Err(AppError::Unauthorized(anyhow::anyhow!(
                "Identifiants invalides"
            )));
        }

        self.db
            .users()
            .update_one(
                doc! { "_id": user.id.to_string() },
                doc! { "$set": { "last_login_at": mongodb::bson::DateTime::now() } },
                None,
            )
            .await
            .map_err(AppError::from)?;

        let (token, expires_in) = self.jwt.generate_token(&user)?;
        metrics::counter!("logins_total", "outcome" => "success").increment(1);
        tracing::info!(user_id = %user.id, username = %user.username, "User logged in");

        Ok((token, expires_in, user))
    }

    /// Creates the initial administrator when the user collection is
    /// empty, so a fresh deployment can be logged into at all.
    pub async fn ensure_default_admin(
        &self,
        username: &str,
        email: &str,
        password: &Secret<String>,
    ) -> Result<(), AppError> {
        let existing = self
            .db
            .users()
            .count_documents(None, None)
            .await
            .map_err(AppError::from)?;
        if existing > 0 {
            return Ok(());
        }

        let hash = hash_password(&Password::new(password.expose_secret().clone()))?;
        let admin = User::new(
            username.to_string(),
            email.to_string(),
            "Administrateur".to_string(),
            Role::Admin,
            hash,
        );

        match self.db.users().insert_one(&admin, None).await {
            Ok(_) => {
                tracing::warn!(
                    username,
                    "Default administrator created; change its password"
                );
                Ok(())
            }
            // Two instances can race the empty check; the unique index
            // on username decides and the loser backs off.
            Err(e) if crate::services::database::is_duplicate_key(&e) => Ok(()),
            Err(e) => Err(AppError::from(e)),
        }
    }
}
