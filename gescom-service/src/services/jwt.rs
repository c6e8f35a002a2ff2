use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::{Capability, Role, User};

/// Bearer token claims. The role travels in the token; authorization is
/// re-derived from it on every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub username: String,
    pub role: Role,
    /// Expiration (Unix timestamp).
    pub exp: i64,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Token id.
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("Malformed subject claim")))
    }

    /// Capability gate used by guarded handlers.
    pub fn require(&self, capability: Capability) -> Result<(), AppError> {
        if self.role.allows(capability) {
            Ok(())
        } else {
            Err(AppError::Forbidden(anyhow::anyhow!(
                "Le role {} ne permet pas cette operation",
                self.role.as_str()
            )))
        }
    }
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_minutes: i64,
}

impl JwtService {
    pub fn new(secret: &Secret<String>, expiry_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.expose_secret().as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            expiry_minutes,
        }
    }

    /// Issue a token for a user. Returns the token and its lifetime in
    /// seconds.
    pub fn generate_token(&self, user: &User) -> Result<(String, i64), AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            role: user.role,
            exp: (now + Duration::minutes(self.expiry_minutes)).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok((token, self.expiry_minutes * 60))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        let data = decode::<Claims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Capability;

    fn user(role: Role) -> User {
        User::new(
            "mkalala".to_string(),
            "mkalala@example.com".to_string(),
            "Mireille Kalala".to_string(),
            role,
            "$argon2id$stub".to_string(),
        )
    }

    fn service() -> JwtService {
        JwtService::new(&Secret::new("test-secret-0123456789".to_string()), 60)
    }

    #[test]
    fn token_round_trips_subject_username_and_role() {
        let svc = service();
        let u = user(Role::Manager);
        let (token, expires_in) = svc.generate_token(&u).unwrap();
        assert_eq!(expires_in, 3600);

        let claims = svc.validate_token(&token).unwrap();
        assert_eq!(claims.sub, u.id.to_string());
        assert_eq!(claims.username, "mkalala");
        assert_eq!(claims.role, Role::Manager);
        assert_eq!(claims.user_id().unwrap(), u.id);
    }

    #[test]
    fn expired_token_is_rejected() {
        let svc = JwtService::new(&Secret::new("test-secret-0123456789".to_string()), -5);
        let (token, _) = svc.generate_token(&user(Role::Admin)).unwrap();
        assert!(svc.validate_token(&token).is_err());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let (token, _) = service().generate_token(&user(Role::Admin)).unwrap();
        let other = JwtService::new(&Secret::new("another-secret-entirely".to_string()), 60);
        assert!(other.validate_token(&token).is_err());
    }

    #[test]
    fn require_enforces_the_capability_table() {
        let svc = service();
        let (token, _) = svc.generate_token(&user(Role::Accountant)).unwrap();
        let claims = svc.validate_token(&token).unwrap();

        assert!(claims.require(Capability::Invoicing).is_ok());
        assert!(claims.require(Capability::ManageUsers).is_err());
    }
}
