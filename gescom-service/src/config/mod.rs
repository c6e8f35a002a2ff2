use secrecy::{ExposeSecret, Secret};
use std::env;

use service_core::error::AppError;

#[derive(Debug, Clone)]
pub struct GescomConfig {
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: String,
    pub server: ServerConfig,
    pub mongodb: MongoConfig,
    pub jwt: JwtConfig,
    pub bootstrap: BootstrapConfig,
    pub checkout: CheckoutConfig,
    pub security: SecurityConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: Secret<String>,
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: Secret<String>,
    pub token_expiry_minutes: i64,
}

/// First-run administrator account, created only when the user
/// collection is empty.
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    pub admin_username: String,
    pub admin_email: String,
    pub admin_password: Secret<String>,
}

/// Hosted checkout provider credentials. All empty means the provider
/// is disabled and payments are completed via the simulate endpoint.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    pub api_key: String,
    pub api_secret: Secret<String>,
    pub webhook_secret: Secret<String>,
    pub api_base_url: String,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub global_ip_limit: u32,
    pub global_ip_window_seconds: u64,
    pub login_attempts: u32,
    pub login_window_seconds: u64,
}

impl GescomConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;
        let is_prod = environment == Environment::Prod;

        let config = GescomConfig {
            environment,
            service_name: get_env("SERVICE_NAME", Some("gescom-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            otlp_endpoint: get_env("OTLP_ENDPOINT", Some("http://localhost:4317"), is_prod)?,
            server: ServerConfig {
                host: get_env("GESCOM_HOST", Some("0.0.0.0"), is_prod)?,
                port: get_env("GESCOM_PORT", Some("3010"), is_prod)?
                    .parse()
                    .map_err(|e: std::num::ParseIntError| {
                        AppError::ConfigError(anyhow::anyhow!(e.to_string()))
                    })?,
            },
            mongodb: MongoConfig {
                uri: Secret::new(get_env(
                    "MONGODB_URI",
                    Some("mongodb://localhost:27017"),
                    is_prod,
                )?),
                database: get_env("MONGODB_DATABASE", Some("gescom"), is_prod)?,
            },
            jwt: JwtConfig {
                secret: Secret::new(get_env(
                    "JWT_SECRET",
                    Some("dev-only-jwt-secret-change-me"),
                    is_prod,
                )?),
                token_expiry_minutes: get_env("JWT_TOKEN_EXPIRY_MINUTES", Some("480"), is_prod)?
                    .parse()
                    .map_err(|e: std::num::ParseIntError| {
                        AppError::ConfigError(anyhow::anyhow!(e.to_string()))
                    })?,
            },
            bootstrap: BootstrapConfig {
                admin_username: get_env("ADMIN_USERNAME", Some("admin"), is_prod)?,
                admin_email: get_env("ADMIN_EMAIL", Some("admin@gescom.local"), is_prod)?,
                admin_password: Secret::new(get_env("ADMIN_PASSWORD", Some("admin123!"), is_prod)?),
            },
            checkout: CheckoutConfig {
                api_key: env::var("CHECKOUT_API_KEY").unwrap_or_default(),
                api_secret: Secret::new(env::var("CHECKOUT_API_SECRET").unwrap_or_default()),
                webhook_secret: Secret::new(env::var("CHECKOUT_WEBHOOK_SECRET").unwrap_or_default()),
                api_base_url: env::var("CHECKOUT_API_BASE_URL").unwrap_or_default(),
            },
            security: SecurityConfig {
                allowed_origins: get_env("ALLOWED_ORIGINS", Some("http://localhost:3000"), is_prod)?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
            },
            rate_limit: RateLimitConfig {
                global_ip_limit: get_env("RATE_LIMIT_GLOBAL_IP_LIMIT", Some("300"), is_prod)?
                    .parse()
                    .unwrap_or(300),
                global_ip_window_seconds: get_env(
                    "RATE_LIMIT_GLOBAL_IP_WINDOW_SECONDS",
                    Some("60"),
                    is_prod,
                )?
                .parse()
                .unwrap_or(60),
                login_attempts: get_env("RATE_LIMIT_LOGIN_ATTEMPTS", Some("5"), is_prod)?
                    .parse()
                    .unwrap_or(5),
                login_window_seconds: get_env(
                    "RATE_LIMIT_LOGIN_WINDOW_SECONDS",
                    Some("900"),
                    is_prod,
                )?
                .parse()
                .unwrap_or(900),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.server.port == 0 && self.environment == Environment::Prod {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "GESCOM_PORT must be greater than 0"
            )));
        }

        if self.jwt.token_expiry_minutes <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_TOKEN_EXPIRY_MINUTES must be positive"
            )));
        }

        if self.environment == Environment::Prod {
            if self.jwt.secret.expose_secret().len() < 32 {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "JWT_SECRET must be at least 32 characters in production"
                )));
            }
            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}
