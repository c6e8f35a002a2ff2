use gescom_service::config::GescomConfig;
use gescom_service::services::{init_metrics, GescomDb};
use gescom_service::Application;
use std::sync::Once;
use uuid::Uuid;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin123!";
pub const TEST_PASSWORD: &str = "motdepasse1!";

static INIT_METRICS: Once = Once::new();

pub struct TestApp {
    pub address: String,
    pub api: String,
    pub port: u16,
    pub db: GescomDb,
    pub db_name: String,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        INIT_METRICS.call_once(init_metrics);

        let db_name = format!("gescom_test_{}", Uuid::new_v4().simple());

        let mut config = GescomConfig::from_env().expect("Failed to load configuration");
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0; // Random port for testing
        config.mongodb.database = db_name.clone();
        // Loosened so tests that log in repeatedly do not trip the limiters.
        config.rate_limit.login_attempts = 1000;
        config.rate_limit.global_ip_limit = 60_000;

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let db = app.db().clone();
        let address = format!("http://127.0.0.1:{}", port);
        let api = format!("{}/api/v1", address);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to be ready by polling the health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            api,
            port,
            db,
            db_name,
            client,
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .client
            .post(format!("{}/auth/login", self.api))
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to execute login request");
        assert!(
            response.status().is_success(),
            "Login failed with status {}",
            response.status()
        );

        let body: serde_json::Value = response.json().await.expect("Failed to parse login body");
        body["token"]
            .as_str()
            .expect("Missing token in login response")
            .to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_USERNAME, ADMIN_PASSWORD).await
    }

    /// Create an account with the given role and return a token for it.
    pub async fn user_token(&self, role: &str) -> String {
        let admin = self.admin_token().await;
        let suffix = Uuid::new_v4().simple().to_string();
        let username = format!("test_{}", &suffix[..8]);

        let response = self
            .client
            .post(format!("{}/users", self.api))
            .bearer_auth(&admin)
            .json(&serde_json::json!({
                "username": username,
                "email": format!("{}@test.local", username),
                "display_name": "Compte de test",
                "role": role,
                "password": TEST_PASSWORD,
            }))
            .send()
            .await
            .expect("Failed to create test user");
        assert_eq!(
            response.status().as_u16(),
            201,
            "Test user creation failed for role {}",
            role
        );

        self.login(&username, TEST_PASSWORD).await
    }

    /// Create a client record and return its id.
    pub async fn seed_client(&self, token: &str, name: &str) -> String {
        let response = self
            .client
            .post(format!("{}/clients", self.api))
            .bearer_auth(token)
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await
            .expect("Failed to create client");
        assert_eq!(response.status().as_u16(), 201);

        let body: serde_json::Value = response.json().await.expect("Failed to parse client body");
        body["id"].as_str().expect("Missing client id").to_string()
    }

    /// Create a stock-managed product and return its id.
    pub async fn seed_product(&self, token: &str, name: &str, initial_stock: i64) -> String {
        let response = self
            .client
            .post(format!("{}/produits", self.api))
            .bearer_auth(token)
            .json(&serde_json::json!({
                "name": name,
                "unit_price_usd": 100.0,
                "tax_rate": 16.0,
                "manage_stock": true,
                "initial_stock": initial_stock,
                "minimum_stock": 2,
                "maximum_stock": 500,
            }))
            .send()
            .await
            .expect("Failed to create product");
        assert_eq!(response.status().as_u16(), 201);

        let body: serde_json::Value = response.json().await.expect("Failed to parse product body");
        body["id"].as_str().expect("Missing product id").to_string()
    }

    pub async fn cleanup(&self) {
        let _ = self.db.database().drop(None).await;
    }
}
