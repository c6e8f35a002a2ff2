use std::future::IntoFuture;
use std::net::SocketAddr;

use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::middleware::rate_limit::create_ip_rate_limiter;
use tokio::net::TcpListener;

use crate::config::GescomConfig;
use crate::services::{
    AuthService, CheckoutClient, GescomDb, InvoiceService, JwtService, PaymentService,
    QuoteService, RateService, StatsService, StockService,
};
use crate::{build_router, AppState};

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
    state: AppState,
}

impl Application {
    pub async fn build(config: GescomConfig) -> Result<Self, AppError> {
        let db = GescomDb::connect(config.mongodb.uri.expose_secret(), &config.mongodb.database)
            .await
            .map_err(|e| {
                tracing::error!("Failed to connect to MongoDB: {}", e);
                e
            })?;
        db.initialize_indexes().await.map_err(|e| {
            tracing::error!("Failed to initialize database indexes: {}", e);
            e
        })?;

        let jwt = JwtService::new(&config.jwt.secret, config.jwt.token_expiry_minutes);

        let checkout = CheckoutClient::new(config.checkout.clone());
        if checkout.is_configured() {
            tracing::info!("Checkout provider client initialized");
        } else {
            tracing::warn!(
                "Checkout credentials not configured - hosted payment sessions are disabled"
            );
        }

        let stock = StockService::new(db.clone());
        let rates = RateService::new(db.clone());
        let invoices = InvoiceService::new(db.clone(), stock.clone(), rates.clone());
        let quotes = QuoteService::new(db.clone(), rates.clone(), invoices.clone());
        let payments = PaymentService::new(db.clone(), invoices.clone(), checkout.clone());
        let auth = AuthService::new(db.clone(), jwt.clone());
        let stats = StatsService::new(db.clone());

        // Seed the singleton rate document and the first account so a
        // fresh database is usable immediately.
        rates.current().await?;
        auth.ensure_default_admin(
            &config.bootstrap.admin_username,
            &config.bootstrap.admin_email,
            &config.bootstrap.admin_password,
        )
        .await?;

        let login_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.login_attempts,
            config.rate_limit.login_window_seconds,
        );
        let ip_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.global_ip_limit,
            config.rate_limit.global_ip_window_seconds,
        );

        let state = AppState {
            config: config.clone(),
            db,
            jwt,
            auth,
            stock,
            rates,
            invoices,
            quotes,
            payments,
            checkout,
            stats,
            login_rate_limiter,
            ip_rate_limiter,
        };

        let app = build_router(state.clone());

        let addr = format!("{}:{}", config.server.host, config.server.port);
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, "Listening");

        let server = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        );

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
            state,
        })
    }

    pub fn db(&self) -> &GescomDb {
        &self.state.db
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}
