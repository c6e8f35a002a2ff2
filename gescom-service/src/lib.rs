pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};
use service_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{ip_rate_limit_middleware, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::GescomConfig;
use crate::services::{
    AuthService, CheckoutClient, GescomDb, InvoiceService, JwtService, PaymentService,
    QuoteService, RateService, StatsService, StockService,
};

pub use startup::Application;

#[derive(Clone)]
pub struct AppState {
    pub config: GescomConfig,
    pub db: GescomDb,
    pub jwt: JwtService,
    pub auth: AuthService,
    pub stock: StockService,
    pub rates: RateService,
    pub invoices: InvoiceService,
    pub quotes: QuoteService,
    pub payments: PaymentService,
    pub checkout: CheckoutClient,
    pub stats: StatsService,
    pub login_rate_limiter: IpRateLimiter,
    pub ip_rate_limiter: IpRateLimiter,
}

pub fn build_router(state: AppState) -> Router {
    // Login gets its own tighter limiter on top of the global one.
    let login_route = Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .layer(from_fn_with_state(
            state.login_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let public_routes = Router::new()
        .route(
            "/paiements/webhook",
            post(handlers::payments::payment_webhook),
        )
        .merge(login_route);

    let protected_routes = Router::new()
        .route("/auth/me", get(handlers::auth::me))
        .route(
            "/clients",
            get(handlers::clients::list_clients).post(handlers::clients::create_client),
        )
        .route(
            "/clients/:id",
            get(handlers::clients::get_client)
                .put(handlers::clients::update_client)
                .delete(handlers::clients::delete_client),
        )
        .route(
            "/produits",
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route(
            "/produits/:id",
            get(handlers::products::get_product)
                .put(handlers::products::update_product)
                .delete(handlers::products::delete_product),
        )
        .route("/produits/:id/stock", post(handlers::products::adjust_stock))
        .route(
            "/produits/:id/mouvements",
            get(handlers::products::stock_movements),
        )
        .route(
            "/factures",
            get(handlers::invoices::list_invoices).post(handlers::invoices::create_invoice),
        )
        .route(
            "/factures/:id",
            get(handlers::invoices::get_invoice).delete(handlers::invoices::delete_invoice),
        )
        .route(
            "/factures/:id/envoyer",
            post(handlers::invoices::send_invoice),
        )
        .route("/factures/:id/payer", post(handlers::invoices::pay_invoice))
        .route(
            "/factures/:id/annuler",
            post(handlers::invoices::cancel_invoice),
        )
        .route(
            "/devis",
            get(handlers::quotes::list_quotes).post(handlers::quotes::create_quote),
        )
        .route("/devis/:id", get(handlers::quotes::get_quote))
        .route("/devis/:id/statut", put(handlers::quotes::set_quote_status))
        .route(
            "/devis/:id/convertir-facture",
            post(handlers::quotes::convert_quote),
        )
        .route(
            "/paiements",
            get(handlers::payments::list_payments).post(handlers::payments::create_payment),
        )
        .route(
            "/paiements/simulate",
            post(handlers::payments::simulate_payment),
        )
        .route("/paiements/:id", get(handlers::payments::get_payment))
        .route(
            "/taux-change",
            get(handlers::settings::get_rate).put(handlers::settings::update_rate),
        )
        .route("/conversion", get(handlers::settings::convert_amount))
        .route("/stats", get(handlers::stats::get_stats))
        .route(
            "/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/users/:id",
            get(handlers::users::get_user)
                .put(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        .route(
            "/parametres",
            get(handlers::settings::get_settings).put(handlers::settings::update_settings),
        )
        .route(
            "/outils",
            get(handlers::tools::list_tools).post(handlers::tools::create_tool),
        )
        .route("/outils/:id", get(handlers::tools::get_tool))
        .route("/outils/:id/affecter", post(handlers::tools::assign_tool))
        .route(
            "/outils/:id/approvisionner",
            post(handlers::tools::restock_tool),
        )
        .route("/outils/:id/mouvements", get(handlers::tools::tool_movements))
        .route("/affectations", get(handlers::tools::list_assignments))
        .route(
            "/affectations/:id/retourner",
            post(handlers::tools::return_assignment),
        )
        .route(
            "/opportunites",
            get(handlers::opportunities::list_opportunities)
                .post(handlers::opportunities::create_opportunity),
        )
        .route(
            "/opportunites/filtres",
            get(handlers::opportunities::filter_opportunities),
        )
        .route(
            "/opportunites/liees",
            get(handlers::opportunities::linked_opportunities),
        )
        .route(
            "/opportunites/:id",
            get(handlers::opportunities::get_opportunity)
                .put(handlers::opportunities::update_opportunity)
                .delete(handlers::opportunities::delete_opportunity),
        )
        .route(
            "/opportunites/:id/lier-client",
            post(handlers::opportunities::link_client),
        )
        .route(
            "/commandes",
            get(handlers::orders::list_orders).post(handlers::orders::create_order),
        )
        .route("/commandes/:id", get(handlers::orders::get_order))
        .route(
            "/commandes/:id/statut",
            put(handlers::orders::set_order_status),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let api = public_routes.merge(protected_routes);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness))
        .route("/metrics", get(handlers::metrics::metrics_handler))
        .nest("/api/v1", api)
        .with_state(state.clone())
        // Global IP rate limiting
        .layer(from_fn_with_state(
            state.ip_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config))
}

fn cors_layer(config: &GescomConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if config.security.allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .security
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}. Skipping.", origin, e);
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}
