use axum::{
    extract::{Query, State},
    Json,
};
use mongodb::bson::doc;
use validator::Validate;

use service_core::error::AppError;

use crate::dtos::settings::{
    ConversionQuery, ConversionResponse, RateResponse, SettingsResponse, UpdateRateRequest,
    UpdateSettingsRequest,
};
use crate::middleware::AuthUser;
use crate::models::{Capability, CompanySettings, COMPANY_SETTINGS_DOC_ID};
use crate::AppState;

pub async fn get_rate(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<RateResponse>, AppError> {
    let rate = state.rates.current().await?;
    Ok(Json(RateResponse::from(rate)))
}

/// Compare-and-swap on the version from `GET /taux-change`; a stale
/// version answers 409 and the caller re-reads.
pub async fn update_rate(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<UpdateRateRequest>,
) -> Result<Json<RateResponse>, AppError> {
    auth.0.require(Capability::ManageSettings)?;
    request.validate()?;

    let operator = auth.operator()?;
    let rate = state
        .rates
        .update(request.taux, request.version, &operator)
        .await?;
    Ok(Json(RateResponse::from(rate)))
}

pub async fn convert_amount(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<ConversionQuery>,
) -> Result<Json<ConversionResponse>, AppError> {
    let (resultat, taux) = state
        .rates
        .convert(query.montant, query.de, query.vers)
        .await?;
    Ok(Json(ConversionResponse {
        montant: query.montant,
        de: query.de,
        vers: query.vers,
        resultat,
        taux,
    }))
}

pub async fn get_settings(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<SettingsResponse>, AppError> {
    let settings = load_or_bootstrap(&state).await?;
    Ok(Json(SettingsResponse::from(settings)))
}

pub async fn update_settings(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<UpdateSettingsRequest>,
) -> Result<Json<SettingsResponse>, AppError> {
    auth.0.require(Capability::ManageSettings)?;
    request.validate()?;

    // Make sure the singleton exists before patching it.
    load_or_bootstrap(&state).await?;

    let mut set = doc! { "updated_at": mongodb::bson::DateTime::now() };
    if let Some(name) = request.name {
        set.insert("name", name);
    }
    if let Some(address) = request.address {
        set.insert("address", address);
    }
    if let Some(city) = request.city {
        set.insert("city", city);
    }
    if let Some(phone) = request.phone {
        set.insert("phone", phone);
    }
    if let Some(email) = request.email {
        set.insert("email", email);
    }
    if let Some(rccm) = request.rccm {
        set.insert("rccm", rccm);
    }
    if let Some(logo_url) = request.logo_url {
        set.insert("logo_url", logo_url);
    }
    if let Some(invoice_footer) = request.invoice_footer {
        set.insert("invoice_footer", invoice_footer);
    }

    state
        .db
        .company_settings()
        .update_one(
            doc! { "_id": COMPANY_SETTINGS_DOC_ID },
            doc! { "$set": set },
            None,
        )
        .await
        .map_err(AppError::from)?;

    let settings = load_or_bootstrap(&state).await?;
    tracing::info!("Company settings updated");
    Ok(Json(SettingsResponse::from(settings)))
}

/// The profile is created with defaults on first read; a lost insert
/// race falls back to whoever won.
async fn load_or_bootstrap(state: &AppState) -> Result<CompanySettings, AppError> {
    if let Some(settings) = state
        .db
        .company_settings()
        .find_one(doc! { "_id": COMPANY_SETTINGS_DOC_ID }, None)
        .await
        .map_err(AppError::from)?
    {
        return Ok(settings);
    }

    let bootstrap = CompanySettings::bootstrap();
    match state
        .db
        .company_settings()
        .insert_one(&bootstrap, None)
        .await
    {
        Ok(_) => Ok(bootstrap),
        Err(_) => state
            .db
            .company_settings()
            .find_one(doc! { "_id": COMPANY_SETTINGS_DOC_ID }, None)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| {
                AppError::DatabaseError(anyhow::anyhow!("Settings bootstrap lost its own insert"))
            }),
    }
}
