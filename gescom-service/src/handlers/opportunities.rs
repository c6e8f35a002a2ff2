use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::FindOptions;
use uuid::Uuid;
use validator::Validate;

use service_core::error::AppError;

use crate::dtos::opportunities::{
    CreateOpportunityRequest, LinkClientRequest, OpportunityFilterQuery, OpportunityResponse,
    UpdateOpportunityRequest,
};
use crate::middleware::AuthUser;
use crate::models::{Capability, Opportunity, OpportunityStage};
use crate::services::DomainError;
use crate::AppState;

pub async fn list_opportunities(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<OpportunityResponse>>, AppError> {
    auth.0.require(Capability::ManageSales)?;
    find_opportunities(&state, doc! {}).await
}

/// Pipeline search by stage, client and estimated amount range.
pub async fn filter_opportunities(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<OpportunityFilterQuery>,
) -> Result<Json<Vec<OpportunityResponse>>, AppError> {
    auth.0.require(Capability::ManageSales)?;

    let mut filter = doc! {};
    if let Some(stage) = query.etape {
        filter.insert("stage", stage.as_str());
    }
    if let Some(client_id) = query.client_id {
        filter.insert("client_id", client_id.to_string());
    }
    let mut amount = doc! {};
    if let Some(min) = query.montant_min {
        amount.insert("$gte", min);
    }
    if let Some(max) = query.montant_max {
        amount.insert("$lte", max);
    }
    if !amount.is_empty() {
        filter.insert("amount_usd", amount);
    }

    find_opportunities(&state, filter).await
}

/// Opportunities already tied to a client record.
pub async fn linked_opportunities(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<OpportunityResponse>>, AppError> {
    auth.0.require(Capability::ManageSales)?;
    find_opportunities(&state, doc! { "client_id": { "$ne": null } }).await
}

pub async fn get_opportunity(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OpportunityResponse>, AppError> {
    auth.0.require(Capability::ManageSales)?;

    let opportunity = find_opportunity(&state, id).await?;
    Ok(Json(OpportunityResponse::from(opportunity)))
}

pub async fn create_opportunity(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateOpportunityRequest>,
) -> Result<(StatusCode, Json<OpportunityResponse>), AppError> {
    auth.0.require(Capability::ManageSales)?;
    request.validate()?;

    let client_name = match request.client_id {
        Some(client_id) => Some(load_client_name(&state, client_id).await?),
        None => None,
    };

    let now = chrono::Utc::now();
    let opportunity = Opportunity {
        id: Uuid::new_v4(),
        title: request.title,
        description: request.description,
        amount_usd: request.amount_usd,
        stage: request.stage.unwrap_or(OpportunityStage::Prospecting),
        client_id: request.client_id,
        client_name,
        expected_close: request.expected_close,
        created_at: now,
        updated_at: now,
    };

    state
        .db
        .opportunities()
        .insert_one(&opportunity, None)
        .await
        .map_err(AppError::from)?;

    tracing::info!(opportunity_id = %opportunity.id, title = %opportunity.title, "Opportunity created");
    Ok((
        StatusCode::CREATED,
        Json(OpportunityResponse::from(opportunity)),
    ))
}

pub async fn update_opportunity(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateOpportunityRequest>,
) -> Result<Json<OpportunityResponse>, AppError> {
    auth.0.require(Capability::ManageSales)?;
    request.validate()?;

    let mut set = doc! { "updated_at": mongodb::bson::DateTime::now() };
    if let Some(title) = request.title {
        set.insert("title", title);
    }
    if let Some(description) = request.description {
        set.insert("description", description);
    }
    if let Some(amount) = request.amount_usd {
        set.insert("amount_usd", amount);
    }
    if let Some(stage) = request.stage {
        set.insert("stage", stage.as_str());
    }
    if let Some(expected_close) = request.expected_close {
        set.insert(
            "expected_close",
            mongodb::bson::DateTime::from_chrono(expected_close),
        );
    }

    let result = state
        .db
        .opportunities()
        .update_one(doc! { "_id": id.to_string() }, doc! { "$set": set }, None)
        .await
        .map_err(AppError::from)?;
    if result.matched_count == 0 {
        return Err(DomainError::NotFound("Opportunite introuvable".to_string()).into());
    }

    let opportunity = find_opportunity(&state, id).await?;
    Ok(Json(OpportunityResponse::from(opportunity)))
}

/// Attaches a client record to a prospect and snapshots its name.
pub async fn link_client(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<LinkClientRequest>,
) -> Result<Json<OpportunityResponse>, AppError> {
    auth.0.require(Capability::ManageSales)?;

    let client_name = load_client_name(&state, request.client_id).await?;

    let result = state
        .db
        .opportunities()
        .update_one(
            doc! { "_id": id.to_string() },
            doc! { "$set": {
                "client_id": request.client_id.to_string(),
                "client_name": client_name,
                "updated_at": mongodb::bson::DateTime::now(),
            } },
            None,
        )
        .await
        .map_err(AppError::from)?;
    if result.matched_count == 0 {
        return Err(DomainError::NotFound("Opportunite introuvable".to_string()).into());
    }

    let opportunity = find_opportunity(&state, id).await?;
    Ok(Json(OpportunityResponse::from(opportunity)))
}

/// Hard delete: an opportunity is pipeline data, nothing references it.
pub async fn delete_opportunity(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.0.require(Capability::ManageSales)?;

    let result = state
        .db
        .opportunities()
        .delete_one(doc! { "_id": id.to_string() }, None)
        .await
        .map_err(AppError::from)?;
    if result.deleted_count == 0 {
        return Err(DomainError::NotFound("Opportunite introuvable".to_string()).into());
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn find_opportunities(
    state: &AppState,
    filter: Document,
) -> Result<Json<Vec<OpportunityResponse>>, AppError> {
    let options = FindOptions::builder()
        .sort(doc! { "created_at": -1 })
        .build();
    let mut cursor = state
        .db
        .opportunities()
        .find(filter, options)
        .await
        .map_err(AppError::from)?;

    let mut opportunities = Vec::new();
    while let Some(opportunity) = cursor.try_next().await.map_err(AppError::from)? {
        opportunities.push(OpportunityResponse::from(opportunity));
    }
    Ok(Json(opportunities))
}

async fn find_opportunity(state: &AppState, id: Uuid) -> Result<Opportunity, AppError> {
    state
        .db
        .opportunities()
        .find_one(doc! { "_id": id.to_string() }, None)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| DomainError::NotFound("Opportunite introuvable".to_string()).into())
}

async fn load_client_name(state: &AppState, client_id: Uuid) -> Result<String, AppError> {
    let client = state
        .db
        .clients()
        .find_one(doc! { "_id": client_id.to_string() }, None)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| DomainError::NotFound("Client introuvable".to_string()))?;
    Ok(client.name)
}
