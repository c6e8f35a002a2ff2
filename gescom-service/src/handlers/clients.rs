use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::FindOptions;
use uuid::Uuid;
use validator::Validate;

use service_core::error::AppError;

use crate::dtos::clients::{
    ClientListQuery, ClientResponse, CreateClientRequest, UpdateClientRequest,
};
use crate::middleware::AuthUser;
use crate::models::{Capability, Client};
use crate::services::DomainError;
use crate::AppState;

pub async fn list_clients(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<ClientListQuery>,
) -> Result<Json<Vec<ClientResponse>>, AppError> {
    let mut filter = doc! {};
    if let Some(active) = query.actif {
        filter.insert("active", active);
    }
    if let Some(q) = &query.q {
        filter.insert("name", doc! { "$regex": q, "$options": "i" });
    }

    let options = FindOptions::builder()
        .sort(doc! { "created_at": -1 })
        .build();
    let mut cursor = state
        .db
        .clients()
        .find(filter, options)
        .await
        .map_err(AppError::from)?;

    let mut clients = Vec::new();
    while let Some(client) = cursor.try_next().await.map_err(AppError::from)? {
        clients.push(ClientResponse::from(client));
    }
    Ok(Json(clients))
}

pub async fn get_client(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ClientResponse>, AppError> {
    let client = find_client(&state, id).await?;
    Ok(Json(ClientResponse::from(client)))
}

pub async fn create_client(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateClientRequest>,
) -> Result<(StatusCode, Json<ClientResponse>), AppError> {
    auth.0.require(Capability::ManageCatalog)?;
    request.validate()?;

    let mut client = Client::new(request.name);
    client.email = request.email;
    client.phone = request.phone;
    client.address = request.address;
    client.city = request.city;
    client.rccm = request.rccm;

    state
        .db
        .clients()
        .insert_one(&client, None)
        .await
        .map_err(AppError::from)?;

    tracing::info!(client_id = %client.id, name = %client.name, "Client created");
    Ok((StatusCode::CREATED, Json(ClientResponse::from(client))))
}

pub async fn update_client(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateClientRequest>,
) -> Result<Json<ClientResponse>, AppError> {
    auth.0.require(Capability::ManageCatalog)?;
    request.validate()?;

    let mut set = doc! { "updated_at": mongodb::bson::DateTime::now() };
    if let Some(name) = request.name {
        set.insert("name", name);
    }
    if let Some(email) = request.email {
        set.insert("email", email);
    }
    if let Some(phone) = request.phone {
        set.insert("phone", phone);
    }
    if let Some(address) = request.address {
        set.insert("address", address);
    }
    if let Some(city) = request.city {
        set.insert("city", city);
    }
    if let Some(rccm) = request.rccm {
        set.insert("rccm", rccm);
    }
    if let Some(active) = request.active {
        set.insert("active", active);
    }

    let result = state
        .db
        .clients()
        .update_one(doc! { "_id": id.to_string() }, doc! { "$set": set }, None)
        .await
        .map_err(AppError::from)?;
    if result.matched_count == 0 {
        return Err(DomainError::NotFound("Client introuvable".to_string()).into());
    }

    let client = find_client(&state, id).await?;
    Ok(Json(ClientResponse::from(client)))
}

/// Deactivates rather than removes: invoices keep referencing the id.
pub async fn delete_client(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.0.require(Capability::ManageCatalog)?;

    let result = state
        .db
        .clients()
        .update_one(
            doc! { "_id": id.to_string() },
            doc! { "$set": { "active": false, "updated_at": mongodb::bson::DateTime::now() } },
            None,
        )
        .await
        .map_err(AppError::from)?;
    if result.matched_count == 0 {
        return Err(DomainError::NotFound("Client introuvable".to_string()).into());
    }

    tracing::info!(client_id = %id, "Client deactivated");
    Ok(StatusCode::NO_CONTENT)
}

async fn find_client(state: &AppState, id: Uuid) -> Result<Client, AppError> {
    state
        .db
        .clients()
        .find_one(doc! { "_id": id.to_string() }, None)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| DomainError::NotFound("Client introuvable".to_string()).into())
}
