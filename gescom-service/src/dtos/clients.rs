use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::Client;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateClientRequest {
    #[validate(length(min = 1, max = 200, message = "Le nom est obligatoire"))]
    pub name: String,

    #[validate(email(message = "Email invalide"))]
    pub email: Option<String>,

    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub rccm: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateClientRequest {
    #[validate(length(min = 1, max = 200, message = "Le nom est obligatoire"))]
    pub name: Option<String>,

    #[validate(email(message = "Email invalide"))]
    pub email: Option<String>,

    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub rccm: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClientListQuery {
    /// Filter on the active flag.
    pub actif: Option<bool>,
    /// Case-insensitive name search.
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClientResponse {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub rccm: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Client> for ClientResponse {
    fn from(client: Client) -> Self {
        Self {
            id: client.id,
            name: client.name,
            email: client.email,
            phone: client.phone,
            address: client.address,
            city: client.city,
            rccm: client.rccm,
            active: client.active,
            created_at: client.created_at,
            updated_at: client.updated_at,
        }
    }
}
