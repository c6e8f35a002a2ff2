use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Opportunity, OpportunityStage};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOpportunityRequest {
    #[validate(length(min = 1, max = 200, message = "Le titre est obligatoire"))]
    pub title: String,

    pub description: Option<String>,

    #[validate(range(min = 0.0, message = "Le montant doit etre positif"))]
    pub amount_usd: f64,

    /// Defaults to `prospection`.
    pub stage: Option<OpportunityStage>,

    pub client_id: Option<Uuid>,
    pub expected_close: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateOpportunityRequest {
    #[validate(length(min = 1, max = 200, message = "Le titre est obligatoire"))]
    pub title: Option<String>,

    pub description: Option<String>,

    #[validate(range(min = 0.0, message = "Le montant doit etre positif"))]
    pub amount_usd: Option<f64>,

    pub stage: Option<OpportunityStage>,
    pub expected_close: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct LinkClientRequest {
    pub client_id: Uuid,
}

/// Filters for `GET /opportunites/filtres`.
#[derive(Debug, Deserialize, Default)]
pub struct OpportunityFilterQuery {
    pub etape: Option<OpportunityStage>,
    pub client_id: Option<Uuid>,
    pub montant_min: Option<f64>,
    pub montant_max: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct OpportunityResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub amount_usd: f64,
    pub stage: OpportunityStage,
    pub client_id: Option<Uuid>,
    pub client_name: Option<String>,
    pub expected_close: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Opportunity> for OpportunityResponse {
    fn from(opportunity: Opportunity) -> Self {
        Self {
            id: opportunity.id,
            title: opportunity.title,
            description: opportunity.description,
            amount_usd: opportunity.amount_usd,
            stage: opportunity.stage,
            client_id: opportunity.client_id,
            client_name: opportunity.client_name,
            expected_close: opportunity.expected_close,
            created_at: opportunity.created_at,
            updated_at: opportunity.updated_at,
        }
    }
}
