use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpportunityStage {
    #[serde(rename = "prospection")]
    Prospecting,
    #[serde(rename = "proposition")]
    Proposal,
    #[serde(rename = "negociation")]
    Negotiation,
    #[serde(rename = "gagnee")]
    Won,
    #[serde(rename = "perdue")]
    Lost,
}

impl OpportunityStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpportunityStage::Prospecting => "prospection",
            OpportunityStage::Proposal => "proposition",
            OpportunityStage::Negotiation => "negociation",
            OpportunityStage::Won => "gagnee",
            OpportunityStage::Lost => "perdue",
        }
    }
}

/// Sales pipeline entry. The client link is optional until the prospect
/// becomes an actual client record.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Opportunity {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// Estimated deal size, USD.
    pub amount_usd: f64,
    pub stage: OpportunityStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::models::opt_chrono_datetime_as_bson_datetime"
    )]
    pub expected_close: Option<DateTime<Utc>>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Opportunity {
    pub fn is_linked(&self) -> bool {
        self.client_id.is_some()
    }
}
