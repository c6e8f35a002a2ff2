use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lendable equipment. `stock_available` tracks what is currently on the
/// shelf; `stock_total` counts units owned including those lent out.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Tool {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub stock_total: i64,
    pub stock_available: i64,
    /// Free-form condition note ("bon etat", "a reviser", ...).
    pub condition: Option<String>,
    pub active: bool,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentStatus {
    #[serde(rename = "affecte")]
    Assigned,
    #[serde(rename = "retourne")]
    Returned,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Assigned => "affecte",
            AssignmentStatus::Returned => "retourne",
        }
    }
}

/// A batch of tool units lent to a technician.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ToolAssignment {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub tool_id: Uuid,
    pub tool_name: String,
    pub technician_id: Uuid,
    pub technician_name: String,
    pub quantity: i64,
    pub status: AssignmentStatus,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub assigned_at: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::models::opt_chrono_datetime_as_bson_datetime"
    )]
    pub returned_at: Option<DateTime<Utc>>,
    /// Condition noted at return time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_condition: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolMovementKind {
    #[serde(rename = "affectation")]
    Assignment,
    #[serde(rename = "retour")]
    Return,
    #[serde(rename = "approvisionnement")]
    Restock,
}

impl ToolMovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolMovementKind::Assignment => "affectation",
            ToolMovementKind::Return => "retour",
            ToolMovementKind::Restock => "approvisionnement",
        }
    }
}

/// Append-only availability ledger for a tool, mirroring the product
/// stock ledger.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ToolMovement {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub tool_id: Uuid,
    pub tool_name: String,
    pub delta: i64,
    pub available_after: i64,
    pub kind: ToolMovementKind,
    pub operator_id: Uuid,
    pub operator_name: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}
