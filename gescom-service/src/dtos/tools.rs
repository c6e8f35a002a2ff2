use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{AssignmentStatus, Tool, ToolAssignment, ToolMovement, ToolMovementKind};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateToolRequest {
    #[validate(length(min = 1, max = 200, message = "Le nom est obligatoire"))]
    pub name: String,

    pub description: Option<String>,

    #[validate(range(min = 0, message = "Le stock initial doit etre positif"))]
    pub initial_stock: i64,

    pub condition: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AssignToolRequest {
    pub technician_id: Uuid,

    #[validate(range(min = 1, message = "La quantite doit etre d'au moins 1"))]
    pub quantity: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RestockToolRequest {
    #[validate(range(min = 1, message = "La quantite doit etre d'au moins 1"))]
    pub quantity: i64,
}

#[derive(Debug, Deserialize, Default)]
pub struct ReturnToolRequest {
    pub condition: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct AssignmentListQuery {
    pub statut: Option<AssignmentStatus>,
    pub technician_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ToolResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub stock_total: i64,
    pub stock_available: i64,
    pub condition: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Tool> for ToolResponse {
    fn from(tool: Tool) -> Self {
        Self {
            id: tool.id,
            name: tool.name,
            description: tool.description,
            stock_total: tool.stock_total,
            stock_available: tool.stock_available,
            condition: tool.condition,
            active: tool.active,
            created_at: tool.created_at,
            updated_at: tool.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ToolAssignmentResponse {
    pub id: Uuid,
    pub tool_id: Uuid,
    pub tool_name: String,
    pub technician_id: Uuid,
    pub technician_name: String,
    pub quantity: i64,
    pub status: AssignmentStatus,
    pub assigned_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub return_condition: Option<String>,
}

impl From<ToolAssignment> for ToolAssignmentResponse {
    fn from(assignment: ToolAssignment) -> Self {
        Self {
            id: assignment.id,
            tool_id: assignment.tool_id,
            tool_name: assignment.tool_name,
            technician_id: assignment.technician_id,
            technician_name: assignment.technician_name,
            quantity: assignment.quantity,
            status: assignment.status,
            assigned_at: assignment.assigned_at,
            returned_at: assignment.returned_at,
            return_condition: assignment.return_condition,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ToolMovementResponse {
    pub id: Uuid,
    pub tool_id: Uuid,
    pub tool_name: String,
    pub delta: i64,
    pub available_after: i64,
    pub kind: ToolMovementKind,
    pub operator_id: Uuid,
    pub operator_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<ToolMovement> for ToolMovementResponse {
    fn from(movement: ToolMovement) -> Self {
        Self {
            id: movement.id,
            tool_id: movement.tool_id,
            tool_name: movement.tool_name,
            delta: movement.delta,
            available_after: movement.available_after,
            kind: movement.kind,
            operator_id: movement.operator_id,
            operator_name: movement.operator_name,
            created_at: movement.created_at,
        }
    }
}
