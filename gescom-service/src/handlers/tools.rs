use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use uuid::Uuid;
use validator::Validate;

use service_core::error::AppError;

use crate::dtos::tools::{
    AssignToolRequest, AssignmentListQuery, CreateToolRequest, RestockToolRequest,
    ReturnToolRequest, ToolAssignmentResponse, ToolMovementResponse, ToolResponse,
};
use crate::middleware::AuthUser;
use crate::models::{
    AssignmentStatus, Capability, Tool, ToolAssignment, ToolMovement, ToolMovementKind,
};
use crate::services::{DomainError, Operator};
use crate::AppState;

pub async fn list_tools(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<ToolResponse>>, AppError> {
    auth.0.require(Capability::ViewTools)?;

    let options = FindOptions::builder().sort(doc! { "name": 1 }).build();
    let mut cursor = state
        .db
        .tools()
        .find(doc! { "active": true }, options)
        .await
        .map_err(AppError::from)?;

    let mut tools = Vec::new();
    while let Some(tool) = cursor.try_next().await.map_err(AppError::from)? {
        tools.push(ToolResponse::from(tool));
    }
    Ok(Json(tools))
}

pub async fn get_tool(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ToolResponse>, AppError> {
    auth.0.require(Capability::ViewTools)?;

    let tool = find_tool(&state, id).await?;
    Ok(Json(ToolResponse::from(tool)))
}

pub async fn create_tool(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateToolRequest>,
) -> Result<(StatusCode, Json<ToolResponse>), AppError> {
    auth.0.require(Capability::ManageTools)?;
    request.validate()?;

    let now = chrono::Utc::now();
    let tool = Tool {
        id: Uuid::new_v4(),
        name: request.name,
        description: request.description,
        stock_total: request.initial_stock,
        stock_available: request.initial_stock,
        condition: request.condition,
        active: true,
        created_at: now,
        updated_at: now,
    };

    state
        .db
        .tools()
        .insert_one(&tool, None)
        .await
        .map_err(AppError::from)?;

    tracing::info!(tool_id = %tool.id, name = %tool.name, "Tool created");
    Ok((StatusCode::CREATED, Json(ToolResponse::from(tool))))
}

/// Lends units to a technician. The availability decrement carries its
/// floor in the filter, so two concurrent assignments cannot both take
/// the last unit.
pub async fn assign_tool(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignToolRequest>,
) -> Result<(StatusCode, Json<ToolAssignmentResponse>), AppError> {
    auth.0.require(Capability::ManageTools)?;
    request.validate()?;
    let operator = auth.operator()?;

    let technician = state
        .db
        .users()
        .find_one(
            doc! { "_id": request.technician_id.to_string(), "active": true },
            None,
        )
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| DomainError::NotFound("Technicien introuvable".to_string()))?;

    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();
    let updated = state
        .db
        .tools()
        .find_one_and_update(
            doc! {
                "_id": id.to_string(),
                "active": true,
                "stock_available": { "$gte": request.quantity },
            },
            doc! {
                "$inc": { "stock_available": -request.quantity },
                "$set": { "updated_at": mongodb::bson::DateTime::now() },
            },
            options,
        )
        .await
        .map_err(AppError::from)?;

    let tool = match updated {
        Some(tool) => tool,
        None => {
            let tool = find_tool(&state, id).await?;
            if !tool.active {
                return Err(DomainError::NotApplicable("Outil desactive".to_string()).into());
            }
            return Err(DomainError::InsufficientStock {
                available: tool.stock_available,
                requested: request.quantity,
            }
            .into());
        }
    };

    let assignment = ToolAssignment {
        id: Uuid::new_v4(),
        tool_id: tool.id,
        tool_name: tool.name.clone(),
        technician_id: technician.id,
        technician_name: technician.display_name.clone(),
        quantity: request.quantity,
        status: AssignmentStatus::Assigned,
        assigned_at: chrono::Utc::now(),
        returned_at: None,
        return_condition: None,
    };

    if let Err(e) = state.db.tool_assignments().insert_one(&assignment, None).await {
        // Put the units back before surfacing the failure.
        if let Err(restore) = state
            .db
            .tools()
            .update_one(
                doc! { "_id": id.to_string() },
                doc! { "$inc": { "stock_available": request.quantity } },
                None,
            )
            .await
        {
            tracing::error!(tool_id = %id, error = %restore, "Failed to restore availability after assignment insert failure");
        }
        return Err(AppError::from(e));
    }

    record_tool_movement(
        &state,
        &tool,
        -request.quantity,
        tool.stock_available,
        ToolMovementKind::Assignment,
        &operator,
    )
    .await;

    metrics::counter!("tool_assignments_total").increment(1);
    tracing::info!(
        tool_id = %tool.id,
        technician = %technician.username,
        quantity = request.quantity,
        "Tool assigned"
    );

    Ok((
        StatusCode::CREATED,
        Json(ToolAssignmentResponse::from(assignment)),
    ))
}

/// Adds units to the pool, raising both the owned and available counts.
pub async fn restock_tool(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<RestockToolRequest>,
) -> Result<Json<ToolResponse>, AppError> {
    auth.0.require(Capability::ManageTools)?;
    request.validate()?;
    let operator = auth.operator()?;

    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();
    let tool = state
        .db
        .tools()
        .find_one_and_update(
            doc! { "_id": id.to_string(), "active": true },
            doc! {
                "$inc": { "stock_total": request.quantity, "stock_available": request.quantity },
                "$set": { "updated_at": mongodb::bson::DateTime::now() },
            },
            options,
        )
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| DomainError::NotFound("Outil introuvable".to_string()))?;

    record_tool_movement(
        &state,
        &tool,
        request.quantity,
        tool.stock_available,
        ToolMovementKind::Restock,
        &operator,
    )
    .await;

    Ok(Json(ToolResponse::from(tool)))
}

pub async fn tool_movements(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ToolMovementResponse>>, AppError> {
    auth.0.require(Capability::ViewTools)?;

    let options = FindOptions::builder()
        .sort(doc! { "created_at": -1 })
        .build();
    let mut cursor = state
        .db
        .tool_movements()
        .find(doc! { "tool_id": id.to_string() }, options)
        .await
        .map_err(AppError::from)?;

    let mut movements = Vec::new();
    while let Some(movement) = cursor.try_next().await.map_err(AppError::from)? {
        movements.push(ToolMovementResponse::from(movement));
    }
    Ok(Json(movements))
}

/// Technicians only ever see their own assignments; managers see all
/// and may filter.
pub async fn list_assignments(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<AssignmentListQuery>,
) -> Result<Json<Vec<ToolAssignmentResponse>>, AppError> {
    auth.0.require(Capability::ViewTools)?;

    let mut filter = doc! {};
    if auth.0.role.allows(Capability::ManageTools) {
        if let Some(technician_id) = query.technician_id {
            filter.insert("technician_id", technician_id.to_string());
        }
    } else {
        filter.insert("technician_id", auth.0.user_id()?.to_string());
    }
    if let Some(status) = query.statut {
        filter.insert("status", status.as_str());
    }

    let options = FindOptions::builder()
        .sort(doc! { "assigned_at": -1 })
        .build();
    let mut cursor = state
        .db
        .tool_assignments()
        .find(filter, options)
        .await
        .map_err(AppError::from)?;

    let mut assignments = Vec::new();
    while let Some(assignment) = cursor.try_next().await.map_err(AppError::from)? {
        assignments.push(ToolAssignmentResponse::from(assignment));
    }
    Ok(Json(assignments))
}

/// Accepts a return. The status swap is the claim: only the request
/// that flips `affecte` to `retourne` restores availability.
pub async fn return_assignment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    request: Option<Json<ReturnToolRequest>>,
) -> Result<Json<ToolAssignmentResponse>, AppError> {
    auth.0.require(Capability::ManageTools)?;
    let operator = auth.operator()?;
    let condition = request.and_then(|Json(r)| r.condition);

    let now = mongodb::bson::DateTime::now();
    let mut set = doc! { "status": AssignmentStatus::Returned.as_str(), "returned_at": now };
    if let Some(condition) = &condition {
        set.insert("return_condition", condition);
    }

    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();
    let assignment = state
        .db
        .tool_assignments()
        .find_one_and_update(
            doc! {
                "_id": id.to_string(),
                "status": AssignmentStatus::Assigned.as_str(),
            },
            doc! { "$set": set },
            options,
        )
        .await
        .map_err(AppError::from)?;

    let assignment = match assignment {
        Some(assignment) => assignment,
        None => {
            let exists = state
                .db
                .tool_assignments()
                .find_one(doc! { "_id": id.to_string() }, None)
                .await
                .map_err(AppError::from)?;
            return Err(match exists {
                Some(_) => {
                    DomainError::NotApplicable("Affectation deja retournee".to_string()).into()
                }
                None => DomainError::NotFound("Affectation introuvable".to_string()).into(),
            });
        }
    };

    let restore_options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();
    let tool = state
        .db
        .tools()
        .find_one_and_update(
            doc! { "_id": assignment.tool_id.to_string() },
            doc! {
                "$inc": { "stock_available": assignment.quantity },
                "$set": { "updated_at": mongodb::bson::DateTime::now() },
            },
            restore_options,
        )
        .await
        .map_err(AppError::from)?;

    if let Some(tool) = tool {
        record_tool_movement(
            &state,
            &tool,
            assignment.quantity,
            tool.stock_available,
            ToolMovementKind::Return,
            &operator,
        )
        .await;
    } else {
        tracing::warn!(
            tool_id = %assignment.tool_id,
            assignment_id = %assignment.id,
            "Returned assignment references a missing tool"
        );
    }

    tracing::info!(
        assignment_id = %assignment.id,
        tool_id = %assignment.tool_id,
        quantity = assignment.quantity,
        "Tool assignment returned"
    );

    Ok(Json(ToolAssignmentResponse::from(assignment)))
}

/// Ledger insert is best-effort: the counter move already happened and
/// is not rolled back for a failed audit row.
async fn record_tool_movement(
    state: &AppState,
    tool: &Tool,
    delta: i64,
    available_after: i64,
    kind: ToolMovementKind,
    operator: &Operator,
) {
    let movement = ToolMovement {
        id: Uuid::new_v4(),
        tool_id: tool.id,
        tool_name: tool.name.clone(),
        delta,
        available_after,
        kind,
        operator_id: operator.id,
        operator_name: operator.name.clone(),
        created_at: chrono::Utc::now(),
    };
    if let Err(e) = state.db.tool_movements().insert_one(&movement, None).await {
        tracing::error!(tool_id = %tool.id, error = %e, "Failed to record tool movement");
    }
}

async fn find_tool(state: &AppState, id: Uuid) -> Result<Tool, AppError> {
    state
        .db
        .tools()
        .find_one(doc! { "_id": id.to_string() }, None)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| DomainError::NotFound("Outil introuvable".to_string()).into())
}
