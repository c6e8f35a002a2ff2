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

use crate::dtos::products::{
    AdjustStockRequest, CreateProductRequest, ProductListQuery, ProductResponse,
    StockAdjustmentResponse, StockMovementResponse, UpdateProductRequest,
};
use crate::middleware::AuthUser;
use crate::models::{Capability, MovementKind, Product, StockInfo};
use crate::services::{pricing, DomainError};
use crate::AppState;

pub async fn list_products(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<Vec<ProductResponse>>, AppError> {
    let mut filter = doc! {};
    if let Some(active) = query.actif {
        filter.insert("active", active);
    }
    if let Some(q) = &query.q {
        filter.insert("name", doc! { "$regex": q, "$options": "i" });
    }
    if query.stock_bas == Some(true) {
        filter.insert("stock", doc! { "$ne": null });
        filter.insert(
            "$expr",
            doc! { "$lt": ["$stock.current", "$stock.minimum"] },
        );
    }

    let options = FindOptions::builder().sort(doc! { "name": 1 }).build();
    let mut cursor = state
        .db
        .products()
        .find(filter, options)
        .await
        .map_err(AppError::from)?;

    let mut products = Vec::new();
    while let Some(product) = cursor.try_next().await.map_err(AppError::from)? {
        products.push(ProductResponse::from(product));
    }
    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductResponse>, AppError> {
    let product = find_product(&state, id).await?;
    Ok(Json(ProductResponse::from(product)))
}

pub async fn create_product(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), AppError> {
    auth.0.require(Capability::ManageCatalog)?;
    request.validate()?;

    let stock = if request.manage_stock {
        let maximum = request.maximum_stock.ok_or_else(|| {
            DomainError::Validation(
                "Le stock maximum est obligatoire quand la gestion de stock est activee".into(),
            )
        })?;
        let current = request.initial_stock.unwrap_or(0);
        let minimum = request.minimum_stock.unwrap_or(0);
        if current > maximum {
            return Err(DomainError::Validation(format!(
                "Le stock initial {current} depasse le maximum {maximum}"
            ))
            .into());
        }
        Some(StockInfo {
            current,
            minimum,
            maximum,
        })
    } else {
        None
    };

    let rate = state.rates.current().await?;
    let now = chrono::Utc::now();
    let product = Product {
        id: Uuid::new_v4(),
        name: request.name,
        description: request.description,
        category: request.category,
        unit_price_usd: request.unit_price_usd,
        unit_price_fc: pricing::usd_to_fc(request.unit_price_usd, rate.rate),
        tax_rate: request.tax_rate,
        stock,
        active: true,
        created_at: now,
        updated_at: now,
    };

    state
        .db
        .products()
        .insert_one(&product, None)
        .await
        .map_err(AppError::from)?;

    tracing::info!(product_id = %product.id, name = %product.name, "Product created");
    Ok((StatusCode::CREATED, Json(ProductResponse::from(product))))
}

pub async fn update_product(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, AppError> {
    auth.0.require(Capability::ManageCatalog)?;
    request.validate()?;

    let existing = find_product(&state, id).await?;
    if (request.minimum_stock.is_some() || request.maximum_stock.is_some())
        && !existing.manages_stock()
    {
        return Err(DomainError::NotApplicable(
            "Ce produit ne gere pas de stock".to_string(),
        )
        .into());
    }

    let mut set = doc! { "updated_at": mongodb::bson::DateTime::now() };
    if let Some(name) = request.name {
        set.insert("name", name);
    }
    if let Some(description) = request.description {
        set.insert("description", description);
    }
    if let Some(category) = request.category {
        set.insert("category", category);
    }
    if let Some(price) = request.unit_price_usd {
        let rate = state.rates.current().await?;
        set.insert("unit_price_usd", price);
        set.insert("unit_price_fc", pricing::usd_to_fc(price, rate.rate));
    }
    if let Some(tax_rate) = request.tax_rate {
        set.insert("tax_rate", tax_rate);
    }
    if let Some(minimum) = request.minimum_stock {
        set.insert("stock.minimum", minimum);
    }
    if let Some(maximum) = request.maximum_stock {
        set.insert("stock.maximum", maximum);
    }
    if let Some(active) = request.active {
        set.insert("active", active);
    }

    state
        .db
        .products()
        .update_one(doc! { "_id": id.to_string() }, doc! { "$set": set }, None)
        .await
        .map_err(AppError::from)?;

    let product = find_product(&state, id).await?;
    Ok(Json(ProductResponse::from(product)))
}

/// Deactivates the product; existing invoice lines keep their snapshot.
pub async fn delete_product(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.0.require(Capability::ManageCatalog)?;

    let result = state
        .db
        .products()
        .update_one(
            doc! { "_id": id.to_string() },
            doc! { "$set": { "active": false, "updated_at": mongodb::bson::DateTime::now() } },
            None,
        )
        .await
        .map_err(AppError::from)?;
    if result.matched_count == 0 {
        return Err(DomainError::NotFound("Produit introuvable".to_string()).into());
    }

    tracing::info!(product_id = %id, "Product deactivated");
    Ok(StatusCode::NO_CONTENT)
}

/// Manual stock adjustment. The movement kind defaults to entry or exit
/// from the sign of the delta; corrections must be asked for explicitly.
pub async fn adjust_stock(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<AdjustStockRequest>,
) -> Result<Json<StockAdjustmentResponse>, AppError> {
    auth.0.require(Capability::ManageCatalog)?;
    request.validate()?;

    let kind = request.kind.unwrap_or(if request.delta >= 0 {
        MovementKind::Entry
    } else {
        MovementKind::Exit
    });
    let operator = auth.operator()?;

    let adjustment = state
        .stock
        .adjust(id, request.delta, kind, &request.reason, &operator)
        .await?;

    Ok(Json(StockAdjustmentResponse::from(adjustment)))
}

pub async fn stock_movements(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<StockMovementResponse>>, AppError> {
    let movements = state.stock.history(id).await?;
    Ok(Json(
        movements
            .into_iter()
            .map(StockMovementResponse::from)
            .collect(),
    ))
}

async fn find_product(state: &AppState, id: Uuid) -> Result<Product, AppError> {
    state
        .db
        .products()
        .find_one(doc! { "_id": id.to_string() }, None)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| DomainError::NotFound("Produit introuvable".to_string()).into())
}
