use mongodb::{
    bson::{doc, Document},
    options::{FindOneAndUpdateOptions, IndexOptions, ReturnDocument},
    Client as MongoClient, Collection, Database, IndexModel,
};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;

use crate::models::{
    Client, CompanySettings, ExchangeRate, Invoice, Opportunity, Order, Payment, Product, Quote,
    RateChange, StockMovement, Tool, ToolAssignment, ToolMovement, User,
};

/// Per-day sequence document backing human reference numbers.
#[derive(Debug, Serialize, Deserialize)]
struct Counter {
    #[serde(rename = "_id")]
    id: String,
    seq: i64,
}

#[derive(Clone)]
pub struct GescomDb {
    client: MongoClient,
    db: Database,
}

impl GescomDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Connected to MongoDB");
        Ok(Self { client, db })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;
        Ok(())
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes");

        self.ensure_index("clients", doc! { "name": 1 }, "name_idx", false)
            .await?;

        self.ensure_index("produits", doc! { "name": 1 }, "name_idx", false)
            .await?;
        self.ensure_index("produits", doc! { "category": 1 }, "category_idx", false)
            .await?;

        self.ensure_index(
            "mouvements_stock",
            doc! { "product_id": 1, "created_at": -1 },
            "product_created_idx",
            false,
        )
        .await?;

        self.ensure_index("factures", doc! { "number": 1 }, "number_idx", true)
            .await?;
        self.ensure_index("factures", doc! { "status": 1 }, "status_idx", false)
            .await?;
        self.ensure_index("factures", doc! { "client_id": 1 }, "client_idx", false)
            .await?;
        self.ensure_index("factures", doc! { "created_at": -1 }, "created_idx", false)
            .await?;

        self.ensure_index("devis", doc! { "number": 1 }, "number_idx", true)
            .await?;
        self.ensure_index("devis", doc! { "status": 1 }, "status_idx", false)
            .await?;
        self.ensure_index("devis", doc! { "client_id": 1 }, "client_idx", false)
            .await?;

        self.ensure_index("paiements", doc! { "invoice_id": 1 }, "invoice_idx", false)
            .await?;
        self.ensure_index("paiements", doc! { "status": 1 }, "status_idx", false)
            .await?;

        self.ensure_index("utilisateurs", doc! { "username": 1 }, "username_idx", true)
            .await?;
        self.ensure_index("utilisateurs", doc! { "email": 1 }, "email_idx", true)
            .await?;

        self.ensure_index(
            "affectations_outils",
            doc! { "technician_id": 1 },
            "technician_idx",
            false,
        )
        .await?;
        self.ensure_index(
            "affectations_outils",
            doc! { "tool_id": 1, "status": 1 },
            "tool_status_idx",
            false,
        )
        .await?;

        self.ensure_index(
            "mouvements_outils",
            doc! { "tool_id": 1, "created_at": -1 },
            "tool_created_idx",
            false,
        )
        .await?;

        self.ensure_index("opportunites", doc! { "stage": 1 }, "stage_idx", false)
            .await?;
        self.ensure_index(
            "opportunites",
            doc! { "client_id": 1 },
            "client_idx",
            false,
        )
        .await?;

        self.ensure_index("commandes", doc! { "number": 1 }, "number_idx", true)
            .await?;
        self.ensure_index("commandes", doc! { "status": 1 }, "status_idx", false)
            .await?;

        self.ensure_index(
            "historique_taux",
            doc! { "created_at": -1 },
            "created_idx",
            false,
        )
        .await?;

        tracing::info!("MongoDB indexes ready");
        Ok(())
    }

    async fn ensure_index(
        &self,
        collection: &str,
        keys: Document,
        name: &str,
        unique: bool,
    ) -> Result<(), AppError> {
        let options = IndexOptions::builder()
            .name(name.to_string())
            .unique(unique)
            .build();
        let model = IndexModel::builder().keys(keys).options(options).build();
        self.db
            .collection::<Document>(collection)
            .create_index(model, None)
            .await
            .map_err(|e| {
                tracing::error!(collection = %collection, index = %name, "Failed to create index: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;
        Ok(())
    }

    /// Next human reference for a prefix, e.g. `FAC-20260214-0007`.
    /// Backed by an atomic `$inc` on a per-day counter document.
    pub async fn next_reference(&self, prefix: &str) -> Result<String, AppError> {
        let date = chrono::Utc::now().format("%Y%m%d");
        let key = format!("{prefix}-{date}");
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();
        let counter = self
            .counters()
            .find_one_and_update(doc! { "_id": &key }, doc! { "$inc": { "seq": 1 } }, options)
            .await?
            .ok_or_else(|| AppError::DatabaseError(anyhow::anyhow!("Counter upsert returned nothing")))?;
        Ok(format!("{}-{:04}", key, counter.seq))
    }

    pub fn clients(&self) -> Collection<Client> {
        self.db.collection("clients")
    }

    pub fn products(&self) -> Collection<Product> {
        self.db.collection("produits")
    }

    pub fn stock_movements(&self) -> Collection<StockMovement> {
        self.db.collection("mouvements_stock")
    }

    pub fn invoices(&self) -> Collection<Invoice> {
        self.db.collection("factures")
    }

    pub fn quotes(&self) -> Collection<Quote> {
        self.db.collection("devis")
    }

    pub fn payments(&self) -> Collection<Payment> {
        self.db.collection("paiements")
    }

    pub fn users(&self) -> Collection<User> {
        self.db.collection("utilisateurs")
    }

    pub fn tools(&self) -> Collection<Tool> {
        self.db.collection("outils")
    }

    pub fn tool_assignments(&self) -> Collection<ToolAssignment> {
        self.db.collection("affectations_outils")
    }

    pub fn tool_movements(&self) -> Collection<ToolMovement> {
        self.db.collection("mouvements_outils")
    }

    pub fn opportunities(&self) -> Collection<Opportunity> {
        self.db.collection("opportunites")
    }

    pub fn orders(&self) -> Collection<Order> {
        self.db.collection("commandes")
    }

    pub fn exchange_rates(&self) -> Collection<ExchangeRate> {
        self.db.collection("taux_change")
    }

    pub fn rate_changes(&self) -> Collection<RateChange> {
        self.db.collection("historique_taux")
    }

    pub fn company_settings(&self) -> Collection<CompanySettings> {
        self.db.collection("parametres")
    }

    fn counters(&self) -> Collection<Counter> {
        self.db.collection("compteurs")
    }
}

/// Unique-index violation (Mongo error code 11000).
pub fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    matches!(
        error.kind.as_ref(),
        mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(e))
            if e.code == 11000
    )
}
