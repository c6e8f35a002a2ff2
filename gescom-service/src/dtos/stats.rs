use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Aggregate dashboard counters. Maps are keyed by the wire status names
/// and sorted so the payload is stable.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub invoices: InvoiceStats,
    pub quotes: CountsByStatus,
    pub payments: CountsByStatus,
    pub clients: ClientStats,
    pub products: ProductStats,
}

#[derive(Debug, Serialize)]
pub struct InvoiceStats {
    pub total: u64,
    pub by_status: BTreeMap<String, u64>,
    /// Sum of TTC totals over paid invoices.
    pub revenue_usd: f64,
    pub revenue_fc: f64,
}

#[derive(Debug, Serialize)]
pub struct CountsByStatus {
    pub total: u64,
    pub by_status: BTreeMap<String, u64>,
}

#[derive(Debug, Serialize)]
pub struct ClientStats {
    pub total: u64,
    pub active: u64,
}

#[derive(Debug, Serialize)]
pub struct ProductStats {
    pub total: u64,
    pub low_stock: Vec<LowStockProduct>,
}

#[derive(Debug, Serialize)]
pub struct LowStockProduct {
    pub id: Uuid,
    pub name: String,
    pub current: i64,
    pub minimum: i64,
}
