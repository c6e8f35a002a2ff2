use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementKind {
    #[serde(rename = "entree")]
    Entry,
    #[serde(rename = "sortie")]
    Exit,
    #[serde(rename = "correction")]
    Correction,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Entry => "entree",
            MovementKind::Exit => "sortie",
            MovementKind::Correction => "correction",
        }
    }
}

/// Append-only stock ledger entry. Written once, never updated or deleted;
/// `stock_before`/`stock_after` make each movement auditable on its own.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StockMovement {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    /// Signed quantity: positive for entries, negative for exits.
    pub delta: i64,
    pub stock_before: i64,
    pub stock_after: i64,
    pub kind: MovementKind,
    pub operator_id: Uuid,
    pub operator_name: String,
    pub reason: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_kind_uses_french_wire_names() {
        assert_eq!(
            serde_json::to_string(&MovementKind::Entry).unwrap(),
            "\"entree\""
        );
        assert_eq!(
            serde_json::to_string(&MovementKind::Exit).unwrap(),
            "\"sortie\""
        );
        let parsed: MovementKind = serde_json::from_str("\"correction\"").unwrap();
        assert_eq!(parsed, MovementKind::Correction);
    }
}
