use service_core::error::AppError;
use thiserror::Error;

/// Business-rule failures. Converted into `AppError` at the handler
/// boundary; message strings are user-facing and follow the API's French
/// vocabulary.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("{0}")]
    Validation(String),

    #[error("Stock insuffisant: disponible {available}, demande {requested}")]
    InsufficientStock { available: i64, requested: i64 },

    #[error("Capacite de stock depassee: maximum {maximum}, actuel {current}, entree {requested}")]
    StockCeilingExceeded {
        maximum: i64,
        current: i64,
        requested: i64,
    },

    #[error("Transition invalide: impossible de {action} depuis le statut {from}")]
    InvalidTransition { from: String, action: String },

    #[error("{0}")]
    NotApplicable(String),

    #[error("{0}")]
    NotFound(String),
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(_)
            | DomainError::InsufficientStock { .. }
            | DomainError::StockCeilingExceeded { .. }
            | DomainError::InvalidTransition { .. }
            | DomainError::NotApplicable(_) => AppError::BadRequest(anyhow::anyhow!("{err}")),
            DomainError::NotFound(_) => AppError::NotFound(anyhow::anyhow!("{err}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[test]
    fn stock_errors_map_to_bad_request() {
        let err: AppError = DomainError::InsufficientStock {
            available: 3,
            requested: 10,
        }
        .into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

        let err: AppError = DomainError::StockCeilingExceeded {
            maximum: 100,
            current: 95,
            requested: 10,
        }
        .into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_maps_to_404() {
        let err: AppError = DomainError::NotFound("Facture introuvable".to_string()).into();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn transition_error_names_source_status() {
        let err = DomainError::InvalidTransition {
            from: "payee".to_string(),
            action: "annuler".to_string(),
        };
        assert!(err.to_string().contains("payee"));
        assert!(err.to_string().contains("annuler"));
    }
}
