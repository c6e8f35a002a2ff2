//! Currency conversion and line pricing. Everything here is pure; the
//! exchange rate is an argument, never read from shared state.

use crate::models::{InvoiceLine, Product, Totals};
use crate::services::error::DomainError;

/// Absolute drift allowed between a caller-claimed amount and the
/// recomputed one. Covers cent-level rounding done by UI code.
pub const ABS_TOLERANCE: f64 = 0.01;
/// Relative drift allowed for large FC amounts where 0.01 is too strict
/// a yardstick.
pub const REL_TOLERANCE: f64 = 1e-6;

pub fn usd_to_fc(amount: f64, rate: f64) -> f64 {
    amount * rate
}

pub fn fc_to_usd(amount: f64, rate: f64) -> f64 {
    amount / rate
}

pub fn within_tolerance(claimed: f64, computed: f64) -> bool {
    let diff = (claimed - computed).abs();
    diff <= ABS_TOLERANCE || diff <= computed.abs() * REL_TOLERANCE
}

/// Rejects caller-supplied totals that drift from the recomputed value.
/// Pre-computed amounts are accepted as a convenience, never as truth.
pub fn check_claimed(field: &str, claimed: Option<f64>, computed: f64) -> Result<(), DomainError> {
    match claimed {
        Some(value) if !within_tolerance(value, computed) => Err(DomainError::Validation(format!(
            "Montant incoherent pour {field}: declare {value}, calcule {computed}"
        ))),
        _ => Ok(()),
    }
}

/// Prices one line from the product snapshot and the captured rate.
/// `unit_price_usd` may differ from the catalog price (negotiated price);
/// the caller decides, this function only derives the dependent amounts.
pub fn price_line(product: &Product, quantity: f64, unit_price_usd: f64, rate: f64) -> InvoiceLine {
    let unit_price_fc = usd_to_fc(unit_price_usd, rate);
    let total_ht_usd = unit_price_usd * quantity;
    let tax_usd = total_ht_usd * product.tax_rate / 100.0;
    let total_ttc_usd = total_ht_usd + tax_usd;

    InvoiceLine {
        product_id: product.id,
        product_name: product.name.clone(),
        quantity,
        unit_price_usd,
        unit_price_fc,
        tax_rate: product.tax_rate,
        total_ht_usd,
        total_ht_fc: usd_to_fc(total_ht_usd, rate),
        tax_usd,
        tax_fc: usd_to_fc(tax_usd, rate),
        total_ttc_usd,
        total_ttc_fc: usd_to_fc(total_ttc_usd, rate),
    }
}

/// Aggregates are always the sum of the stored line values.
pub fn sum_lines(lines: &[InvoiceLine]) -> Totals {
    let mut totals = Totals::default();
    for line in lines {
        totals.total_ht_usd += line.total_ht_usd;
        totals.total_ht_fc += line.total_ht_fc;
        totals.tax_usd += line.tax_usd;
        totals.tax_fc += line.tax_fc;
        totals.total_ttc_usd += line.total_ttc_usd;
        totals.total_ttc_fc += line.total_ttc_fc;
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn product(price_usd: f64, tax_rate: f64) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4(),
            name: "Tole galvanisee".to_string(),
            description: None,
            category: None,
            unit_price_usd: price_usd,
            unit_price_fc: usd_to_fc(price_usd, 2800.0),
            tax_rate,
            stock: None,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn conversion_multiplies_and_divides_by_rate() {
        assert_eq!(usd_to_fc(10.0, 2800.0), 28_000.0);
        assert_eq!(fc_to_usd(28_000.0, 2800.0), 10.0);
    }

    #[test]
    fn conversion_round_trips_within_tolerance() {
        for amount in [0.0, 0.07, 1.0, 99.99, 1234.56, 1_000_000.0] {
            let back = fc_to_usd(usd_to_fc(amount, 2795.37), 2795.37);
            assert!(within_tolerance(back, amount), "{amount} -> {back}");
        }
    }

    #[test]
    fn line_pricing_matches_hand_computation() {
        let p = product(12.5, 16.0);
        let line = price_line(&p, 4.0, p.unit_price_usd, 2800.0);

        assert_eq!(line.total_ht_usd, 50.0);
        assert_eq!(line.tax_usd, 8.0);
        assert_eq!(line.total_ttc_usd, 58.0);
        assert_eq!(line.total_ht_fc, 140_000.0);
        assert_eq!(line.tax_fc, 22_400.0);
        assert_eq!(line.total_ttc_fc, 162_400.0);
        assert_eq!(line.product_name, p.name);
    }

    #[test]
    fn negotiated_price_overrides_catalog_price() {
        let p = product(12.5, 0.0);
        let line = price_line(&p, 2.0, 10.0, 2800.0);
        assert_eq!(line.unit_price_usd, 10.0);
        assert_eq!(line.total_ttc_usd, 20.0);
    }

    #[test]
    fn totals_are_sum_of_lines() {
        let p1 = product(10.0, 16.0);
        let p2 = product(3.3, 0.0);
        let lines = vec![
            price_line(&p1, 2.0, p1.unit_price_usd, 2800.0),
            price_line(&p2, 5.0, p2.unit_price_usd, 2800.0),
        ];
        let totals = sum_lines(&lines);

        assert!(within_tolerance(totals.total_ht_usd, 36.5));
        assert!(within_tolerance(totals.tax_usd, 3.2));
        assert!(within_tolerance(totals.total_ttc_usd, 39.7));
        assert!(within_tolerance(
            totals.total_ttc_fc,
            usd_to_fc(totals.total_ttc_usd, 2800.0)
        ));
    }

    #[test]
    fn empty_line_set_sums_to_zero() {
        let totals = sum_lines(&[]);
        assert_eq!(totals.total_ttc_usd, 0.0);
        assert_eq!(totals.total_ttc_fc, 0.0);
    }

    #[test]
    fn tolerance_accepts_cent_rounding_and_rejects_drift() {
        assert!(within_tolerance(58.004, 58.0));
        assert!(within_tolerance(58.0, 58.0));
        assert!(within_tolerance(162_400.16, 162_400.0));
        assert!(!within_tolerance(58.5, 58.0));
        assert!(!within_tolerance(163_000.0, 162_400.0));
    }

    #[test]
    fn check_claimed_ignores_absent_values() {
        assert!(check_claimed("total_ht_usd", None, 58.0).is_ok());
        assert!(check_claimed("total_ht_usd", Some(58.0049), 58.0).is_ok());
        let err = check_claimed("total_ht_usd", Some(60.0), 58.0).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(err.to_string().contains("total_ht_usd"));
    }
}
