//! Dollar amounts from the wizard to integer cents

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{FulfillmentError, FulfillmentResult};

/// Provider-added line item, e.g. dose titration monitoring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OversightFee {
    pub label: String,
    /// Dollars
    pub amount: Decimal,
}

/// Round half away from zero to whole cents
///
/// # Errors
///
/// [`FulfillmentError::Validation`] for negative or unrepresentable amounts.
pub fn dollars_to_cents(dollars: Decimal, field: &str) -> FulfillmentResult<i64> {
    if dollars.is_sign_negative() && !dollars.is_zero() {
        return Err(FulfillmentError::Validation(format!(
            "{field} must not be negative"
        )));
    }
    (dollars * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| FulfillmentError::Validation(format!("{field} is out of range")))
}

/// Sum of line items in cents, each item rounded on its own
///
/// # Errors
///
/// See [`dollars_to_cents`].
pub fn oversight_total_cents(fees: &[OversightFee]) -> FulfillmentResult<i64> {
    fees.iter().try_fold(0_i64, |total, fee| {
        let cents = dollars_to_cents(fee.amount, &format!("oversight fee '{}'", fee.label))?;
        total
            .checked_add(cents)
            .ok_or_else(|| FulfillmentError::Validation("oversight fees are out of range".into()))
    })
}

/// Use computed line items when present, otherwise the caller's cents value
///
/// # Errors
///
/// Negative amounts on either path.
pub fn resolve_cents(
    computed: Option<FulfillmentResult<i64>>,
    supplied_cents: Option<i64>,
    field: &str,
) -> FulfillmentResult<i64> {
    match computed {
        Some(result) => result,
        None => {
            let cents = supplied_cents.unwrap_or(0);
            if cents < 0 {
                return Err(FulfillmentError::Validation(format!(
                    "{field} must not be negative"
                )));
            }
            Ok(cents)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    #[test]
    fn half_cents_round_away_from_zero() {
        assert_eq!(dollars_to_cents(d("10.005"), "fee").unwrap(), 1001);
        assert_eq!(dollars_to_cents(d("10.004"), "fee").unwrap(), 1000);
        assert_eq!(dollars_to_cents(d("0"), "fee").unwrap(), 0);
    }

    #[test]
    fn negative_amount_is_rejected() {
        assert!(matches!(
            dollars_to_cents(d("-0.01"), "shipping fee"),
            Err(FulfillmentError::Validation(_))
        ));
    }

    #[test]
    fn items_are_rounded_individually_then_summed() {
        let fees = vec![
            OversightFee {
                label: "Titration".into(),
                amount: d("25.005"),
            },
            OversightFee {
                label: "Monitoring".into(),
                amount: d("14.995"),
            },
        ];
        assert_eq!(oversight_total_cents(&fees).unwrap(), 2501 + 1500);
        assert_eq!(oversight_total_cents(&[]).unwrap(), 0);
    }

    #[test]
    fn supplied_cents_are_the_fallback() {
        assert_eq!(resolve_cents(None, Some(4200), "profit_cents").unwrap(), 4200);
        assert_eq!(resolve_cents(None, None, "profit_cents").unwrap(), 0);
        assert!(resolve_cents(None, Some(-1), "profit_cents").is_err());
        assert_eq!(resolve_cents(Some(Ok(7)), Some(4200), "profit_cents").unwrap(), 7);
    }
}
