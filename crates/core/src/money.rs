//! Money and percentage arithmetic shared by every hierarchy operation.
//!
//! Amounts are rounded to cents at each level independently, so a deep tree
//! can drift by a few cents from the plan total. That drift is reported by
//! the audit and never corrected here.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Decimal places kept for money amounts.
pub const MONEY_SCALE: u32 = 2;

/// Decimal places kept for percentages derived from actual amounts.
pub const PERCENTAGE_SCALE: u32 = 12;

/// Allowed deviation of a sibling set's percentage sum from 100.
pub const PERCENTAGE_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Allowed deviation between a stored amount and the amount recomputed from
/// its parent (one cent).
pub const AMOUNT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

// ---------------------------------------------------------------------------
// Rounding
// ---------------------------------------------------------------------------

/// Round to cents, half away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// `round(parent_amount * percentage / 100, 2)`.
pub fn share_of(parent_amount: Decimal, percentage: Decimal) -> Decimal {
    round_money(parent_amount * percentage / Decimal::ONE_HUNDRED)
}

/// Percentage that `part` represents of `whole`, or `None` when `whole` is zero.
pub fn percentage_of(part: Decimal, whole: Decimal) -> Option<Decimal> {
    if whole.is_zero() {
        return None;
    }
    Some(
        (part * Decimal::ONE_HUNDRED / whole)
            .round_dp_with_strategy(PERCENTAGE_SCALE, RoundingStrategy::MidpointAwayFromZero),
    )
}

// ---------------------------------------------------------------------------
// Sibling-sum validation
// ---------------------------------------------------------------------------

/// Whether a sibling set of percentages sums to 100 within
/// [`PERCENTAGE_TOLERANCE`].
///
/// Purely structural: negative entries are not rejected here.
pub fn validate_percentages<I>(percentages: I) -> bool
where
    I: IntoIterator<Item = Decimal>,
{
    let sum: Decimal = percentages.into_iter().sum();
    (sum - Decimal::ONE_HUNDRED).abs() <= PERCENTAGE_TOLERANCE
}

/// Like [`validate_percentages`], but returns a validation error naming the sum.
pub fn check_sibling_sum<I>(percentages: I, context: &str) -> Result<(), CoreError>
where
    I: IntoIterator<Item = Decimal>,
{
    let values: Vec<Decimal> = percentages.into_iter().collect();
    if validate_percentages(values.iter().copied()) {
        return Ok(());
    }
    let sum: Decimal = values.iter().copied().sum();
    Err(CoreError::Validation(format!(
        "Percentages for {context} must sum to 100, got {}",
        sum.normalize()
    )))
}

/// Split 100% evenly across `n` siblings.
///
/// Each share is truncated to two decimals and the last sibling absorbs the
/// remainder, so the result always sums to exactly 100.
pub fn distribute_evenly(n: usize) -> Vec<Decimal> {
    if n == 0 {
        return Vec::new();
    }
    let base = (Decimal::ONE_HUNDRED / Decimal::from(n))
        .round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::ToZero);
    let mut shares = vec![base; n];
    shares[n - 1] = Decimal::ONE_HUNDRED - base * Decimal::from(n - 1);
    shares
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
