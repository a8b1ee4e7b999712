//! Monetary totals for orders and invoices.
//!
//! All currency amounts are `Decimal`. Tax is the only derived amount that is
//! rounded; line totals and subtotals are exact products and sums of
//! two-decimal prices.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::OrderItem;

/// Number of decimal places kept for currency amounts.
pub const CURRENCY_SCALE: u32 = 2;

/// Largest amount accepted for a price, a payment or an order total.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

/// An amount left the range the back office accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Amount exceeds the maximum of {}", MAX_AMOUNT)]
pub struct AmountOverflow;

/// Rounds a currency amount to two places, midpoint away from zero.
pub fn round_currency(amount: Decimal) -> Decimal {
	amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Subtotal, tax and grand total of an order.
///
/// `total == sub_total + tax` and `tax == round(sub_total * rate)` hold for
/// every value produced by [`Totals::compute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Totals {
	pub sub_total: Decimal,
	pub tax: Decimal,
	pub total: Decimal,
}

impl Totals {
	/// Computes totals for a set of order lines at the given tax rate.
	///
	/// Fails when a line, the subtotal or the grand total would exceed
	/// [`MAX_AMOUNT`].
	pub fn compute(items: &[OrderItem], tax_rate: Decimal) -> Result<Self, AmountOverflow> {
		let mut sub_total = Decimal::ZERO;
		for item in items {
			sub_total = checked_amount(sub_total.checked_add(item.line_total()?))?;
		}
		let tax = round_currency(sub_total.checked_mul(tax_rate).ok_or(AmountOverflow)?);
		let total = checked_amount(sub_total.checked_add(tax))?;
		Ok(Self {
			sub_total,
			tax,
			total,
		})
	}

	/// Returns true when the stored amounts satisfy the totals invariant.
	pub fn is_consistent(&self, tax_rate: Decimal) -> bool {
		self.total == self.sub_total + self.tax
			&& self.tax == round_currency(self.sub_total * tax_rate)
	}
}

/// Accepts a computed amount when it exists and stays within [`MAX_AMOUNT`].
pub(crate) fn checked_amount(amount: Option<Decimal>) -> Result<Decimal, AmountOverflow> {
	match amount {
		Some(amount) if amount <= MAX_AMOUNT => Ok(amount),
		_ => Err(AmountOverflow),
	}
}
