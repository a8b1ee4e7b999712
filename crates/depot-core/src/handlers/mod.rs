//! Operation handlers for the depot engine.
//!
//! Each handler owns one area of the back office: the order lifecycle, trip
//! dispatch, billing, and catalog/user administration. Mutating handler
//! methods validate everything before writing, commit their records in one
//! batch and return an [`Outcome`] carrying the events to publish.

pub mod admin;
pub mod billing;
pub mod order;
pub mod trip;

pub use admin::AdminHandler;
pub use billing::BillingHandler;
pub use order::OrderHandler;
pub use trip::TripHandler;

use crate::error::DepotError;
use depot_types::{DepotEvent, EventKind, RequestContext, Role, CURRENCY_SCALE, MAX_AMOUNT};
use rust_decimal::Decimal;

/// Result value of a committed mutation plus the events it produced.
#[derive(Debug)]
pub struct Outcome<T> {
	pub value: T,
	pub events: Vec<DepotEvent>,
}

impl<T> Outcome<T> {
	pub fn new(value: T, events: Vec<DepotEvent>) -> Self {
		Self { value, events }
	}

	/// Outcome with a single event stamped from the request context.
	pub fn with_event(value: T, ctx: &RequestContext, kind: EventKind) -> Self {
		Self::new(value, vec![event(ctx, kind)])
	}
}

/// Roles that run trips and move orders along the road.
pub(crate) const TRIP_MANAGERS: &[Role] = &[Role::Dispatcher, Role::DistributorAdmin, Role::Admin];

/// Roles that pack orders at the warehouse.
pub(crate) const PACKERS: &[Role] = &[Role::WarehouseStaff, Role::DistributorAdmin, Role::Admin];

pub(crate) fn event(ctx: &RequestContext, kind: EventKind) -> DepotEvent {
	DepotEvent::new(ctx.actor_id(), ctx.now, kind)
}

pub(crate) fn require_role(
	ctx: &RequestContext,
	roles: &[Role],
	action: &str,
) -> Result<(), DepotError> {
	if ctx.has_role(roles) {
		Ok(())
	} else {
		Err(DepotError::Validation(format!(
			"Role {} is not allowed to {}",
			ctx.actor.role, action
		)))
	}
}

pub(crate) fn require_text(field: &str, value: &str) -> Result<(), DepotError> {
	if value.trim().is_empty() {
		return Err(DepotError::Validation(format!("{} is required", field)));
	}
	Ok(())
}

/// Checks that an amount is non-negative, within [`MAX_AMOUNT`] and has at
/// most two decimal places.
pub(crate) fn check_money(field: &str, amount: Decimal) -> Result<(), DepotError> {
	if amount.is_sign_negative() {
		return Err(DepotError::Validation(format!(
			"{} cannot be negative",
			field
		)));
	}
	if amount > MAX_AMOUNT {
		return Err(DepotError::Validation(format!(
			"{} exceeds the maximum of {}",
			field, MAX_AMOUNT
		)));
	}
	if amount.normalize().scale() > CURRENCY_SCALE {
		return Err(DepotError::Validation(format!(
			"{} has more than {} decimal places",
			field, CURRENCY_SCALE
		)));
	}
	Ok(())
}

pub(crate) fn new_id() -> String {
	uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;
	use std::str::FromStr;

	#[test]
	fn test_check_money() {
		assert!(check_money("amount", Decimal::from_str("10.50").unwrap()).is_ok());
		assert!(check_money("amount", Decimal::from_str("10.500").unwrap()).is_ok());
		assert!(check_money("amount", Decimal::from_str("10.505").unwrap()).is_err());
		assert!(check_money("amount", Decimal::from_str("-1").unwrap()).is_err());
		assert!(check_money("amount", MAX_AMOUNT).is_ok());
		assert!(check_money("amount", Decimal::MAX).is_err());
	}

	#[test]
	fn test_require_role_message() {
		let ctx = RequestContext::new("u1", Role::Agent, Utc::now());
		assert!(require_role(&ctx, &[Role::Agent, Role::Admin], "create orders").is_ok());
		let err = require_role(&ctx, &[Role::Admin], "manage users").unwrap_err();
		assert_eq!(err.to_string(), "Role agent is not allowed to manage users");
	}
}
