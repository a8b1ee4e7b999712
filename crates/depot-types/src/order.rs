//! Order entity and the order lifecycle state machine.
//!
//! Orders move Pending -> Confirmed -> Packed -> Dispatched -> InTransit ->
//! AtStore -> Delivered, with Cancelled and Returned as side branches. Every
//! state change goes through [`OrderStatus::apply`], a pure function that
//! either yields the next status or a typed rejection.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::{money::checked_amount, AmountOverflow, Payment, Totals};

/// A store order placed by an agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
	/// Unique identifier for this order.
	pub id: String,
	/// Store the order is delivered to.
	pub store_id: String,
	/// Distributor that fulfils the order, if any.
	#[serde(default)]
	pub distributor_id: Option<String>,
	/// Warehouse the order ships from, if already bound.
	#[serde(default)]
	pub warehouse_id: Option<String>,
	/// Agent that created the order on behalf of the store.
	pub agent_id: String,
	/// Trip carrying the order once dispatched.
	#[serde(default)]
	pub trip_id: Option<String>,
	/// Current lifecycle status.
	pub status: OrderStatus,
	/// Priority orders sort ahead of others within a stop group.
	pub priority: bool,
	/// Requested delivery time.
	#[serde(default)]
	pub scheduled_for: Option<DateTime<Utc>>,
	/// Free-form notes from the agent.
	#[serde(default)]
	pub notes: Option<String>,
	pub sub_total: Decimal,
	pub tax: Decimal,
	pub total: Decimal,
	/// Order lines, in the order they were entered.
	pub items: Vec<OrderItem>,
	/// Payments recorded against the order.
	#[serde(default)]
	pub payments: Vec<Payment>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	pub created_by: String,
	pub updated_by: String,
}

impl Order {
	/// Returns the stored totals.
	pub fn totals(&self) -> Totals {
		Totals {
			sub_total: self.sub_total,
			tax: self.tax,
			total: self.total,
		}
	}

	/// Recomputes totals from the current lines. The order is left untouched
	/// when the lines overflow.
	pub fn recompute_totals(&mut self, tax_rate: Decimal) -> Result<(), AmountOverflow> {
		let totals = Totals::compute(&self.items, tax_rate)?;
		self.sub_total = totals.sub_total;
		self.tax = totals.tax;
		self.total = totals.total;
		Ok(())
	}

	/// Sum of all recorded payments.
	pub fn amount_paid(&self) -> Decimal {
		self.payments.iter().map(|p| p.amount).sum()
	}

	/// Amount still owed on the order.
	pub fn balance(&self) -> Decimal {
		self.total - self.amount_paid()
	}

	/// Stamps update metadata.
	pub fn touch(&mut self, actor_id: &str, now: DateTime<Utc>) {
		self.updated_at = now;
		self.updated_by = actor_id.to_string();
	}
}

/// A single order line. The unit price is a snapshot taken when the line was
/// entered, not the live product price.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
	pub product_id: String,
	pub product_name: String,
	pub quantity: u32,
	pub unit_price: Decimal,
}

impl OrderItem {
	/// Quantity times unit price.
	pub fn line_total(&self) -> Result<Decimal, AmountOverflow> {
		checked_amount(Decimal::from(self.quantity).checked_mul(self.unit_price))
	}
}

/// Status of an order in its lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
	Pending,
	Confirmed,
	Packed,
	Dispatched,
	InTransit,
	AtStore,
	Delivered,
	Returned,
	Cancelled,
}

impl OrderStatus {
	/// All statuses, in lifecycle order.
	pub const ALL: [OrderStatus; 9] = [
		OrderStatus::Pending,
		OrderStatus::Confirmed,
		OrderStatus::Packed,
		OrderStatus::Dispatched,
		OrderStatus::InTransit,
		OrderStatus::AtStore,
		OrderStatus::Delivered,
		OrderStatus::Returned,
		OrderStatus::Cancelled,
	];

	/// Applies a lifecycle operation, returning the resulting status.
	///
	/// Rejections carry the current status and the attempted operation and
	/// never imply any mutation took place.
	pub fn apply(self, transition: OrderTransition) -> Result<OrderStatus, OrderTransitionError> {
		use OrderStatus::*;
		use OrderTransition as T;

		let next = match (transition, self) {
			(T::Edit, Pending) => Some(Pending),
			(T::Confirm, Pending) => Some(Confirmed),
			(T::MarkPacked, Confirmed) => Some(Packed),
			(T::Dispatch, Packed) => Some(Dispatched),
			(T::RevertDispatch, Dispatched) => Some(Packed),
			(T::MarkInTransit, Dispatched) => Some(InTransit),
			(T::MarkAtStore, InTransit) => Some(AtStore),
			(T::MarkDelivered, AtStore) => Some(Delivered),
			(T::MarkReturned, InTransit | AtStore | Delivered) => Some(Returned),
			(T::Cancel, Delivered | Cancelled) => None,
			(T::Cancel, _) => Some(Cancelled),
			_ => None,
		};

		next.ok_or(OrderTransitionError {
			from: self,
			operation: transition,
		})
	}

	/// Returns true for statuses no forward operation leaves.
	pub fn is_terminal(self) -> bool {
		matches!(
			self,
			OrderStatus::Delivered | OrderStatus::Returned | OrderStatus::Cancelled
		)
	}

	pub fn as_str(self) -> &'static str {
		match self {
			OrderStatus::Pending => "pending",
			OrderStatus::Confirmed => "confirmed",
			OrderStatus::Packed => "packed",
			OrderStatus::Dispatched => "dispatched",
			OrderStatus::InTransit => "in_transit",
			OrderStatus::AtStore => "at_store",
			OrderStatus::Delivered => "delivered",
			OrderStatus::Returned => "returned",
			OrderStatus::Cancelled => "cancelled",
		}
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Operations that move an order through its lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderTransition {
	Edit,
	Confirm,
	MarkPacked,
	Dispatch,
	/// Undo of `Dispatch` when the carrying trip is cancelled.
	RevertDispatch,
	MarkInTransit,
	MarkAtStore,
	MarkDelivered,
	MarkReturned,
	Cancel,
}

impl OrderTransition {
	pub const ALL: [OrderTransition; 10] = [
		OrderTransition::Edit,
		OrderTransition::Confirm,
		OrderTransition::MarkPacked,
		OrderTransition::Dispatch,
		OrderTransition::RevertDispatch,
		OrderTransition::MarkInTransit,
		OrderTransition::MarkAtStore,
		OrderTransition::MarkDelivered,
		OrderTransition::MarkReturned,
		OrderTransition::Cancel,
	];

	/// Human readable precondition of the operation.
	pub fn requirement(self) -> &'static str {
		match self {
			OrderTransition::Edit => "Only pending orders can be edited",
			OrderTransition::Confirm => "Only pending orders can be confirmed",
			OrderTransition::MarkPacked => "Only confirmed orders can be packed",
			OrderTransition::Dispatch => "Only packed orders can be dispatched",
			OrderTransition::RevertDispatch => "Only dispatched orders can be returned to packing",
			OrderTransition::MarkInTransit => "Only dispatched orders can be marked in transit",
			OrderTransition::MarkAtStore => "Only in-transit orders can be marked at store",
			OrderTransition::MarkDelivered => "Only orders at the store can be marked delivered",
			OrderTransition::MarkReturned => {
				"Only in-transit, at-store or delivered orders can be returned"
			},
			OrderTransition::Cancel => "Delivered or cancelled orders cannot be cancelled",
		}
	}
}

/// Rejected order lifecycle operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{} (order is {from})", .operation.requirement())]
pub struct OrderTransitionError {
	pub from: OrderStatus,
	pub operation: OrderTransition,
}

/// A requested order line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderLine {
	pub product_id: String,
	pub quantity: u32,
}

/// Request to create an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
	pub store_id: String,
	#[serde(default)]
	pub distributor_id: Option<String>,
	#[serde(default)]
	pub warehouse_id: Option<String>,
	#[serde(default)]
	pub priority: bool,
	#[serde(default)]
	pub scheduled_for: Option<DateTime<Utc>>,
	#[serde(default)]
	pub notes: Option<String>,
	pub items: Vec<NewOrderLine>,
}

/// Edit of a pending order. Absent fields are left unchanged; an explicit
/// `null` for `scheduled_for` or `notes` clears the field.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OrderEdit {
	#[serde(default)]
	pub items: Option<Vec<NewOrderLine>>,
	#[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
	pub scheduled_for: Option<Option<DateTime<Utc>>>,
	#[serde(default)]
	pub priority: Option<bool>,
	#[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
	pub notes: Option<Option<String>>,
}

/// Marks a field that appeared in the payload, even as `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
	D: Deserializer<'de>,
	T: Deserialize<'de>,
{
	Option::<T>::deserialize(deserializer).map(Some)
}

/// Per-product quantity overrides applied when confirming an order.
pub type QuantityAdjustments = HashMap<String, u32>;
