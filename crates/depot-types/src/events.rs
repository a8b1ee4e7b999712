//! Event types produced by mutating operations.
//!
//! Each engine operation returns the events describing what it changed. The
//! engine publishes them only after the storage write commits, and a separate
//! dispatcher turns them into audit entries and user notifications. Event
//! delivery never feeds back into the operation that produced the event.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{OrderStatus, PaymentMethod, TripStatus};

/// A committed change, stamped with its actor and time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DepotEvent {
	pub actor_id: String,
	pub occurred_at: DateTime<Utc>,
	pub kind: EventKind,
}

/// What changed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
	OrderCreated {
		order_id: String,
		agent_id: String,
		store_id: String,
		total: Decimal,
	},
	OrderEdited {
		order_id: String,
		agent_id: String,
		total: Decimal,
	},
	OrderStatusChanged {
		order_id: String,
		agent_id: String,
		from: OrderStatus,
		to: OrderStatus,
		#[serde(default)]
		trip_id: Option<String>,
		#[serde(default)]
		reason: Option<String>,
	},
	TripCreated {
		trip_id: String,
		dispatcher_id: String,
		order_ids: Vec<String>,
	},
	TripStatusChanged {
		trip_id: String,
		dispatcher_id: String,
		from: TripStatus,
		to: TripStatus,
	},
	TripResequenced {
		trip_id: String,
		dispatcher_id: String,
		order_ids: Vec<String>,
	},
	PaymentRecorded {
		order_id: String,
		agent_id: String,
		payment_id: String,
		amount: Decimal,
		method: PaymentMethod,
	},
	InvoiceGenerated {
		invoice_id: String,
		order_id: String,
		number: String,
	},
	InvoiceUpdated {
		invoice_id: String,
		number: String,
		reconciled: bool,
	},
	InventoryAdjusted {
		warehouse_id: String,
		product_id: String,
		delta: i64,
		on_hand: i64,
		reason: String,
	},
	RecordChanged {
		entity_type: EntityType,
		entity_id: String,
		action: AuditAction,
	},
}

impl DepotEvent {
	pub fn new(actor_id: impl Into<String>, occurred_at: DateTime<Utc>, kind: EventKind) -> Self {
		Self {
			actor_id: actor_id.into(),
			occurred_at,
			kind,
		}
	}

	/// Entity the event is about.
	pub fn subject(&self) -> (EntityType, &str) {
		match &self.kind {
			EventKind::OrderCreated { order_id, .. }
			| EventKind::OrderEdited { order_id, .. }
			| EventKind::OrderStatusChanged { order_id, .. }
			| EventKind::PaymentRecorded { order_id, .. } => (EntityType::Order, order_id.as_str()),
			EventKind::TripCreated { trip_id, .. }
			| EventKind::TripStatusChanged { trip_id, .. }
			| EventKind::TripResequenced { trip_id, .. } => (EntityType::Trip, trip_id.as_str()),
			EventKind::InvoiceGenerated { invoice_id, .. }
			| EventKind::InvoiceUpdated { invoice_id, .. } => (EntityType::Invoice, invoice_id.as_str()),
			EventKind::InventoryAdjusted { warehouse_id, .. } => {
				(EntityType::Inventory, warehouse_id.as_str())
			},
			EventKind::RecordChanged {
				entity_type,
				entity_id,
				..
			} => (*entity_type, entity_id.as_str()),
		}
	}

	/// Audit classification of the event.
	pub fn action(&self) -> AuditAction {
		match &self.kind {
			EventKind::OrderCreated { .. } => AuditAction::OrderCreated,
			EventKind::OrderEdited { .. } => AuditAction::OrderEdited,
			EventKind::OrderStatusChanged { .. } => AuditAction::OrderStatusChanged,
			EventKind::TripCreated { .. } => AuditAction::TripCreated,
			EventKind::TripStatusChanged { .. } => AuditAction::TripStatusChanged,
			EventKind::TripResequenced { .. } => AuditAction::TripResequenced,
			EventKind::PaymentRecorded { .. } => AuditAction::PaymentRecorded,
			EventKind::InvoiceGenerated { .. } => AuditAction::InvoiceGenerated,
			EventKind::InvoiceUpdated { .. } => AuditAction::InvoiceUpdated,
			EventKind::InventoryAdjusted { .. } => AuditAction::InventoryAdjusted,
			EventKind::RecordChanged { action, .. } => *action,
		}
	}

	/// One-line description used for audit metadata and notifications.
	pub fn describe(&self) -> String {
		match &self.kind {
			EventKind::OrderCreated { order_id, total, .. } => {
				format!("Order {} created with total {}", order_id, total)
			},
			EventKind::OrderEdited { order_id, total, .. } => {
				format!("Order {} edited, new total {}", order_id, total)
			},
			EventKind::OrderStatusChanged {
				order_id, from, to, ..
			} => format!("Order {} moved from {} to {}", order_id, from, to),
			EventKind::TripCreated {
				trip_id, order_ids, ..
			} => format!("Trip {} created with {} stop(s)", trip_id, order_ids.len()),
			EventKind::TripStatusChanged { trip_id, from, to, .. } => {
				format!("Trip {} moved from {} to {}", trip_id, from, to)
			},
			EventKind::TripResequenced { trip_id, .. } => {
				format!("Stops of trip {} were reordered", trip_id)
			},
			EventKind::PaymentRecorded {
				order_id,
				amount,
				method,
				..
			} => format!("Payment of {} via {} recorded for order {}", amount, method, order_id),
			EventKind::InvoiceGenerated { number, order_id, .. } => {
				format!("Invoice {} issued for order {}", number, order_id)
			},
			EventKind::InvoiceUpdated {
				number, reconciled, ..
			} => {
				if *reconciled {
					format!("Invoice {} reconciled", number)
				} else {
					format!("Invoice {} updated", number)
				}
			},
			EventKind::InventoryAdjusted {
				product_id,
				warehouse_id,
				delta,
				on_hand,
				..
			} => format!(
				"Stock of {} at {} adjusted by {} to {}",
				product_id, warehouse_id, delta, on_hand
			),
			EventKind::RecordChanged {
				entity_type,
				entity_id,
				action,
			} => format!("{} {} {}", entity_type, entity_id, action),
		}
	}
}

/// Kinds of records that appear in the audit log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
	Order,
	Trip,
	Invoice,
	Store,
	Warehouse,
	Product,
	User,
	Inventory,
}

impl fmt::Display for EntityType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			EntityType::Order => "order",
			EntityType::Trip => "trip",
			EntityType::Invoice => "invoice",
			EntityType::Store => "store",
			EntityType::Warehouse => "warehouse",
			EntityType::Product => "product",
			EntityType::User => "user",
			EntityType::Inventory => "inventory",
		};
		f.write_str(name)
	}
}

/// Audit action classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
	OrderCreated,
	OrderEdited,
	OrderStatusChanged,
	TripCreated,
	TripStatusChanged,
	TripResequenced,
	PaymentRecorded,
	InvoiceGenerated,
	InvoiceUpdated,
	InventoryAdjusted,
	RecordCreated,
	RecordUpdated,
	RecordDeactivated,
}

impl fmt::Display for AuditAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			AuditAction::OrderCreated => "order_created",
			AuditAction::OrderEdited => "order_edited",
			AuditAction::OrderStatusChanged => "order_status_changed",
			AuditAction::TripCreated => "trip_created",
			AuditAction::TripStatusChanged => "trip_status_changed",
			AuditAction::TripResequenced => "trip_resequenced",
			AuditAction::PaymentRecorded => "payment_recorded",
			AuditAction::InvoiceGenerated => "invoice_generated",
			AuditAction::InvoiceUpdated => "invoice_updated",
			AuditAction::InventoryAdjusted => "inventory_adjusted",
			AuditAction::RecordCreated => "created",
			AuditAction::RecordUpdated => "updated",
			AuditAction::RecordDeactivated => "deactivated",
		};
		f.write_str(name)
	}
}

/// Persisted audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
	pub id: String,
	pub actor_id: String,
	pub action: AuditAction,
	pub entity_type: EntityType,
	pub entity_id: String,
	pub metadata: serde_json::Value,
	pub recorded_at: DateTime<Utc>,
}

/// Message delivered to a single user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
	pub id: String,
	pub recipient_id: String,
	pub kind: NotificationKind,
	pub message: String,
	pub entity_type: EntityType,
	pub entity_id: String,
	pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
	NewOrder,
	OrderUpdate,
	TripUpdate,
	PaymentReceived,
}
