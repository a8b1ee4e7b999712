//! Read model query types: filters, sorting and pagination.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Order, OrderStatus};

/// Filter, sort and paging parameters for listing orders.
///
/// Date bounds are inclusive. `page` is 1-based.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OrderQuery {
	#[serde(default)]
	pub status: Option<OrderStatus>,
	#[serde(default)]
	pub store_id: Option<String>,
	#[serde(default)]
	pub agent_id: Option<String>,
	#[serde(default)]
	pub distributor_id: Option<String>,
	#[serde(default)]
	pub warehouse_id: Option<String>,
	#[serde(default)]
	pub priority: Option<bool>,
	#[serde(default)]
	pub created_from: Option<DateTime<Utc>>,
	#[serde(default)]
	pub created_to: Option<DateTime<Utc>>,
	#[serde(default)]
	pub scheduled_from: Option<DateTime<Utc>>,
	#[serde(default)]
	pub scheduled_to: Option<DateTime<Utc>>,
	/// Case-insensitive match on order id, store name or notes.
	#[serde(default)]
	pub search: Option<String>,
	#[serde(default)]
	pub sort_by: Option<OrderSortField>,
	#[serde(default)]
	pub direction: Option<SortDirection>,
	#[serde(default)]
	pub page: Option<u32>,
	#[serde(default)]
	pub size: Option<u32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderSortField {
	#[default]
	CreatedAt,
	ScheduledFor,
	Total,
	Status,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
	Asc,
	#[default]
	Desc,
}

/// One page of results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
	pub items: Vec<T>,
	/// Number of matches across all pages.
	pub total: usize,
	pub page: u32,
	pub size: u32,
}

/// List view of an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderSummary {
	pub id: String,
	pub store_id: String,
	pub store_name: String,
	pub agent_id: String,
	#[serde(default)]
	pub warehouse_id: Option<String>,
	#[serde(default)]
	pub trip_id: Option<String>,
	pub status: OrderStatus,
	pub priority: bool,
	#[serde(default)]
	pub scheduled_for: Option<DateTime<Utc>>,
	pub total: Decimal,
	pub balance: Decimal,
	pub item_count: usize,
	pub created_at: DateTime<Utc>,
}

impl OrderSummary {
	pub fn from_order(order: &Order, store_name: &str) -> Self {
		Self {
			id: order.id.clone(),
			store_id: order.store_id.clone(),
			store_name: store_name.to_string(),
			agent_id: order.agent_id.clone(),
			warehouse_id: order.warehouse_id.clone(),
			trip_id: order.trip_id.clone(),
			status: order.status,
			priority: order.priority,
			scheduled_for: order.scheduled_for,
			total: order.total,
			balance: order.balance(),
			item_count: order.items.len(),
			created_at: order.created_at,
		}
	}
}
