//! Catalog types: stores, warehouses, products and inventory.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A retail store receiving deliveries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Store {
	pub id: String,
	pub name: String,
	#[serde(default)]
	pub owner_name: Option<String>,
	pub city: String,
	pub barangay: String,
	#[serde(default)]
	pub address_line: Option<String>,
	#[serde(default)]
	pub contact_number: Option<String>,
	pub active: bool,
	pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStore {
	pub name: String,
	#[serde(default)]
	pub owner_name: Option<String>,
	pub city: String,
	pub barangay: String,
	#[serde(default)]
	pub address_line: Option<String>,
	#[serde(default)]
	pub contact_number: Option<String>,
}

/// A warehouse trips depart from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Warehouse {
	pub id: String,
	pub name: String,
	#[serde(default)]
	pub distributor_id: Option<String>,
	pub city: String,
	pub active: bool,
	pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWarehouse {
	pub name: String,
	#[serde(default)]
	pub distributor_id: Option<String>,
	pub city: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
	pub id: String,
	pub sku: String,
	pub name: String,
	pub unit_price: Decimal,
	pub active: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
	pub sku: String,
	pub name: String,
	pub unit_price: Decimal,
}

/// On-hand quantity of one product in one warehouse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryRecord {
	pub warehouse_id: String,
	pub product_id: String,
	pub on_hand: i64,
	pub updated_at: DateTime<Utc>,
	pub updated_by: String,
}

impl InventoryRecord {
	/// Storage id of the record for a warehouse/product pair.
	pub fn key(warehouse_id: &str, product_id: &str) -> String {
		format!("{}.{}", warehouse_id, product_id)
	}
}

/// Manual stock adjustment. Positive deltas restock, negative ones write off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryAdjustment {
	pub warehouse_id: String,
	pub product_id: String,
	pub delta: i64,
	pub reason: String,
}

/// New list price for a product. Existing order lines keep their snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPriceUpdate {
	pub unit_price: Decimal,
}
