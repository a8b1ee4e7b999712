//! Storage namespaces for depot records.

use std::str::FromStr;

/// Storage namespaces for the different record collections.
///
/// Replaces string literals in storage calls with a closed set of names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	Orders,
	Trips,
	/// Payment records, also embedded in their order.
	Payments,
	Invoices,
	/// Order id -> invoice id.
	InvoiceByOrder,
	Stores,
	Warehouses,
	Products,
	/// SKU -> product id.
	ProductBySku,
	Users,
	Inventory,
	AuditLog,
}

impl StorageKey {
	/// Returns the namespace string.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Orders => "orders",
			StorageKey::Trips => "trips",
			StorageKey::Payments => "payments",
			StorageKey::Invoices => "invoices",
			StorageKey::InvoiceByOrder => "invoice_by_order",
			StorageKey::Stores => "stores",
			StorageKey::Warehouses => "warehouses",
			StorageKey::Products => "products",
			StorageKey::ProductBySku => "product_by_sku",
			StorageKey::Users => "users",
			StorageKey::Inventory => "inventory",
			StorageKey::AuditLog => "audit_log",
		}
	}

	/// Returns an iterator over all namespaces.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Orders,
			Self::Trips,
			Self::Payments,
			Self::Invoices,
			Self::InvoiceByOrder,
			Self::Stores,
			Self::Warehouses,
			Self::Products,
			Self::ProductBySku,
			Self::Users,
			Self::Inventory,
			Self::AuditLog,
		]
		.into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all().find(|key| key.as_str() == s).ok_or(())
	}
}

impl From<StorageKey> for &'static str {
	fn from(key: StorageKey) -> Self {
		key.as_str()
	}
}
