//! Billing types: payments, invoices, balances and receivables.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Payment recorded against an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
	pub id: String,
	pub order_id: String,
	pub amount: Decimal,
	pub method: PaymentMethod,
	/// External reference such as a transfer or e-wallet receipt number.
	#[serde(default)]
	pub reference: Option<String>,
	pub recorded_by: String,
	pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
	Cash,
	#[serde(rename = "gcash")]
	GCash,
	Maya,
	BankTransfer,
	Other,
}

impl fmt::Display for PaymentMethod {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			PaymentMethod::Cash => "cash",
			PaymentMethod::GCash => "gcash",
			PaymentMethod::Maya => "maya",
			PaymentMethod::BankTransfer => "bank_transfer",
			PaymentMethod::Other => "other",
		};
		f.write_str(name)
	}
}

/// Request to record a payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
	pub amount: Decimal,
	pub method: PaymentMethod,
	#[serde(default)]
	pub reference: Option<String>,
}

/// Paid and outstanding amounts of an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderBalance {
	pub order_id: String,
	pub total: Decimal,
	pub paid: Decimal,
	pub balance: Decimal,
}

/// Invoice issued for an order. Amounts are copied at issue time and never
/// change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invoice {
	pub id: String,
	pub number: String,
	pub order_id: String,
	pub store_id: String,
	pub currency: String,
	pub sub_total: Decimal,
	pub tax: Decimal,
	pub total: Decimal,
	pub issued_at: DateTime<Utc>,
	pub issued_by: String,
	/// Location of the rendered document, if any.
	#[serde(default)]
	pub url: Option<String>,
	#[serde(default)]
	pub reconciled: bool,
	#[serde(default)]
	pub reconciled_at: Option<DateTime<Utc>>,
	#[serde(default)]
	pub reconciliation_note: Option<String>,
}

/// Outstanding invoiced balance for one store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreReceivable {
	pub store_id: String,
	pub invoiced: Decimal,
	pub paid: Decimal,
	pub outstanding: Decimal,
	/// Invoice numbers that still carry a balance.
	pub open_invoices: Vec<String>,
}
