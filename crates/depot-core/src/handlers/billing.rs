//! Payments, invoices and accounts receivable.

use super::{check_money, new_id, Outcome};
use crate::error::DepotError;
use crate::state::{Batch, Records};
use depot_config::BillingConfig;
use depot_types::{
	truncate_id, EventKind, Invoice, NewPayment, Order, OrderBalance, OrderStatus, Payment,
	RequestContext, StorageKey, StoreReceivable,
};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::instrument;

pub struct BillingHandler {
	records: Records,
	config: BillingConfig,
}

impl BillingHandler {
	pub fn new(records: Records, config: BillingConfig) -> Self {
		Self { records, config }
	}

	/// Records a payment. The running total of payments never exceeds the
	/// order total.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), amount = %payment.amount))]
	pub async fn record_payment(
		&self,
		ctx: &RequestContext,
		order_id: &str,
		payment: NewPayment,
	) -> Result<Outcome<Payment>, DepotError> {
		check_money("Payment amount", payment.amount)?;
		if payment.amount.is_zero() {
			return Err(DepotError::validation(
				"Payment amount must be greater than zero",
			));
		}

		let mut order = self.records.order(order_id).await?;
		if order.status == OrderStatus::Cancelled {
			return Err(DepotError::validation(
				"Payments cannot be recorded for a cancelled order",
			));
		}
		let remaining = order.balance();
		if payment.amount > remaining {
			return Err(DepotError::Validation(format!(
				"Payment amount exceeds remaining balance of {}",
				remaining
			)));
		}

		let recorded = Payment {
			id: new_id(),
			order_id: order.id.clone(),
			amount: payment.amount,
			method: payment.method,
			reference: payment.reference,
			recorded_by: ctx.actor_id().to_string(),
			recorded_at: ctx.now,
		};
		order.payments.push(recorded.clone());
		order.touch(ctx.actor_id(), ctx.now);

		let mut batch = Batch::new();
		batch
			.order(&order)?
			.put(StorageKey::Payments, &recorded.id, &recorded)?;
		self.records.commit(batch).await?;

		tracing::info!(balance = %order.balance(), "Payment recorded");
		let kind = EventKind::PaymentRecorded {
			order_id: order.id.clone(),
			agent_id: order.agent_id.clone(),
			payment_id: recorded.id.clone(),
			amount: recorded.amount,
			method: recorded.method,
		};
		Ok(Outcome::with_event(recorded, ctx, kind))
	}

	pub async fn payments(&self, order_id: &str) -> Result<Vec<Payment>, DepotError> {
		Ok(self.records.order(order_id).await?.payments)
	}

	pub async fn order_balance(&self, order_id: &str) -> Result<OrderBalance, DepotError> {
		let order = self.records.order(order_id).await?;
		Ok(balance_of(&order))
	}

	/// Issues the invoice for an order. Each order gets at most one.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn generate_invoice(
		&self,
		ctx: &RequestContext,
		order_id: &str,
	) -> Result<Outcome<Invoice>, DepotError> {
		let order = self.records.order(order_id).await?;
		if order.status == OrderStatus::Cancelled {
			return Err(DepotError::validation(
				"Cancelled orders cannot be invoiced",
			));
		}
		if let Some(existing) = self
			.records
			.find::<String>(StorageKey::InvoiceByOrder, &order.id)
			.await?
		{
			return Err(DepotError::Conflict(format!(
				"Order {} already has invoice {}",
				order.id, existing
			)));
		}

		let id = new_id();
		let invoice = Invoice {
			number: self.invoice_number(ctx, &id),
			id,
			order_id: order.id.clone(),
			store_id: order.store_id.clone(),
			currency: self.config.currency.clone(),
			sub_total: order.sub_total,
			tax: order.tax,
			total: order.total,
			issued_at: ctx.now,
			issued_by: ctx.actor_id().to_string(),
			url: None,
			reconciled: false,
			reconciled_at: None,
			reconciliation_note: None,
		};

		let mut batch = Batch::new();
		batch
			.put(StorageKey::Invoices, &invoice.id, &invoice)?
			.put(StorageKey::InvoiceByOrder, &order.id, &invoice.id)?;
		self.records.commit(batch).await?;

		tracing::info!(number = %invoice.number, "Invoice generated");
		let kind = EventKind::InvoiceGenerated {
			invoice_id: invoice.id.clone(),
			order_id: invoice.order_id.clone(),
			number: invoice.number.clone(),
		};
		Ok(Outcome::with_event(invoice, ctx, kind))
	}

	/// Sets the rendered document location. Amounts are never touched.
	#[instrument(skip_all, fields(invoice_id = %truncate_id(invoice_id)))]
	pub async fn update_metadata(
		&self,
		ctx: &RequestContext,
		invoice_id: &str,
		url: Option<String>,
	) -> Result<Outcome<Invoice>, DepotError> {
		let mut invoice = self.records.invoice(invoice_id).await?;
		invoice.url = url;
		self.save_invoice(ctx, invoice).await
	}

	#[instrument(skip_all, fields(invoice_id = %truncate_id(invoice_id)))]
	pub async fn reconcile(
		&self,
		ctx: &RequestContext,
		invoice_id: &str,
		note: Option<String>,
	) -> Result<Outcome<Invoice>, DepotError> {
		let mut invoice = self.records.invoice(invoice_id).await?;
		if invoice.reconciled {
			return Err(DepotError::Conflict(format!(
				"Invoice {} is already reconciled",
				invoice.number
			)));
		}
		invoice.reconciled = true;
		invoice.reconciled_at = Some(ctx.now);
		invoice.reconciliation_note = note;
		self.save_invoice(ctx, invoice).await
	}

	pub async fn get_invoice(&self, invoice_id: &str) -> Result<Invoice, DepotError> {
		self.records.invoice(invoice_id).await
	}

	/// Outstanding balances per store over invoiced orders, skipping invoices
	/// that are fully paid.
	pub async fn accounts_receivable(
		&self,
		store_id: Option<&str>,
	) -> Result<Vec<StoreReceivable>, DepotError> {
		let invoices: Vec<Invoice> = self.records.all(StorageKey::Invoices).await?;
		let mut receivables: BTreeMap<String, StoreReceivable> = BTreeMap::new();

		for invoice in invoices {
			if store_id.is_some_and(|s| s != invoice.store_id) {
				continue;
			}
			let order = self.records.order(&invoice.order_id).await?;
			let paid = order.amount_paid();
			let outstanding = invoice.total - paid;
			if outstanding <= Decimal::ZERO {
				continue;
			}

			let entry = receivables
				.entry(invoice.store_id.clone())
				.or_insert_with(|| StoreReceivable {
					store_id: invoice.store_id.clone(),
					invoiced: Decimal::ZERO,
					paid: Decimal::ZERO,
					outstanding: Decimal::ZERO,
					open_invoices: Vec::new(),
				});
			entry.invoiced += invoice.total;
			entry.paid += paid;
			entry.outstanding += outstanding;
			entry.open_invoices.push(invoice.number);
		}

		Ok(receivables.into_values().collect())
	}

	async fn save_invoice(
		&self,
		ctx: &RequestContext,
		invoice: Invoice,
	) -> Result<Outcome<Invoice>, DepotError> {
		let mut batch = Batch::new();
		batch.put(StorageKey::Invoices, &invoice.id, &invoice)?;
		self.records.commit(batch).await?;

		tracing::info!(number = %invoice.number, reconciled = invoice.reconciled, "Invoice updated");
		let kind = EventKind::InvoiceUpdated {
			invoice_id: invoice.id.clone(),
			number: invoice.number.clone(),
			reconciled: invoice.reconciled,
		};
		Ok(Outcome::with_event(invoice, ctx, kind))
	}

	/// `<prefix>-<YYYYMMDD>-<first 8 hex digits of the id>`.
	fn invoice_number(&self, ctx: &RequestContext, invoice_id: &str) -> String {
		let suffix: String = invoice_id
			.chars()
			.filter(char::is_ascii_hexdigit)
			.take(8)
			.collect::<String>()
			.to_uppercase();
		format!(
			"{}-{}-{}",
			self.config.invoice_prefix,
			ctx.now.format("%Y%m%d"),
			suffix
		)
	}
}

pub(crate) fn balance_of(order: &Order) -> OrderBalance {
	let paid = order.amount_paid();
	OrderBalance {
		order_id: order.id.clone(),
		total: order.total,
		paid,
		balance: order.total - paid,
	}
}
