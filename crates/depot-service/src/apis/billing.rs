//! Payment, invoice and receivables endpoints.

use axum::{
	extract::{Path, Query, State},
	http::StatusCode,
	response::Json,
};
use depot_types::{
	APIError, InvoiceMetadataRequest, Invoice, NewPayment, OrderBalance, Payment,
	ReconcileInvoiceRequest, StoreReceivable,
};
use serde::Deserialize;

use crate::server::{Actor, AppState};

#[derive(Debug, Deserialize)]
pub struct ReceivablesFilter {
	#[serde(default)]
	pub store_id: Option<String>,
}

pub async fn record_payment(
	State(state): State<AppState>,
	Actor(ctx): Actor,
	Path(order_id): Path<String>,
	Json(payment): Json<NewPayment>,
) -> Result<(StatusCode, Json<Payment>), APIError> {
	let payment = state.engine.record_payment(&ctx, &order_id, payment).await?;
	Ok((StatusCode::CREATED, Json(payment)))
}

pub async fn list_payments(
	State(state): State<AppState>,
	_actor: Actor,
	Path(order_id): Path<String>,
) -> Result<Json<Vec<Payment>>, APIError> {
	Ok(Json(state.engine.list_payments(&order_id).await?))
}

pub async fn balance(
	State(state): State<AppState>,
	_actor: Actor,
	Path(order_id): Path<String>,
) -> Result<Json<OrderBalance>, APIError> {
	Ok(Json(state.engine.order_balance(&order_id).await?))
}

pub async fn generate_invoice(
	State(state): State<AppState>,
	Actor(ctx): Actor,
	Path(order_id): Path<String>,
) -> Result<(StatusCode, Json<Invoice>), APIError> {
	let invoice = state.engine.generate_invoice(&ctx, &order_id).await?;
	Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn get_invoice(
	State(state): State<AppState>,
	_actor: Actor,
	Path(id): Path<String>,
) -> Result<Json<Invoice>, APIError> {
	Ok(Json(state.engine.get_invoice(&id).await?))
}

pub async fn update_invoice(
	State(state): State<AppState>,
	Actor(ctx): Actor,
	Path(id): Path<String>,
	Json(req): Json<InvoiceMetadataRequest>,
) -> Result<Json<Invoice>, APIError> {
	Ok(Json(state.engine.update_invoice_metadata(&ctx, &id, req.url).await?))
}

pub async fn reconcile_invoice(
	State(state): State<AppState>,
	Actor(ctx): Actor,
	Path(id): Path<String>,
	body: Option<Json<ReconcileInvoiceRequest>>,
) -> Result<Json<Invoice>, APIError> {
	let note = body.and_then(|Json(req)| req.note);
	Ok(Json(state.engine.reconcile_invoice(&ctx, &id, note).await?))
}

/// Handles GET /api/receivables, optionally for one store.
pub async fn receivables(
	State(state): State<AppState>,
	_actor: Actor,
	Query(filter): Query<ReceivablesFilter>,
) -> Result<Json<Vec<StoreReceivable>>, APIError> {
	Ok(Json(
		state
			.engine
			.accounts_receivable(filter.store_id.as_deref())
			.await?,
	))
}
