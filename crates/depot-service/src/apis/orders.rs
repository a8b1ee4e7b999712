//! Order endpoints: placement, editing, lifecycle actions and listing.

use axum::{
	extract::{Path, Query, State},
	http::StatusCode,
	response::Json,
};
use depot_types::{
	APIError, AuditEntry, CancelRequest, ConfirmOrderRequest, DispatchOrderRequest, EntityType,
	NewOrder, Order, OrderEdit, OrderQuery, OrderSummary, Page,
};

use crate::server::{Actor, AppState};

pub async fn create(
	State(state): State<AppState>,
	Actor(ctx): Actor,
	Json(new): Json<NewOrder>,
) -> Result<(StatusCode, Json<Order>), APIError> {
	let order = state.engine.create_order(&ctx, new).await?;
	Ok((StatusCode::CREATED, Json(order)))
}

/// Handles GET /api/orders with filter, sort and paging query parameters.
pub async fn list(
	State(state): State<AppState>,
	_actor: Actor,
	Query(query): Query<OrderQuery>,
) -> Result<Json<Page<OrderSummary>>, APIError> {
	Ok(Json(state.engine.list_orders(&query).await?))
}

pub async fn get(
	State(state): State<AppState>,
	_actor: Actor,
	Path(id): Path<String>,
) -> Result<Json<Order>, APIError> {
	Ok(Json(state.engine.get_order(&id).await?))
}

pub async fn edit(
	State(state): State<AppState>,
	Actor(ctx): Actor,
	Path(id): Path<String>,
	Json(edit): Json<OrderEdit>,
) -> Result<Json<Order>, APIError> {
	Ok(Json(state.engine.edit_order(&ctx, &id, edit).await?))
}

/// Handles POST /api/orders/{id}/confirm. The body is optional.
pub async fn confirm(
	State(state): State<AppState>,
	Actor(ctx): Actor,
	Path(id): Path<String>,
	body: Option<Json<ConfirmOrderRequest>>,
) -> Result<Json<Order>, APIError> {
	let adjustments = body.map(|Json(req)| req.adjustments).unwrap_or_default();
	Ok(Json(state.engine.confirm_order(&ctx, &id, adjustments).await?))
}

pub async fn pack(
	State(state): State<AppState>,
	Actor(ctx): Actor,
	Path(id): Path<String>,
) -> Result<Json<Order>, APIError> {
	Ok(Json(state.engine.mark_packed(&ctx, &id).await?))
}

pub async fn dispatch(
	State(state): State<AppState>,
	Actor(ctx): Actor,
	Path(id): Path<String>,
	Json(req): Json<DispatchOrderRequest>,
) -> Result<Json<Order>, APIError> {
	Ok(Json(state.engine.dispatch_order(&ctx, &id, &req.trip_id).await?))
}

pub async fn in_transit(
	State(state): State<AppState>,
	Actor(ctx): Actor,
	Path(id): Path<String>,
) -> Result<Json<Order>, APIError> {
	Ok(Json(state.engine.mark_in_transit(&ctx, &id).await?))
}

pub async fn at_store(
	State(state): State<AppState>,
	Actor(ctx): Actor,
	Path(id): Path<String>,
) -> Result<Json<Order>, APIError> {
	Ok(Json(state.engine.mark_at_store(&ctx, &id).await?))
}

pub async fn deliver(
	State(state): State<AppState>,
	Actor(ctx): Actor,
	Path(id): Path<String>,
) -> Result<Json<Order>, APIError> {
	Ok(Json(state.engine.mark_delivered(&ctx, &id).await?))
}

pub async fn mark_returned(
	State(state): State<AppState>,
	Actor(ctx): Actor,
	Path(id): Path<String>,
	body: Option<Json<CancelRequest>>,
) -> Result<Json<Order>, APIError> {
	let reason = body.and_then(|Json(req)| req.reason);
	Ok(Json(state.engine.mark_returned(&ctx, &id, reason).await?))
}

pub async fn cancel(
	State(state): State<AppState>,
	Actor(ctx): Actor,
	Path(id): Path<String>,
	body: Option<Json<CancelRequest>>,
) -> Result<Json<Order>, APIError> {
	let reason = body.and_then(|Json(req)| req.reason);
	Ok(Json(state.engine.cancel_order(&ctx, &id, reason).await?))
}

/// Handles GET /api/orders/{id}/audit, oldest entry first.
pub async fn audit(
	State(state): State<AppState>,
	_actor: Actor,
	Path(id): Path<String>,
) -> Result<Json<Vec<AuditEntry>>, APIError> {
	state.engine.get_order(&id).await?;
	Ok(Json(state.engine.audit_trail(EntityType::Order, &id).await?))
}
