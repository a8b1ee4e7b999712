//! Trip endpoints: planning, assignment, status updates and stop ordering.

use axum::{
	extract::{Path, Query, State},
	http::StatusCode,
	response::Json,
};
use depot_types::{
	APIError, NewTrip, ReorderTripRequest, SuggestSequenceRequest, SuggestSequenceResponse, Trip,
	TripAssign, TripStatus, TripStatusRequest,
};
use serde::Deserialize;

use crate::server::{Actor, AppState};

#[derive(Debug, Deserialize)]
pub struct TripFilter {
	#[serde(default)]
	pub status: Option<TripStatus>,
	#[serde(default)]
	pub warehouse_id: Option<String>,
}

pub async fn create(
	State(state): State<AppState>,
	Actor(ctx): Actor,
	Json(new): Json<NewTrip>,
) -> Result<(StatusCode, Json<Trip>), APIError> {
	let trip = state.engine.create_trip(&ctx, new).await?;
	Ok((StatusCode::CREATED, Json(trip)))
}

pub async fn list(
	State(state): State<AppState>,
	_actor: Actor,
	Query(filter): Query<TripFilter>,
) -> Result<Json<Vec<Trip>>, APIError> {
	let trips = state
		.engine
		.list_trips(filter.status, filter.warehouse_id.as_deref())
		.await?;
	Ok(Json(trips))
}

pub async fn get(
	State(state): State<AppState>,
	_actor: Actor,
	Path(id): Path<String>,
) -> Result<Json<Trip>, APIError> {
	Ok(Json(state.engine.get_trip(&id).await?))
}

/// Handles POST /api/trips/{id}/assign. Without a body the trip keeps its
/// dispatcher and vehicle.
pub async fn assign(
	State(state): State<AppState>,
	Actor(ctx): Actor,
	Path(id): Path<String>,
	body: Option<Json<TripAssign>>,
) -> Result<Json<Trip>, APIError> {
	let assign = body.map(|Json(assign)| assign).unwrap_or_default();
	Ok(Json(state.engine.assign_trip(&ctx, &id, assign).await?))
}

pub async fn update_status(
	State(state): State<AppState>,
	Actor(ctx): Actor,
	Path(id): Path<String>,
	Json(req): Json<TripStatusRequest>,
) -> Result<Json<Trip>, APIError> {
	Ok(Json(state.engine.update_trip_status(&ctx, &id, req.status).await?))
}

pub async fn reorder(
	State(state): State<AppState>,
	Actor(ctx): Actor,
	Path(id): Path<String>,
	Json(req): Json<ReorderTripRequest>,
) -> Result<Json<Trip>, APIError> {
	Ok(Json(
		state
			.engine
			.reorder_trip_assignments(&ctx, &id, req.sequence)
			.await?,
	))
}

pub async fn cancel(
	State(state): State<AppState>,
	Actor(ctx): Actor,
	Path(id): Path<String>,
) -> Result<Json<Trip>, APIError> {
	Ok(Json(state.engine.cancel_trip(&ctx, &id).await?))
}

/// Handles POST /api/trips/suggest-sequence. Nothing is written.
pub async fn suggest_sequence(
	State(state): State<AppState>,
	_actor: Actor,
	Json(req): Json<SuggestSequenceRequest>,
) -> Result<Json<SuggestSequenceResponse>, APIError> {
	let order_ids = state.engine.suggest_trip_sequence(&req.order_ids).await?;
	Ok(Json(SuggestSequenceResponse { order_ids }))
}

#[cfg(test)]
mod tests {
	use crate::apis::admin::tests::{packed_order, seed_catalog};
	use crate::server::tests::{call, test_app};
	use axum::http::StatusCode;
	use depot_core::handlers::admin::BOOTSTRAP_ADMIN_ID;
	use serde_json::json;

	const ADMIN: Option<&str> = Some(BOOTSTRAP_ADMIN_ID);

	#[tokio::test]
	async fn test_trip_flow_over_http() {
		let app = test_app().await;
		let seed = seed_catalog(&app).await;
		let first = packed_order(&app, &seed).await;
		let second = packed_order(&app, &seed).await;

		let (status, trip) = call(
			&app,
			"POST",
			"/api/trips",
			ADMIN,
			Some(json!({
				"warehouse_id": seed.warehouse,
				"dispatcher_id": seed.dispatcher,
				"order_ids": [first, second]
			})),
		)
		.await;
		assert_eq!(status, StatusCode::CREATED);
		assert_eq!(trip["status"], "created");
		let id = trip["id"].as_str().unwrap();

		let (status, trip) = call(
			&app,
			"POST",
			&format!("/api/trips/{}/reorder", id),
			ADMIN,
			Some(json!({"sequence": {first.as_str(): 2, second.as_str(): 1}})),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(trip["assignments"][0]["order_id"], second.as_str());

		let (status, trip) =
			call(&app, "POST", &format!("/api/trips/{}/assign", id), ADMIN, None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(trip["status"], "assigned");

		let (status, trip) = call(
			&app,
			"POST",
			&format!("/api/trips/{}/status", id),
			ADMIN,
			Some(json!({"status": "started"})),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert!(trip["departed_at"].is_string());

		let (_, order) = call(&app, "GET", &format!("/api/orders/{}", first), ADMIN, None).await;
		assert_eq!(order["status"], "in_transit");

		let (status, trips) = call(&app, "GET", "/api/trips?status=started", ADMIN, None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(trips.as_array().unwrap().len(), 1);
	}

	#[tokio::test]
	async fn test_created_status_is_rejected() {
		let app = test_app().await;
		let seed = seed_catalog(&app).await;
		let order = packed_order(&app, &seed).await;
		let (_, trip) = call(
			&app,
			"POST",
			"/api/trips",
			ADMIN,
			Some(json!({
				"warehouse_id": seed.warehouse,
				"dispatcher_id": seed.dispatcher,
				"order_ids": [order]
			})),
		)
		.await;

		let uri = format!("/api/trips/{}/status", trip["id"].as_str().unwrap());
		let (status, body) =
			call(&app, "POST", &uri, ADMIN, Some(json!({"status": "created"}))).await;
		assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
		assert_eq!(body["error"], "VALIDATION_ERROR");
	}
}
