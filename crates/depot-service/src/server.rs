//! HTTP server for the depot API.
//!
//! Every route except `/api/health` acts on behalf of the user named by the
//! `x-actor-id` header. The user must exist and be active; their stored role
//! is what the engine checks.

use axum::{
	extract::{DefaultBodyLimit, FromRequestParts, State},
	http::request::Parts,
	response::Json,
	routing::{get, patch, post},
	Router,
};
use chrono::Utc;
use depot_config::ApiConfig;
use depot_core::{DepotEngine, DepotError};
use depot_types::{APIError, HealthResponse, RequestContext};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::apis;

pub const ACTOR_HEADER: &str = "x-actor-id";

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub engine: Arc<DepotEngine>,
}

/// The resolved caller of a request, with the request clock read once.
pub struct Actor(pub RequestContext);

impl FromRequestParts<AppState> for Actor {
	type Rejection = APIError;

	async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
		let user_id = parts
			.headers
			.get(ACTOR_HEADER)
			.and_then(|value| value.to_str().ok())
			.map(str::trim)
			.filter(|value| !value.is_empty())
			.ok_or_else(|| {
				APIError::bad_request("MISSING_ACTOR", format!("Header '{}' is required", ACTOR_HEADER))
			})?;

		let unauthorized = || APIError::Unauthorized {
			error_type: "UNKNOWN_ACTOR".to_string(),
			message: format!("No active user '{}'", user_id),
		};
		let user = match state.engine.get_user(user_id).await {
			Ok(user) => user,
			Err(DepotError::NotFound { .. }) => return Err(unauthorized()),
			Err(e) => return Err(e.into()),
		};
		if !user.active {
			return Err(unauthorized());
		}
		Ok(Actor(RequestContext::new(user.id, user.role, Utc::now())))
	}
}

/// Builds the `/api` router for an engine.
pub fn router(engine: Arc<DepotEngine>, api_config: &ApiConfig) -> Router {
	let api = Router::new()
		.route("/health", get(handle_health))
		.route("/orders", post(apis::orders::create).get(apis::orders::list))
		.route("/orders/{id}", get(apis::orders::get).patch(apis::orders::edit))
		.route("/orders/{id}/confirm", post(apis::orders::confirm))
		.route("/orders/{id}/pack", post(apis::orders::pack))
		.route("/orders/{id}/dispatch", post(apis::orders::dispatch))
		.route("/orders/{id}/in-transit", post(apis::orders::in_transit))
		.route("/orders/{id}/at-store", post(apis::orders::at_store))
		.route("/orders/{id}/deliver", post(apis::orders::deliver))
		.route("/orders/{id}/return", post(apis::orders::mark_returned))
		.route("/orders/{id}/cancel", post(apis::orders::cancel))
		.route("/orders/{id}/audit", get(apis::orders::audit))
		.route(
			"/orders/{id}/payments",
			post(apis::billing::record_payment).get(apis::billing::list_payments),
		)
		.route("/orders/{id}/balance", get(apis::billing::balance))
		.route("/orders/{id}/invoice", post(apis::billing::generate_invoice))
		.route("/trips", post(apis::trips::create).get(apis::trips::list))
		.route("/trips/suggest-sequence", post(apis::trips::suggest_sequence))
		.route("/trips/{id}", get(apis::trips::get))
		.route("/trips/{id}/assign", post(apis::trips::assign))
		.route("/trips/{id}/status", post(apis::trips::update_status))
		.route("/trips/{id}/reorder", post(apis::trips::reorder))
		.route("/trips/{id}/cancel", post(apis::trips::cancel))
		.route(
			"/invoices/{id}",
			get(apis::billing::get_invoice).patch(apis::billing::update_invoice),
		)
		.route("/invoices/{id}/reconcile", post(apis::billing::reconcile_invoice))
		.route("/receivables", get(apis::billing::receivables))
		.route("/users", post(apis::admin::create_user).get(apis::admin::list_users))
		.route("/users/{id}", get(apis::admin::get_user))
		.route("/users/{id}/deactivate", post(apis::admin::deactivate_user))
		.route("/stores", post(apis::admin::create_store).get(apis::admin::list_stores))
		.route("/stores/{id}", get(apis::admin::get_store))
		.route("/stores/{id}/deactivate", post(apis::admin::deactivate_store))
		.route(
			"/warehouses",
			post(apis::admin::create_warehouse).get(apis::admin::list_warehouses),
		)
		.route("/warehouses/{id}", get(apis::admin::get_warehouse))
		.route("/warehouses/{id}/deactivate", post(apis::admin::deactivate_warehouse))
		.route(
			"/products",
			post(apis::admin::create_product).get(apis::admin::list_products),
		)
		.route("/products/{id}", get(apis::admin::get_product))
		.route("/products/{id}/price", patch(apis::admin::update_price))
		.route("/products/{id}/deactivate", post(apis::admin::deactivate_product))
		.route("/inventory/adjust", post(apis::admin::adjust_inventory))
		.route("/inventory/{warehouse_id}", get(apis::admin::inventory));

	Router::new()
		.nest("/api", api)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(CorsLayer::permissive())
				.layer(TimeoutLayer::new(Duration::from_secs(api_config.timeout_seconds)))
				.layer(DefaultBodyLimit::max(api_config.max_request_size)),
		)
		.with_state(AppState { engine })
}

/// Starts the HTTP server for the API.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<DepotEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(engine, &api_config);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Depot API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Handles GET /api/health requests.
async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
	Json(HealthResponse {
		status: "ok".to_string(),
		service_id: state.engine.config().service.id.clone(),
	})
}
