//! User, store, warehouse, product and inventory endpoints.

use axum::{
	extract::{Path, Query, State},
	http::StatusCode,
	response::Json,
};
use depot_types::{
	APIError, InventoryAdjustment, InventoryRecord, NewProduct, NewStore, NewUser, NewWarehouse,
	Product, ProductPriceUpdate, Role, Store, User, Warehouse,
};
use serde::Deserialize;

use crate::server::{Actor, AppState};

#[derive(Debug, Deserialize)]
pub struct UserFilter {
	#[serde(default)]
	pub role: Option<Role>,
}

// Users

pub async fn create_user(
	State(state): State<AppState>,
	Actor(ctx): Actor,
	Json(new): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), APIError> {
	let user = state.engine.create_user(&ctx, new).await?;
	Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list_users(
	State(state): State<AppState>,
	_actor: Actor,
	Query(filter): Query<UserFilter>,
) -> Result<Json<Vec<User>>, APIError> {
	Ok(Json(state.engine.list_users(filter.role).await?))
}

pub async fn get_user(
	State(state): State<AppState>,
	_actor: Actor,
	Path(id): Path<String>,
) -> Result<Json<User>, APIError> {
	Ok(Json(state.engine.get_user(&id).await?))
}

pub async fn deactivate_user(
	State(state): State<AppState>,
	Actor(ctx): Actor,
	Path(id): Path<String>,
) -> Result<Json<User>, APIError> {
	Ok(Json(state.engine.deactivate_user(&ctx, &id).await?))
}

// Stores

pub async fn create_store(
	State(state): State<AppState>,
	Actor(ctx): Actor,
	Json(new): Json<NewStore>,
) -> Result<(StatusCode, Json<Store>), APIError> {
	let store = state.engine.create_store(&ctx, new).await?;
	Ok((StatusCode::CREATED, Json(store)))
}

pub async fn list_stores(
	State(state): State<AppState>,
	_actor: Actor,
) -> Result<Json<Vec<Store>>, APIError> {
	Ok(Json(state.engine.list_stores().await?))
}

pub async fn get_store(
	State(state): State<AppState>,
	_actor: Actor,
	Path(id): Path<String>,
) -> Result<Json<Store>, APIError> {
	Ok(Json(state.engine.get_store(&id).await?))
}

pub async fn deactivate_store(
	State(state): State<AppState>,
	Actor(ctx): Actor,
	Path(id): Path<String>,
) -> Result<Json<Store>, APIError> {
	Ok(Json(state.engine.deactivate_store(&ctx, &id).await?))
}

// Warehouses

pub async fn create_warehouse(
	State(state): State<AppState>,
	Actor(ctx): Actor,
	Json(new): Json<NewWarehouse>,
) -> Result<(StatusCode, Json<Warehouse>), APIError> {
	let warehouse = state.engine.create_warehouse(&ctx, new).await?;
	Ok((StatusCode::CREATED, Json(warehouse)))
}

pub async fn list_warehouses(
	State(state): State<AppState>,
	_actor: Actor,
) -> Result<Json<Vec<Warehouse>>, APIError> {
	Ok(Json(state.engine.list_warehouses().await?))
}

pub async fn get_warehouse(
	State(state): State<AppState>,
	_actor: Actor,
	Path(id): Path<String>,
) -> Result<Json<Warehouse>, APIError> {
	Ok(Json(state.engine.get_warehouse(&id).await?))
}

pub async fn deactivate_warehouse(
	State(state): State<AppState>,
	Actor(ctx): Actor,
	Path(id): Path<String>,
) -> Result<Json<Warehouse>, APIError> {
	Ok(Json(state.engine.deactivate_warehouse(&ctx, &id).await?))
}

// Products

pub async fn create_product(
	State(state): State<AppState>,
	Actor(ctx): Actor,
	Json(new): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>), APIError> {
	let product = state.engine.create_product(&ctx, new).await?;
	Ok((StatusCode::CREATED, Json(product)))
}

pub async fn list_products(
	State(state): State<AppState>,
	_actor: Actor,
) -> Result<Json<Vec<Product>>, APIError> {
	Ok(Json(state.engine.list_products().await?))
}

pub async fn get_product(
	State(state): State<AppState>,
	_actor: Actor,
	Path(id): Path<String>,
) -> Result<Json<Product>, APIError> {
	Ok(Json(state.engine.get_product(&id).await?))
}

/// Handles PATCH /api/products/{id}/price. Existing order lines keep the
/// price they were placed at.
pub async fn update_price(
	State(state): State<AppState>,
	Actor(ctx): Actor,
	Path(id): Path<String>,
	Json(update): Json<ProductPriceUpdate>,
) -> Result<Json<Product>, APIError> {
	Ok(Json(
		state
			.engine
			.update_product_price(&ctx, &id, update.unit_price)
			.await?,
	))
}

pub async fn deactivate_product(
	State(state): State<AppState>,
	Actor(ctx): Actor,
	Path(id): Path<String>,
) -> Result<Json<Product>, APIError> {
	Ok(Json(state.engine.deactivate_product(&ctx, &id).await?))
}

// Inventory

pub async fn adjust_inventory(
	State(state): State<AppState>,
	Actor(ctx): Actor,
	Json(adjustment): Json<InventoryAdjustment>,
) -> Result<Json<InventoryRecord>, APIError> {
	Ok(Json(state.engine.adjust_inventory(&ctx, adjustment).await?))
}

pub async fn inventory(
	State(state): State<AppState>,
	_actor: Actor,
	Path(warehouse_id): Path<String>,
) -> Result<Json<Vec<InventoryRecord>>, APIError> {
	Ok(Json(state.engine.get_inventory(&warehouse_id).await?))
}

#[cfg(test)]
pub(crate) mod tests {
	use crate::server::tests::{call, test_app};
	use axum::{http::StatusCode, Router};
	use depot_core::handlers::admin::BOOTSTRAP_ADMIN_ID;
	use serde_json::{json, Value};

	const ADMIN: Option<&str> = Some(BOOTSTRAP_ADMIN_ID);

	/// Ids of the records every HTTP test starts from.
	pub(crate) struct Seed {
		pub store: String,
		pub warehouse: String,
		pub product: String,
		pub dispatcher: String,
	}

	async fn created(app: &Router, uri: &str, body: Value) -> String {
		let (status, value) = call(app, "POST", uri, ADMIN, Some(body)).await;
		assert_eq!(status, StatusCode::CREATED, "{}: {}", uri, value);
		value["id"].as_str().unwrap().to_string()
	}

	pub(crate) async fn seed_catalog(app: &Router) -> Seed {
		Seed {
			store: created(
				app,
				"/api/stores",
				json!({"name": "Tindahan ni Lito", "city": "Pasig", "barangay": "Kapitolyo"}),
			)
			.await,
			warehouse: created(app, "/api/warehouses", json!({"name": "Pasig DC", "city": "Pasig"}))
				.await,
			product: created(
				app,
				"/api/products",
				json!({"sku": "rice-5kg", "name": "Rice 5kg", "unit_price": "10.00"}),
			)
			.await,
			dispatcher: created(
				app,
				"/api/users",
				json!({"name": "Ben", "email": "ben@depot.test", "role": "dispatcher"}),
			)
			.await,
		}
	}

	/// Places, confirms and packs a one-line order; returns its id.
	pub(crate) async fn packed_order(app: &Router, seed: &Seed) -> String {
		let id = created(
			app,
			"/api/orders",
			json!({
				"store_id": seed.store,
				"warehouse_id": seed.warehouse,
				"items": [{"product_id": seed.product, "quantity": 1}]
			}),
		)
		.await;
		for action in ["confirm", "pack"] {
			let uri = format!("/api/orders/{}/{}", id, action);
			let (status, _) = call(app, "POST", &uri, ADMIN, None).await;
			assert_eq!(status, StatusCode::OK);
		}
		id
	}

	#[tokio::test]
	async fn test_catalog_endpoints() {
		let app = test_app().await;
		let seed = seed_catalog(&app).await;

		let (_, products) = call(&app, "GET", "/api/products", ADMIN, None).await;
		assert_eq!(products[0]["sku"], "RICE-5KG");

		let (status, _) = call(
			&app,
			"POST",
			"/api/products",
			ADMIN,
			Some(json!({"sku": "RICE-5KG", "name": "Duplicate", "unit_price": "1.00"})),
		)
		.await;
		assert_eq!(status, StatusCode::CONFLICT);

		let (status, product) = call(
			&app,
			"PATCH",
			&format!("/api/products/{}/price", seed.product),
			ADMIN,
			Some(json!({"unit_price": "12.50"})),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(product["unit_price"], "12.50");

		let (_, dispatchers) = call(&app, "GET", "/api/users?role=dispatcher", ADMIN, None).await;
		assert_eq!(dispatchers.as_array().unwrap().len(), 1);
		assert_eq!(dispatchers[0]["id"], seed.dispatcher.as_str());
	}

	#[tokio::test]
	async fn test_inventory_adjustments() {
		let app = test_app().await;
		let seed = seed_catalog(&app).await;
		let adjust = |delta: i64| {
			json!({
				"warehouse_id": seed.warehouse,
				"product_id": seed.product,
				"delta": delta,
				"reason": "cycle count"
			})
		};

		let (status, record) =
			call(&app, "POST", "/api/inventory/adjust", ADMIN, Some(adjust(8))).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(record["on_hand"], 8);

		let (status, _) = call(&app, "POST", "/api/inventory/adjust", ADMIN, Some(adjust(-9))).await;
		assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

		let uri = format!("/api/inventory/{}", seed.warehouse);
		let (_, records) = call(&app, "GET", &uri, ADMIN, None).await;
		assert_eq!(records.as_array().unwrap().len(), 1);
		assert_eq!(records[0]["on_hand"], 8);
	}

	#[tokio::test]
	async fn test_role_gate_over_http() {
		let app = test_app().await;
		let seed = seed_catalog(&app).await;

		let (status, body) = call(
			&app,
			"POST",
			"/api/products",
			Some(seed.dispatcher.as_str()),
			Some(json!({"sku": "OIL-1L", "name": "Oil", "unit_price": "3.00"})),
		)
		.await;
		assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
		assert_eq!(body["error"], "VALIDATION_ERROR");
	}
}
