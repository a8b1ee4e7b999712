//! Startup and shutdown of the depot engine.

use super::{DepotEngine, EngineError};
use chrono::Utc;

impl DepotEngine {
	/// Prepares storage before serving requests. Creates the bootstrap
	/// administrator when no user exists yet.
	pub async fn initialize(&self) -> Result<(), EngineError> {
		tracing::info!(service_id = %self.config.service.id, "Initializing depot engine");

		let _guard = self.write_lock.lock().await;
		self.admin
			.ensure_admin(Utc::now())
			.await
			.map_err(|e| EngineError::Service(format!("Failed to bootstrap users: {}", e)))?;
		Ok(())
	}

	pub async fn shutdown(&self) -> Result<(), EngineError> {
		tracing::info!("Shutting down depot engine");
		if let Err(e) = self.storage.cleanup_expired().await {
			tracing::warn!("Final storage cleanup failed: {}", e);
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use crate::handlers::admin::BOOTSTRAP_ADMIN_ID;
	use crate::test_support::Fixture;
	use depot_types::Role;

	#[tokio::test]
	async fn test_initialize_is_idempotent() {
		let fx = Fixture::new().await;
		let before = fx.engine.list_users(None).await.unwrap().len();

		fx.engine.initialize().await.unwrap();
		let users = fx.engine.list_users(None).await.unwrap();
		assert_eq!(users.len(), before);
		let admin = fx.engine.get_user(BOOTSTRAP_ADMIN_ID).await.unwrap();
		assert_eq!(admin.role, Role::Admin);
	}
}
