//! Main entry point for the depot service.
//!
//! Loads the configuration, builds the engine from the registered storage
//! backends and notification channels, and serves the HTTP API alongside the
//! engine's event dispatcher until interrupted.

use clap::Parser;
use depot_config::Config;
use std::path::PathBuf;
use std::sync::Arc;

mod apis;
mod factory_registry;
mod server;

/// Command-line arguments for the depot service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, env = "DEPOT_CONFIG", default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started depot");

	let config_path = args
		.config
		.to_str()
		.ok_or_else(|| format!("Config path is not valid UTF-8: {}", args.config.display()))?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	let engine = Arc::new(factory_registry::build_engine_from_config(config.clone())?);
	engine.initialize().await?;

	let api_config = config.api_or_default();
	if api_config.enabled {
		let engine_task = engine.run();
		let api_task = server::start_server(api_config, Arc::clone(&engine));

		tokio::select! {
			result = engine_task => {
				tracing::info!("Engine finished");
				result?;
			}
			result = api_task => {
				tracing::info!("API server finished");
				result?;
			}
		}
	} else {
		tracing::info!("API disabled, running engine only");
		engine.run().await?;
	}

	engine.shutdown().await?;
	tracing::info!("Stopped depot");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_args_defaults() {
		let args = Args::try_parse_from(["depot"]).unwrap();
		assert_eq!(args.config, PathBuf::from("config.toml"));
		assert_eq!(args.log_level, "info");
	}

	#[test]
	fn test_args_custom_values() {
		let args = Args::try_parse_from(["depot", "-c", "prod.toml", "--log-level", "debug"]).unwrap();
		assert_eq!(args.config, PathBuf::from("prod.toml"));
		assert_eq!(args.log_level, "debug");
	}

	#[tokio::test]
	async fn test_config_file_builds_engine() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.toml");
		std::fs::write(
			&path,
			r#"
[service]
id = "depot-main-test"

[storage]
primary = "memory"

[storage.implementations.memory]

[api]
enabled = false
"#,
		)
		.unwrap();

		let config = Config::from_file(path.to_str().unwrap()).await.unwrap();
		assert!(!config.api_or_default().enabled);
		let engine = factory_registry::build_engine_from_config(config).unwrap();
		engine.initialize().await.unwrap();
		assert_eq!(engine.config().service.id, "depot-main-test");
	}
}
