//! File-based storage backend.
//!
//! Each key is one file named after the hex encoding of the key, so keys can
//! be listed back from the directory without a separate index. Every file
//! starts with a fixed header carrying the expiry time.

use crate::{BatchOp, StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use depot_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, StorageKey, ValidationError,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::fs;

const DATA_EXTENSION: &str = "bin";
const DEFAULT_STORAGE_PATH: &str = "./data/storage";

fn unix_now() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or_default()
}

fn backend_err(e: impl std::fmt::Display) -> StorageError {
	StorageError::Backend(e.to_string())
}

/// 32-byte file header.
///
/// Layout: magic "DPOT" (4), version u16 LE (2), expiry u64 LE in Unix
/// seconds with 0 meaning never (8), zero padding (18).
#[derive(Debug, Clone, Copy, PartialEq)]
struct FileHeader {
	expires_at: u64,
}

impl FileHeader {
	const MAGIC: &'static [u8; 4] = b"DPOT";
	const VERSION: u16 = 1;
	const SIZE: usize = 32;

	fn new(ttl: Duration) -> Self {
		let expires_at = if ttl.is_zero() {
			0
		} else {
			unix_now().saturating_add(ttl.as_secs().max(1))
		};
		Self { expires_at }
	}

	fn encode(&self, body: &[u8]) -> Vec<u8> {
		let mut bytes = Vec::with_capacity(Self::SIZE + body.len());
		bytes.extend_from_slice(Self::MAGIC);
		bytes.extend_from_slice(&Self::VERSION.to_le_bytes());
		bytes.extend_from_slice(&self.expires_at.to_le_bytes());
		bytes.resize(Self::SIZE, 0);
		bytes.extend_from_slice(body);
		bytes
	}

	/// Splits a stored file into its header and body.
	fn decode(bytes: &[u8]) -> Result<(Self, &[u8]), StorageError> {
		if bytes.len() < Self::SIZE || &bytes[0..4] != Self::MAGIC {
			return Err(StorageError::Backend("Missing or corrupt file header".into()));
		}
		let version = u16::from_le_bytes([bytes[4], bytes[5]]);
		if version > Self::VERSION {
			return Err(StorageError::Backend(format!(
				"Unsupported file version: {}",
				version
			)));
		}
		let mut expiry = [0u8; 8];
		expiry.copy_from_slice(&bytes[6..14]);
		Ok((
			Self {
				expires_at: u64::from_le_bytes(expiry),
			},
			&bytes[Self::SIZE..],
		))
	}

	fn is_expired(&self) -> bool {
		self.expires_at != 0 && unix_now() >= self.expires_at
	}
}

/// Default time-to-live per namespace, read from `ttl_<namespace>` keys.
#[derive(Debug, Clone, Default)]
pub struct TtlConfig {
	ttls: HashMap<StorageKey, Duration>,
}

impl TtlConfig {
	fn from_config(config: &toml::Value) -> Self {
		let ttls = StorageKey::all()
			.filter_map(|key| {
				config
					.get(format!("ttl_{}", key.as_str()))
					.and_then(|v| v.as_integer())
					.map(|secs| (key, Duration::from_secs(secs.max(0) as u64)))
			})
			.collect();
		Self { ttls }
	}

	fn ttl_for(&self, key: &str) -> Duration {
		key.split(':')
			.next()
			.and_then(|ns| ns.parse::<StorageKey>().ok())
			.and_then(|ns| self.ttls.get(&ns).copied())
			.unwrap_or(Duration::ZERO)
	}
}

/// Directory-backed storage.
pub struct FileStorage {
	base_path: PathBuf,
	ttl_config: TtlConfig,
}

impl FileStorage {
	pub fn new(base_path: PathBuf, ttl_config: TtlConfig) -> Self {
		Self {
			base_path,
			ttl_config,
		}
	}

	fn file_path(&self, key: &str) -> PathBuf {
		self.base_path
			.join(format!("{}.{}", hex::encode(key), DATA_EXTENSION))
	}

	/// Recovers the key from a data file path, ignoring foreign files.
	fn key_from_path(path: &Path) -> Option<String> {
		if path.extension()? != DATA_EXTENSION {
			return None;
		}
		let stem = path.file_stem()?.to_str()?;
		String::from_utf8(hex::decode(stem).ok()?).ok()
	}

	async fn ensure_dir(&self) -> Result<(), StorageError> {
		fs::create_dir_all(&self.base_path)
			.await
			.map_err(backend_err)
	}

	/// Reads a file, returning `None` when it is missing or expired.
	async fn read_live(&self, path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
		let data = match fs::read(path).await {
			Ok(data) => data,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(backend_err(e)),
		};
		let (header, body) = FileHeader::decode(&data)?;
		if header.is_expired() {
			return Ok(None);
		}
		Ok(Some(body.to_vec()))
	}

	async fn data_files(&self) -> Result<Vec<(PathBuf, String)>, StorageError> {
		let mut entries = match fs::read_dir(&self.base_path).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(backend_err(e)),
		};
		let mut files = Vec::new();
		while let Some(entry) = entries.next_entry().await.map_err(backend_err)? {
			let path = entry.path();
			if let Some(key) = Self::key_from_path(&path) {
				files.push((path, key));
			}
		}
		Ok(files)
	}

	async fn remove_if_present(path: &Path) -> Result<(), StorageError> {
		match fs::remove_file(path).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(backend_err(e)),
		}
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		self.read_live(&self.file_path(key))
			.await?
			.ok_or(StorageError::NotFound)
	}

	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		self.ensure_dir().await?;
		let path = self.file_path(key);
		let ttl = ttl.unwrap_or_else(|| self.ttl_config.ttl_for(key));
		let temp_path = path.with_extension("tmp");

		fs::write(&temp_path, FileHeader::new(ttl).encode(&value))
			.await
			.map_err(backend_err)?;
		fs::rename(&temp_path, &path).await.map_err(backend_err)
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		Self::remove_if_present(&self.file_path(key)).await
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		Ok(self.read_live(&self.file_path(key)).await?.is_some())
	}

	async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
		let mut keys = Vec::new();
		for (path, key) in self.data_files().await? {
			if key.starts_with(prefix) && self.read_live(&path).await?.is_some() {
				keys.push(key);
			}
		}
		keys.sort();
		Ok(keys)
	}

	/// Stages every write to a temp file first; nothing is renamed into place
	/// until all of them were written. A failed stage removes the temp files
	/// and leaves the existing data untouched.
	async fn apply_batch(&self, ops: Vec<BatchOp>) -> Result<(), StorageError> {
		self.ensure_dir().await?;
		let batch_id = uuid::Uuid::new_v4().simple().to_string();

		let mut staged: Vec<(PathBuf, PathBuf)> = Vec::new();
		let mut deletes: Vec<PathBuf> = Vec::new();
		let mut stage_error = None;

		for op in ops {
			match op {
				BatchOp::Set { key, value } => {
					let path = self.file_path(&key);
					let temp = path.with_extension(format!("{}.tmp", batch_id));
					let ttl = self.ttl_config.ttl_for(&key);
					if let Err(e) = fs::write(&temp, FileHeader::new(ttl).encode(&value)).await {
						stage_error = Some(backend_err(e));
						break;
					}
					staged.push((temp, path));
				},
				BatchOp::Delete { key } => deletes.push(self.file_path(&key)),
			}
		}

		if let Some(err) = stage_error {
			for (temp, _) in &staged {
				let _ = fs::remove_file(temp).await;
			}
			tracing::warn!(error = %err, "Aborted storage batch while staging");
			return Err(err);
		}

		for (temp, path) in staged {
			fs::rename(&temp, &path).await.map_err(backend_err)?;
		}
		for path in deletes {
			Self::remove_if_present(&path).await?;
		}
		Ok(())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}

	async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		let mut removed = 0;
		for (path, _) in self.data_files().await? {
			let data = match fs::read(&path).await {
				Ok(data) => data,
				Err(e) => {
					tracing::debug!("Skipping file {:?}: could not be read: {}", path, e);
					continue;
				},
			};
			match FileHeader::decode(&data) {
				Ok((header, _)) if header.is_expired() => {
					if let Err(e) = fs::remove_file(&path).await {
						tracing::warn!("Failed to remove expired file {:?}: {}", path, e);
					} else {
						removed += 1;
					}
				},
				Ok(_) => {},
				Err(e) => tracing::debug!("Skipping file {:?}: {}", path, e),
			}
		}
		Ok(removed)
	}
}

/// Accepts `storage_path` and one optional `ttl_<namespace>` per namespace.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let mut optional = vec![Field::new("storage_path", FieldType::String).with_validator(
			|v| match v.as_str() {
				Some(path) if !path.trim().is_empty() => Ok(()),
				_ => Err("storage_path cannot be empty".to_string()),
			},
		)];
		optional.extend(StorageKey::all().map(|key| {
			Field::new(
				format!("ttl_{}", key.as_str()),
				FieldType::Integer {
					min: Some(0),
					max: None,
				},
			)
		}));

		Schema::new(vec![], optional).validate(config)
	}
}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: base directory (default: "./data/storage")
/// - `ttl_<namespace>`: default TTL in seconds for that namespace (default: 0, never)
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_STORAGE_PATH);

	Ok(Box::new(FileStorage::new(
		PathBuf::from(storage_path),
		TtlConfig::from_config(config),
	)))
}

/// Registry for the file storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}
