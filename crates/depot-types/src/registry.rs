//! Registry trait for self-registering implementations.

/// Implemented by every pluggable backend module (storage backends,
/// notification channels) to declare the name it is configured under and the
/// factory that builds it.
pub trait ImplementationRegistry {
	/// Name used under `[<section>.implementations.<NAME>]` in the TOML config,
	/// e.g. "memory" or "webhook".
	const NAME: &'static str;

	/// Factory function type of the implementing module.
	type Factory;

	/// Returns the factory.
	fn factory() -> Self::Factory;
}
