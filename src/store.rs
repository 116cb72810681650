//! Storage contracts and built-in store implementations for cached credentials.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, credential::Credential};

/// Boxed future type returned by store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract for cached credentials.
///
/// Keys are caller-supplied strings; the client uses distinct keys for the
/// access token and the JSAPI ticket so both coexist under one backend. Reads
/// and writes may suspend, which keeps durable adapters (databases, caches)
/// implementable without blocking the caller's executor.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Fetches the credential stored under `key`, if present.
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Credential>>;

	/// Persists or replaces the credential stored under `key`.
	fn set<'a>(&'a self, key: &'a str, credential: Credential) -> StoreFuture<'a, ()>;
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures (e.g., serde) surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
