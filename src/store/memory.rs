//! Thread-safe in-memory [`CredentialStore`] implementation for single-process deployments.

// self
use crate::{
	_prelude::*,
	credential::Credential,
	store::{CredentialStore, StoreError, StoreFuture},
};

type StoreMap = Arc<RwLock<HashMap<String, Credential>>>;

/// Thread-safe storage backend that keeps credentials in-process.
///
/// This is the default adapter when the caller injects nothing. Each instance
/// owns its own map, so two clients built with default stores never collide on
/// the default keys. There is no eviction; entries are overwritten on refresh
/// and simply ignored once expired.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	fn get_now(map: StoreMap, key: String) -> Option<Credential> {
		map.read().get(&key).cloned()
	}

	fn set_now(map: StoreMap, key: String, credential: Credential) -> Result<(), StoreError> {
		map.write().insert(key, credential);

		Ok(())
	}
}
impl CredentialStore for MemoryStore {
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Credential>> {
		let map = self.0.clone();
		let key = key.to_owned();

		Box::pin(async move { Ok(Self::get_now(map, key)) })
	}

	fn set<'a>(&'a self, key: &'a str, credential: Credential) -> StoreFuture<'a, ()> {
		let map = self.0.clone();
		let key = key.to_owned();

		Box::pin(async move { Self::set_now(map, key, credential) })
	}
}
