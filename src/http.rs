//! Transport primitives for platform API calls.
//!
//! The module exposes [`ApiHttpClient`], the crate's only dependency on an HTTP
//! stack. The platform API is plain `GET`-plus-JSON, so the contract is a single
//! method returning the raw response body; decoding happens at the fetcher layer
//! where the response envelope is known.

// std
use std::ops::Deref;
// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future type returned by transport calls.
pub type HttpFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing platform API calls.
///
/// Callers provide an implementation (typically behind `Arc<T>` where
/// `T: ApiHttpClient`) and the client issues every upstream request through it.
/// Implementations must be `Send + Sync + 'static` so they can be shared across
/// client instances without additional wrappers, and the returned futures must
/// be `Send` so caller tasks can hop executors. Timeouts, proxies, and TLS
/// policy all belong to the implementation; the core imposes none of its own.
pub trait ApiHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Issues a `GET` request against `url` and resolves with the raw response body.
	///
	/// Implementations must not interpret the body; a non-2xx status with a JSON
	/// payload still resolves successfully so the fetcher layer can surface the
	/// platform's own error envelope.
	fn get(&self, url: Url) -> HttpFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ApiHttpClient for ReqwestHttpClient {
	fn get(&self, url: Url) -> HttpFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let response = client.get(url).send().await.map_err(TransportError::from)?;
			let bytes = response.bytes().await.map_err(TransportError::from)?;

			Ok(bytes.to_vec())
		})
	}
}
