//! Crate-level error types shared across the fetchers, the client, and the stores.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Upstream body could not be decoded into a credential grant or a denial.
	#[error(transparent)]
	Response(#[from] ResponseError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// The platform answered with a non-zero `errcode`.
	#[error("WechatAPI: {message} (errcode {code}).")]
	Upstream {
		/// Numeric error code reported by the platform.
		code: i64,
		/// Error text reported by the platform, embedded verbatim.
		message: String,
	},
}

/// Decode failures raised while interpreting an upstream response body.
#[derive(Debug, ThisError)]
pub enum ResponseError {
	/// The endpoint returned malformed JSON.
	#[error("Upstream endpoint returned malformed JSON.")]
	Json {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// The body parsed as JSON but carried neither credential fields nor an error code.
	#[error("Upstream endpoint returned a body without credential fields or an error code.")]
	MissingFields,
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the platform endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the platform endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
