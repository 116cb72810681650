//! Credential value types shared by the fetchers, the stores, and the client.

// self
use crate::_prelude::*;

/// Redacted secret wrapper keeping credential material out of logs.
///
/// Wraps access tokens, JSAPI tickets, and the application secret alike.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSecret(String);
impl CredentialSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for CredentialSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for CredentialSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("CredentialSecret").field(&"<redacted>").finish()
	}
}
impl Display for CredentialSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Cached credential paired with its absolute expiry instant.
///
/// Represents either an access token or a JSAPI ticket; the two are
/// distinguished only by the store key they live under. Staleness is detected
/// by clock comparison, never by eviction.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
	/// Credential material; callers must avoid logging it.
	pub value: CredentialSecret,
	/// Expiry instant derived from the fetch instant plus the server-reported lifetime.
	pub expires_at: OffsetDateTime,
}
impl Credential {
	/// Builds a credential issued at `issued_at` with a server-reported relative lifetime.
	pub fn issued(value: impl Into<String>, issued_at: OffsetDateTime, expires_in: Duration) -> Self {
		Self { value: CredentialSecret::new(value), expires_at: issued_at + expires_in }
	}

	/// Returns `true` while `instant` lies strictly before the expiry instant.
	pub fn is_valid_at(&self, instant: OffsetDateTime) -> bool {
		instant < self.expires_at
	}

	/// Returns `true` once `instant` has reached the expiry instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		!self.is_valid_at(instant)
	}

	/// Remaining lifetime at `instant`; negative once expired.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		self.expires_at - instant
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("value", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
