//! Deterministic JSAPI signature construction.
//!
//! The platform verifies signatures byte-for-byte, so the canonical string is
//! assembled exactly as the JS bridge expects: keys in ASCII lexicographic
//! order, values verbatim with no percent-encoding, fragment stripped from the
//! page URL and nothing else normalized.

// std
use std::fmt::Write;
// crates.io
use rand::Rng;
use sha1::{Digest, Sha1};
// self
use crate::_prelude::*;

/// Signed configuration bundle a front end embeds to authorize bridge calls.
///
/// Serializes with the exact field names (`appId`, `timestamp`, `nonceStr`,
/// `signature`) the platform's JS bridge consumes. Immutable once produced and
/// never cached; every page load gets a fresh bundle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedConfig {
	/// Application identifier echoed back to the caller.
	pub app_id: String,
	/// Signature timestamp in integer seconds since the epoch.
	pub timestamp: i64,
	/// Single-use nonce bound into the signature.
	pub nonce_str: String,
	/// Lowercase hexadecimal SHA-1 signature.
	pub signature: String,
}

/// Generates a fresh nonce: 16 random bytes rendered as 32 lowercase hex characters.
pub fn nonce() -> String {
	let bytes: [u8; 16] = rand::rng().random();

	hex_lower(&bytes)
}

/// Removes everything from the first `#` onward; the rest of the URL is untouched.
pub fn strip_fragment(url: &str) -> &str {
	match url.find('#') {
		Some(index) => &url[..index],
		None => url,
	}
}

/// Joins the signing parameters into the canonical string fed to SHA-1.
///
/// `url` must already have its fragment stripped. Values are taken verbatim;
/// percent-encoding any of them would break platform-side verification.
pub fn canonical_string(ticket: &str, nonce: &str, timestamp: i64, url: &str) -> String {
	format!("jsapi_ticket={ticket}&noncestr={nonce}&timestamp={timestamp}&url={url}")
}

/// Computes the signature for an explicit nonce and timestamp.
///
/// Deterministic given fixed inputs, which is what allows verifiers (and
/// tests) to reproduce signatures byte-exactly. [`jsapi_config`] layers fresh
/// nonce/timestamp generation on top of this.
pub fn sign_with(ticket: &str, nonce: &str, timestamp: i64, url: &str) -> String {
	let canonical = canonical_string(ticket, nonce, timestamp, strip_fragment(url));

	hex_lower(&Sha1::digest(canonical.as_bytes()))
}

/// Produces a signed configuration for `url` using a fresh nonce and the current clock.
///
/// The access token is accepted for call-shape parity with the credential
/// pipeline; the platform's scheme binds only the ticket into the signature.
pub fn jsapi_config(app_id: &str, _access_token: &str, ticket: &str, url: &str) -> SignedConfig {
	let timestamp = OffsetDateTime::now_utc().unix_timestamp();
	let nonce_str = nonce();
	let signature = sign_with(ticket, &nonce_str, timestamp, url);

	SignedConfig { app_id: app_id.to_owned(), timestamp, nonce_str, signature }
}

fn hex_lower(bytes: &[u8]) -> String {
	let mut buf = String::with_capacity(bytes.len() * 2);

	for byte in bytes {
		let _ = write!(buf, "{byte:02x}");
	}

	buf
}
