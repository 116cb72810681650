//! Upstream endpoint definitions, response decoding, and the stateless credential fetchers.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	credential::{Credential, CredentialSecret},
	error::ResponseError,
	http::ApiHttpClient,
};

const TOKEN_ENDPOINT: &str = "https://api.weixin.qq.com/cgi-bin/token";
const TICKET_ENDPOINT: &str = "https://api.weixin.qq.com/cgi-bin/ticket/getticket";

/// Endpoint pair used for the two credential exchanges.
///
/// Defaults to the production platform URLs; tests and self-hosted gateways
/// substitute their own pair via [`Endpoints::for_base`] or field construction.
#[derive(Clone, Debug)]
pub struct Endpoints {
	/// Access-token exchange endpoint.
	pub token: Url,
	/// JSAPI-ticket exchange endpoint.
	pub ticket: Url,
}
impl Endpoints {
	/// Builds both endpoints by joining the platform paths onto `base`.
	pub fn for_base(base: &Url) -> Result<Self, url::ParseError> {
		Ok(Self {
			token: base.join("cgi-bin/token")?,
			ticket: base.join("cgi-bin/ticket/getticket")?,
		})
	}

	fn token_request(&self, app_id: &str, secret: &str) -> Url {
		let mut url = self.token.clone();

		url.query_pairs_mut()
			.append_pair("grant_type", "client_credential")
			.append_pair("appid", app_id)
			.append_pair("secret", secret);

		url
	}

	fn ticket_request(&self, access_token: &str) -> Url {
		let mut url = self.ticket.clone();

		url.query_pairs_mut().append_pair("access_token", access_token).append_pair("type", "jsapi");

		url
	}
}
impl Default for Endpoints {
	fn default() -> Self {
		Self {
			token: Url::parse(TOKEN_ENDPOINT).expect("Builtin token endpoint URL must parse."),
			ticket: Url::parse(TICKET_ENDPOINT).expect("Builtin ticket endpoint URL must parse."),
		}
	}
}

/// Value/lifetime pair returned by a credential exchange before expiry stamping.
#[derive(Clone, Debug)]
pub struct IssuedCredential {
	/// Raw credential material.
	pub value: CredentialSecret,
	/// Server-reported relative lifetime.
	pub expires_in: Duration,
}
impl IssuedCredential {
	/// Stamps the relative lifetime into an absolute-expiry credential issued at `issued_at`.
	pub fn stamp(self, issued_at: OffsetDateTime) -> Credential {
		Credential { value: self.value, expires_at: issued_at + self.expires_in }
	}
}

/// Response envelope shared by both exchanges.
///
/// Success and failure bodies carry disjoint required fields, so the grant
/// variant is tried first; a body that satisfies neither is a decode error.
/// Ticket grants arrive with `errcode: 0` alongside the payload, which still
/// matches the grant variant because unknown fields are ignored.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiEnvelope<T> {
	Grant(T),
	Denial(ApiDenial),
}

#[derive(Debug, Deserialize)]
struct ApiDenial {
	errcode: i64,
	errmsg: String,
}

#[derive(Debug, Deserialize)]
struct TokenGrant {
	access_token: String,
	expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct TicketGrant {
	ticket: String,
	expires_in: i64,
}

fn decode<T>(bytes: &[u8]) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(bytes);
	let envelope: ApiEnvelope<T> = serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| ResponseError::Json { source })?;

	match envelope {
		ApiEnvelope::Grant(grant) => Ok(grant),
		ApiEnvelope::Denial(denial) if denial.errcode != 0 =>
			Err(Error::Upstream { code: denial.errcode, message: denial.errmsg }),
		ApiEnvelope::Denial(_) => Err(ResponseError::MissingFields.into()),
	}
}

/// Exchanges application identity for a fresh access token.
///
/// Stateless; every call hits the upstream endpoint. Callers wanting caching
/// should go through [`WechatClient::access_token`](crate::client::WechatClient::access_token).
pub async fn fetch_access_token<C>(
	http_client: &C,
	endpoints: &Endpoints,
	app_id: &str,
	secret: &str,
) -> Result<IssuedCredential>
where
	C: ?Sized + ApiHttpClient,
{
	let bytes = http_client.get(endpoints.token_request(app_id, secret)).await?;
	let grant: TokenGrant = decode(&bytes)?;

	Ok(IssuedCredential {
		value: CredentialSecret::new(grant.access_token),
		expires_in: Duration::seconds(grant.expires_in),
	})
}

/// Exchanges a valid access token for a fresh JSAPI ticket.
///
/// Stateless; every call hits the upstream endpoint. No retries are performed,
/// so an expired or revoked token surfaces as the platform's own denial.
pub async fn fetch_jsapi_ticket<C>(
	http_client: &C,
	endpoints: &Endpoints,
	access_token: &str,
) -> Result<IssuedCredential>
where
	C: ?Sized + ApiHttpClient,
{
	let bytes = http_client.get(endpoints.ticket_request(access_token)).await?;
	let grant: TicketGrant = decode(&bytes)?;

	Ok(IssuedCredential {
		value: CredentialSecret::new(grant.ticket),
		expires_in: Duration::seconds(grant.expires_in),
	})
}
