//! Cached credential orchestration: access token → JSAPI ticket → signed configuration.

// self
use crate::{
	_prelude::*,
	api::{self, Endpoints},
	credential::CredentialSecret,
	http::ApiHttpClient,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	sign::{self, SignedConfig},
	store::CredentialStore,
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, store::MemoryStore};

/// Default store key for the cached access token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Default store key for the cached JSAPI ticket.
pub const JSAPI_TICKET_KEY: &str = "JSAPITicket";

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport stack.
pub type ReqwestWechatClient = WechatClient<ReqwestHttpClient>;

/// Coordinates the two-tier credential lifecycle for one application identity.
///
/// The client owns the HTTP transport, the credential store, and the endpoint
/// pair so the individual operations can focus on cache policy. The access
/// token and the JSAPI ticket live under distinct store keys with independent
/// expiries: a cached ticket is served without ever consulting the token,
/// while a ticket refresh always obtains a valid token first.
#[derive(Clone)]
pub struct WechatClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// HTTP client wrapper used for every outbound platform request.
	pub http_client: Arc<C>,
	/// Credential store that persists issued secrets.
	pub store: Arc<dyn CredentialStore>,
	/// Endpoint pair used for the two credential exchanges.
	pub endpoints: Endpoints,
	/// Application identifier used in every exchange.
	pub app_id: String,
	app_secret: CredentialSecret,
	token_key: String,
	ticket_key: String,
	refresh_guards: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}
impl<C> WechatClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_http_client(
		store: Arc<dyn CredentialStore>,
		app_id: impl Into<String>,
		secret: impl Into<String>,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			store,
			endpoints: Endpoints::default(),
			app_id: app_id.into(),
			app_secret: CredentialSecret::new(secret),
			token_key: ACCESS_TOKEN_KEY.into(),
			ticket_key: JSAPI_TICKET_KEY.into(),
			refresh_guards: Default::default(),
		}
	}

	/// Replaces the endpoint pair (tests, self-hosted gateways).
	pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
		self.endpoints = endpoints;

		self
	}

	/// Overrides the store key for the access token. Must differ from the ticket key.
	pub fn with_token_key(mut self, key: impl Into<String>) -> Self {
		self.token_key = key.into();

		self
	}

	/// Overrides the store key for the JSAPI ticket. Must differ from the token key.
	pub fn with_ticket_key(mut self, key: impl Into<String>) -> Self {
		self.ticket_key = key.into();

		self
	}

	/// Returns a valid access token, refreshing through the platform on miss or expiry.
	///
	/// A cached token that is still valid is returned without any upstream
	/// call. On refresh, the expiry is stamped from the instant taken before
	/// the exchange, the new credential is persisted, and its value returned.
	/// If the exchange fails nothing is written; a stale cached entry stays in
	/// place for the next attempt.
	pub async fn access_token(&self) -> Result<String> {
		const KIND: FlowKind = FlowKind::AccessToken;

		let span = FlowSpan::new(KIND, "access_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let guard = self.refresh_guard(&self.token_key);
				let _singleflight = guard.lock().await;
				let now = OffsetDateTime::now_utc();

				if let Some(current) = self
					.store
					.get(&self.token_key)
					.await?
					.filter(|credential| credential.is_valid_at(now))
				{
					return Ok(current.value.expose().to_owned());
				}

				let issued = api::fetch_access_token(
					self.http_client.as_ref(),
					&self.endpoints,
					&self.app_id,
					self.app_secret.expose(),
				)
				.await?;
				let credential = issued.stamp(now);
				let value = credential.value.expose().to_owned();

				self.store.set(&self.token_key, credential).await?;

				Ok(value)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Returns a valid JSAPI ticket, refreshing through the platform on miss or expiry.
	///
	/// A cached ticket that is still valid is returned without touching the
	/// token path at all. A refresh first obtains a valid access token via
	/// [`WechatClient::access_token`] (which may itself refresh), then
	/// exchanges it for a ticket and persists the result.
	pub async fn jsapi_ticket(&self) -> Result<String> {
		const KIND: FlowKind = FlowKind::JsapiTicket;

		let span = FlowSpan::new(KIND, "jsapi_ticket");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let guard = self.refresh_guard(&self.ticket_key);
				let _singleflight = guard.lock().await;
				let now = OffsetDateTime::now_utc();

				if let Some(current) = self
					.store
					.get(&self.ticket_key)
					.await?
					.filter(|credential| credential.is_valid_at(now))
				{
					return Ok(current.value.expose().to_owned());
				}

				let access_token = self.access_token().await?;
				let issued = api::fetch_jsapi_ticket(
					self.http_client.as_ref(),
					&self.endpoints,
					&access_token,
				)
				.await?;
				let credential = issued.stamp(now);
				let value = credential.value.expose().to_owned();

				self.store.set(&self.ticket_key, credential).await?;

				Ok(value)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Produces a signed bridge configuration authorizing `url`.
	///
	/// Obtains a valid token and ticket through the cache managers, then signs
	/// the caller's URL as supplied (only the fragment is stripped inside the
	/// signer). Any failure in the chain propagates unmodified; no partial
	/// configuration is ever returned.
	pub async fn jsapi_config(&self, url: &str) -> Result<SignedConfig> {
		const KIND: FlowKind = FlowKind::JsapiConfig;

		let span = FlowSpan::new(KIND, "jsapi_config");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let access_token = self.access_token().await?;
				let ticket = self.jsapi_ticket().await?;

				Ok(sign::jsapi_config(&self.app_id, &access_token, &ticket, url))
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Returns (and creates on demand) the refresh guard for a store key.
	fn refresh_guard(&self, key: &str) -> Arc<AsyncMutex<()>> {
		let mut guards = self.refresh_guards.lock();

		guards.entry(key.to_owned()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}
}
#[cfg(feature = "reqwest")]
impl WechatClient<ReqwestHttpClient> {
	/// Creates a client with a per-instance in-memory store and a default reqwest transport.
	///
	/// The in-memory default is suitable for single-process deployments only;
	/// production use should inject a durable adapter via
	/// [`WechatClient::with_store`].
	pub fn new(app_id: impl Into<String>, secret: impl Into<String>) -> Self {
		Self::with_store(Arc::new(MemoryStore::default()), app_id, secret)
	}

	/// Creates a client over the provided store and a default reqwest transport.
	pub fn with_store(
		store: Arc<dyn CredentialStore>,
		app_id: impl Into<String>,
		secret: impl Into<String>,
	) -> Self {
		Self::with_http_client(store, app_id, secret, ReqwestHttpClient::default())
	}
}
impl<C> Debug for WechatClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("WechatClient")
			.field("endpoints", &self.endpoints)
			.field("app_id", &self.app_id)
			.field("app_secret", &self.app_secret)
			.field("token_key", &self.token_key)
			.field("ticket_key", &self.ticket_key)
			.finish()
	}
}
