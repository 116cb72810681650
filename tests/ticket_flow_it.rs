// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use time::{Duration, OffsetDateTime};
// self
use wechat_jsapi::{
	api::Endpoints,
	client::{ACCESS_TOKEN_KEY, JSAPI_TICKET_KEY, ReqwestWechatClient, WechatClient},
	credential::Credential,
	error::Error,
	store::{CredentialStore, MemoryStore},
	url::Url,
};

const APP_ID: &str = "wx-ticket-flow";
const SECRET: &str = "secret-ticket-flow";

fn mock_endpoints(server: &MockServer) -> Endpoints {
	let base = Url::parse(&server.base_url()).expect("Mock server base URL should parse.");

	Endpoints::for_base(&base).expect("Mock endpoints should build from the server base.")
}

fn build_client(server: &MockServer) -> (ReqwestWechatClient, Arc<MemoryStore>) {
	let store_backend = Arc::new(MemoryStore::default());
	let store: Arc<dyn CredentialStore> = store_backend.clone();
	let client =
		WechatClient::with_store(store, APP_ID, SECRET).with_endpoints(mock_endpoints(server));

	(client, store_backend)
}

#[tokio::test]
async fn ticket_refresh_obtains_a_token_before_the_ticket_exchange() {
	let server = MockServer::start_async().await;
	let (client, store) = build_client(&server);
	let token_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/cgi-bin/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"fresh-token","expires_in":7200}"#);
		})
		.await;
	let ticket_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/cgi-bin/ticket/getticket")
				.query_param("access_token", "fresh-token")
				.query_param("type", "jsapi");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"errcode":0,"errmsg":"ok","ticket":"fresh-ticket","expires_in":7200}"#);
		})
		.await;
	let ticket = client.jsapi_ticket().await.expect("Ticket refresh should succeed.");

	assert_eq!(ticket, "fresh-ticket");

	token_mock.assert_calls_async(1).await;
	ticket_mock.assert_calls_async(1).await;

	let stored_token = store
		.get(ACCESS_TOKEN_KEY)
		.await
		.expect("Token store read should succeed.")
		.expect("Token refresh should have persisted a credential.");
	let stored_ticket = store
		.get(JSAPI_TICKET_KEY)
		.await
		.expect("Ticket store read should succeed.")
		.expect("Ticket refresh should have persisted a credential.");

	assert_eq!(stored_token.value.expose(), "fresh-token");
	assert_eq!(stored_ticket.value.expose(), "fresh-ticket");
}

#[tokio::test]
async fn cached_ticket_never_touches_the_token_path() {
	let server = MockServer::start_async().await;
	let (client, store) = build_client(&server);
	let token_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/cgi-bin/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"unexpected-token","expires_in":7200}"#);
		})
		.await;

	// Even an expired token must stay untouched while the ticket is valid.
	store
		.set(
			ACCESS_TOKEN_KEY,
			Credential::issued(
				"expired-token",
				OffsetDateTime::now_utc() - Duration::hours(3),
				Duration::HOUR,
			),
		)
		.await
		.expect("Failed to seed the expired token fixture.");
	store
		.set(
			JSAPI_TICKET_KEY,
			Credential::issued("cached-ticket", OffsetDateTime::now_utc(), Duration::HOUR),
		)
		.await
		.expect("Failed to seed the ticket fixture.");

	let ticket = client.jsapi_ticket().await.expect("Cached ticket lookup should succeed.");

	assert_eq!(ticket, "cached-ticket");

	token_mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn expired_ticket_reuses_a_still_valid_token() {
	let server = MockServer::start_async().await;
	let (client, store) = build_client(&server);
	let token_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/cgi-bin/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"unexpected-token","expires_in":7200}"#);
		})
		.await;
	let ticket_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/cgi-bin/ticket/getticket")
				.query_param("access_token", "long-lived-token")
				.query_param("type", "jsapi");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"errcode":0,"errmsg":"ok","ticket":"renewed-ticket","expires_in":7200}"#);
		})
		.await;

	store
		.set(
			ACCESS_TOKEN_KEY,
			Credential::issued("long-lived-token", OffsetDateTime::now_utc(), Duration::HOUR),
		)
		.await
		.expect("Failed to seed the valid token fixture.");
	store
		.set(
			JSAPI_TICKET_KEY,
			Credential::issued(
				"expired-ticket",
				OffsetDateTime::now_utc() - Duration::hours(3),
				Duration::HOUR,
			),
		)
		.await
		.expect("Failed to seed the expired ticket fixture.");

	let ticket = client.jsapi_ticket().await.expect("Ticket renewal should succeed.");

	assert_eq!(ticket, "renewed-ticket");

	// The two expiries are independent clocks; the valid token is reused as-is.
	token_mock.assert_calls_async(0).await;
	ticket_mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn token_denial_surfaces_through_the_ticket_path() {
	let server = MockServer::start_async().await;
	let (client, store) = build_client(&server);
	let token_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/cgi-bin/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"errcode":40125,"errmsg":"invalid appsecret"}"#);
		})
		.await;
	let ticket_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/cgi-bin/ticket/getticket");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"errcode":0,"errmsg":"ok","ticket":"unreachable","expires_in":7200}"#);
		})
		.await;
	let err = client.jsapi_ticket().await.expect_err("Token denial should fail the ticket flow.");

	assert!(matches!(err, Error::Upstream { code: 40125, .. }));
	assert!(err.to_string().contains("invalid appsecret"));

	token_mock.assert_calls_async(1).await;
	ticket_mock.assert_calls_async(0).await;

	assert!(
		store
			.get(JSAPI_TICKET_KEY)
			.await
			.expect("Ticket store read should succeed after the failed flow.")
			.is_none()
	);
}
