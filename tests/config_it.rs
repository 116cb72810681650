// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use time::OffsetDateTime;
// self
use wechat_jsapi::{
	api::Endpoints,
	client::{ReqwestWechatClient, WechatClient},
	error::Error,
	sign,
	store::{CredentialStore, MemoryStore},
	url::Url,
};

const APP_ID: &str = "wx-config";
const SECRET: &str = "secret-config";
const TICKET: &str = "config-ticket";
const PAGE_URL: &str = "https://example.com/page?from=timeline#anchor";

fn mock_endpoints(server: &MockServer) -> Endpoints {
	let base = Url::parse(&server.base_url()).expect("Mock server base URL should parse.");

	Endpoints::for_base(&base).expect("Mock endpoints should build from the server base.")
}

fn build_client(server: &MockServer) -> ReqwestWechatClient {
	let store: Arc<dyn CredentialStore> = Arc::new(MemoryStore::default());

	WechatClient::with_store(store, APP_ID, SECRET).with_endpoints(mock_endpoints(server))
}

#[tokio::test]
async fn config_is_signed_over_the_fragment_stripped_url() {
	let server = MockServer::start_async().await;
	let client = build_client(&server);
	let token_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/cgi-bin/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"config-token","expires_in":7200}"#);
		})
		.await;
	let ticket_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/cgi-bin/ticket/getticket");
			then.status(200).header("content-type", "application/json").body(format!(
				r#"{{"errcode":0,"errmsg":"ok","ticket":"{TICKET}","expires_in":7200}}"#
			));
		})
		.await;
	let config = client.jsapi_config(PAGE_URL).await.expect("Config assembly should succeed.");

	token_mock.assert_calls_async(1).await;
	ticket_mock.assert_calls_async(1).await;

	assert_eq!(config.app_id, APP_ID);
	assert_eq!(config.nonce_str.len(), 32);
	assert!(config.nonce_str.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

	let now = OffsetDateTime::now_utc().unix_timestamp();

	assert!((now - config.timestamp).abs() <= 5);

	// The returned signature must be reproducible from its parts, with the
	// fragment stripped and the rest of the URL untouched.
	assert_eq!(
		config.signature,
		sign::sign_with(
			TICKET,
			&config.nonce_str,
			config.timestamp,
			"https://example.com/page?from=timeline",
		),
	);
}

#[tokio::test]
async fn repeated_configs_reuse_credentials_but_not_nonces() {
	let server = MockServer::start_async().await;
	let client = build_client(&server);
	let token_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/cgi-bin/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"config-token","expires_in":7200}"#);
		})
		.await;
	let ticket_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/cgi-bin/ticket/getticket");
			then.status(200).header("content-type", "application/json").body(format!(
				r#"{{"errcode":0,"errmsg":"ok","ticket":"{TICKET}","expires_in":7200}}"#
			));
		})
		.await;
	let first = client.jsapi_config(PAGE_URL).await.expect("First config should succeed.");
	let second = client.jsapi_config(PAGE_URL).await.expect("Second config should succeed.");

	// Both credentials were fetched once and served from cache afterwards.
	token_mock.assert_calls_async(1).await;
	ticket_mock.assert_calls_async(1).await;

	assert_ne!(first.nonce_str, second.nonce_str);
}

#[tokio::test]
async fn ticket_denial_fails_the_whole_config() {
	let server = MockServer::start_async().await;
	let client = build_client(&server);
	let _token_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/cgi-bin/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"config-token","expires_in":7200}"#);
		})
		.await;
	let _ticket_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/cgi-bin/ticket/getticket");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"errcode":42001,"errmsg":"access_token expired"}"#);
		})
		.await;
	let err =
		client.jsapi_config(PAGE_URL).await.expect_err("Ticket denial should fail the config.");

	assert!(matches!(err, Error::Upstream { code: 42001, .. }));
	assert!(err.to_string().contains("access_token expired"));
}
