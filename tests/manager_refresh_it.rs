#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use iam_token_manager::{_preludet::*, auth::TokenSecret, obs::FlowKind};

const TOKEN_PATH: &str = "/identity/token";

fn seeded_manager(
	server: &MockServer,
	refresh: Option<&str>,
	expiration: OffsetDateTime,
) -> ReqwestTestManager {
	let manager = build_reqwest_test_manager(test_options(&server.url(TOKEN_PATH), "k1"));

	manager.store().replace(test_record("stale-access", refresh, 3600, expiration));

	manager
}

#[tokio::test]
async fn expired_access_token_is_refreshed() {
	let server = MockServer::start_async().await;
	let manager =
		seeded_manager(&server, Some("r1"), OffsetDateTime::now_utc() - Duration::minutes(1));
	let expiration = OffsetDateTime::now_utc().unix_timestamp() + 3600;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.header("authorization", "Basic Yng6Yng=")
				.form_urlencoded_tuple("grant_type", "refresh_token")
				.form_urlencoded_tuple("refresh_token", "r1");
			then.status(200).header("content-type", "application/json").body(format!(
				"{{\"access_token\":\"t2\",\"refresh_token\":\"r2\",\"token_type\":\"Bearer\",\"expires_in\":3600,\"expiration\":{expiration}}}"
			));
		})
		.await;

	assert_eq!(manager.next_flow(OffsetDateTime::now_utc()).ok(), Some(FlowKind::Refresh));

	let token = manager.get_token().await.expect("Refresh exchange should succeed.");

	mock.assert_calls_async(1).await;

	assert_eq!(token.expose(), "t2");

	let record = manager.token_record().expect("Refreshed record should be stored.");

	assert_eq!(record.access_token.expose(), "t2");
	assert_eq!(record.refresh_token.as_ref().map(TokenSecret::expose), Some("r2"));
	assert_eq!(record.expiration, expiration);
	assert_eq!(manager.metrics().refreshes(), 1);
	assert_eq!(manager.metrics().requests(), 0);
}

#[tokio::test]
async fn access_token_inside_safety_margin_is_refreshed() {
	let server = MockServer::start_async().await;
	// 10 minutes left of a 60 minute token is inside the 12 minute margin.
	let manager =
		seeded_manager(&server, Some("r1"), OffsetDateTime::now_utc() + Duration::minutes(10));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH).form_urlencoded_tuple("grant_type", "refresh_token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"t3\",\"refresh_token\":\"r3\",\"expires_in\":3600}");
		})
		.await;
	let token = manager.get_token().await.expect("Refresh exchange should succeed.");

	mock.assert_async().await;

	assert_eq!(token.expose(), "t3");
}

#[tokio::test]
async fn refresh_response_without_refresh_token_keeps_the_old_one() {
	let server = MockServer::start_async().await;
	let manager =
		seeded_manager(&server, Some("r1"), OffsetDateTime::now_utc() - Duration::minutes(1));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH).form_urlencoded_tuple("refresh_token", "r1");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"t4\",\"expires_in\":3600}");
		})
		.await;
	let token = manager.get_token().await.expect("Refresh exchange should succeed.");

	mock.assert_async().await;

	assert_eq!(token.expose(), "t4");

	let record = manager.token_record().expect("Refreshed record should be stored.");

	assert_eq!(record.refresh_token.as_ref().map(TokenSecret::expose), Some("r1"));
}

#[tokio::test]
async fn refresh_failure_does_not_fall_back_to_api_key() {
	let server = MockServer::start_async().await;
	let expiration = OffsetDateTime::now_utc() - Duration::minutes(1);
	let manager = seeded_manager(&server, Some("revoked"), expiration);
	let refresh_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH).form_urlencoded_tuple("grant_type", "refresh_token");
			then.status(400).header("content-type", "application/json").body(
				"{\"errorCode\":\"BXNIM0407E\",\"errorMessage\":\"Refresh token is not valid.\"}",
			);
		})
		.await;
	let request_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.form_urlencoded_tuple("grant_type", "urn:ibm:params:oauth:grant-type:apikey");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"unexpected\",\"expires_in\":3600}");
		})
		.await;
	let err = manager.get_token().await.expect_err("Revoked refresh token should fail.");

	refresh_mock.assert_calls_async(1).await;
	request_mock.assert_calls_async(0).await;

	match err {
		Error::Endpoint(endpoint) => {
			assert_eq!(endpoint.status, 400);
			assert_eq!(endpoint.grant, "refresh_token");
			assert!(!endpoint.is_retryable());
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	let record = manager.token_record().expect("Failed refresh must keep the stored record.");

	assert_eq!(record.access_token.expose(), "stale-access");
	assert_eq!(record.refresh_token.as_ref().map(TokenSecret::expose), Some("revoked"));
	assert_eq!(record.expiration, expiration.unix_timestamp());
}

#[tokio::test]
async fn expired_refresh_token_requests_with_api_key() {
	let server = MockServer::start_async().await;
	let manager =
		seeded_manager(&server, Some("r-old"), OffsetDateTime::now_utc() - Duration::days(8));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.form_urlencoded_tuple("grant_type", "urn:ibm:params:oauth:grant-type:apikey")
				.form_urlencoded_tuple("apikey", "k1");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"t5\",\"refresh_token\":\"r5\",\"expires_in\":3600}");
		})
		.await;

	assert_eq!(manager.next_flow(OffsetDateTime::now_utc()).ok(), Some(FlowKind::Request));

	let token = manager.get_token().await.expect("API-key request should succeed.");

	mock.assert_calls_async(1).await;

	assert_eq!(token.expose(), "t5");
	assert_eq!(manager.metrics().requests(), 1);
	assert_eq!(manager.metrics().refreshes(), 0);
}
