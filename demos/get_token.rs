//! Demonstrates acquiring, caching, and attaching an IAM access token against a mock identity
//! endpoint with the default reqwest transport.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use iam_token_manager::{
	config::TokenOptions,
	ext::BearerSigner,
	http::ReqwestHttpClient,
	iam::{
		ReqwestTransportErrorMapper,
		oauth2::{HttpRequest, http::Request},
	},
	manager::TokenManager,
	reqwest::Client,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/identity/token")
				.form_urlencoded_tuple("grant_type", "urn:ibm:params:oauth:grant-type:apikey");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"refresh_token\":\"demo-refresh\",\"token_type\":\"Bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let options = TokenOptions::builder()
		.api_key("demo-api-key")
		.iam_url(server.url("/identity/token"))
		.build()?;
	let http_client = ReqwestHttpClient::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	);
	let manager = <TokenManager<ReqwestHttpClient, ReqwestTransportErrorMapper>>::with_http_client(
		options,
		http_client,
		ReqwestTransportErrorMapper,
	);
	let first = manager.get_token().await?;
	let second = manager.get_token().await?;

	println!("First token: {}", first.expose());
	println!("Second token (cached): {}", second.expose());

	let request: HttpRequest =
		Request::get("https://gateway.example.test/discovery/api/v1/environments")
			.body(Vec::new())?;
	let signed = manager.sign(&BearerSigner, request).await?;

	println!("Signed header: {:?}", signed.headers().get("authorization"));
	println!("Metrics: {:?}", manager.metrics());

	token_mock.assert_calls_async(1).await;

	Ok(())
}
