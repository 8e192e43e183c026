//! IBM Cloud IAM access-token lifecycle manager: exchange API keys, rotate refresh tokens, and
//! keep a bearer token warm for Watson service clients.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod ext;
pub mod http;
pub mod iam;
pub mod manager;
pub mod obs;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::TokenRecord,
		config::TokenOptions,
		http::ReqwestHttpClient,
		iam::ReqwestTransportErrorMapper,
		manager::TokenManager,
	};

	/// Manager type alias used by reqwest-backed integration tests.
	pub type ReqwestTestManager = TokenManager<ReqwestHttpClient, ReqwestTransportErrorMapper>;

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Builds options that point the manager at a mock identity endpoint with an API key.
	pub fn test_options(token_url: &str, api_key: &str) -> TokenOptions {
		TokenOptions::builder()
			.api_key(api_key)
			.iam_url(token_url)
			.build()
			.expect("Test token options should be valid.")
	}

	/// Constructs a [`TokenManager`] backed by the reqwest transport used across integration
	/// tests.
	pub fn build_reqwest_test_manager(options: TokenOptions) -> ReqwestTestManager {
		TokenManager::with_http_client(
			options,
			test_reqwest_http_client(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}

	/// Builds a complete token record whose expiry is expressed relative to `now`.
	pub fn test_record(
		access: &str,
		refresh: Option<&str>,
		expires_in: i64,
		expiration: OffsetDateTime,
	) -> TokenRecord {
		let mut builder = TokenRecord::builder()
			.access_token(access)
			.token_type("Bearer")
			.expires_in(expires_in)
			.expiration(expiration.unix_timestamp());

		if let Some(refresh) = refresh {
			builder = builder.refresh_token(refresh);
		}

		builder.build().expect("Token record fixture should build successfully.")
	}
}

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::RwLock;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
