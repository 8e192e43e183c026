//! Crate-level error types shared by the manager, the IAM client, and configuration.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem, including missing credentials.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Identity endpoint responded with a body that could not be turned into a token record.
	#[error(transparent)]
	Parse(#[from] ParseError),
	/// Identity endpoint answered with a non-success HTTP status.
	#[error(transparent)]
	Endpoint(#[from] EndpointError),
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Identity endpoint URL cannot be parsed.
	#[error("Identity endpoint URL is invalid.")]
	InvalidUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Identity endpoint URL uses a scheme other than http or https.
	#[error("Identity endpoint must use http or https: {url}.")]
	UnsupportedScheme {
		/// Offending URL.
		url: String,
	},
	/// Expiry ratio must fall within `(0, 1]`.
	#[error("Access token refresh ratio must be within (0, 1], got {ratio}.")]
	InvalidRefreshRatio {
		/// Supplied ratio.
		ratio: f64,
	},
	/// Refresh-token grace window cannot be negative.
	#[error("Refresh token grace window cannot be negative.")]
	NegativeRefreshGrace,
	/// Options JSON could not be decoded.
	#[error("Token options JSON is malformed.")]
	OptionsJson {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// A token is needed but neither an API key nor a usable refresh token is available.
	#[error("No API key, user-managed access token, or usable refresh token is configured.")]
	MissingCredentials,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures decoding a token response into a [`TokenRecord`](crate::auth::TokenRecord).
#[derive(Debug, ThisError)]
pub enum ParseError {
	/// Response body is not valid JSON or lacks a required field.
	#[error("Identity endpoint returned malformed JSON.")]
	Json {
		/// Structured parsing failure, including the offending path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the response.
		status: u16,
	},
	/// Response decoded but does not describe a valid token record.
	#[error("Identity endpoint returned an unusable token record.")]
	InvalidRecord(#[from] crate::auth::TokenRecordBuilderError),
}

/// Non-success answer from the identity endpoint.
#[derive(Debug, ThisError)]
#[error("Identity endpoint rejected the {grant} request with HTTP {status}: {message}.")]
pub struct EndpointError {
	/// Grant label of the failed exchange.
	pub grant: &'static str,
	/// HTTP status code.
	pub status: u16,
	/// Service error code (for example `BXNIM0415E`), when the body carries one.
	pub code: Option<String>,
	/// Human-readable message from the body, or the canonical status reason.
	pub message: String,
	/// Retry-After hint from upstream, if supplied.
	pub retry_after: Option<Duration>,
}
impl EndpointError {
	/// Returns `true` for throttling and server-side failures that a caller may retry later.
	pub fn is_retryable(&self) -> bool {
		self.status == 429 || self.status >= 500
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the identity endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request did not complete before the HTTP client's timeout.
	#[error("Request timed out while calling the identity endpoint.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the identity endpoint.")]
	Io(#[from] std::io::Error),
	/// Transport reported a failure without a structured error.
	#[error("HTTP client error occurred while calling the identity endpoint: {0}.")]
	Other(String),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::timeout(e) } else { Self::network(e) }
	}
}
