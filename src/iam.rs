//! IAM token endpoint client: API-key acquisition and refresh-token exchanges.
//!
//! Both modes share one exchange: a form-encoded `POST` carrying the public client's Basic
//! credential, answered by a JSON token document. [`IamTokenClient`] turns that document into a
//! [`TokenRecord`] and classifies every failure into the crate's [`Error`] taxonomy. It never
//! retries; callers decide what to do with a failure.

pub use oauth2;

// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
	http::{
		HeaderMap, Method, Request,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER},
	},
};
use time::format_description::well_known::Rfc2822;
use url::form_urlencoded::Serializer as FormSerializer;
// self
use crate::{
	_prelude::*,
	auth::{TokenRecord, TokenSecret},
	config::IdentityEndpoint,
	error::{ConfigError, EndpointError, ParseError, TransportError},
	http::TokenHttpClient,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";
const CLOUD_IAM_RESPONSE_TYPE: &str = "cloud_iam";

/// Grant types sent to the IAM token endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
	/// Exchange an API key for a fresh token pair.
	ApiKey,
	/// Exchange a refresh token for a new token pair.
	RefreshToken,
}
impl GrantType {
	/// Returns the `grant_type` form value.
	pub fn as_str(self) -> &'static str {
		match self {
			GrantType::ApiKey => "urn:ibm:params:oauth:grant-type:apikey",
			GrantType::RefreshToken => "refresh_token",
		}
	}

	/// Returns a short label for errors, spans, and metrics.
	pub fn label(self) -> &'static str {
		match self {
			GrantType::ApiKey => "apikey",
			GrantType::RefreshToken => "refresh_token",
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.label())
	}
}

/// Credential presented in a single exchange.
#[derive(Clone, Copy, Debug)]
pub enum TokenGrant<'a> {
	/// Request mode: `grant_type=urn:ibm:params:oauth:grant-type:apikey`.
	ApiKey(&'a TokenSecret),
	/// Refresh mode: `grant_type=refresh_token`.
	Refresh(&'a TokenSecret),
}
impl TokenGrant<'_> {
	/// Grant type sent for this credential.
	pub fn grant_type(&self) -> GrantType {
		match self {
			TokenGrant::ApiKey(_) => GrantType::ApiKey,
			TokenGrant::Refresh(_) => GrantType::RefreshToken,
		}
	}

	/// Encodes the `application/x-www-form-urlencoded` request body.
	pub fn form_body(&self) -> String {
		let mut form = FormSerializer::new(String::new());

		form.append_pair("grant_type", self.grant_type().as_str());

		match self {
			TokenGrant::ApiKey(key) => {
				form.append_pair("apikey", key.expose());
				form.append_pair("response_type", CLOUD_IAM_RESPONSE_TYPE);
			},
			TokenGrant::Refresh(refresh) => {
				form.append_pair("refresh_token", refresh.expose());
			},
		}

		form.finish()
	}

	fn carried_refresh(&self) -> Option<&TokenSecret> {
		match self {
			TokenGrant::ApiKey(_) => None,
			TokenGrant::Refresh(refresh) => Some(refresh),
		}
	}
}

/// Maps HTTP transport failures into crate [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a crate error.
	fn map_transport_error(&self, grant: GrantType, error: HttpClientError<E>) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(&self, _grant: GrantType, err: HttpClientError<ReqwestError>) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(*inner),
			other => map_http_client_error(other),
		}
	}
}

/// Client for the IAM token endpoint.
pub struct IamTokenClient<C, M>
where
	C: TokenHttpClient,
	M: TransportErrorMapper<C::TransportError>,
{
	endpoint: IdentityEndpoint,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> IamTokenClient<C, M>
where
	C: TokenHttpClient,
	M: TransportErrorMapper<C::TransportError>,
{
	/// Creates a client for `endpoint` over the provided transport and mapper.
	pub fn new(
		endpoint: IdentityEndpoint,
		http_client: impl Into<Arc<C>>,
		error_mapper: impl Into<Arc<M>>,
	) -> Self {
		Self { endpoint, http_client: http_client.into(), error_mapper: error_mapper.into() }
	}

	/// Identity endpoint this client talks to.
	pub fn endpoint(&self) -> &IdentityEndpoint {
		&self.endpoint
	}

	/// Request mode: exchanges an API key for a new token record.
	pub async fn request_token(&self, api_key: &TokenSecret) -> Result<TokenRecord> {
		self.exchange(TokenGrant::ApiKey(api_key)).await
	}

	/// Refresh mode: exchanges a refresh token for a new token record.
	///
	/// When the response omits `refresh_token`, the presented one is carried into the record.
	pub async fn refresh_token(&self, refresh_token: &TokenSecret) -> Result<TokenRecord> {
		self.exchange(TokenGrant::Refresh(refresh_token)).await
	}

	/// Builds the HTTP request for `grant` without sending it.
	pub fn build_request(&self, grant: &TokenGrant<'_>) -> Result<HttpRequest> {
		Request::builder()
			.method(Method::POST)
			.uri(self.endpoint.token_url.as_str())
			.header(CONTENT_TYPE, FORM_CONTENT_TYPE)
			.header(ACCEPT, JSON_CONTENT_TYPE)
			.header(AUTHORIZATION, self.endpoint.basic_authorization())
			.body(grant.form_body().into_bytes())
			.map_err(|e| ConfigError::from(e).into())
	}

	async fn exchange(&self, grant: TokenGrant<'_>) -> Result<TokenRecord> {
		let grant_type = grant.grant_type();
		let request = self.build_request(&grant)?;
		let handle = self.http_client.handle();
		let response = handle
			.call(request)
			.await
			.map_err(|err| self.error_mapper.map_transport_error(grant_type, err))?;

		map_token_response(grant_type, grant.carried_refresh(), response)
	}
}
#[cfg(feature = "reqwest")]
impl IamTokenClient<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a client backed by the default reqwest transport.
	pub fn with_reqwest(endpoint: IdentityEndpoint) -> Result<Self> {
		Ok(Self::new(endpoint, ReqwestHttpClient::new()?, ReqwestTransportErrorMapper))
	}
}
impl<C, M> Debug for IamTokenClient<C, M>
where
	C: TokenHttpClient,
	M: TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IamTokenClient").field("endpoint", &self.endpoint).finish()
	}
}

#[derive(Deserialize)]
struct IamTokenResponse {
	access_token: String,
	#[serde(default)]
	refresh_token: Option<String>,
	#[serde(default)]
	token_type: Option<String>,
	expires_in: i64,
	#[serde(default)]
	expiration: Option<i64>,
}

#[derive(Default, Deserialize)]
struct IamErrorBody {
	#[serde(default, rename = "errorCode")]
	error_code: Option<String>,
	#[serde(default, rename = "errorMessage")]
	error_message: Option<String>,
	#[serde(default)]
	error: Option<String>,
	#[serde(default)]
	error_description: Option<String>,
}

fn map_token_response(
	grant: GrantType,
	carried_refresh: Option<&TokenSecret>,
	response: HttpResponse,
) -> Result<TokenRecord> {
	let status = response.status();

	if !status.is_success() {
		return Err(map_error_response(grant, &response).into());
	}

	let mut de = serde_json::Deserializer::from_slice(response.body());
	let payload: IamTokenResponse = serde_path_to_error::deserialize(&mut de)
		.map_err(|source| ParseError::Json { source, status: status.as_u16() })?;
	let mut builder =
		TokenRecord::builder().access_token(payload.access_token).expires_in(payload.expires_in);

	builder = match payload.expiration {
		Some(epoch) => builder.expiration(epoch),
		None => builder.issued_now(),
	};

	if let Some(token_type) = payload.token_type {
		builder = builder.token_type(token_type);
	}

	match (payload.refresh_token, carried_refresh) {
		(Some(refresh), _) => builder = builder.refresh_token(refresh),
		(None, Some(carried)) => builder = builder.refresh_token(carried.expose()),
		(None, None) => (),
	}

	builder.build().map_err(|e| ParseError::from(e).into())
}

fn map_error_response(grant: GrantType, response: &HttpResponse) -> EndpointError {
	let status = response.status();
	let body: IamErrorBody = serde_json::from_slice(response.body()).unwrap_or_default();
	let message = body
		.error_message
		.or(body.error_description)
		.or_else(|| body.error.clone())
		.unwrap_or_else(|| status.canonical_reason().unwrap_or("unexpected status").to_owned());

	EndpointError {
		grant: grant.label(),
		status: status.as_u16(),
		code: body.error_code.or(body.error),
		message,
		retry_after: parse_retry_after(response.headers()),
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}

	TransportError::from(err).into()
}

/// Generic classification of [`HttpClientError`] values for custom transports.
///
/// Transport-specific errors become [`TransportError::Network`]; request construction errors
/// become [`ConfigError::HttpRequest`].
pub fn map_http_client_error<E>(err: HttpClientError<E>) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	match err {
		HttpClientError::Reqwest(inner) => TransportError::network(*inner).into(),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) => TransportError::Other(message).into(),
		_ => TransportError::Other("unrecognized HTTP client failure".into()).into(),
	}
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
