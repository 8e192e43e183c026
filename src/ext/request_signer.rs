//! Request signing contracts that let downstream crates attach IAM tokens to arbitrary HTTP
//! clients.

// crates.io
use oauth2::{
	HttpRequest,
	http::{HeaderValue, header::AUTHORIZATION},
};
// self
use crate::{
	_prelude::*,
	auth::{DEFAULT_TOKEN_TYPE, TokenSecret},
	error::ConfigError,
	http::TokenHttpClient,
	iam::TransportErrorMapper,
	manager::TokenManager,
};

/// Describes how to attach an access token to an outbound request without constraining the
/// HTTP client type.
pub trait RequestSignerExt<Request, Error>
where
	Self: Send + Sync,
{
	/// Consumes the provided request and injects authorization derived from `token`.
	fn attach_token(&self, request: Request, token: &TokenSecret) -> Result<Request, Error>;
}

/// Signs requests with an `Authorization: Bearer <token>` header.
#[derive(Clone, Copy, Debug, Default)]
pub struct BearerSigner;
impl RequestSignerExt<HttpRequest, Error> for BearerSigner {
	fn attach_token(&self, mut request: HttpRequest, token: &TokenSecret) -> Result<HttpRequest> {
		let mut value = HeaderValue::from_str(&token.to_header_value(DEFAULT_TOKEN_TYPE))
			.map_err(|e| ConfigError::HttpRequest(e.into()))?;

		value.set_sensitive(true);
		request.headers_mut().insert(AUTHORIZATION, value);

		Ok(request)
	}
}
#[cfg(feature = "reqwest")]
impl RequestSignerExt<reqwest::RequestBuilder, Error> for BearerSigner {
	fn attach_token(
		&self,
		request: reqwest::RequestBuilder,
		token: &TokenSecret,
	) -> Result<reqwest::RequestBuilder> {
		Ok(request.bearer_auth(token.expose()))
	}
}

impl<C, M> TokenManager<C, M>
where
	C: TokenHttpClient,
	M: TransportErrorMapper<C::TransportError>,
{
	/// Obtains a usable token and hands it to `signer` for `request`.
	pub async fn sign<S, R>(&self, signer: &S, request: R) -> Result<R>
	where
		S: RequestSignerExt<R, Error>,
	{
		let token = self.get_token().await?;

		signer.attach_token(request, &token)
	}
}
