//! Immutable IAM token records and their builder.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Token type assumed when the identity service omits `token_type`.
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// Errors produced by [`TokenRecordBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum TokenRecordBuilderError {
	/// Issued when no (or an empty) access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no TTL was provided.
	#[error("The expires_in value is required.")]
	MissingExpiresIn,
	/// Issued when neither an absolute expiration nor an issued-at instant was provided.
	#[error("Expiry must be supplied via expiration or issued_at.")]
	MissingExpiry,
	/// Issued when the TTL is zero or negative.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
}

/// Immutable record describing the last IAM token issued to the manager.
///
/// Field names follow the identity service's JSON so a record serializes the same way the
/// endpoint returned it. A record is always complete: `expires_in` and `expiration` are both
/// present. Refreshing produces a new record instead of mutating this one.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
	/// Access token secret used as the bearer credential.
	pub access_token: TokenSecret,
	/// Refresh token secret, if the identity service issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Token type, typically `Bearer`.
	pub token_type: String,
	/// TTL in seconds declared by the identity service at issuance.
	pub expires_in: i64,
	/// Absolute expiry as Unix epoch seconds.
	pub expiration: i64,
}
impl TokenRecord {
	/// Returns a builder for constructing records.
	pub fn builder() -> TokenRecordBuilder {
		TokenRecordBuilder::default()
	}

	/// Absolute expiry instant.
	///
	/// Out-of-range timestamps saturate to the representable bounds.
	pub fn expires_at(&self) -> OffsetDateTime {
		OffsetDateTime::from_unix_timestamp(self.expiration).unwrap_or(if self.expiration < 0 {
			OffsetDateTime::UNIX_EPOCH
		} else {
			time::PrimitiveDateTime::MAX.assume_utc()
		})
	}

	/// Issuance instant, derived as `expiration - expires_in`.
	pub fn issued_at(&self) -> OffsetDateTime {
		let expires_at = self.expires_at();

		expires_at.checked_sub(self.ttl()).unwrap_or(expires_at)
	}

	/// TTL as a [`Duration`].
	pub fn ttl(&self) -> Duration {
		Duration::seconds(self.expires_in)
	}

	/// Returns the refresh token when it is present and non-blank.
	pub fn usable_refresh_token(&self) -> Option<&TokenSecret> {
		self.refresh_token.as_ref().filter(|secret| !secret.is_blank())
	}

	/// Formats the access token as an `Authorization` header value using the record's token type.
	pub fn authorization_header(&self) -> String {
		self.access_token.to_header_value(&self.token_type)
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("token_type", &self.token_type)
			.field("expires_in", &self.expires_in)
			.field("expiration", &self.expiration)
			.finish()
	}
}

/// Builder for [`TokenRecord`].
#[derive(Clone, Debug, Default)]
pub struct TokenRecordBuilder {
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	token_type: Option<String>,
	expires_in: Option<i64>,
	expiration: Option<i64>,
	issued_at: Option<OffsetDateTime>,
}
impl TokenRecordBuilder {
	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Overrides the token type (defaults to [`DEFAULT_TOKEN_TYPE`]).
	pub fn token_type(mut self, token_type: impl Into<String>) -> Self {
		self.token_type = Some(token_type.into());

		self
	}

	/// Sets the TTL in seconds.
	pub fn expires_in(mut self, seconds: i64) -> Self {
		self.expires_in = Some(seconds);

		self
	}

	/// Sets the absolute expiry as Unix epoch seconds.
	pub fn expiration(mut self, epoch_seconds: i64) -> Self {
		self.expiration = Some(epoch_seconds);

		self
	}

	/// Sets the issuance instant used when no absolute expiration is supplied.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Convenience helper that stamps `issued_at` with the current clock.
	pub fn issued_now(self) -> Self {
		self.issued_at(OffsetDateTime::now_utc())
	}

	/// Consumes the builder and produces a [`TokenRecord`].
	pub fn build(self) -> Result<TokenRecord, TokenRecordBuilderError> {
		let access_token = self
			.access_token
			.filter(|secret| !secret.is_blank())
			.ok_or(TokenRecordBuilderError::MissingAccessToken)?;
		let expires_in = self.expires_in.ok_or(TokenRecordBuilderError::MissingExpiresIn)?;

		if expires_in <= 0 {
			return Err(TokenRecordBuilderError::NonPositiveExpiresIn);
		}

		let expiration = match (self.expiration, self.issued_at) {
			(Some(epoch), _) => epoch,
			(None, Some(issued)) => issued.unix_timestamp().saturating_add(expires_in),
			(None, None) => return Err(TokenRecordBuilderError::MissingExpiry),
		};
		let token_type = self
			.token_type
			.filter(|value| !value.trim().is_empty())
			.unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_owned());

		Ok(TokenRecord {
			access_token,
			refresh_token: self.refresh_token,
			token_type,
			expires_in,
			expiration,
		})
	}
}
