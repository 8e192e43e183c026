//! Access-token lifecycle orchestration.
//!
//! [`TokenManager::get_token`] picks one of four sources for every call, in order:
//!
//! 1. the caller-managed token, when one was configured or set with
//!    [`TokenManager::set_access_token`];
//! 2. a fresh API-key request, when nothing was issued yet or the refresh token is past its grace
//!    window;
//! 3. a refresh-token exchange, when only the access token reached its safety margin;
//! 4. the stored access token.
//!
//! Each call performs at most one identity endpoint exchange and never retries. A successful
//! exchange replaces the stored record before the token is returned; a failed one leaves the
//! store untouched, and the next call re-evaluates expiry from scratch.

mod metrics;

pub use metrics::TokenMetrics;

// self
use crate::{
	_prelude::*,
	auth::{ExpiryPolicy, TokenRecord, TokenSecret},
	config::TokenOptions,
	error::ConfigError,
	http::TokenHttpClient,
	iam::{IamTokenClient, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::TokenStore,
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, iam::ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Manager specialized for the crate's default reqwest transport stack.
pub type ReqwestTokenManager = TokenManager<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Keeps a usable IAM access token available for outgoing API calls.
///
/// The manager is a plain value built from explicit [`TokenOptions`]; share it behind an `Arc`
/// when several clients need the same token. There is no singleflight guard: concurrent callers
/// that all find the token expired each perform their own exchange, and the last one to finish
/// owns the stored record.
pub struct TokenManager<C, M>
where
	C: TokenHttpClient,
	M: TransportErrorMapper<C::TransportError>,
{
	client: IamTokenClient<C, M>,
	api_key: Option<TokenSecret>,
	user_token: RwLock<Option<TokenSecret>>,
	store: TokenStore,
	policy: ExpiryPolicy,
	metrics: Arc<TokenMetrics>,
}
impl<C, M> TokenManager<C, M>
where
	C: TokenHttpClient,
	M: TransportErrorMapper<C::TransportError>,
{
	/// Creates a manager that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		options: TokenOptions,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		let client = IamTokenClient::new(options.endpoint, http_client, mapper);

		Self {
			client,
			api_key: options.api_key,
			user_token: RwLock::new(options.access_token),
			store: TokenStore::default(),
			policy: options.expiry_policy,
			metrics: Default::default(),
		}
	}

	/// Returns a usable access token, contacting the identity endpoint only when required.
	pub async fn get_token(&self) -> Result<TokenSecret> {
		let plan = self.plan_at(OffsetDateTime::now_utc());
		// A call without credentials is reported as the request it could not make.
		let kind = plan.as_ref().map_or(FlowKind::Request, Plan::kind);
		let span = FlowSpan::new(kind, "get_token");

		obs::record_flow_outcome(kind, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				match plan {
					Err(err) => Err(err),
					Ok(Plan::UserManaged(token)) => {
						self.metrics.record_user_managed();

						Ok(token)
					},
					Ok(Plan::Cached(token)) => {
						self.metrics.record_cache_hit();

						Ok(token)
					},
					Ok(Plan::Request(api_key)) => {
						self.metrics.record_request();

						self.client
							.request_token(&api_key)
							.await
							.map(|record| self.store_record(kind, record))
					},
					Ok(Plan::Refresh(refresh_token)) => {
						self.metrics.record_refresh();

						self.client
							.refresh_token(&refresh_token)
							.await
							.map(|record| self.store_record(kind, record))
					},
				}
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(kind, FlowOutcome::Success),
			Err(err) => {
				self.metrics.record_failure();
				obs::record_token_failure(kind, err);
				obs::record_flow_outcome(kind, FlowOutcome::Failure);
			},
		}

		result
	}

	/// Returns an `Authorization` header value carrying a usable access token.
	pub async fn authorization_header(&self) -> Result<String> {
		let token = self.get_token().await?;

		Ok(token.to_header_value(crate::auth::DEFAULT_TOKEN_TYPE))
	}

	/// Switches the manager into user-managed mode for the rest of its lifetime.
	///
	/// The token is served verbatim by every later [`get_token`](Self::get_token) call; the
	/// manager neither validates it nor tracks its expiry. Blank tokens are ignored, matching
	/// [`TokenOptionsBuilder::access_token`](crate::config::TokenOptionsBuilder::access_token),
	/// and the return value reports whether the token was accepted.
	pub fn set_access_token(&self, token: impl Into<String>) -> bool {
		let token = TokenSecret::new(token);

		if token.is_blank() {
			return false;
		}

		*self.user_token.write() = Some(token);

		true
	}

	/// Returns `true` once a caller-managed token is in effect.
	pub fn is_user_managed(&self) -> bool {
		self.user_token.read().is_some()
	}

	/// Reports which source a `get_token` call would use at `now`, without side effects.
	pub fn next_flow(&self, now: OffsetDateTime) -> Result<FlowKind> {
		self.plan_at(now).map(|plan| plan.kind())
	}

	/// Returns `true` when the stored access token is missing or past its safety margin at `now`.
	pub fn is_access_token_expired(&self, now: OffsetDateTime) -> bool {
		self.policy.access_token_expired(self.store.snapshot().as_ref(), now)
	}

	/// Returns `true` when the stored refresh token is missing or past its grace window at `now`.
	pub fn is_refresh_token_expired(&self, now: OffsetDateTime) -> bool {
		self.policy.refresh_token_expired(self.store.snapshot().as_ref(), now)
	}

	/// Snapshot of the stored token record.
	pub fn token_record(&self) -> Option<TokenRecord> {
		self.store.snapshot()
	}

	/// Token store backing this manager.
	pub fn store(&self) -> &TokenStore {
		&self.store
	}

	/// Expiry policy applied to stored records.
	pub fn expiry_policy(&self) -> &ExpiryPolicy {
		&self.policy
	}

	/// Counters describing how calls were served.
	pub fn metrics(&self) -> &TokenMetrics {
		&self.metrics
	}

	/// Identity endpoint client used for exchanges.
	pub fn client(&self) -> &IamTokenClient<C, M> {
		&self.client
	}

	fn plan_at(&self, now: OffsetDateTime) -> Result<Plan> {
		if let Some(token) = self.user_token.read().clone() {
			return Ok(Plan::UserManaged(token));
		}

		let Some(record) = self.store.snapshot() else {
			return self.request_plan();
		};

		if self.policy.refresh_token_expired(Some(&record), now) {
			return self.request_plan();
		}
		if !self.policy.access_token_expired(Some(&record), now) {
			return Ok(Plan::Cached(record.access_token));
		}

		match record.usable_refresh_token() {
			Some(refresh_token) => Ok(Plan::Refresh(refresh_token.clone())),
			None => self.request_plan(),
		}
	}

	fn request_plan(&self) -> Result<Plan> {
		self.api_key.clone().map(Plan::Request).ok_or_else(|| ConfigError::MissingCredentials.into())
	}

	fn store_record(&self, kind: FlowKind, record: TokenRecord) -> TokenSecret {
		let token = record.access_token.clone();

		obs::record_token_stored(kind, record.expiration);
		self.store.replace(record);

		token
	}
}
#[cfg(feature = "reqwest")]
impl TokenManager<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a manager that provisions its own reqwest-backed transport.
	///
	/// Fails with [`ConfigError::HttpClientBuild`] when the reqwest client cannot be built.
	pub fn new(options: TokenOptions) -> Result<Self> {
		Ok(Self::with_http_client(
			options,
			ReqwestHttpClient::new()?,
			Arc::new(ReqwestTransportErrorMapper),
		))
	}
}
impl<C, M> Debug for TokenManager<C, M>
where
	C: TokenHttpClient,
	M: TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("client", &self.client)
			.field("api_key_set", &self.api_key.is_some())
			.field("user_managed", &self.is_user_managed())
			.field("record", &self.store.snapshot())
			.field("policy", &self.policy)
			.finish()
	}
}

enum Plan {
	UserManaged(TokenSecret),
	Request(TokenSecret),
	Refresh(TokenSecret),
	Cached(TokenSecret),
}
impl Plan {
	fn kind(&self) -> FlowKind {
		match self {
			Plan::UserManaged(_) => FlowKind::UserManaged,
			Plan::Request(_) => FlowKind::Request,
			Plan::Refresh(_) => FlowKind::Refresh,
			Plan::Cached(_) => FlowKind::Cached,
		}
	}
}
