//! Expiry rules deciding when the access token and refresh token stop being usable.

// self
use crate::{_prelude::*, auth::token::record::TokenRecord, error::ConfigError};

const MARGIN_EPSILON: f64 = 1e-6;

/// Pure expiry predicates over an optional [`TokenRecord`] and an instant.
///
/// The access token is treated as expired once `refresh_ratio` of its TTL has elapsed, which
/// leaves a margin for requests already in flight. The refresh token is never inspected; it is
/// assumed valid until `refresh_token_grace` past the last access token's expiration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExpiryPolicy {
	refresh_ratio: f64,
	refresh_token_grace: Duration,
}
impl ExpiryPolicy {
	/// Fraction of the TTL after which the access token is considered expired.
	pub const DEFAULT_REFRESH_RATIO: f64 = 0.8;
	/// Window past the access token's expiration during which the refresh token stays usable.
	pub const DEFAULT_REFRESH_TOKEN_GRACE: Duration = Duration::days(7);

	/// Creates a validated policy.
	pub fn new(refresh_ratio: f64, refresh_token_grace: Duration) -> Result<Self, ConfigError> {
		if refresh_ratio.is_nan() || refresh_ratio <= 0.0 || refresh_ratio > 1.0 {
			return Err(ConfigError::InvalidRefreshRatio { ratio: refresh_ratio });
		}
		if refresh_token_grace.is_negative() {
			return Err(ConfigError::NegativeRefreshGrace);
		}

		Ok(Self { refresh_ratio, refresh_token_grace })
	}

	/// Fraction of the TTL after which the access token is considered expired.
	pub fn refresh_ratio(&self) -> f64 {
		self.refresh_ratio
	}

	/// Grace window granted to the refresh token.
	pub fn refresh_token_grace(&self) -> Duration {
		self.refresh_token_grace
	}

	/// Whole seconds before `expiration` at which the access token stops being served.
	///
	/// The exact margin is floored so the deadline never lands before `refresh_ratio` of the TTL
	/// has elapsed.
	pub fn safety_margin(&self, record: &TokenRecord) -> i64 {
		let exact = record.expires_in as f64 * (1.0 - self.refresh_ratio);

		// Absorb representation error of the ratio (3600 * 0.2 is 719.999..).
		(exact + MARGIN_EPSILON).floor() as i64
	}

	/// Epoch second at which the access token is first considered expired.
	pub fn access_deadline(&self, record: &TokenRecord) -> i64 {
		record.expiration.saturating_sub(self.safety_margin(record))
	}

	/// Epoch second after which the refresh token is considered expired.
	pub fn refresh_deadline(&self, record: &TokenRecord) -> i64 {
		record.expiration.saturating_add(self.refresh_token_grace.whole_seconds())
	}

	/// Returns `true` when there is no record or the safety margin has been reached.
	pub fn access_token_expired(&self, record: Option<&TokenRecord>, now: OffsetDateTime) -> bool {
		match record {
			Some(record) => self.access_deadline(record) <= now.unix_timestamp(),
			None => true,
		}
	}

	/// Returns `true` when there is no record or the grace window has passed.
	pub fn refresh_token_expired(&self, record: Option<&TokenRecord>, now: OffsetDateTime) -> bool {
		match record {
			Some(record) => self.refresh_deadline(record) < now.unix_timestamp(),
			None => true,
		}
	}
}
impl Default for ExpiryPolicy {
	fn default() -> Self {
		Self {
			refresh_ratio: Self::DEFAULT_REFRESH_RATIO,
			refresh_token_grace: Self::DEFAULT_REFRESH_TOKEN_GRACE,
		}
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	const WEEK: i64 = 7 * 24 * 3600;

	fn record(expires_in: i64, expiration: i64) -> TokenRecord {
		TokenRecord::builder()
			.access_token("access")
			.refresh_token("refresh")
			.expires_in(expires_in)
			.expiration(expiration)
			.build()
			.expect("Expiry fixture should build successfully.")
	}

	fn at(epoch: i64) -> OffsetDateTime {
		OffsetDateTime::from_unix_timestamp(epoch).expect("Fixture instant should be in range.")
	}

	#[test]
	fn missing_record_is_always_expired() {
		let policy = ExpiryPolicy::default();
		let now = macros::datetime!(2025-01-01 00:00 UTC);

		assert!(policy.access_token_expired(None, now));
		assert!(policy.refresh_token_expired(None, now));
	}

	#[test]
	fn access_token_expires_at_eighty_percent_of_ttl() {
		let policy = ExpiryPolicy::default();
		let t = macros::datetime!(2025-01-01 01:00 UTC).unix_timestamp();
		let record = record(3600, t);

		assert_eq!(policy.safety_margin(&record), 720);
		assert!(policy.access_token_expired(Some(&record), at(t - 720)));
		assert!(!policy.access_token_expired(Some(&record), at(t - 721)));
		assert!(!policy.access_token_expired(Some(&record), at(t - 3600)));
		assert!(policy.access_token_expired(Some(&record), at(t + 1)));
	}

	#[test]
	fn fractional_margin_never_expires_early() {
		let policy = ExpiryPolicy::default();
		let t = macros::datetime!(2025-01-01 01:00 UTC).unix_timestamp();
		// 80% of a 3 second TTL elapses at T - 0.6, so T - 1 is still fresh.
		let short = record(3, t);

		assert_eq!(policy.safety_margin(&short), 0);
		assert!(!policy.access_token_expired(Some(&short), at(t - 1)));
		assert!(policy.access_token_expired(Some(&short), at(t)));

		// 80% of an 8 second TTL elapses at T - 1.6.
		let longer = record(8, t);

		assert_eq!(policy.safety_margin(&longer), 1);
		assert!(!policy.access_token_expired(Some(&longer), at(t - 2)));
		assert!(policy.access_token_expired(Some(&longer), at(t - 1)));
	}

	#[test]
	fn refresh_token_survives_one_week_past_expiration() {
		let policy = ExpiryPolicy::default();
		let t = macros::datetime!(2025-01-01 01:00 UTC).unix_timestamp();
		let record = record(3600, t);

		assert!(!policy.refresh_token_expired(Some(&record), at(t + WEEK - 1)));
		assert!(!policy.refresh_token_expired(Some(&record), at(t + WEEK)));
		assert!(policy.refresh_token_expired(Some(&record), at(t + WEEK + 1)));
	}

	#[test]
	fn custom_ratio_moves_the_deadline() {
		let policy = ExpiryPolicy::new(0.5, Duration::hours(1))
			.expect("Half-life policy should be valid.");
		let record = record(1000, 10_000);

		assert_eq!(policy.refresh_ratio(), 0.5);
		assert_eq!(policy.refresh_token_grace(), Duration::hours(1));
		assert_eq!(policy.access_deadline(&record), 9_500);
		assert_eq!(policy.refresh_deadline(&record), 13_600);
	}

	#[test]
	fn policy_validation_rejects_out_of_range_values() {
		assert!(matches!(
			ExpiryPolicy::new(0.0, Duration::ZERO),
			Err(ConfigError::InvalidRefreshRatio { .. })
		));
		assert!(matches!(
			ExpiryPolicy::new(1.5, Duration::ZERO),
			Err(ConfigError::InvalidRefreshRatio { .. })
		));
		assert!(matches!(
			ExpiryPolicy::new(f64::NAN, Duration::ZERO),
			Err(ConfigError::InvalidRefreshRatio { .. })
		));
		assert!(matches!(
			ExpiryPolicy::new(0.8, Duration::seconds(-1)),
			Err(ConfigError::NegativeRefreshGrace)
		));
		assert!(ExpiryPolicy::new(1.0, Duration::ZERO).is_ok());
	}
}
