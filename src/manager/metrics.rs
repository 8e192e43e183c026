// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing how `get_token` calls were served.
#[derive(Debug, Default)]
pub struct TokenMetrics {
	requests: AtomicU64,
	refreshes: AtomicU64,
	cache_hits: AtomicU64,
	user_managed: AtomicU64,
	failures: AtomicU64,
}
impl TokenMetrics {
	/// Returns the number of API-key requests sent to the identity endpoint.
	pub fn requests(&self) -> u64 {
		self.requests.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh-token exchanges sent to the identity endpoint.
	pub fn refreshes(&self) -> u64 {
		self.refreshes.load(Ordering::Relaxed)
	}

	/// Returns the number of calls served from the stored record.
	pub fn cache_hits(&self) -> u64 {
		self.cache_hits.load(Ordering::Relaxed)
	}

	/// Returns the number of calls served with the caller-managed token.
	pub fn user_managed(&self) -> u64 {
		self.user_managed.load(Ordering::Relaxed)
	}

	/// Returns the number of calls that ended in an error.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	/// Total number of identity endpoint calls (requests + refreshes).
	pub fn network_calls(&self) -> u64 {
		self.requests() + self.refreshes()
	}

	pub(crate) fn record_request(&self) {
		self.requests.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_refresh(&self) {
		self.refreshes.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_cache_hit(&self) {
		self.cache_hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_user_managed(&self) {
		self.user_managed.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}
