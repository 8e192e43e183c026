//! Process-lifetime slot holding the manager's current [`TokenRecord`].
//!
//! The store is either empty (no token issued yet) or holds one complete record. Records are
//! never patched in place: every successful acquisition replaces the slot wholesale. The lock
//! only guards the swap itself and is never held across an `.await`, so concurrent writers race
//! with last-writer-wins semantics.

// self
use crate::{_prelude::*, auth::TokenRecord};

/// Single-slot, thread-safe token store.
#[derive(Debug, Default)]
pub struct TokenStore(RwLock<Option<TokenRecord>>);
impl TokenStore {
	/// Creates a store seeded with `record`.
	pub fn with_record(record: TokenRecord) -> Self {
		Self(RwLock::new(Some(record)))
	}

	/// Returns a copy of the current record, if any.
	pub fn snapshot(&self) -> Option<TokenRecord> {
		self.0.read().clone()
	}

	/// Returns `true` when no record has been stored yet.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_none()
	}

	/// Replaces the current record, returning the previous one.
	pub fn replace(&self, record: TokenRecord) -> Option<TokenRecord> {
		self.0.write().replace(record)
	}

	/// Empties the store, returning the previous record.
	pub fn clear(&self) -> Option<TokenRecord> {
		self.0.write().take()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn record(access: &str) -> TokenRecord {
		TokenRecord::builder()
			.access_token(access)
			.refresh_token("refresh")
			.expires_in(3600)
			.expiration(1_700_003_600)
			.build()
			.expect("Store fixture should build successfully.")
	}

	#[test]
	fn replace_swaps_whole_records() {
		let store = TokenStore::default();

		assert!(store.is_empty());
		assert!(store.replace(record("first")).is_none());

		let previous = store.replace(record("second")).expect("First record should be returned.");

		assert_eq!(previous.access_token.expose(), "first");
		assert_eq!(
			store.snapshot().map(|record| record.access_token.expose().to_owned()),
			Some("second".to_owned())
		);
	}

	#[test]
	fn snapshot_is_detached_from_later_writes() {
		let store = TokenStore::with_record(record("original"));
		let snapshot = store.snapshot().expect("Seeded store should hold a record.");

		store.replace(record("newer"));

		assert_eq!(snapshot.access_token.expose(), "original");
		assert!(store.clear().is_some());
		assert!(store.is_empty());
	}
}
