//! IAM token records, secrets, and expiry rules.

pub mod expiry;
pub mod record;
pub mod secret;
