//! Auth-domain token models and the expiry policy applied to them.

pub mod token;

pub use token::{expiry::*, record::*, secret::*};
