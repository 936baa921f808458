//! Tweet retention library.
//!
//! Streams the authenticated user's Twitter timeline, classifies every post
//! against an age and engagement retention policy, optionally deletes the
//! posts that fall outside it, and writes CSV ledgers of what was deleted and
//! what was kept.

pub mod config;
pub mod constants;
pub mod error;
pub mod export;
pub mod ledger;
pub mod processor;
pub mod retention;
pub mod twitter;

pub use error::{Error, Result};
