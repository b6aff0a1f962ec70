//! Database connectors and utilities.
//!
//! Currently provides Redis connection management; the relational store
//! behind the domain repositories is owned by the embedding application.

pub mod common;
pub mod redis;

pub use common::{retry, retry_with_backoff, DatabaseError, RetryConfig};
