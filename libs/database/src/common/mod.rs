mod error;
mod retry;

pub use error::DatabaseError;
pub use retry::{retry, retry_with_backoff, RetryConfig};
