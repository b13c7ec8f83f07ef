//! Timeout helper for backend calls
//!
//! Every candidate attempt is individually bounded; a slow model costs its
//! own budget only and the walk moves on.

use std::future::Future;
use std::time::Duration;

use crate::types::{Result, ScribeError};

/// Execute an async operation with a timeout
///
/// Returns a timeout error if the operation doesn't complete within the
/// specified duration.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(ScribeError::timeout(operation_name, timeout)),
    }
}
