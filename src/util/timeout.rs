//! Timeout helper.

use std::future::Future;
use std::time::Duration;

use crate::error::{Result, VoiceGitError};

/// Bound a fallible future, mapping expiry to [`VoiceGitError::Timeout`].
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(duration, future)
        .await
        .unwrap_or_else(|_| Err(VoiceGitError::Timeout(duration.as_millis() as u64)))
}
