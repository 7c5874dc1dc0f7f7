//! Bounded retry with exponential backoff
//!
//! Every network-calling step of a transfer goes through the same combinator,
//! so the attempt bound and backoff curve are defined once.

use crate::{api::actions::ResponseError, transfer::error::TransferError};
use anyhow::Result;
use std::{future::Future, time::Duration};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }

    /// Run `call` until it succeeds, the attempt bound is reached, a
    /// non-retryable error is returned, or `cancel` fires.
    ///
    /// # Errors
    /// [`TransferError::Cancelled`] when the token fires,
    /// [`TransferError::RetryExhausted`] otherwise.
    pub async fn run<T, F, Fut>(
        &self,
        op: &'static str,
        cancel: &CancellationToken,
        mut call: F,
    ) -> Result<T, TransferError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt: u32 = 1;

        loop {
            if cancel.is_cancelled() {
                return Err(TransferError::Cancelled);
            }

            let result = tokio::select! {
                () = cancel.cancelled() => return Err(TransferError::Cancelled),
                result = call() => result,
            };

            match result {
                Ok(value) => return Ok(value),
                Err(err) => {
                    log::error!("{op}: attempt {attempt}/{max_attempts} failed: {err:#}");

                    if attempt >= max_attempts || !is_retryable(&err) {
                        return Err(TransferError::RetryExhausted {
                            op,
                            attempts: attempt,
                            reason: err,
                        });
                    }

                    let backoff = self.backoff(attempt);
                    log::warn!("{op}: retrying in {}ms", backoff.as_millis());

                    tokio::select! {
                        () = cancel.cancelled() => return Err(TransferError::Cancelled),
                        () = sleep(backoff) => {}
                    }

                    attempt += 1;
                }
            }
        }
    }

    /// Delay before the attempt following `attempt`: exponential, capped,
    /// with a little jitter so concurrent transfers do not retry in step.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let delay = self
            .base_delay
            .saturating_mul(2_u32.saturating_pow(exp))
            .min(self.max_delay);

        let jitter_ceiling = delay.min(Duration::from_millis(250)).as_millis();
        let jitter = u64::try_from(jitter_ceiling).map_or(0, |ms| {
            if ms == 0 {
                0
            } else {
                rand::random_range(0..=ms)
            }
        });

        delay + Duration::from_millis(jitter)
    }
}

/// Whether another attempt is worth making for `err`.
///
/// Transport-level failures (connect, timeout) and 408/429/5xx responses are
/// transient; any other HTTP status re-raises immediately.
#[must_use]
pub fn is_retryable(err: &anyhow::Error) -> bool {
    for cause in err.chain() {
        if let Some(response) = cause.downcast_ref::<ResponseError>() {
            return retryable_status(response.status.as_u16());
        }
        if let Some(request) = cause.downcast_ref::<reqwest::Error>() {
            if let Some(status) = request.status() {
                return retryable_status(status.as_u16());
            }
            return true;
        }
    }
    true
}

const fn retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500..=504)
}
