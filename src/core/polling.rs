//! Bounded status polling
//!
//! Remote media processing (Instagram containers, X uploads) is asynchronous:
//! the platform accepts the media and reports its processing state on a
//! separate status endpoint. This module provides a fixed-interval poller with
//! a hard attempt limit.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Options for polling behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Maximum number of status checks
    pub max_attempts: u32,
    /// Delay between two status checks
    pub interval: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            interval: Duration::from_secs(5),
        }
    }
}

/// Result of a single status check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus<T> {
    Ready(T),
    Pending,
}

/// Result of a complete polling run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Ready(T),
    Exhausted { attempts: u32 },
}

/// Runs a status check until it is ready, fails, or runs out of attempts
///
/// # Examples
///
/// ```no_run
/// use video_publisher::core::{PollOptions, PollOutcome, PollStatus, Poller};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let poller = Poller::new(PollOptions::default());
///
///     let outcome = poller
///         .poll(|| async { Ok::<_, anyhow::Error>(PollStatus::Ready("FINISHED")) })
///         .await?;
///
///     assert_eq!(outcome, PollOutcome::Ready("FINISHED"));
///     Ok(())
/// }
/// ```
pub struct Poller {
    options: PollOptions,
}

impl Poller {
    pub fn new(options: PollOptions) -> Self {
        Self { options }
    }

    /// Execute the status check until it reports `Ready`
    ///
    /// An `Err` from the check ends polling immediately. There is no delay
    /// after the final attempt.
    pub async fn poll<F, Fut, T, E>(&self, mut check: F) -> Result<PollOutcome<T>, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<PollStatus<T>, E>>,
    {
        for attempt in 1..=self.options.max_attempts {
            if let PollStatus::Ready(value) = check().await? {
                return Ok(PollOutcome::Ready(value));
            }

            if attempt < self.options.max_attempts {
                sleep(self.options.interval).await;
            }
        }

        Ok(PollOutcome::Exhausted {
            attempts: self.options.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_options(max_attempts: u32) -> PollOptions {
        PollOptions {
            max_attempts,
            interval: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn test_ready_on_first_attempt() {
        let poller = Poller::new(fast_options(3));

        let outcome = poller
            .poll(|| async { Ok::<_, anyhow::Error>(PollStatus::Ready(7)) })
            .await
            .unwrap();

        assert_eq!(outcome, PollOutcome::Ready(7));
    }

    #[tokio::test]
    async fn test_ready_after_pending() {
        let poller = Poller::new(fast_options(5));
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let outcome = poller
            .poll(move || {
                let count = counter_clone.fetch_add(1, Ordering::SeqCst);
                async move {
                    if count < 2 {
                        Ok::<_, anyhow::Error>(PollStatus::Pending)
                    } else {
                        Ok(PollStatus::Ready("FINISHED"))
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(outcome, PollOutcome::Ready("FINISHED"));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_after_max_attempts() {
        let poller = Poller::new(fast_options(4));
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let outcome = poller
            .poll(move || {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<PollStatus<()>, anyhow::Error>(PollStatus::Pending) }
            })
            .await
            .unwrap();

        assert_eq!(outcome, PollOutcome::Exhausted { attempts: 4 });
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_error_stops_polling() {
        let poller = Poller::new(fast_options(5));
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = poller
            .poll(move || {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                async move { Err::<PollStatus<()>, _>(anyhow::anyhow!("processing failed")) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_delay_after_last_attempt() {
        let poller = Poller::new(PollOptions {
            max_attempts: 3,
            interval: Duration::from_millis(40),
        });

        let start = std::time::Instant::now();
        let _outcome = poller
            .poll(|| async { Ok::<PollStatus<()>, anyhow::Error>(PollStatus::Pending) })
            .await;
        let elapsed = start.elapsed();

        // Two sleeps between three checks
        assert!(
            elapsed >= Duration::from_millis(80) && elapsed < Duration::from_millis(500),
            "Expected two intervals, got {:?}",
            elapsed
        );
    }

    #[test]
    fn test_poll_options_default() {
        let options = PollOptions::default();

        assert_eq!(options.max_attempts, 10);
        assert_eq!(options.interval, Duration::from_secs(5));
    }
}
