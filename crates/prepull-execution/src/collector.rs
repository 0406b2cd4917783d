//! Deadline-aware fan-in.
//!
//! Consumes completion signals from many concurrent producers on the
//! caller's task, racing a single timer.

use std::future::Future;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};

/// Why [`collect_n`] stopped before receiving every expected signal.
#[derive(Debug, Error)]
pub enum CollectError<T, E> {
    /// The deadline fired first. `received` holds the signals whose handler
    /// succeeded, in arrival order.
    #[error("deadline exceeded after {} signal(s)", .received.len())]
    DeadlineExceeded { received: Vec<T> },

    /// The per-signal handler failed; no further signals were consumed.
    #[error("{0}")]
    Signal(E),
}

/// Waits for `n` items from `signals`, running `on_signal` for each one
/// received before `deadline`.
///
/// Items are handled strictly in channel (FIFO) order. The timer is
/// checked before the channel on every iteration, so an already-elapsed
/// deadline returns `DeadlineExceeded` without touching buffered items.
/// With `n == 0` this returns immediately.
///
/// If every producer drops its sender before `n` items arrive, the missing
/// items can never come; the call then waits out the deadline and reports
/// `DeadlineExceeded` like any other shortfall.
pub async fn collect_n<T, E, F, Fut>(
    deadline: Instant,
    signals: &mut mpsc::Receiver<T>,
    n: usize,
    mut on_signal: F,
) -> Result<(), CollectError<T, E>>
where
    T: Clone,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    if n == 0 {
        return Ok(());
    }

    let mut received = Vec::with_capacity(n);
    let timer = sleep_until(deadline);
    tokio::pin!(timer);

    loop {
        if Instant::now() >= deadline {
            return Err(CollectError::DeadlineExceeded { received });
        }

        tokio::select! {
            biased;

            _ = &mut timer => {
                return Err(CollectError::DeadlineExceeded { received });
            }
            signal = signals.recv() => {
                let Some(item) = signal else {
                    (&mut timer).await;
                    return Err(CollectError::DeadlineExceeded { received });
                };

                on_signal(item.clone()).await.map_err(CollectError::Signal)?;
                received.push(item);

                if received.len() == n {
                    return Ok(());
                }
            }
        }
    }
}
