//! Cancellation and deadline propagation.
//!
//! A `Context` is cloned into every task that takes part in one operation
//! (dispatcher, workers, fan-out queries, heartbeat). All clones observe the
//! same cancellation signal and the same deadline.

use crate::error::{LedgerError, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Why a context stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Canceled,
    DeadlineExceeded,
}

impl From<Interrupt> for LedgerError {
    fn from(interrupt: Interrupt) -> Self {
        match interrupt {
            Interrupt::Canceled => LedgerError::Canceled,
            Interrupt::DeadlineExceeded => LedgerError::DeadlineExceeded,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Context {
    signal: Arc<watch::Sender<Option<Interrupt>>>,
    deadline: Option<Instant>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// A context that only stops when cancelled explicitly.
    pub fn new() -> Self {
        let (signal, _) = watch::channel(None);
        Self {
            signal: Arc::new(signal),
            deadline: None,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            ..Self::new()
        }
    }

    /// Cancels every clone of this context. The first interruption wins.
    pub fn cancel(&self) {
        self.signal.send_if_modified(|state| {
            if state.is_some() {
                return false;
            }
            *state = Some(Interrupt::Canceled);
            true
        });
    }

    /// `Some` once the context has been cancelled or its deadline passed.
    pub fn err(&self) -> Option<Interrupt> {
        if let Some(interrupt) = *self.signal.borrow() {
            return Some(interrupt);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Interrupt::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves when the context is cancelled or the deadline passes.
    pub async fn done(&self) -> Interrupt {
        let mut signal = self.signal.subscribe();
        let canceled = async move {
            // Copy out so the `watch::Ref` is not held across an await.
            let state = signal.wait_for(Option::is_some).await.map(|state| *state);
            match state {
                Ok(state) => state.unwrap_or(Interrupt::Canceled),
                // The sender lives as long as `self`, so this never resolves.
                Err(_) => std::future::pending().await,
            }
        };

        match self.deadline {
            Some(deadline) => tokio::select! {
                interrupt = canceled => interrupt,
                () = tokio::time::sleep_until(deadline) => Interrupt::DeadlineExceeded,
            },
            None => canceled.await,
        }
    }

    /// Races `fut` against the context. An already-stopped context wins
    /// without polling `fut`.
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            interrupt = self.done() => Err(interrupt.into()),
            result = fut => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fresh_context_is_live() {
        let ctx = Context::new();
        assert_eq!(ctx.err(), None);
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn test_waiting_futures_are_send() {
        let ctx = Context::with_timeout(Duration::from_secs(1));
        assert_send(&ctx.done());
        assert_send(&ctx.run(async { Ok(()) }));
    }

    #[tokio::test]
    async fn test_cancel_reaches_clones() {
        let ctx = Context::new();
        let clone = ctx.clone();

        let waiter = tokio::spawn(async move { clone.done().await });
        ctx.cancel();

        assert_eq!(waiter.await.unwrap(), Interrupt::Canceled);
        assert_eq!(ctx.err(), Some(Interrupt::Canceled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fires() {
        let ctx = Context::with_timeout(Duration::from_millis(50));
        assert_eq!(ctx.err(), None);

        assert_eq!(ctx.done().await, Interrupt::DeadlineExceeded);
        assert_eq!(ctx.err(), Some(Interrupt::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_deadline_reports_cancel() {
        let ctx = Context::with_timeout(Duration::from_secs(60));
        ctx.cancel();
        assert_eq!(ctx.done().await, Interrupt::Canceled);
    }

    #[tokio::test]
    async fn test_run_short_circuits_when_cancelled() {
        let ctx = Context::new();
        ctx.cancel();

        let result: Result<u32> = ctx.run(async { Ok(7) }).await;
        assert!(matches!(result, Err(LedgerError::Canceled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_abandons_hung_future() {
        let ctx = Context::with_timeout(Duration::from_millis(10));
        let result: Result<()> = ctx.run(std::future::pending()).await;
        assert!(matches!(result, Err(LedgerError::DeadlineExceeded)));
    }
}
