//! Operator-initiated cancellation threaded through polling loops.
//!
//! Readiness waits can run for minutes, so an interrupt must stop the run
//! between polls rather than leaving the process to be killed mid-request.
//! The token is a thin wrapper over a `tokio::sync::watch` channel: the CLI
//! holds the [`CancelHandle`] and flips it from the Ctrl-C handler; every
//! wait loop holds a [`CancelToken`] clone and checks it each iteration.

use tokio::sync::watch;

/// Creates a linked cancellation handle and token.
#[must_use]
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

/// Sender half used to request cancellation.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiver half observed by polling loops.
#[derive(Clone, Debug)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Returns a token that can never be cancelled.
    #[must_use]
    pub fn never() -> Self {
        let (_, token) = cancel_pair();
        token
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested. If the handle has been
    /// dropped without cancelling, the future never resolves.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
