//! Minimal cooperative cancellation signal (spec §4.4 "Cancellation"): the
//! coordinator holds the [`Canceller`] half and can trip it from another
//! task; the controller polls/awaits the [`CancellationToken`] half between
//! (and, via `select!`, during) driver calls.

use tokio::sync::watch;

#[derive(Clone)]
pub struct CancellationToken {
    rx: watch::Receiver<bool>,
}

impl CancellationToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is signalled; never resolves otherwise.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow() {
                return;
            }
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

pub struct Canceller {
    tx: watch::Sender<bool>,
}

impl Canceller {
    pub fn new() -> (Self, CancellationToken) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, CancellationToken { rx })
    }

    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

impl Default for Canceller {
    fn default() -> Self {
        Self::new().0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn token_reflects_cancellation() {
        let (canceller, token) = Canceller::new();
        assert!(!token.is_cancelled());
        canceller.cancel();
        assert!(token.is_cancelled());
    }
}
