//! Typed per-instance signals.
//!
//! A `Slot` is a broadcast channel with a typed payload: producers `emit`,
//! consumers `subscribe` and drain their receiver on the event loop. Emitting
//! with no subscribers is not an error.

use tokio::sync::broadcast;

/// Default slot capacity. Receivers further behind than this see a lag.
pub const DEFAULT_SLOT_CAPACITY: usize = 256;

/// A typed publish/subscribe channel.
#[derive(Debug)]
pub struct Slot<T: Clone> {
    tx: broadcast::Sender<T>,
}

impl<T: Clone> Slot<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish a payload. Returns the number of subscribers that received it.
    pub fn emit(&self, payload: T) -> usize {
        self.tx.send(payload).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.tx.subscribe()
    }
}

impl<T: Clone> Default for Slot<T> {
    fn default() -> Self {
        Self::new(DEFAULT_SLOT_CAPACITY)
    }
}

impl<T: Clone> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Drain every pending payload from a receiver without blocking.
///
/// Lagged receivers skip the lost payloads and keep draining.
pub fn drain<T: Clone>(rx: &mut broadcast::Receiver<T>) -> Vec<T> {
    let mut out = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(payload) => out.push(payload),
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                tracing::warn!("slot receiver lagged, skipped {n} payloads");
            }
            Err(broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed) => {
                break;
            }
        }
    }
    out
}
