// ── Binding subscriptions ──
//
// Lets a device list redraw whenever sessions are bound, unbound or
// re-pointed at new metadata, without registering an event handler.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::Binding;

/// Live view of which sessions are bound, obtained from
/// [`ConnectionRegistry::subscribe`](crate::ConnectionRegistry::subscribe).
///
/// Every registry mutation publishes a whole `Vec<Binding>` in bind order.
/// Intermediate snapshots may be skipped; the newest is never lost.
pub struct BindingStream {
    current: Arc<Vec<Binding>>,
    receiver: watch::Receiver<Arc<Vec<Binding>>>,
}

impl BindingStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<Vec<Binding>>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Bindings as of `subscribe`, or as of the last `changed()` that resolved.
    pub fn current(&self) -> &Arc<Vec<Binding>> {
        &self.current
    }

    /// Newest published bindings, without waiting and without marking them seen.
    pub fn latest(&self) -> Arc<Vec<Binding>> {
        self.receiver.borrow().clone()
    }

    /// Resolves after the next bind, unbind or refresh. `None` once the
    /// registry is gone.
    pub async fn changed(&mut self) -> Option<Arc<Vec<Binding>>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = Arc::clone(&snap);
        Some(snap)
    }

    /// Binding snapshots as a `Stream`, starting with the one current now.
    pub fn into_stream(self) -> BindingWatchStream {
        BindingWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// Stream of binding snapshots. Ends when the registry is dropped.
pub struct BindingWatchStream {
    inner: WatchStream<Arc<Vec<Binding>>>,
}

impl Stream for BindingWatchStream {
    type Item = Arc<Vec<Binding>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
