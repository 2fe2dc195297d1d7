//! Live listener handles.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::Stream;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::StoreResult;

type Teardown = Box<dyn FnOnce() + Send>;

/// Cancellation handle for a live listener.
///
/// Clones share state: the first [`remove`](Self::remove) call from any
/// clone runs the backend teardown, later calls do nothing.
#[derive(Clone)]
pub struct ListenerRegistration {
    teardown: Arc<Mutex<Option<Teardown>>>,
}

impl ListenerRegistration {
    pub fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
        Self {
            teardown: Arc::new(Mutex::new(Some(Box::new(teardown)))),
        }
    }

    /// Unregisters the listener. Returns `true` if this call tore it down.
    pub fn remove(&self) -> bool {
        let teardown = self.teardown.lock().take();
        match teardown {
            Some(teardown) => {
                teardown();
                true
            }
            None => false,
        }
    }

    pub fn is_removed(&self) -> bool {
        self.teardown.lock().is_none()
    }
}

impl fmt::Debug for ListenerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistration")
            .field("removed", &self.is_removed())
            .finish()
    }
}

/// Stream of snapshots (or listener errors) for one live query or document.
///
/// The stream ends once the registration is removed. Dropping the listener
/// removes the registration.
pub struct Listener<S> {
    receiver: mpsc::UnboundedReceiver<StoreResult<S>>,
    registration: ListenerRegistration,
}

impl<S> Listener<S> {
    pub fn new(
        receiver: mpsc::UnboundedReceiver<StoreResult<S>>,
        registration: ListenerRegistration,
    ) -> Self {
        Self {
            receiver,
            registration,
        }
    }

    /// Waits for the next snapshot. `None` once the listener is removed.
    pub async fn recv(&mut self) -> Option<StoreResult<S>> {
        self.receiver.recv().await
    }

    /// Returns a queued snapshot without waiting.
    pub fn try_recv(&mut self) -> Option<StoreResult<S>> {
        self.receiver.try_recv().ok()
    }

    /// Handle that can remove this listener from elsewhere.
    pub fn registration(&self) -> ListenerRegistration {
        self.registration.clone()
    }

    pub fn remove(&self) -> bool {
        self.registration.remove()
    }
}

impl<S> Stream for Listener<S> {
    type Item = StoreResult<S>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl<S> Drop for Listener<S> {
    fn drop(&mut self) {
        self.registration.remove();
    }
}

impl<S> fmt::Debug for Listener<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("registration", &self.registration)
            .finish_non_exhaustive()
    }
}
