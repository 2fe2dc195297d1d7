//! The stream type every adapter returns.

use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use doc_store::{Listener, ListenerRegistration, StoreResult};
use futures_util::future;
use futures_util::stream::{self, AbortHandle, BoxStream, Stream, StreamExt};
use news_model::Resource;

/// Lazy sequence of [`Resource`] states for one operation.
///
/// The first item is always `Resource::Loading`. Cancel with
/// [`unsubscribe`](Self::unsubscribe) or by dropping the stream; either way
/// a backing remote listener is unregistered exactly once.
pub struct ResourceStream<T> {
    inner: BoxStream<'static, Resource<T>>,
    cancel: AbortHandle,
    registration: Option<ListenerRegistration>,
}

impl<T: Send + 'static> ResourceStream<T> {
    fn build(
        states: impl Stream<Item = Resource<T>> + Send + 'static,
        registration: Option<ListenerRegistration>,
    ) -> Self {
        let (states, cancel) = stream::abortable(
            stream::once(future::ready(Resource::Loading)).chain(states),
        );
        Self {
            inner: states.boxed(),
            cancel,
            registration,
        }
    }

    /// Live adapter: one state per listener event, for as long as the
    /// listener stays registered.
    pub fn live<S, F>(listener: Listener<S>, map: F) -> Self
    where
        S: Send + 'static,
        F: FnMut(StoreResult<S>) -> Resource<T> + Send + 'static,
    {
        let registration = listener.registration();
        Self::build(listener.map(map), Some(registration))
    }

    /// One-shot adapter: `Loading`, then whatever `work` resolves to.
    pub fn once<Fut>(work: Fut) -> Self
    where
        Fut: Future<Output = Resource<T>> + Send + 'static,
    {
        Self::build(stream::once(work), None)
    }

    /// `Loading`, then `state`, without touching any backend.
    pub fn ready(state: Resource<T>) -> Self {
        Self::build(stream::once(future::ready(state)), None)
    }

    /// `Loading`, then `Error(message)`.
    pub fn failed(message: impl Display) -> Self {
        Self::ready(Resource::Error(message.to_string()))
    }

    /// `Loading`, then every state produced by `states`.
    pub fn from_states(states: impl Stream<Item = Resource<T>> + Send + 'static) -> Self {
        Self::build(states, None)
    }
}

impl<T> ResourceStream<T> {
    /// Next state, or `None` once the stream has ended or been cancelled.
    pub async fn recv(&mut self) -> Option<Resource<T>> {
        self.inner.next().await
    }

    /// Skips `Loading` states and returns the first terminal one.
    pub async fn settle(&mut self) -> Option<Resource<T>> {
        while let Some(state) = self.recv().await {
            if state.is_terminal() {
                return Some(state);
            }
        }
        None
    }

    /// Stops the stream and unregisters its remote listener. Safe to call
    /// any number of times.
    pub fn unsubscribe(&self) {
        self.cancel.abort();
        if let Some(registration) = &self.registration {
            registration.remove();
        }
    }

    pub fn is_unsubscribed(&self) -> bool {
        self.cancel.is_aborted()
    }
}

impl<T> Stream for ResourceStream<T> {
    type Item = Resource<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl<T> std::fmt::Debug for ResourceStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceStream")
            .field("unsubscribed", &self.is_unsubscribed())
            .field("registration", &self.registration)
            .finish_non_exhaustive()
    }
}
