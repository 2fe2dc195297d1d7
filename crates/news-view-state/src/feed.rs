//! Pumps adapter streams into slots on the runtime.

use std::sync::Arc;

use news_model::Resource;
use news_sync::ResourceStream;
use tokio::runtime::Handle;
use tracing::debug;

use crate::slot::{Slot, SlotState};

/// Aggregator that owns slots and a shared error message.
pub(crate) trait Owner: Send + Sync + 'static {
    fn runtime(&self) -> &Handle;

    /// Surfaces an operation failure to the user.
    fn report(&self, message: String);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    /// Keeps emitting until superseded; aborted when replaced.
    Subscription,
    /// Runs to completion; a superseded result is dropped.
    OneShot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OnError {
    /// Slot shows the error and the owner reports it.
    Surface,
    /// Slot shows the empty value instead; nothing is reported.
    Collapse,
}

/// Starts a new operation on the slot picked by `select` and feeds it from
/// `states`. `on_success` runs after each `Success` lands in the slot.
pub(crate) fn drive<O, T, F>(
    owner: &Arc<O>,
    select: fn(&O) -> &Slot<T>,
    mut states: ResourceStream<T>,
    mode: Mode,
    on_error: OnError,
    mut on_success: F,
) where
    O: Owner,
    T: Clone + Default + Send + Sync + 'static,
    F: FnMut(&Arc<O>, T) + Send + 'static,
{
    let generation = select(owner).begin();
    let weak = Arc::downgrade(owner);

    let task = owner.runtime().spawn(async move {
        while let Some(state) = states.recv().await {
            if state.is_loading() {
                continue;
            }
            let Some(owner) = weak.upgrade() else {
                break;
            };
            let state = match (state, on_error) {
                (Resource::Error(message), OnError::Collapse) => {
                    debug!(%message, "hiding failure");
                    Resource::Success(T::default())
                }
                (state, _) => state,
            };
            if !select(&owner).publish(generation, SlotState::from(state.clone())) {
                debug!(generation, "dropping superseded result");
                break;
            }
            match state {
                Resource::Success(data) => on_success(&owner, data),
                Resource::Error(message) => owner.report(message),
                Resource::Loading => {}
            }
        }
    });

    if mode == Mode::Subscription {
        select(owner).attach(generation, task.abort_handle());
    }
}

/// `on_success` for operations with no follow-up.
pub(crate) fn ignore<O, T>(_: &Arc<O>, _: T) {}
