//! One observable state cell per UI concern.

use news_model::Resource;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::trace;

/// What a slot currently shows.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SlotState<T> {
    /// Nothing requested yet.
    #[default]
    Idle,
    Loading,
    Success(T),
    Error(String),
}

impl<T> SlotState<T> {
    pub fn is_idle(&self) -> bool {
        matches!(self, SlotState::Idle)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SlotState::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            SlotState::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            SlotState::Error(message) => Some(message),
            _ => None,
        }
    }
}

impl<T> From<Resource<T>> for SlotState<T> {
    fn from(resource: Resource<T>) -> Self {
        match resource {
            Resource::Loading => SlotState::Loading,
            Resource::Success(data) => SlotState::Success(data),
            Resource::Error(message) => SlotState::Error(message),
        }
    }
}

struct Control {
    generation: u64,
    feeder: Option<AbortHandle>,
}

/// A watched [`SlotState`] whose latest operation wins.
///
/// Every [`begin`](Self::begin) starts a new generation; [`publish`](Self::publish)
/// only lands for the current one. A subscription feeding the slot is
/// aborted as soon as it is superseded.
pub(crate) struct Slot<T> {
    state: watch::Sender<SlotState<T>>,
    control: Mutex<Control>,
}

impl<T: Clone> Slot<T> {
    pub(crate) fn new() -> Self {
        let (state, _) = watch::channel(SlotState::Idle);
        Self {
            state,
            control: Mutex::new(Control {
                generation: 0,
                feeder: None,
            }),
        }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SlotState<T>> {
        self.state.subscribe()
    }

    pub(crate) fn current(&self) -> SlotState<T> {
        self.state.borrow().clone()
    }

    /// Starts a new operation in `Loading` and returns its generation.
    pub(crate) fn begin(&self) -> u64 {
        self.start(SlotState::Loading)
    }

    /// Supersedes whatever is running and shows `state` right away.
    pub(crate) fn set(&self, state: SlotState<T>) -> u64 {
        self.start(state)
    }

    fn start(&self, state: SlotState<T>) -> u64 {
        let mut control = self.control.lock();
        control.generation += 1;
        if let Some(previous) = control.feeder.take() {
            previous.abort();
            trace!(generation = control.generation, "superseded subscription aborted");
        }
        self.state.send_replace(state);
        control.generation
    }

    /// Shows `state` if `generation` is still current. Returns whether it did.
    pub(crate) fn publish(&self, generation: u64, state: SlotState<T>) -> bool {
        let control = self.control.lock();
        if control.generation != generation {
            return false;
        }
        self.state.send_replace(state);
        true
    }

    /// Records the subscription task feeding `generation`, aborting it
    /// instead if a newer operation already started.
    pub(crate) fn attach(&self, generation: u64, feeder: AbortHandle) {
        let mut control = self.control.lock();
        if control.generation == generation {
            control.feeder = Some(feeder);
        } else {
            feeder.abort();
        }
    }
}

impl<T> Drop for Slot<T> {
    fn drop(&mut self) {
        if let Some(feeder) = self.control.get_mut().feeder.take() {
            feeder.abort();
        }
    }
}
