//! # News view state
//!
//! Aggregators that turn adapter streams into watchable per-screen state.
//!
//! Each UI concern is a slot moving through
//! `Idle → Loading → (Success | Error)`; consumers observe slots through
//! `tokio::sync::watch` receivers. Operations are spawned on a runtime
//! handle supplied at construction, and the latest invocation of an
//! operation always wins its slot.

mod auth;
mod feed;
mod news;
mod slot;

pub use auth::AuthViewState;
pub use news::NewsViewState;
pub use slot::SlotState;
