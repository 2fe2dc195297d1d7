//! # Document store boundary
//!
//! The hosted document database, reduced to the operations the news
//! application uses: point reads, filtered and ordered queries, live
//! listeners, whole-document writes and field-level updates.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  get / query / set / update / delete   ┌──────────────┐
//! │   adapters   │ ──────────────────────────────────────▶│ DocumentStore│
//! │ (news-sync)  │ ◀──────────── Listener<Snapshot> ──────│   (trait)    │
//! └──────────────┘                                        └──────┬───────┘
//!                                                                │
//!                                                         ┌──────▼───────┐
//!                                                         │ MemoryStore  │
//!                                                         └──────────────┘
//! ```
//!
//! ## Design Principles
//!
//! - Listeners are owned handles: dropping a [`Listener`] or calling
//!   [`ListenerRegistration::remove`] unregisters it, and removal is
//!   idempotent
//! - Every listener first receives the current snapshot, then one snapshot
//!   per change that affects it
//! - Writers never wait on listeners

mod document;
mod error;
mod listener;
mod memory;
mod query;
mod store;

pub use document::{
    Document, DocumentSnapshot, DocumentWrite, FieldChange, FieldOp, Fields, QuerySnapshot,
};
pub use error::{StoreError, StoreResult};
pub use listener::{Listener, ListenerRegistration};
pub use memory::{MemoryStore, StoreCall, StoreOp};
pub use query::{Direction, Filter, OrderBy, Query};
pub use store::DocumentStore;

/// Maximum values a single `in` filter may carry unless configured otherwise.
pub const DEFAULT_MAX_IN_VALUES: usize = 10;
