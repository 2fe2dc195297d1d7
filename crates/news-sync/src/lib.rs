//! # News sync
//!
//! Adapters between the remote services and application state. Every
//! operation returns a [`ResourceStream`] that starts with
//! `Resource::Loading`:
//!
//! - live reads keep emitting one `Success` (or `Error`) per remote snapshot
//!   until they are unsubscribed or dropped
//! - one-shot reads and writes emit a single terminal state and end
//!
//! ```text
//!   NewsRepository ──┐                       ┌── DocumentStore
//!                    ├── ResourceStream<T> ◀─┤
//!   AuthRepository ──┘                       └── AuthProvider
//! ```
//!
//! Failures never escape as Rust errors: they become `Resource::Error`
//! with a message fit for display.

mod auth;
mod codec;
mod news;
mod stream;

pub use auth::AuthRepository;
pub use news::{NewsRepository, RepositoryConfig};
pub use stream::ResourceStream;
