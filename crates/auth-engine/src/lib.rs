//! # Auth engine
//!
//! Boundary to the managed authentication service.
//!
//! - [`AuthProvider`]: sign-in, registration, sign-out and a session
//!   change stream
//! - [`MemoryAuthProvider`]: in-process accounts for demos and tests
//! - [`SessionContext`]: explicit handle to the signed-in user, resolved
//!   fresh on every call instead of read from process-wide state

mod error;
mod memory;
mod provider;
mod session;

pub use error::{AuthError, AuthResult};
pub use memory::MemoryAuthProvider;
pub use provider::{AuthProvider, AuthUser};
pub use session::SessionContext;
