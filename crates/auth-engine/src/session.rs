use std::fmt;
use std::sync::Arc;

use crate::{AuthProvider, AuthUser};

/// Handle to the current session, passed explicitly to whoever needs the
/// signed-in user. Every call asks the provider again, so sign-in and
/// sign-out are visible immediately to all holders.
#[derive(Clone)]
pub struct SessionContext {
    provider: Arc<dyn AuthProvider>,
}

impl SessionContext {
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        Self { provider }
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.provider.current_user()
    }

    pub fn is_signed_in(&self) -> bool {
        self.current_user().is_some()
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("user", &self.current_user().map(|u| u.user_id))
            .finish_non_exhaustive()
    }
}
