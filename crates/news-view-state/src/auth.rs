//! State behind the login, registration and settings screens.

use std::sync::Arc;

use news_model::validation::{validate_login, validate_registration};
use news_model::User;
use news_sync::AuthRepository;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::feed::{drive, ignore, Mode, OnError, Owner};
use crate::slot::{Slot, SlotState};

/// Observable session state.
#[derive(Clone)]
pub struct AuthViewState {
    inner: Arc<AuthInner>,
}

struct AuthInner {
    repo: AuthRepository,
    runtime: Handle,
    current_user: Slot<Option<User>>,
    is_admin: Slot<bool>,
    auth_action: Slot<User>,
    sign_out: Slot<()>,
    error_message: watch::Sender<Option<String>>,
}

impl Owner for AuthInner {
    fn runtime(&self) -> &Handle {
        &self.runtime
    }

    fn report(&self, message: String) {
        warn!(%message, "auth operation failed");
        self.error_message.send_replace(Some(message));
    }
}

impl AuthViewState {
    pub fn new(repo: AuthRepository, runtime: Handle) -> Self {
        let (error_message, _) = watch::channel(None);
        Self {
            inner: Arc::new(AuthInner {
                repo,
                runtime,
                current_user: Slot::new(),
                is_admin: Slot::new(),
                auth_action: Slot::new(),
                sign_out: Slot::new(),
                error_message,
            }),
        }
    }

    /// Follows the session. Each signed-in profile triggers an admin check;
    /// signing out resets the admin flag.
    pub fn start(&self) {
        let inner = &self.inner;
        drive(
            inner,
            |s| &s.current_user,
            inner.repo.current_user(),
            Mode::Subscription,
            OnError::Surface,
            |owner: &Arc<AuthInner>, user: Option<User>| match user {
                Some(_) => owner.check_admin(),
                None => {
                    owner.is_admin.set(SlotState::Success(false));
                }
            },
        );
    }

    pub fn sign_in(&self, email: &str, password: &str) {
        let inner = &self.inner;
        if let Err(e) = validate_login(email, password) {
            inner.reject(e.to_string());
            return;
        }
        inner.clear_error();
        drive(
            inner,
            |s| &s.auth_action,
            inner.repo.sign_in(email, password),
            Mode::OneShot,
            OnError::Surface,
            |owner: &Arc<AuthInner>, user: User| {
                info!(user_id = %user.id, "signed in from form");
                owner.check_admin();
            },
        );
    }

    pub fn register(&self, display_name: &str, email: &str, password: &str, confirm_password: &str) {
        let inner = &self.inner;
        if let Err(e) = validate_registration(display_name, email, password, confirm_password) {
            inner.reject(e.to_string());
            return;
        }
        inner.clear_error();
        drive(
            inner,
            |s| &s.auth_action,
            inner.repo.register(email, password, display_name),
            Mode::OneShot,
            OnError::Surface,
            ignore,
        );
    }

    pub fn sign_out(&self) {
        let inner = &self.inner;
        drive(
            inner,
            |s| &s.sign_out,
            inner.repo.sign_out(),
            Mode::OneShot,
            OnError::Surface,
            |owner: &Arc<AuthInner>, ()| {
                owner.is_admin.set(SlotState::Success(false));
                owner.clear_error();
            },
        );
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.inner.current_user.current(), SlotState::Success(Some(_)))
    }

    pub fn is_admin_now(&self) -> bool {
        self.inner.is_admin.current() == SlotState::Success(true)
    }

    pub fn clear_error(&self) {
        self.inner.clear_error();
    }

    pub fn reset_auth_action(&self) {
        self.inner.auth_action.set(SlotState::Idle);
    }

    pub fn current_user(&self) -> watch::Receiver<SlotState<Option<User>>> {
        self.inner.current_user.subscribe()
    }

    pub fn is_admin(&self) -> watch::Receiver<SlotState<bool>> {
        self.inner.is_admin.subscribe()
    }

    /// Result of the last sign-in or registration.
    pub fn auth_action(&self) -> watch::Receiver<SlotState<User>> {
        self.inner.auth_action.subscribe()
    }

    pub fn sign_out_state(&self) -> watch::Receiver<SlotState<()>> {
        self.inner.sign_out.subscribe()
    }

    pub fn error_message(&self) -> watch::Receiver<Option<String>> {
        self.inner.error_message.subscribe()
    }
}

impl AuthInner {
    fn clear_error(&self) {
        self.error_message.send_replace(None);
    }

    /// Form input failed validation; nothing is sent to the provider.
    fn reject(&self, message: String) {
        self.auth_action.set(SlotState::Error(message.clone()));
        self.error_message.send_replace(Some(message));
    }

    fn check_admin(self: &Arc<Self>) {
        drive(
            self,
            |s| &s.is_admin,
            self.repo.is_current_user_admin(),
            Mode::OneShot,
            OnError::Surface,
            ignore,
        );
    }
}
