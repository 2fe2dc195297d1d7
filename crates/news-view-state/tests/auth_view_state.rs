//! End-to-end tests for the auth aggregator.

use std::sync::Arc;
use std::time::Duration;

use auth_engine::{AuthProvider, MemoryAuthProvider};
use doc_store::{Fields, MemoryStore};
use news_sync::AuthRepository;
use news_view_state::{AuthViewState, SlotState};
use serde_json::json;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::timeout;

fn setup() -> (Arc<MemoryAuthProvider>, MemoryStore, AuthViewState) {
    let auth = Arc::new(MemoryAuthProvider::new());
    let store = MemoryStore::new();
    let repo = AuthRepository::new(auth.clone(), Arc::new(store.clone()));
    let view = AuthViewState::new(repo, Handle::current());
    (auth, store, view)
}

async fn wait_until<T: Clone>(
    rx: &mut watch::Receiver<T>,
    mut ready: impl FnMut(&T) -> bool,
) -> T {
    let state = timeout(Duration::from_secs(5), rx.wait_for(|state| ready(state)))
        .await
        .expect("timed out waiting for state")
        .expect("state sender dropped");
    state.clone()
}

fn admin_profile() -> Fields {
    match json!({ "displayName": "Boss", "admin": true }) {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn signed_out_start_reports_no_user_and_no_admin() {
    let (_auth, _store, view) = setup();
    let mut user = view.current_user();
    let mut admin = view.is_admin();
    view.start();

    assert_eq!(
        wait_until(&mut user, |s| s.data().is_some()).await,
        SlotState::Success(None)
    );
    assert_eq!(
        wait_until(&mut admin, |s| s.data().is_some()).await,
        SlotState::Success(false)
    );
    assert!(!view.is_authenticated());
}

#[tokio::test]
async fn invalid_forms_never_reach_the_backend() {
    let (_auth, store, view) = setup();
    let mut action = view.auth_action();

    view.sign_in("not-an-email", "secret1");
    assert_eq!(
        wait_until(&mut action, |s| !s.is_idle()).await,
        SlotState::Error("Please enter a valid email address".into())
    );

    view.sign_in("a@ndejje.ac.ug", "123");
    assert_eq!(
        action.borrow().error_message(),
        Some("Password must be at least 6 characters")
    );

    view.register("", "a@ndejje.ac.ug", "secret1", "secret1");
    assert_eq!(
        action.borrow().error_message(),
        Some("Please enter a display name")
    );

    view.register("A", "a@ndejje.ac.ug", "secret1", "secret2");
    assert_eq!(action.borrow().error_message(), Some("Passwords do not match"));
    assert_eq!(
        *view.error_message().borrow(),
        Some("Passwords do not match".to_string())
    );
    assert!(store.calls().is_empty());

    view.clear_error();
    assert_eq!(*view.error_message().borrow(), None);
}

#[tokio::test]
async fn admin_sign_in_flows_through_every_slot() {
    let (auth, store, view) = setup();
    let account = auth.add_account("boss@ndejje.ac.ug", "secret1", "Boss").unwrap();
    store.seed("users", account.user_id.as_str(), admin_profile());

    let mut user = view.current_user();
    let mut admin = view.is_admin();
    let mut action = view.auth_action();
    view.start();
    wait_until(&mut user, |s| s.data().is_some()).await;

    view.sign_in("boss@ndejje.ac.ug", "secret1");
    let signed_in = wait_until(&mut action, |s| s.data().is_some()).await;
    assert_eq!(signed_in.data().unwrap().display_name, "Boss");

    wait_until(&mut user, |s| matches!(s, SlotState::Success(Some(_)))).await;
    wait_until(&mut admin, |s| *s == SlotState::Success(true)).await;
    assert!(view.is_authenticated());
    assert!(view.is_admin_now());

    let mut signed_out = view.sign_out_state();
    view.sign_out();
    wait_until(&mut signed_out, |s| *s == SlotState::Success(())).await;
    wait_until(&mut user, |s| *s == SlotState::Success(None)).await;
    wait_until(&mut admin, |s| *s == SlotState::Success(false)).await;
    assert!(!view.is_authenticated());
}

#[tokio::test]
async fn provider_rejections_show_their_messages() {
    let (auth, _store, view) = setup();
    auth.add_account("taken@ndejje.ac.ug", "secret1", "T").unwrap();
    let mut action = view.auth_action();

    view.register("T", "taken@ndejje.ac.ug", "secret1", "secret1");
    assert_eq!(
        wait_until(&mut action, |s| s.error_message().is_some()).await,
        SlotState::Error("An account with this email already exists.".into())
    );

    view.sign_in("ghost@ndejje.ac.ug", "secret1");
    assert_eq!(
        wait_until(&mut action, |s| {
            s.error_message() == Some("User not found. Please check your email.")
        })
        .await,
        SlotState::Error("User not found. Please check your email.".into())
    );
    assert!(auth.current_user().is_none());
}

#[tokio::test]
async fn registration_signs_the_new_user_in() {
    let (_auth, store, view) = setup();
    let mut user = view.current_user();
    view.start();
    wait_until(&mut user, |s| s.data().is_some()).await;

    view.register("Newbie", "new@ndejje.ac.ug", "secret1", "secret1");
    let shown = wait_until(&mut user, |s| matches!(s, SlotState::Success(Some(_)))).await;
    let profile = shown.data().unwrap().clone().unwrap();
    assert_eq!(profile.display_name, "Newbie");

    let mut action = view.auth_action();
    wait_until(&mut action, |s| s.data().is_some()).await;
    assert!(store.document("users", profile.id.as_str()).is_some());

    view.reset_auth_action();
    assert!(action.borrow().is_idle());
}
