//! In-memory session state.
//!
//! The snapshot is the single source of truth the UI subscribes to. It
//! mirrors the token store but is updated synchronously; persistence is
//! awaited by the lifecycle operations, and a failed store write never
//! rolls the in-memory state back.

use crate::session_fsm::{SessionMachine, SessionMachineInput, SessionPhase};
use bodega_storage::{SessionVault, UserProfile};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

/// Point-in-time view of the session.
///
/// Invariants: `is_authenticated` equals `access_token.is_some()`, and
/// `user` is only ever populated while authenticated.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub is_authenticated: bool,
    pub access_token: Option<String>,
    pub user: Option<UserProfile>,
    pub is_first_time_user: bool,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            is_authenticated: false,
            access_token: None,
            user: None,
            // Until storage says otherwise, this is a first run
            is_first_time_user: true,
        }
    }
}

/// Events emitted on session transitions. Navigation subscribes to these
/// to redirect to the login screen on a forced sign-out.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A session was established (login, signup, or hydration).
    SignedIn,
    /// The user signed out deliberately.
    SignedOut,
    /// The session was torn down by the pipeline (terminal 401 or failed
    /// refresh).
    ForcedSignOut,
}

/// Shared, observable session state.
pub struct SessionHandle {
    snapshot_tx: watch::Sender<SessionSnapshot>,
    events_tx: broadcast::Sender<SessionEvent>,
    fsm: Mutex<SessionMachine>,
    hydrated: AtomicBool,
}

impl SessionHandle {
    pub fn new() -> Self {
        let (snapshot_tx, _) = watch::channel(SessionSnapshot::default());
        let (events_tx, _) = broadcast::channel(16);

        Self {
            snapshot_tx,
            events_tx,
            fsm: Mutex::new(SessionMachine::new()),
            hydrated: AtomicBool::new(false),
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Subscribe to session events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events_tx.subscribe()
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        let fsm = self.fsm.lock().unwrap();
        SessionPhase::from(fsm.state())
    }

    /// Try the given inputs in order; the first legal transition wins.
    /// Illegal transitions are tolerated (a forced sign-out can arrive in
    /// any phase) and logged at debug.
    fn advance(&self, inputs: &[SessionMachineInput]) {
        let mut fsm = self.fsm.lock().unwrap();
        for input in inputs {
            let before = fsm.state().clone();
            if fsm.consume(input).is_ok() {
                debug!(
                    from = ?before,
                    to = ?fsm.state(),
                    input = ?input,
                    "Session phase transition"
                );
                return;
            }
        }
        debug!(state = ?fsm.state(), inputs = ?inputs, "No legal session phase transition");
    }

    /// Hydrate from the token store at process start. Runs exactly once;
    /// calling it again is a no-op. Storage failures are logged and
    /// hydrate as unauthenticated.
    pub async fn hydrate(&self, vault: &SessionVault) {
        if self.hydrated.swap(true, Ordering::SeqCst) {
            debug!("Session already hydrated, skipping");
            return;
        }

        let access_token = match vault.access_token().await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Could not read access token, hydrating as unauthenticated");
                None
            }
        };

        let user = match vault.cached_user().await {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "Could not read cached user");
                None
            }
        };

        let is_first_time_user = vault.is_first_time_user().await.unwrap_or(true);

        let has_token = access_token.is_some();
        self.snapshot_tx.send_modify(|s| {
            s.is_authenticated = has_token;
            s.access_token = access_token;
            // The cached user only applies to a live session
            s.user = if has_token { user } else { None };
            s.is_first_time_user = is_first_time_user;
        });

        if has_token {
            self.advance(&[SessionMachineInput::SessionRestored]);
            debug!("Session hydrated from storage");
        } else {
            debug!("No stored session found");
        }
    }

    /// A login or signup call is starting.
    pub fn begin_authentication(&self) {
        self.advance(&[SessionMachineInput::StartLogin]);
    }

    /// The login or signup call failed.
    pub fn authentication_failed(&self) {
        self.advance(&[SessionMachineInput::LoginFailed]);
    }

    /// A session is now live with the given access token.
    pub fn mark_authenticated(&self, access_token: &str) {
        let was_authenticated = self.snapshot_tx.borrow().is_authenticated;

        self.advance(&[
            SessionMachineInput::LoginSucceeded,
            SessionMachineInput::RefreshSucceeded,
            SessionMachineInput::SessionRestored,
        ]);

        self.snapshot_tx.send_modify(|s| {
            s.is_authenticated = true;
            s.access_token = Some(access_token.to_string());
        });

        if !was_authenticated {
            let _ = self.events_tx.send(SessionEvent::SignedIn);
        }
    }

    /// Attach the user profile to the session. Ignored while
    /// unauthenticated: `user` must never be populated without a token.
    pub fn set_user(&self, user: UserProfile) {
        if !self.snapshot_tx.borrow().is_authenticated {
            warn!("Ignoring user profile update while unauthenticated");
            return;
        }
        self.snapshot_tx.send_modify(|s| s.user = Some(user));
    }

    /// Mark the first-time flow as complete.
    pub fn complete_first_time_flow(&self) {
        self.snapshot_tx.send_modify(|s| s.is_first_time_user = false);
    }

    /// A token refresh is starting.
    pub fn note_refreshing(&self) {
        self.advance(&[SessionMachineInput::StartRefresh]);
    }

    /// Logout teardown is starting.
    pub fn begin_sign_out(&self) {
        self.advance(&[SessionMachineInput::StartLogout]);
    }

    /// Deliberate logout completed.
    pub fn mark_signed_out(&self) {
        let was_authenticated = self.snapshot_tx.borrow().is_authenticated;

        self.advance(&[
            SessionMachineInput::LogoutCompleted,
            SessionMachineInput::SessionInvalidated,
        ]);
        self.clear_session_fields();

        if was_authenticated {
            let _ = self.events_tx.send(SessionEvent::SignedOut);
        }
    }

    /// Immediate forced downgrade, used by the pipeline on an
    /// unrecoverable 401. Emits [`SessionEvent::ForcedSignOut`] once per
    /// downgrade: repeated calls while already signed out stay silent.
    pub fn force_unauthenticated(&self) {
        let was_authenticated = self.snapshot_tx.borrow().is_authenticated;

        self.advance(&[
            SessionMachineInput::SessionInvalidated,
            SessionMachineInput::RefreshFailed,
            SessionMachineInput::LoginFailed,
        ]);
        self.clear_session_fields();

        if was_authenticated {
            let _ = self.events_tx.send(SessionEvent::ForcedSignOut);
        }
    }

    fn clear_session_fields(&self) {
        self.snapshot_tx.send_modify(|s| {
            s.is_authenticated = false;
            s.access_token = None;
            s.user = None;
        });
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}
