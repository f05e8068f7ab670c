//! Session state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐
//! │  Uninitialized  │ (initial)
//! └────────┬────────┘
//!          │ Initialize / LoginAttempt
//!          ▼
//! ┌─────────────────┐   NoSession / LoadFailed   ┌─────────────────┐
//! │     Loading     │ ─────────────────────────► │    Anonymous    │
//! └────────┬────────┘                            └─────────────────┘
//!          │                                              ▲
//!          │ UserLoaded              SessionExpired       │ RefreshFailed
//!          ▼                                              │
//! ┌─────────────────┐   RefreshStarted           ┌────────┴────────┐
//! │  Authenticated  │ ─────────────────────────► │   Refreshing    │
//! │                 │ ◄───────────────────────── │                 │
//! └─────────────────┘   RefreshSucceeded         └─────────────────┘
//!
//! Logout leads to Anonymous from every state.
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};

// Generates module `session_machine` with State, Input and the
// StateMachine alias.
state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(Uninitialized)

    Uninitialized => {
        Initialize => Loading,
        LoginAttempt => Loading,
        RefreshStarted => Refreshing,
        Logout => Anonymous
    },
    Loading => {
        // Persisted token absent
        NoSession => Anonymous,
        // Persisted token expired or rejected by the service
        SessionExpired => Refreshing,
        UserLoaded => Authenticated,
        LoadFailed => Anonymous,
        LoginAttempt => Loading,
        Logout => Anonymous
    },
    Anonymous => {
        Initialize => Loading,
        LoginAttempt => Loading,
        RefreshStarted => Refreshing,
        Logout => Anonymous
    },
    Authenticated => {
        // Background refresh keeps the user signed in
        RefreshStarted => Refreshing,
        LoginAttempt => Loading,
        Logout => Anonymous
    },
    Refreshing => {
        RefreshStarted => Refreshing,
        RefreshSucceeded => Authenticated,
        RefreshFailed => Anonymous,
        LoginAttempt => Loading,
        Logout => Anonymous
    }
}

pub use session_machine::Input as SessionMachineInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// Session phase for external consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Controller created, startup check not run yet.
    Uninitialized,
    /// Startup check or login/signup in flight.
    Loading,
    /// No session.
    Anonymous,
    /// Signed in with a user and access token.
    Authenticated,
    /// Obtaining a new access token.
    Refreshing,
}

impl SessionPhase {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionPhase::Authenticated)
    }

    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SessionPhase::Uninitialized | SessionPhase::Loading | SessionPhase::Refreshing
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Uninitialized => "uninitialized",
            SessionPhase::Loading => "loading",
            SessionPhase::Anonymous => "anonymous",
            SessionPhase::Authenticated => "authenticated",
            SessionPhase::Refreshing => "refreshing",
        }
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&SessionMachineState> for SessionPhase {
    fn from(state: &SessionMachineState) -> Self {
        match state {
            SessionMachineState::Uninitialized => SessionPhase::Uninitialized,
            SessionMachineState::Loading => SessionPhase::Loading,
            SessionMachineState::Anonymous => SessionPhase::Anonymous,
            SessionMachineState::Authenticated => SessionPhase::Authenticated,
            SessionMachineState::Refreshing => SessionPhase::Refreshing,
        }
    }
}

/// Background work whose failures have no caller to return to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundOperation {
    StartupCheck,
    ExpiryRefresh,
}

/// Notification delivered to the host's event callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    PhaseChanged {
        phase: SessionPhase,
        #[serde(skip_serializing_if = "Option::is_none")]
        email: Option<String>,
    },
    BackgroundError {
        operation: BackgroundOperation,
        message: String,
    },
}
