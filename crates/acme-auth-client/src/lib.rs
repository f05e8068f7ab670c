//! Client-side session lifecycle against the acme auth service.
//!
//! This crate provides:
//! - [`AuthApiClient`]: typed calls to `/signup`, `/login`, `/refresh` and `/me`
//! - [`SessionController`]: owned session state with login/signup/logout,
//!   startup restore and proactive refresh of expiring access tokens
//! - [`AuthenticatedClient`]: bearer-token requests with one retry after a
//!   silent refresh
//! - An explicit FSM tracking the session phase
//!
//! Roles, scopes and tenant exposed by the session come from unverified
//! token claims (see `acme_token_store`). They drive UI only; the auth
//! service re-validates every protected call.

mod api;
mod authenticated;
mod error;
mod session;
mod session_fsm;
mod types;

pub use api::AuthApiClient;
pub use authenticated::{AuthenticatedClient, MAX_AUTH_RETRIES};
pub use error::{ApiError, AuthError, AuthResult, ErrorCode, ErrorResponse, FieldError};
pub use session::{SessionConfig, SessionController, SessionEventCallback, SessionSnapshot};
pub use session_fsm::session_machine;
pub use session_fsm::{
    BackgroundOperation, SessionEvent, SessionMachine, SessionMachineInput, SessionMachineState,
    SessionPhase,
};
pub use types::{AuthResponse, LoginRequest, RefreshTokenRequest, SignupRequest, UserResponse};
