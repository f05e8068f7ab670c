//! Session controller: owns the signed-in user and the access token.
//!
//! One [`SessionController`] exists per application. It is created with
//! [`SessionController::new`], shared as an `Arc`, and torn down with
//! [`SessionController::shutdown`] (or by dropping the last reference).

use crate::api::AuthApiClient;
use crate::error::{ApiError, AuthError, AuthResult};
use crate::session_fsm::{
    BackgroundOperation, SessionEvent, SessionMachine, SessionMachineInput, SessionPhase,
};
use crate::types::{AuthResponse, LoginRequest, RefreshTokenRequest, SignupRequest, UserResponse};
use acme_config::Config;
use acme_token_store::{
    is_token_expired, is_token_expiring_soon, roles_from_token, scopes_from_token,
    tenant_id_from_token, TokenStore,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Callback type for session event notifications.
pub type SessionEventCallback = Box<dyn Fn(SessionEvent) + Send + Sync>;

/// Background behaviour of a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Refresh access tokens that are about to expire.
    pub auto_refresh: bool,
    /// Time between expiry checks.
    pub expiry_check_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auto_refresh: true,
            expiry_check_interval: Duration::from_secs(
                acme_config::DEFAULT_EXPIRY_CHECK_INTERVAL_SECS,
            ),
        }
    }
}

impl From<&Config> for SessionConfig {
    fn from(config: &Config) -> Self {
        Self {
            auto_refresh: config.auto_refresh,
            expiry_check_interval: config.expiry_check_interval(),
        }
    }
}

/// Point-in-time view of the session, as UI code consumes it.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub user: Option<UserResponse>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub error: Option<ApiError>,
    pub roles: Vec<String>,
    pub scopes: Vec<String>,
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone)]
struct SessionState {
    user: Option<UserResponse>,
    access_token: Option<String>,
    is_loading: bool,
    error: Option<ApiError>,
}

impl Default for SessionState {
    fn default() -> Self {
        // Loading until the startup check has run.
        Self {
            user: None,
            access_token: None,
            is_loading: true,
            error: None,
        }
    }
}

/// Session controller with FSM-based phase tracking.
///
/// Roles, scopes and tenant are decoded from the current access token on
/// every read and are advisory only; the auth service re-validates each
/// protected call.
///
/// Concurrent operations are not serialized: if `login` and `logout` race,
/// whichever finishes last decides the final state.
pub struct SessionController {
    api: AuthApiClient,
    tokens: TokenStore,
    config: SessionConfig,
    state: Mutex<SessionState>,
    fsm: Mutex<SessionMachine>,
    event_callback: Mutex<Option<Arc<dyn Fn(SessionEvent) + Send + Sync>>>,
    expiry_watch: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
    weak_self: Weak<SessionController>,
}

impl SessionController {
    /// Create a controller. Call [`initialize`](Self::initialize) to restore a
    /// persisted session.
    pub fn new(api: AuthApiClient, tokens: TokenStore, config: SessionConfig) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            api,
            tokens,
            config,
            state: Mutex::new(SessionState::default()),
            fsm: Mutex::new(SessionMachine::new()),
            event_callback: Mutex::new(None),
            expiry_watch: Mutex::new(None),
            closed: AtomicBool::new(false),
            weak_self: weak_self.clone(),
        })
    }

    /// Set a callback to be notified of phase changes and background errors.
    ///
    /// The callback runs on whichever task caused the event.
    pub fn set_event_callback(&self, callback: SessionEventCallback) {
        *self.event_callback.lock() = Some(Arc::from(callback));
    }

    pub fn api(&self) -> &AuthApiClient {
        &self.api
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn phase(&self) -> SessionPhase {
        SessionPhase::from(self.fsm.lock().state())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock().clone();
        let token = state.access_token.as_deref();

        SessionSnapshot {
            phase: self.phase(),
            is_authenticated: state.user.is_some() && token.is_some(),
            is_loading: state.is_loading,
            roles: token.map(roles_from_token).unwrap_or_default(),
            scopes: token.map(scopes_from_token).unwrap_or_default(),
            tenant_id: token.and_then(tenant_id_from_token),
            user: state.user,
            error: state.error,
        }
    }

    pub fn user(&self) -> Option<UserResponse> {
        self.state.lock().user.clone()
    }

    /// The in-memory access token of the current session.
    pub fn access_token(&self) -> Option<String> {
        self.state.lock().access_token.clone()
    }

    /// Last error from login or signup.
    pub fn error(&self) -> Option<ApiError> {
        self.state.lock().error.clone()
    }

    pub fn clear_error(&self) {
        self.update_state(|state| state.error = None);
    }

    pub fn is_authenticated(&self) -> bool {
        let state = self.state.lock();
        state.user.is_some() && state.access_token.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().is_loading
    }

    pub fn roles(&self) -> Vec<String> {
        self.access_token()
            .map(|token| roles_from_token(&token))
            .unwrap_or_default()
    }

    pub fn scopes(&self) -> Vec<String> {
        self.access_token()
            .map(|token| scopes_from_token(&token))
            .unwrap_or_default()
    }

    pub fn tenant_id(&self) -> Option<String> {
        self.access_token()
            .and_then(|token| tenant_id_from_token(&token))
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles().iter().any(|r| r == role)
    }

    /// True if the token carries at least one of `roles`. False for an empty list.
    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        contains_any(&self.roles(), roles)
    }

    /// True if the token carries every one of `roles`. True for an empty list.
    pub fn has_all_roles<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        contains_all(&self.roles(), roles)
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes().iter().any(|s| s == scope)
    }

    pub fn has_any_scope<S: AsRef<str>>(&self, scopes: &[S]) -> bool {
        contains_any(&self.scopes(), scopes)
    }

    pub fn has_all_scopes<S: AsRef<str>>(&self, scopes: &[S]) -> bool {
        contains_all(&self.scopes(), scopes)
    }

    /// Restore the persisted session on startup.
    ///
    /// Returns:
    /// - `Ok(true)` if a session was restored (possibly after a refresh)
    /// - `Ok(false)` if no session was persisted
    /// - `Err` if the persisted session could not be refreshed (tokens are
    ///   cleared) or the current user could not be fetched (tokens are kept)
    ///
    /// Errors are also reported to the event callback. Loading is cleared
    /// in every case.
    pub async fn initialize(&self) -> AuthResult<bool> {
        self.advance(&SessionMachineInput::Initialize);
        self.update_state(|state| state.is_loading = true);

        let result = self.restore_session().await;

        self.update_state(|state| state.is_loading = false);
        if let Err(e) = &result {
            self.report_background_error(BackgroundOperation::StartupCheck, e);
        }
        result
    }

    async fn restore_session(&self) -> AuthResult<bool> {
        let Some(access_token) = self.tokens.get_access_token() else {
            info!("No persisted session found on startup");
            self.advance(&SessionMachineInput::NoSession);
            return Ok(false);
        };

        if is_token_expired(&access_token) {
            info!("Persisted access token expired, attempting refresh");
            self.advance(&SessionMachineInput::SessionExpired);
            self.refresh_access_token().await?;
            return Ok(true);
        }

        match self.api.get_current_user(&access_token).await {
            Ok(user) => {
                info!(email = %user.email, "Session restored on startup");
                self.set_authenticated(user, access_token);
                self.advance(&SessionMachineInput::UserLoaded);
                Ok(true)
            }
            Err(e) if e.is_unauthorized() => {
                info!("Persisted access token rejected, attempting refresh");
                self.advance(&SessionMachineInput::SessionExpired);
                self.refresh_access_token().await?;
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "Failed to load current user on startup");
                self.advance(&SessionMachineInput::LoadFailed);
                Err(e)
            }
        }
    }

    /// Log in with email and password.
    ///
    /// API errors are stored (see [`error`](Self::error)) and returned.
    pub async fn login(&self, request: &LoginRequest) -> AuthResult<UserResponse> {
        debug!(email = %request.email, "Attempting login");
        self.begin_auth_operation();

        let result = self.login_inner(request).await;

        self.finish_auth_operation("Login", &result);
        result
    }

    async fn login_inner(&self, request: &LoginRequest) -> AuthResult<UserResponse> {
        let response = self.api.login(request).await?;
        self.establish_session(response).await
    }

    /// Create an account and sign in to it.
    ///
    /// API errors are stored (see [`error`](Self::error)) and returned.
    pub async fn signup(&self, request: &SignupRequest) -> AuthResult<UserResponse> {
        debug!(email = %request.email, tenant = %request.tenant_slug, "Attempting signup");
        self.begin_auth_operation();

        let result = self.signup_inner(request).await;

        self.finish_auth_operation("Signup", &result);
        result
    }

    async fn signup_inner(&self, request: &SignupRequest) -> AuthResult<UserResponse> {
        let response = self.api.signup(request).await?;
        self.establish_session(response).await
    }

    fn begin_auth_operation(&self) {
        self.advance(&SessionMachineInput::LoginAttempt);
        self.update_state(|state| {
            state.is_loading = true;
            state.error = None;
        });
    }

    fn finish_auth_operation(&self, operation: &str, result: &AuthResult<UserResponse>) {
        match result {
            Ok(user) => info!(email = %user.email, "{} successful", operation),
            Err(e) => {
                warn!(error = %e, "{} failed", operation);
                if let AuthError::Api(api_error) = e {
                    let api_error = api_error.clone();
                    self.update_state(|state| state.error = Some(api_error));
                }
                // A failed re-login leaves the previous session in place.
                let input = if self.is_authenticated() {
                    SessionMachineInput::UserLoaded
                } else {
                    SessionMachineInput::LoadFailed
                };
                self.advance(&input);
            }
        }
        self.update_state(|state| state.is_loading = false);
    }

    async fn establish_session(&self, response: AuthResponse) -> AuthResult<UserResponse> {
        self.tokens
            .set_tokens(&response.access_token, &response.refresh_token);

        let user = self.api.get_current_user(&response.access_token).await?;

        self.set_authenticated(user.clone(), response.access_token);
        self.advance(&SessionMachineInput::UserLoaded);
        Ok(user)
    }

    /// Clear persisted tokens and the in-memory session. Idempotent.
    pub fn logout(&self) {
        self.end_session(SessionMachineInput::Logout);
        info!("Logged out");
    }

    /// Exchange the persisted refresh token for a new access token.
    ///
    /// The refresh token itself is kept as is. On any failure, including a
    /// missing refresh token (which never reaches the network), the session
    /// is cleared and the error returned.
    pub async fn refresh_access_token(&self) -> AuthResult<()> {
        self.advance(&SessionMachineInput::RefreshStarted);

        match self.try_refresh().await {
            Ok(()) => {
                self.advance(&SessionMachineInput::RefreshSucceeded);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, clearing session");
                self.end_session(SessionMachineInput::RefreshFailed);
                Err(e)
            }
        }
    }

    async fn try_refresh(&self) -> AuthResult<()> {
        let refresh_token = self
            .tokens
            .get_refresh_token()
            .ok_or(AuthError::NoRefreshToken)?;

        let response = self
            .api
            .refresh_token(&RefreshTokenRequest { refresh_token })
            .await?;
        self.tokens.set_access_token(&response.access_token);

        let user = self.api.get_current_user(&response.access_token).await?;
        info!(email = %user.email, "Access token refreshed");
        self.set_authenticated(user, response.access_token);
        Ok(())
    }

    /// Refresh if the current access token expires within the warning window.
    ///
    /// Returns whether a refresh happened. This is what the expiry watch runs
    /// on every tick.
    pub async fn refresh_if_expiring_soon(&self) -> AuthResult<bool> {
        if !self.is_authenticated() {
            return Ok(false);
        }
        let Some(token) = self.access_token() else {
            return Ok(false);
        };
        if !is_token_expiring_soon(&token) {
            return Ok(false);
        }

        info!("Access token expiring soon, refreshing");
        self.refresh_access_token().await?;
        Ok(true)
    }

    /// Stop background work and freeze in-memory state.
    ///
    /// Operations still in flight may persist tokens when they complete, but
    /// no longer change the user, token, error or phase held here.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop_expiry_watch();
        debug!("Session controller shut down");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn set_authenticated(&self, user: UserResponse, access_token: String) {
        self.update_state(|state| {
            state.user = Some(user);
            state.access_token = Some(access_token);
        });
        self.start_expiry_watch();
    }

    fn end_session(&self, input: SessionMachineInput) {
        self.stop_expiry_watch();
        self.tokens.clear_tokens();
        self.update_state(|state| {
            state.user = None;
            state.access_token = None;
            state.error = None;
        });
        if self.transition(&input).is_err() {
            self.advance(&SessionMachineInput::Logout);
        }
    }

    fn update_state(&self, f: impl FnOnce(&mut SessionState)) {
        if self.is_closed() {
            debug!("Session controller closed, ignoring state update");
            return;
        }
        f(&mut self.state.lock());
    }

    /// Transition the FSM and notify the callback if the phase changed.
    fn transition(&self, input: &SessionMachineInput) -> AuthResult<SessionPhase> {
        let mut fsm = self.fsm.lock();
        let old_phase = SessionPhase::from(fsm.state());

        if self.is_closed() {
            return Ok(old_phase);
        }

        fsm.consume(input).map_err(|_| {
            AuthError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                fsm.state()
            ))
        })?;

        let new_phase = SessionPhase::from(fsm.state());
        drop(fsm);

        if old_phase != new_phase {
            debug!(
                old_phase = %old_phase,
                new_phase = %new_phase,
                "Session phase transition"
            );
            let email = self.state.lock().user.as_ref().map(|u| u.email.clone());
            self.emit(SessionEvent::PhaseChanged {
                phase: new_phase,
                email,
            });
        }

        Ok(new_phase)
    }

    /// Best-effort transition. Overlapping operations can make an input
    /// invalid for the current phase; that is logged and ignored.
    fn advance(&self, input: &SessionMachineInput) {
        if let Err(e) = self.transition(input) {
            debug!(error = %e, "Ignoring session transition");
        }
    }

    fn emit(&self, event: SessionEvent) {
        let callback = self.event_callback.lock().clone();
        if let Some(callback) = callback {
            callback(event);
        }
    }

    fn report_background_error(&self, operation: BackgroundOperation, error: &AuthError) {
        warn!(operation = ?operation, error = %error, "Background session operation failed");
        self.emit(SessionEvent::BackgroundError {
            operation,
            message: error.to_string(),
        });
    }

    fn start_expiry_watch(&self) {
        if !self.config.auto_refresh || self.is_closed() {
            return;
        }

        let mut slot = self.expiry_watch.lock();
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime available, expiry watch not started");
            return;
        };

        let session = self.weak_self.clone();
        let interval = self.config.expiry_check_interval.max(Duration::from_millis(1));
        debug!(interval_secs = interval.as_secs_f64(), "Starting expiry watch");

        *slot = Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let Some(session) = session.upgrade() else {
                    break;
                };
                if session.is_closed() {
                    break;
                }
                if let Err(e) = session.refresh_if_expiring_soon().await {
                    session.report_background_error(BackgroundOperation::ExpiryRefresh, &e);
                }
            }
        }));
    }

    fn stop_expiry_watch(&self) {
        if let Some(handle) = self.expiry_watch.lock().take() {
            handle.abort();
            debug!("Stopped expiry watch");
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(handle) = self.expiry_watch.get_mut().take() {
            handle.abort();
        }
    }
}

fn contains_any<S: AsRef<str>>(have: &[String], wanted: &[S]) -> bool {
    wanted
        .iter()
        .any(|w| have.iter().any(|h| h == w.as_ref()))
}

fn contains_all<S: AsRef<str>>(have: &[String], wanted: &[S]) -> bool {
    wanted
        .iter()
        .all(|w| have.iter().any(|h| h == w.as_ref()))
}
