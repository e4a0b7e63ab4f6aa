//! # Session State Machine
//!
//! Single authority over the connector's authentication state.
//!
//! ## Overview
//!
//! Several asynchronous signals compete to change the session: the
//! authorization redirect, background token refresh, explicit re-validation
//! and upload failures. They all enter through one serialized transition
//! entry point guarded by a mutex, and each carries the [`Generation`] it was
//! produced under. Inputs older than the current generation are dropped as
//! stale, so a late completion can never overwrite a newer decision.
//!
//! ## Notifications
//!
//! Emitted on the [`EventBus`] while the writer lock is held, so subscribers
//! observe them in acceptance order:
//!
//! - `SessionChanged` whenever the `is_authenticated` projection flips
//! - `ReconnectRequired` on every entry into `Unauthenticated`
//! - `StateChanged` for every accepted transition
//! - `Validated` when the provider accepts the credential
//!
//! ## Usage
//!
//! ```no_run
//! use core_auth::{SessionStateMachine, TokenStore};
//! use core_runtime::config::SessionConfig;
//! use core_runtime::events::EventBus;
//! use std::sync::Arc;
//! # use bridge_traits::{ProviderClient, SecureStore, SystemClock};
//! # async fn example(store: Arc<dyn SecureStore>, provider: Arc<dyn ProviderClient>) {
//! let session = SessionStateMachine::new(
//!     TokenStore::new(store, "receipt-connector.session"),
//!     provider,
//!     EventBus::new(100),
//!     Arc::new(SystemClock),
//!     SessionConfig::default(),
//! );
//!
//! // Optimistically connected if a token was stored; validation runs in the background
//! let snapshot = session.restore();
//! session.await_pending_validation().await;
//! println!("connected: {}", session.is_authenticated() && snapshot.is_authenticated);
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::token_store::TokenStore;
use crate::types::{
    AccessToken, Credentials, Generation, SessionSnapshot, SessionState, TransitionOutcome,
};
use bridge_traits::provider::{Identity, ProviderClient, ProviderResult};
use bridge_traits::clock::Clock;
use chrono::{DateTime, Utc};
use core_runtime::config::SessionConfig;
use core_runtime::events::{CoreEvent, EventBus, SessionEvent};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

/// Transition inputs accepted by the state machine
#[derive(Debug)]
enum Input {
    StartAuthorization,
    AuthorizationSucceeded(AccessToken),
    AuthorizationFailed(String),
    AuthorizationCancelled,
    Restore(AccessToken),
    RefreshStarted,
    RefreshSucceeded(AccessToken),
    RefreshFailed(String),
    RefreshAbandoned,
    ValidationFailed(String),
    SignOut,
}

impl Input {
    fn name(&self) -> &'static str {
        match self {
            Input::StartAuthorization => "start_authorization",
            Input::AuthorizationSucceeded(_) => "authorization_succeeded",
            Input::AuthorizationFailed(_) => "authorization_failed",
            Input::AuthorizationCancelled => "authorization_cancelled",
            Input::Restore(_) => "restore",
            Input::RefreshStarted => "token_refresh_started",
            Input::RefreshSucceeded(_) => "token_refresh_succeeded",
            Input::RefreshFailed(_) => "token_refresh_failed",
            Input::RefreshAbandoned => "token_refresh_abandoned",
            Input::ValidationFailed(_) => "explicit_validation_failed",
            Input::SignOut => "sign_out",
        }
    }

    /// Target state for this input, or `None` when it does not apply to `state`.
    fn target(&self, state: SessionState) -> Option<SessionState> {
        use SessionState::*;

        match (self, state) {
            (Input::StartAuthorization, Unauthenticated | Authenticating) => Some(Authenticating),
            (Input::AuthorizationSucceeded(_), Authenticating) => Some(Authenticated),
            (Input::AuthorizationFailed(_) | Input::AuthorizationCancelled, Authenticating) => {
                Some(Unauthenticated)
            }
            (Input::Restore(_), Unauthenticated) => Some(Authenticated),
            (Input::RefreshStarted, Authenticated) => Some(Refreshing),
            (Input::RefreshSucceeded(_) | Input::RefreshAbandoned, Refreshing) => {
                Some(Authenticated)
            }
            (Input::RefreshFailed(_), Refreshing) => Some(Unauthenticated),
            (Input::ValidationFailed(_) | Input::SignOut, state) if state != Unauthenticated => {
                Some(Unauthenticated)
            }
            _ => None,
        }
    }

    fn reconnect_reason(&self) -> String {
        match self {
            Input::AuthorizationFailed(detail) => format!("Authorization failed: {}", detail),
            Input::AuthorizationCancelled => "Authorization cancelled".to_string(),
            Input::RefreshFailed(detail) => format!("Token refresh failed: {}", detail),
            Input::ValidationFailed(reason) => format!("Session expired: {}", reason),
            Input::SignOut => "Signed out".to_string(),
            _ => "Session ended".to_string(),
        }
    }
}

/// Mutable session data, only touched under the writer lock
#[derive(Debug, Default)]
struct SessionCore {
    state: SessionState,
    token: Option<AccessToken>,
    generation: Generation,
}

impl SessionCore {
    fn is_authenticated(&self, now: DateTime<Utc>) -> bool {
        match (self.state, &self.token) {
            (SessionState::Authenticated, Some(_)) => true,
            (SessionState::Refreshing, Some(token)) => !token.is_expired_at(now),
            _ => false,
        }
    }
}

struct Inner {
    core: Mutex<SessionCore>,
    token_store: TokenStore,
    provider: Arc<dyn ProviderClient>,
    event_bus: EventBus,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    pending_validation: Mutex<Option<JoinHandle<()>>>,
}

/// Authentication session for the connector.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct SessionStateMachine {
    inner: Arc<Inner>,
}

impl SessionStateMachine {
    /// Creates a session in the `Unauthenticated` state.
    ///
    /// Call [`restore`](Self::restore) to pick up a persisted token.
    pub fn new(
        token_store: TokenStore,
        provider: Arc<dyn ProviderClient>,
        event_bus: EventBus,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                core: Mutex::new(SessionCore::default()),
                token_store,
                provider,
                event_bus,
                clock,
                config,
                pending_validation: Mutex::new(None),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn snapshot(&self) -> SessionSnapshot {
        let now = self.inner.clock.now();
        let core = self.inner.core.lock();
        SessionSnapshot {
            state: core.state,
            is_authenticated: core.is_authenticated(now),
            is_refreshing: core.state == SessionState::Refreshing,
            generation: core.generation,
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner.core.lock().state
    }

    /// The single authoritative "connected" flag.
    pub fn is_authenticated(&self) -> bool {
        let now = self.inner.clock.now();
        self.inner.core.lock().is_authenticated(now)
    }

    pub fn is_refreshing(&self) -> bool {
        self.state() == SessionState::Refreshing
    }

    pub fn generation(&self) -> Generation {
        self.inner.core.lock().generation
    }

    /// Configured timings
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Returns the token for a provider call along with the generation it
    /// was read under.
    ///
    /// # Errors
    ///
    /// `AuthError::NotConnected` unless the session is authenticated.
    pub fn request_credentials(&self) -> Result<Credentials> {
        let now = self.inner.clock.now();
        let core = self.inner.core.lock();

        match &core.token {
            Some(token) if core.is_authenticated(now) => Ok(Credentials {
                token: token.clone(),
                generation: core.generation,
            }),
            _ => Err(AuthError::NotConnected),
        }
    }

    // ------------------------------------------------------------------
    // Transition inputs
    // ------------------------------------------------------------------

    /// Cold start: adopt the persisted token, if any.
    ///
    /// A stored token makes the session `Authenticated` immediately and
    /// schedules one validation call. Until it completes,
    /// `is_authenticated()` reports `true`.
    #[instrument(skip(self))]
    pub fn restore(&self) -> SessionSnapshot {
        let token = match self.inner.token_store.load() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Could not restore stored token, starting unauthenticated");
                None
            }
        };

        match token {
            Some(token) => {
                let tag = self.generation();
                if let TransitionOutcome::Applied { generation, .. } =
                    self.apply(tag, Input::Restore(token))
                {
                    info!(generation = %generation, "Restored stored token, validating");
                    self.schedule_validation(generation);
                }
            }
            None => debug!("No stored token, session stays unauthenticated"),
        }

        self.snapshot()
    }

    /// Moves to `Authenticating`. Re-entry restarts the attempt under a new
    /// generation.
    pub fn start_authorization_flow(&self) -> TransitionOutcome {
        let tag = self.generation();
        self.apply(tag, Input::StartAuthorization)
    }

    /// Accepts the token delivered by the authorization redirect.
    ///
    /// The token is persisted and validated in the background.
    pub fn authorization_succeeded(
        &self,
        token: AccessToken,
        generation: Generation,
    ) -> TransitionOutcome {
        let outcome = self.apply(generation, Input::AuthorizationSucceeded(token));
        if let TransitionOutcome::Applied { generation, .. } = outcome {
            self.schedule_validation(generation);
        }
        outcome
    }

    pub fn authorization_failed(
        &self,
        detail: impl Into<String>,
        generation: Generation,
    ) -> TransitionOutcome {
        self.apply(generation, Input::AuthorizationFailed(detail.into()))
    }

    pub fn authorization_cancelled(&self, generation: Generation) -> TransitionOutcome {
        self.apply(generation, Input::AuthorizationCancelled)
    }

    pub fn token_refresh_started(&self, generation: Generation) -> TransitionOutcome {
        self.apply(generation, Input::RefreshStarted)
    }

    pub fn token_refresh_succeeded(
        &self,
        token: AccessToken,
        generation: Generation,
    ) -> TransitionOutcome {
        self.apply(generation, Input::RefreshSucceeded(token))
    }

    pub fn token_refresh_failed(
        &self,
        detail: impl Into<String>,
        generation: Generation,
    ) -> TransitionOutcome {
        self.apply(generation, Input::RefreshFailed(detail.into()))
    }

    /// The provider rejected the credential outside the refresh path
    /// (validation call or upload).
    pub fn explicit_validation_failed(
        &self,
        reason: impl Into<String>,
        generation: Generation,
    ) -> TransitionOutcome {
        self.apply(generation, Input::ValidationFailed(reason.into()))
    }

    /// Drops the credential from memory and from the secure store.
    pub fn sign_out(&self) -> TransitionOutcome {
        let tag = self.generation();
        let outcome = self.apply(tag, Input::SignOut);

        if !outcome.is_applied() {
            if let Err(e) = self.inner.token_store.clear() {
                warn!(error = %e, "Failed to clear stored token on sign out");
            }
        }

        outcome
    }

    // ------------------------------------------------------------------
    // Provider-driven operations
    // ------------------------------------------------------------------

    /// Re-validates the current token against the provider.
    ///
    /// Only an auth-invalid answer ends the session; transient failures are
    /// returned and leave the state untouched.
    #[instrument(skip(self))]
    pub async fn validate(&self) -> Result<Identity> {
        let credentials = self.request_credentials()?;
        self.run_validation(credentials.token, credentials.generation)
            .await
    }

    /// Exchanges the refresh credential for a new access token.
    ///
    /// Drives `token_refresh_started`, then `token_refresh_succeeded` or
    /// `token_refresh_failed` depending on the provider's answer. A transient
    /// failure returns to `Authenticated` with the previous token.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<AccessToken> {
        let (token, tag) = {
            let core = self.inner.core.lock();
            match (core.state, &core.token) {
                (SessionState::Authenticated, Some(token)) => (token.clone(), core.generation),
                (SessionState::Refreshing, _) => {
                    return Err(AuthError::Other(
                        "Token refresh already in progress".to_string(),
                    ))
                }
                _ => return Err(AuthError::NotConnected),
            }
        };

        let Some(refresh_token) = token.refresh_token().map(str::to_string) else {
            return Err(AuthError::Other(
                "No refresh credential available".to_string(),
            ));
        };

        let generation = match self.token_refresh_started(tag) {
            TransitionOutcome::Applied { generation, .. } => generation,
            _ => {
                return Err(AuthError::Other(
                    "Session changed before refresh started".to_string(),
                ))
            }
        };

        let result = self
            .call_provider(
                "token refresh",
                self.inner.provider.refresh_access_token(&refresh_token),
            )
            .await;

        match result {
            Ok(grant) => {
                let refreshed = token.refreshed(grant);
                match self.token_refresh_succeeded(refreshed.clone(), generation) {
                    TransitionOutcome::Applied { .. } => {
                        info!("Access token refreshed");
                        Ok(refreshed)
                    }
                    _ => Err(AuthError::Other(
                        "Session changed while refreshing".to_string(),
                    )),
                }
            }
            Err(AuthError::AuthExpired(reason)) => {
                warn!(reason = %reason, "Provider rejected the refresh credential");
                self.token_refresh_failed(reason.clone(), generation);
                Err(AuthError::AuthExpired(reason))
            }
            Err(e) => {
                warn!(error = %e, "Token refresh did not complete, keeping current token");
                self.apply(generation, Input::RefreshAbandoned);
                Err(e)
            }
        }
    }

    /// Waits for the background validation scheduled by `restore` or
    /// `authorization_succeeded`, if any.
    pub async fn await_pending_validation(&self) {
        loop {
            let handle = self.inner.pending_validation.lock().take();
            let Some(handle) = handle else {
                return;
            };
            if let Err(e) = handle.await {
                warn!(error = %e, "Background validation task failed");
            }
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Serialized transition entry point.
    ///
    /// Persistence and notifications happen while the lock is held; nothing
    /// in here suspends.
    fn apply(&self, tag: Generation, input: Input) -> TransitionOutcome {
        let now = self.inner.clock.now();
        let mut core = self.inner.core.lock();

        if tag < core.generation {
            debug!(
                input = input.name(),
                tag = %tag,
                current = %core.generation,
                "Dropping stale session input"
            );
            return TransitionOutcome::Stale {
                tag,
                current: core.generation,
            };
        }

        let from = core.state;
        let Some(to) = input.target(from) else {
            debug!(input = input.name(), state = %from, "Session input does not apply");
            return TransitionOutcome::Ignored { state: from };
        };

        let was_authenticated = core.is_authenticated(now);
        let name = input.name();
        let reconnect_reason = input.reconnect_reason();

        match input {
            Input::AuthorizationSucceeded(token) | Input::RefreshSucceeded(token) => {
                if let Err(e) = self.inner.token_store.save(&token) {
                    warn!(error = %e, "Token not persisted, session kept in memory only");
                }
                core.token = Some(token);
            }
            Input::Restore(token) => core.token = Some(token),
            _ if to == SessionState::Unauthenticated => {
                if from.holds_token() {
                    if let Err(e) = self.inner.token_store.clear() {
                        warn!(error = %e, "Failed to clear stored token");
                    }
                }
                core.token = None;
            }
            _ => {}
        }

        core.state = to;
        core.generation = core.generation.advance(tag);
        let generation = core.generation;
        let is_authenticated = core.is_authenticated(now);

        info!(
            input = name,
            from = %from,
            to = %to,
            generation = %generation,
            "Session transition"
        );

        let bus = &self.inner.event_bus;
        if to == SessionState::Authenticating {
            let _ = bus.emit(CoreEvent::Session(SessionEvent::AuthorizationStarted {
                generation: generation.value(),
            }));
        }
        let _ = bus.emit(CoreEvent::Session(SessionEvent::StateChanged {
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
            generation: generation.value(),
        }));
        if was_authenticated != is_authenticated {
            let _ = bus.emit(CoreEvent::Session(SessionEvent::SessionChanged {
                is_authenticated,
            }));
        }
        if to == SessionState::Unauthenticated && from != SessionState::Unauthenticated {
            let _ = bus.emit(CoreEvent::Session(SessionEvent::ReconnectRequired {
                reason: reconnect_reason,
            }));
        }

        TransitionOutcome::Applied {
            from,
            to,
            generation,
        }
    }

    fn schedule_validation(&self, generation: Generation) {
        let token = {
            let core = self.inner.core.lock();
            match &core.token {
                Some(token) => token.clone(),
                None => return,
            }
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime available, skipping background validation");
            return;
        };

        let session = self.clone();
        let handle = runtime.spawn(async move {
            match session.run_validation(token, generation).await {
                Ok(identity) => debug!(account_id = %identity.account_id, "Background validation passed"),
                Err(e) => debug!(error = %e, "Background validation did not pass"),
            }
        });

        *self.inner.pending_validation.lock() = Some(handle);
    }

    async fn run_validation(&self, token: AccessToken, generation: Generation) -> Result<Identity> {
        let result = self
            .call_provider(
                "validation",
                self.inner.provider.get_current_identity(token.secret()),
            )
            .await;

        match result {
            Ok(identity) => {
                let core = self.inner.core.lock();
                if core.generation == generation {
                    info!(account_id = %identity.account_id, "Session validated");
                    let _ = self
                        .inner
                        .event_bus
                        .emit(CoreEvent::Session(SessionEvent::Validated {
                            account_id: identity.account_id.clone(),
                        }));
                } else {
                    debug!(
                        tag = %generation,
                        current = %core.generation,
                        "Validation result is stale"
                    );
                }
                Ok(identity)
            }
            Err(AuthError::AuthExpired(reason)) => {
                warn!(reason = %reason, "Provider rejected the session token");
                self.explicit_validation_failed(reason.clone(), generation);
                Err(AuthError::AuthExpired(reason))
            }
            Err(e) => {
                warn!(error = %e, "Validation inconclusive, keeping session");
                Err(e)
            }
        }
    }

    /// Runs a provider call under the configured timeout.
    async fn call_provider<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = ProviderResult<T>>,
    {
        match timeout(self.inner.config.provider_timeout, call).await {
            Ok(result) => result.map_err(AuthError::from),
            Err(_) => {
                warn!(operation, "Provider call timed out");
                Err(AuthError::TransientNetwork(format!(
                    "{} timed out after {:?}",
                    operation, self.inner.config.provider_timeout
                )))
            }
        }
    }
}
