//! OAuth 2.0 Implicit Grant Authorization Flow
//!
//! Drives the browser-based authorization round trip for the connector.
//!
//! # Overview
//!
//! [`AuthorizationFlow::begin`] builds the provider's authorization URL,
//! moves the session to `Authenticating` and asks the host to open the page.
//! The provider later redirects to `<scheme>://...` with either the granted
//! token or an error in the URL fragment; the host forwards that URL to
//! [`AuthorizationFlow::handle_redirect`].
//!
//! # Security
//!
//! - A random `state` value is attached to each attempt and checked on return
//! - Each attempt accepts exactly one redirect; replays are rejected
//! - Redirect URLs are logged without their query or fragment
//!
//! # Example
//!
//! ```no_run
//! use core_auth::AuthorizationFlow;
//! # fn example(flow: AuthorizationFlow, presenter: &dyn bridge_traits::AuthorizationPresenter) -> core_auth::Result<()> {
//! let url = flow.begin(presenter)?;
//! println!("Waiting for the user at {}", url.host_str().unwrap_or_default());
//!
//! // Later, from the platform's URL handler
//! let handled = flow.handle_redirect("db-abc123://2/token#access_token=sl.x&state=...");
//! # let _ = handled;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::session::SessionStateMachine;
use crate::types::{AccessToken, Generation, TransitionOutcome};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bridge_traits::presentation::AuthorizationPresenter;
use bridge_traits::clock::Clock;
use core_runtime::config::ProviderApiConfig;
use core_runtime::logging::redact_url;
use parking_lot::Mutex;
use rand::Rng;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// `error` value the provider sends when the user declines
const ACCESS_DENIED: &str = "access_denied";

/// Outstanding authorization attempt.
///
/// Consumed by the first redirect that reaches the flow.
#[derive(Debug, Clone)]
struct PendingAuthorization {
    state: String,
    generation: Generation,
}

/// Parameters carried by the redirect fragment (or query)
#[derive(Debug, Default, Deserialize)]
struct RedirectParams {
    access_token: Option<String>,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// What the provider reported back
#[derive(Debug, PartialEq, Eq)]
enum RedirectOutcome {
    Granted,
    Cancelled,
    Failed(String),
}

/// Generates a URL-safe random `state` value for CSRF protection.
fn random_state() -> String {
    let mut state_bytes = [0u8; 16];
    rand::thread_rng().fill(&mut state_bytes);
    URL_SAFE_NO_PAD.encode(state_bytes)
}

/// Browser-based authorization against the storage provider.
#[derive(Clone)]
pub struct AuthorizationFlow {
    config: ProviderApiConfig,
    session: SessionStateMachine,
    clock: Arc<dyn Clock>,
    pending: Arc<Mutex<Option<PendingAuthorization>>>,
}

impl AuthorizationFlow {
    pub fn new(
        config: ProviderApiConfig,
        session: SessionStateMachine,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            session,
            clock,
            pending: Arc::new(Mutex::new(None)),
        }
    }

    /// Whether an attempt is waiting for its redirect
    pub fn is_pending(&self) -> bool {
        self.pending.lock().is_some()
    }

    /// Builds the authorization URL for an attempt identified by `state`.
    #[instrument(skip(self, state))]
    pub fn authorization_url(&self, state: &str) -> Result<Url> {
        let mut url = Url::parse(&self.config.authorize_url).map_err(|e| {
            AuthError::AuthorizationFailed(format!("Invalid authorize URL: {}", e))
        })?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.config.app_key)
            .append_pair("response_type", "token")
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", state);

        Ok(url)
    }

    /// Starts an authorization attempt and asks the host to open the page.
    ///
    /// Calling this again while an attempt is pending restarts it; the
    /// earlier attempt's redirect is then rejected by the `state` check.
    ///
    /// # Errors
    ///
    /// - `AuthError::AuthorizationFailed` if the session is already
    ///   connected or the presenter could not open the page. In the latter
    ///   case the attempt is reported to the session as failed.
    #[instrument(skip(self, presenter))]
    pub fn begin(&self, presenter: &dyn AuthorizationPresenter) -> Result<Url> {
        let state = random_state();
        let url = self.authorization_url(&state)?;

        let generation = match self.session.start_authorization_flow() {
            TransitionOutcome::Applied { generation, .. } => generation,
            TransitionOutcome::Ignored { state: current } => {
                warn!(state = %current, "Authorization requested while connected");
                return Err(AuthError::AuthorizationFailed(format!(
                    "Cannot start authorization while {}",
                    current
                )));
            }
            TransitionOutcome::Stale { .. } => {
                return Err(AuthError::AuthorizationFailed(
                    "Session changed while starting authorization".to_string(),
                ))
            }
        };

        *self.pending.lock() = Some(PendingAuthorization {
            state,
            generation,
        });

        info!(
            generation = %generation,
            authorize_url = %redact_url(url.as_str()),
            "Opening authorization page"
        );

        if let Err(e) = presenter.open_authorization_url(url.as_str()) {
            warn!(error = %e, "Presenter could not open the authorization page");
            self.pending.lock().take();
            self.session.authorization_failed(e.to_string(), generation);
            return Err(AuthError::AuthorizationFailed(e.to_string()));
        }

        Ok(url)
    }

    /// Processes the redirect callback.
    ///
    /// Returns `false`, leaving everything untouched, when the URL is not
    /// ours or no attempt is pending (a replayed callback included).
    /// Otherwise the pending attempt is consumed and its result forwarded to
    /// the session.
    #[instrument(skip(self, url), fields(url = %redact_url(url)))]
    pub fn handle_redirect(&self, url: &str) -> bool {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(error = %e, "Ignoring unparseable redirect");
                return false;
            }
        };

        if !parsed
            .scheme()
            .eq_ignore_ascii_case(self.config.callback_scheme())
        {
            debug!(scheme = parsed.scheme(), "Ignoring redirect for another scheme");
            return false;
        }

        let raw = parsed
            .fragment()
            .filter(|fragment| !fragment.is_empty())
            .or_else(|| parsed.query())
            .unwrap_or_default();

        let params: RedirectParams = match serde_urlencoded::from_str(raw) {
            Ok(params) => params,
            Err(e) => {
                debug!(error = %e, "Ignoring redirect with malformed parameters");
                return false;
            }
        };

        let Some(pending) = self.pending.lock().take() else {
            debug!("No authorization pending, ignoring redirect");
            return false;
        };

        let generation = pending.generation;
        match Self::classify(&params, &pending) {
            RedirectOutcome::Granted => match self.token_from(params) {
                Some(token) => {
                    info!(
                        has_refresh_token = token.refresh_token().is_some(),
                        "Authorization granted"
                    );
                    self.session.authorization_succeeded(token, generation);
                }
                None => {
                    warn!("Authorization granted with an unusable expires_in");
                    self.session
                        .authorization_failed("Invalid expires_in".to_string(), generation);
                }
            },
            RedirectOutcome::Cancelled => {
                info!("Authorization declined by the user");
                self.session.authorization_cancelled(generation);
            }
            RedirectOutcome::Failed(detail) => {
                warn!(detail = %detail, "Authorization failed");
                self.session.authorization_failed(detail, generation);
            }
        }

        true
    }

    /// Reports that the user closed the authorization page.
    ///
    /// Returns `false` when no attempt is pending.
    pub fn cancel(&self) -> bool {
        let Some(pending) = self.pending.lock().take() else {
            return false;
        };

        info!("Authorization page closed by the user");
        self.session.authorization_cancelled(pending.generation);
        true
    }

    fn classify(params: &RedirectParams, pending: &PendingAuthorization) -> RedirectOutcome {
        if params.state.as_deref() != Some(pending.state.as_str()) {
            return RedirectOutcome::Failed("State parameter mismatch".to_string());
        }

        if let Some(error) = &params.error {
            if error == ACCESS_DENIED {
                return RedirectOutcome::Cancelled;
            }
            return RedirectOutcome::Failed(
                params
                    .error_description
                    .clone()
                    .unwrap_or_else(|| error.clone()),
            );
        }

        match &params.access_token {
            Some(token) if !token.is_empty() => RedirectOutcome::Granted,
            _ => RedirectOutcome::Failed(
                "Redirect carried neither a token nor an error".to_string(),
            ),
        }
    }

    /// `None` if the expiry hint is negative or out of range.
    fn token_from(&self, params: RedirectParams) -> Option<AccessToken> {
        let mut token = AccessToken::new(params.access_token.unwrap_or_default());
        if let Some(refresh_token) = params.refresh_token {
            token = token.with_refresh_token(refresh_token);
        }
        match params.expires_in {
            Some(expires_in) => token.with_expires_in(self.clock.now(), expires_in),
            None => Some(token),
        }
    }
}
