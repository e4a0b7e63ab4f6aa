use bridge_traits::TokenGrant;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// OAuth access credential.
///
/// Holds the bearer token handed out by the provider, the optional refresh
/// credential and the expiry hint. Long-lived tokens carry no expiry.
///
/// # Security
///
/// Tokens should be stored securely and never logged. The `Debug` implementation
/// redacts sensitive information.
///
/// # Examples
///
/// ```
/// use core_auth::AccessToken;
/// use chrono::{Duration, Utc};
///
/// let now = Utc::now();
/// let token = AccessToken::new("sl.abc").with_expires_at(now + Duration::hours(4));
///
/// assert!(!token.is_expired_at(now));
/// assert!(token.expires_within(now, Duration::hours(5)));
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    secret: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Sets the expiry from a relative `expires_in` value in seconds.
    ///
    /// Returns `None` for negative values and for values past the
    /// representable date range.
    pub fn with_expires_in(self, now: DateTime<Utc>, expires_in: i64) -> Option<Self> {
        if expires_in < 0 {
            return None;
        }
        let expires_at = now.checked_add_signed(Duration::try_seconds(expires_in)?)?;
        Some(self.with_expires_at(expires_at))
    }

    /// The bearer credential sent to the provider
    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Tokens without an expiry hint never expire locally.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }

    /// Whether the token expires before `now + buffer`.
    pub fn expires_within(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        self.expires_at
            .is_some_and(|expires_at| now + buffer >= expires_at)
    }

    /// Builds the token that replaces `self` after a refresh-token exchange.
    ///
    /// Providers that do not rotate refresh credentials return none, in which
    /// case the current one is kept.
    pub fn refreshed(&self, grant: TokenGrant) -> Self {
        Self {
            secret: grant.access_token,
            refresh_token: grant.refresh_token.or_else(|| self.refresh_token.clone()),
            expires_at: grant.expires_at,
        }
    }
}

// Custom Debug implementation to avoid logging tokens
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Connection state of the session.
///
/// # State Transitions
///
/// ```text
/// Unauthenticated -> Authenticating -> Authenticated
///        ^                 |             ^   |
///        |                 |             |   v
///        +-----------------+-------- Refreshing
/// ```
///
/// Any state falls back to `Unauthenticated` when the provider rejects the
/// credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SessionState {
    /// No usable credential
    #[default]
    Unauthenticated,
    /// The user is on the provider's authorization page
    Authenticating,
    /// A credential is held and believed valid
    Authenticated,
    /// A refresh-token exchange is in flight
    Refreshing,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Unauthenticated => "unauthenticated",
            SessionState::Authenticating => "authenticating",
            SessionState::Authenticated => "authenticated",
            SessionState::Refreshing => "refreshing",
        }
    }

    /// Whether the state holds a credential at all.
    pub fn holds_token(&self) -> bool {
        matches!(self, SessionState::Authenticated | SessionState::Refreshing)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monotonic tag attached to every transition input.
///
/// Inputs produced under an older generation than the current one are stale
/// and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Generation(u64);

impl Generation {
    pub const INITIAL: Generation = Generation(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Generation assigned by an accepted transition tagged `tag`.
    pub fn advance(self, tag: Generation) -> Generation {
        Generation(self.0.max(tag.0).saturating_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub is_authenticated: bool,
    pub is_refreshing: bool,
    pub generation: Generation,
}

/// Result of feeding one input into the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The input was accepted and changed the state.
    Applied {
        from: SessionState,
        to: SessionState,
        generation: Generation,
    },
    /// The input was tagged with an outdated generation.
    Stale {
        tag: Generation,
        current: Generation,
    },
    /// The input does not apply to the current state.
    Ignored { state: SessionState },
}

impl TransitionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied { .. })
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, TransitionOutcome::Stale { .. })
    }
}

/// Credential handed to a provider call together with the generation it was
/// read under.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub token: AccessToken,
    pub generation: Generation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_without_expiry_never_expires() {
        let token = AccessToken::new("sl.abc");
        let now = Utc::now();
        assert!(!token.is_expired_at(now + Duration::days(3650)));
        assert!(!token.expires_within(now, Duration::minutes(5)));
    }

    #[test]
    fn test_token_expiry_buffer() {
        let now = Utc::now();
        let token = AccessToken::new("sl.abc").with_expires_at(now + Duration::minutes(3));

        assert!(!token.is_expired_at(now));
        assert!(token.expires_within(now, Duration::minutes(5)));
        assert!(!token.expires_within(now, Duration::minutes(1)));
        assert!(token.is_expired_at(now + Duration::minutes(3)));
    }

    #[test]
    fn test_with_expires_in() {
        let now = Utc::now();
        let token = AccessToken::new("sl.abc")
            .with_expires_in(now, 14400)
            .unwrap();
        assert_eq!(token.expires_at(), Some(now + Duration::seconds(14400)));

        assert!(AccessToken::new("sl.abc").with_expires_in(now, -1).is_none());
        assert!(AccessToken::new("sl.abc")
            .with_expires_in(now, 1_000_000_000_000_000)
            .is_none());
        assert!(AccessToken::new("sl.abc")
            .with_expires_in(now, i64::MAX)
            .is_none());
    }

    #[test]
    fn test_token_debug_redacts_secrets() {
        let token = AccessToken::new("sl.very-secret").with_refresh_token("refresh-secret");
        let debug = format!("{:?}", token);

        assert!(!debug.contains("sl.very-secret"));
        assert!(!debug.contains("refresh-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_refreshed_keeps_refresh_token_when_not_rotated() {
        let now = Utc::now();
        let token = AccessToken::new("old").with_refresh_token("r1");

        let grant = TokenGrant {
            access_token: "new".to_string(),
            refresh_token: None,
            expires_at: Some(now + Duration::hours(4)),
        };
        let refreshed = token.refreshed(grant);

        assert_eq!(refreshed.secret(), "new");
        assert_eq!(refreshed.refresh_token(), Some("r1"));
        assert_eq!(refreshed.expires_at(), Some(now + Duration::hours(4)));

        let rotated = refreshed.refreshed(TokenGrant {
            access_token: "newer".to_string(),
            refresh_token: Some("r2".to_string()),
            expires_at: None,
        });
        assert_eq!(rotated.refresh_token(), Some("r2"));
    }

    #[test]
    fn test_token_deserializes_without_optional_fields() {
        let token: AccessToken = serde_json::from_str(r#"{"secret":"sl.abc"}"#).unwrap();
        assert_eq!(token, AccessToken::new("sl.abc"));
    }

    #[test]
    fn test_generation_advance() {
        let current = Generation::new(3);
        assert_eq!(current.advance(Generation::new(3)), Generation::new(4));
        assert_eq!(current.advance(Generation::new(7)), Generation::new(8));
        assert_eq!(Generation::INITIAL.advance(Generation::INITIAL).value(), 1);
    }

    #[test]
    fn test_session_state_display() {
        assert_eq!(SessionState::default(), SessionState::Unauthenticated);
        assert_eq!(SessionState::Refreshing.to_string(), "refreshing");
        assert!(SessionState::Refreshing.holds_token());
        assert!(!SessionState::Authenticating.holds_token());
    }

    #[test]
    fn test_transition_outcome_helpers() {
        let applied = TransitionOutcome::Applied {
            from: SessionState::Unauthenticated,
            to: SessionState::Authenticating,
            generation: Generation::new(1),
        };
        assert!(applied.is_applied());
        assert!(!applied.is_stale());

        let stale = TransitionOutcome::Stale {
            tag: Generation::new(1),
            current: Generation::new(2),
        };
        assert!(stale.is_stale());
    }
}
