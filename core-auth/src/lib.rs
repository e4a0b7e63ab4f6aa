//! # Authentication Module
//!
//! Session lifecycle for the cloud-storage connector.
//!
//! ## Overview
//!
//! This crate owns the connector's OAuth credential from the moment the
//! provider hands it out until it is revoked. It persists the token in the
//! platform secure store, reconciles concurrent authentication signals and
//! exposes one authoritative "connected" flag.
//!
//! ## Features
//!
//! - Browser-based OAuth 2.0 authorization with CSRF `state` checking
//! - Generation-tagged session state machine with stale-input rejection
//! - Optimistic cold start with background validation
//! - Refresh-token exchange when the provider supports it
//! - Secure token storage via platform-specific secure stores
//! - Session event emission on the core event bus

pub mod error;
pub mod flow;
pub mod session;
pub mod token_store;
pub mod types;

pub use error::{AuthError, Result};
pub use flow::AuthorizationFlow;
pub use session::SessionStateMachine;
pub use token_store::TokenStore;
pub use types::{
    AccessToken, Credentials, Generation, SessionSnapshot, SessionState, TransitionOutcome,
};
