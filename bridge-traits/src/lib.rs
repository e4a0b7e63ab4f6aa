//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the receipt connector core and
//! platform-specific implementations. Each trait represents a capability that
//! the core requires but that must be implemented differently per platform
//! (desktop, iOS, Android).
//!
//! ## Traits
//!
//! ### Cloud Storage
//! - [`ProviderClient`](provider::ProviderClient) - Identity lookup, upload, token refresh
//! - [`AuthorizationPresenter`](presentation::AuthorizationPresenter) - Shows the provider's sign-in page
//!
//! ### Security & Storage
//! - [`SecureStore`](storage::SecureStore) - Credential persistence (Keychain/Keystore)
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Captured files and the capture log
//!
//! ### Utilities
//! - [`Clock`](clock::Clock) - Time source for deterministic testing
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ In Progress |
//! | iOS      | TBD                 | 📋 Planned |
//! | Android  | TBD                 | 📋 Planned |
//!
//! The provider client is always host-supplied; no crate in this workspace
//! ships a concrete cloud API.
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability is missing:
//!
//! ```ignore
//! let provider = config.provider_client
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "ProviderClient".to_string(),
//!         message: "Inject the host's cloud storage client.".to_string(),
//!     })?;
//! ```
//!
//! ## Error Handling
//!
//! Storage bridges use [`BridgeError`](error::BridgeError). Provider calls use
//! [`ProviderError`](provider::ProviderError), which classifies failures so the
//! session layer can distinguish an invalid credential from a transient fault.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent usage
//! across async tasks.

pub mod clock;
pub mod error;
pub mod presentation;
pub mod provider;
pub mod storage;

pub use error::BridgeError;

// Re-export commonly used types
pub use presentation::AuthorizationPresenter;
pub use provider::{Identity, ProviderClient, ProviderError, ProviderResult, TokenGrant};
pub use storage::{FileSystemAccess, SecureStore};
pub use clock::{Clock, SystemClock};
