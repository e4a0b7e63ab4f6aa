//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `SecureStore` using the `keyring` crate (OS keychain)
//! - `FileSystemAccess` using `tokio::fs` and the platform data directory
//! - `AuthorizationPresenter` opening the system browser via `webbrowser`
//!
//! `ProviderClient` has no desktop default; the host supplies it.
//!
//! ## Feature Flags
//!
//! - `secure-store`: Enable OS keychain integration (default)
//! - `browser`: Enable the system browser presenter (default)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{KeyringSecureStore, TokioFileSystem, WebBrowserPresenter};
//!
//! let secure_store = KeyringSecureStore::new();
//! let fs = TokioFileSystem::new();
//! let presenter = WebBrowserPresenter;
//! // Use in core configuration
//! ```

mod filesystem;

#[cfg(feature = "browser")]
mod presenter;
#[cfg(feature = "secure-store")]
mod secure_store;

pub use filesystem::TokioFileSystem;

#[cfg(feature = "browser")]
pub use presenter::WebBrowserPresenter;
#[cfg(feature = "secure-store")]
pub use secure_store::KeyringSecureStore;

/// Directory name used under the platform data directory and as the keychain service.
pub const APP_DIRECTORY_NAME: &str = "receipt-connector";
