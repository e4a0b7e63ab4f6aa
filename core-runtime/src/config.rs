//! # Core Configuration Module
//!
//! Provides configuration management for the receipt connector.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds all necessary dependencies and settings for the core library.
//! It enforces fail-fast validation to ensure all required bridges are provided
//! before initialization.
//!
//! ## Required Dependencies
//!
//! - `ProviderClient` - Remote identity lookup and upload (always host-supplied)
//! - `ProviderApiConfig` - App key, redirect URI and scopes for authorization
//!
//! ## Dependencies with platform defaults
//!
//! - `SecureStore` - Credential persistence (desktop default: OS keychain)
//! - `FileSystemAccess` - Captured files and capture log (desktop default: tokio fs)
//! - `AuthorizationPresenter` - Shows the sign-in page (desktop default: system browser)
//! - `Clock` - Time source (default: system clock)
//!
//! When the `desktop-shims` feature is enabled, desktop-ready defaults are
//! injected automatically if not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, ProviderApiConfig};
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .provider_client(Arc::new(MyProviderClient))
//!     .provider_api(ProviderApiConfig::new("abc123"))
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ## Error Handling
//!
//! The builder validates all required dependencies and provides actionable error
//! messages when capabilities are missing:
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // This will panic with an actionable error message
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Should fail - missing provider configuration");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{
    AuthorizationPresenter, Clock, FileSystemAccess, ProviderClient, SecureStore, SystemClock,
};
use std::sync::Arc;
use std::time::Duration;

/// Default authorization endpoint (implicit grant).
pub const DEFAULT_AUTHORIZE_URL: &str = "https://www.dropbox.com/oauth2/authorize";

/// Default OAuth scopes: write files and read account info for validation.
pub const DEFAULT_SCOPES: &[&str] = &["files.content.write", "account_info.read"];

/// Default secure-store key the session token is persisted under.
pub const DEFAULT_APP_IDENTIFIER: &str = "receipt-connector.session";

/// Default remote folder receipts are uploaded into.
pub const DEFAULT_REMOTE_FOLDER: &str = "/dkexpenses/inbox";

/// Default capture log file name inside the data directory.
pub const DEFAULT_CAPTURE_LOG_FILE: &str = "capture_logs.json";

/// Environment variable names read by [`ProviderApiConfig::from_env`].
pub const ENV_APP_KEY: &str = "RECEIPT_CONNECTOR_APP_KEY";
pub const ENV_REDIRECT_URI: &str = "RECEIPT_CONNECTOR_REDIRECT_URI";
pub const ENV_SCOPES: &str = "RECEIPT_CONNECTOR_SCOPES";

/// Core configuration for the receipt connector.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Secure credential storage
    pub secure_store: Arc<dyn SecureStore>,

    /// File system access for captured files and the capture log
    pub file_system: Arc<dyn FileSystemAccess>,

    /// Cloud storage client (host-supplied)
    pub provider_client: Arc<dyn ProviderClient>,

    /// Presents the authorization page
    pub presenter: Arc<dyn AuthorizationPresenter>,

    /// Time source
    pub clock: Arc<dyn Clock>,

    /// Authorization settings
    pub provider_api: ProviderApiConfig,

    /// Upload destination settings
    pub upload: UploadConfig,

    /// Session timing settings
    pub session: SessionConfig,

    /// Event bus buffer size
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("secure_store", &"SecureStore { ... }")
            .field("file_system", &"FileSystemAccess { ... }")
            .field("provider_client", &"ProviderClient { ... }")
            .field("presenter", &"AuthorizationPresenter { ... }")
            .field("provider_api", &self.provider_api)
            .field("upload", &self.upload)
            .field("session", &self.session)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

/// Authorization settings for the cloud storage provider.
///
/// # Security Note
///
/// The app key is not a secret in the implicit grant, but it should still be
/// injected by the host (environment or bundled configuration) rather than
/// hardcoded in the core.
///
/// # Example
///
/// ```
/// use core_runtime::config::ProviderApiConfig;
///
/// let config = ProviderApiConfig::new("abc123");
/// assert_eq!(config.redirect_uri, "db-abc123://2/token");
/// assert_eq!(config.callback_scheme(), "db-abc123");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderApiConfig {
    /// OAuth client identifier
    pub app_key: String,

    /// Authorization endpoint
    pub authorize_url: String,

    /// Redirect URI registered with the provider; its scheme identifies callbacks
    pub redirect_uri: String,

    /// Requested scopes
    pub scopes: Vec<String>,

    /// Secure-store key the session token is persisted under
    pub app_identifier: String,
}

impl ProviderApiConfig {
    /// Creates a configuration with the default endpoint, scopes and a
    /// `db-<app_key>://2/token` redirect URI.
    pub fn new(app_key: impl Into<String>) -> Self {
        let app_key = app_key.into();
        Self {
            redirect_uri: format!("db-{}://2/token", app_key),
            app_key,
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            app_identifier: DEFAULT_APP_IDENTIFIER.to_string(),
        }
    }

    /// Reads the configuration from `RECEIPT_CONNECTOR_*` environment variables.
    ///
    /// `RECEIPT_CONNECTOR_APP_KEY` is required. `RECEIPT_CONNECTOR_REDIRECT_URI`
    /// and `RECEIPT_CONNECTOR_SCOPES` (space separated) override the defaults.
    pub fn from_env() -> Result<Self> {
        let app_key = std::env::var(ENV_APP_KEY).map_err(|_| {
            Error::Config(format!(
                "{} is not set. Export the provider app key before starting.",
                ENV_APP_KEY
            ))
        })?;

        let mut config = Self::new(app_key);

        if let Ok(redirect_uri) = std::env::var(ENV_REDIRECT_URI) {
            config.redirect_uri = redirect_uri;
        }

        if let Ok(scopes) = std::env::var(ENV_SCOPES) {
            config.scopes = scopes.split_whitespace().map(str::to_string).collect();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_authorize_url(mut self, url: impl Into<String>) -> Self {
        self.authorize_url = url.into();
        self
    }

    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = uri.into();
        self
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_app_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.app_identifier = identifier.into();
        self
    }

    /// URL scheme of the redirect URI (e.g. `db-abc123`).
    pub fn callback_scheme(&self) -> &str {
        self.redirect_uri
            .split_once("://")
            .map(|(scheme, _)| scheme)
            .unwrap_or("")
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.app_key.trim().is_empty() {
            return Err(Error::Config("Provider app key cannot be empty".to_string()));
        }

        if !self.authorize_url.starts_with("https://") {
            return Err(Error::Config(
                "Authorization URL must use https".to_string(),
            ));
        }

        if self.callback_scheme().is_empty() {
            return Err(Error::Config(format!(
                "Redirect URI '{}' must have the form '<scheme>://<path>'",
                self.redirect_uri
            )));
        }

        if self.scopes.is_empty() {
            return Err(Error::Config(
                "At least one OAuth scope is required".to_string(),
            ));
        }

        if self.app_identifier.trim().is_empty() {
            return Err(Error::Config(
                "Application identifier cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Where uploads go and where captures are logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    /// Remote folder receipts are uploaded into (absolute, no trailing slash)
    pub remote_folder: String,

    /// Capture log file name inside the data directory
    pub capture_log_file: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            remote_folder: DEFAULT_REMOTE_FOLDER.to_string(),
            capture_log_file: DEFAULT_CAPTURE_LOG_FILE.to_string(),
        }
    }
}

impl UploadConfig {
    pub fn with_remote_folder(mut self, folder: impl Into<String>) -> Self {
        self.remote_folder = folder.into();
        self
    }

    pub fn with_capture_log_file(mut self, name: impl Into<String>) -> Self {
        self.capture_log_file = name.into();
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.remote_folder.starts_with('/') {
            return Err(Error::Config(format!(
                "Remote folder '{}' must be absolute",
                self.remote_folder
            )));
        }

        if self.remote_folder.len() > 1 && self.remote_folder.ends_with('/') {
            return Err(Error::Config(format!(
                "Remote folder '{}' must not end with '/'",
                self.remote_folder
            )));
        }

        if self.capture_log_file.is_empty()
            || self.capture_log_file.contains(['/', '\\'])
        {
            return Err(Error::Config(
                "Capture log file must be a plain file name".to_string(),
            ));
        }

        Ok(())
    }
}

/// Session timing settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Upper bound for a validation or refresh call. Uploads are not bounded.
    pub provider_timeout: Duration,

    /// Tokens expiring within this window are refreshed before use
    pub refresh_buffer: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_secs(30),
            refresh_buffer: Duration::from_secs(5 * 60),
        }
    }
}

impl SessionConfig {
    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.provider_timeout.is_zero() {
            return Err(Error::Config(
                "Provider timeout must be greater than zero".to_string(),
            ));
        }

        if self.provider_timeout > Duration::from_secs(300) {
            return Err(Error::Config(
                "Provider timeout exceeds maximum of 5 minutes".to_string(),
            ));
        }

        Ok(())
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        self.provider_api.validate()?;
        self.upload.validate()?;
        self.session.validate()?;

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn provider_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "ProviderClient".to_string(),
        message: "ProviderClient implementation is required for validation and uploads. \
                 Inject the host's cloud storage client with .provider_client()."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn secure_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SecureStore".to_string(),
        message: "SecureStore implementation is required for credential persistence. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default KeyringSecureStore. \
                 Mobile: inject platform-native secure storage (Keychain/Keystore)."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn file_system_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "FileSystemAccess".to_string(),
        message: "FileSystemAccess implementation is required for captured files. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default TokioFileSystem. \
                 Mobile: inject the app sandbox file system."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn presenter_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "AuthorizationPresenter".to_string(),
        message: "AuthorizationPresenter implementation is required to show the sign-in page. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the system browser. \
                 Mobile: inject an in-app web authentication session."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    use bridge_desktop::KeyringSecureStore;

    let store: Arc<dyn SecureStore> = Arc::new(KeyringSecureStore::new());
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    Err(secure_store_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    use bridge_desktop::TokioFileSystem;

    let fs: Arc<dyn FileSystemAccess> = Arc::new(TokioFileSystem::new());
    Ok(fs)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Err(file_system_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_presenter() -> Result<Arc<dyn AuthorizationPresenter>> {
    use bridge_desktop::WebBrowserPresenter;

    let presenter: Arc<dyn AuthorizationPresenter> = Arc::new(WebBrowserPresenter);
    Ok(presenter)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_presenter() -> Result<Arc<dyn AuthorizationPresenter>> {
    Err(presenter_missing_error())
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Call [`build()`](CoreConfigBuilder::build) to create the final config.
/// The builder validates required dependencies and provides helpful error
/// messages.
#[derive(Default)]
pub struct CoreConfigBuilder {
    secure_store: Option<Arc<dyn SecureStore>>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    provider_client: Option<Arc<dyn ProviderClient>>,
    presenter: Option<Arc<dyn AuthorizationPresenter>>,
    clock: Option<Arc<dyn Clock>>,
    provider_api: Option<ProviderApiConfig>,
    upload: Option<UploadConfig>,
    session: Option<SessionConfig>,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the secure store implementation.
    ///
    /// The secure store persists the session token. It must provide
    /// platform-appropriate security (Keychain on macOS/iOS, Keystore on
    /// Android, etc.).
    pub fn secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    /// Sets the file system access implementation.
    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    /// Sets the cloud storage client (required).
    pub fn provider_client(mut self, client: Arc<dyn ProviderClient>) -> Self {
        self.provider_client = Some(client);
        self
    }

    /// Sets the authorization presenter.
    pub fn presenter(mut self, presenter: Arc<dyn AuthorizationPresenter>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    /// Sets the time source. Default: [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the authorization settings (required).
    pub fn provider_api(mut self, config: ProviderApiConfig) -> Self {
        self.provider_api = Some(config);
        self
    }

    /// Sets the upload destination settings.
    pub fn upload(mut self, config: UploadConfig) -> Self {
        self.upload = Some(config);
        self
    }

    /// Sets the session timing settings.
    pub fn session(mut self, config: SessionConfig) -> Self {
        self.session = Some(config);
        self
    }

    /// Sets the timeout applied to every provider call.
    ///
    /// Default: 30 seconds
    pub fn provider_timeout(mut self, timeout: Duration) -> Self {
        let mut session = self.session.unwrap_or_default();
        session.provider_timeout = timeout;
        self.session = Some(session);
        self
    }

    /// Sets the event bus buffer size.
    ///
    /// Default: 100
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(CoreConfig)` on success, or an error if:
    /// - The provider configuration or client is missing
    /// - A bridge without a platform default is missing
    /// - Configuration values are invalid
    pub fn build(self) -> Result<CoreConfig> {
        let provider_api = self.provider_api.ok_or_else(|| {
            Error::Config(
                "Provider API configuration is required. Use .provider_api() to set it."
                    .to_string(),
            )
        })?;

        let provider_client = self
            .provider_client
            .ok_or_else(provider_client_missing_error)?;

        let secure_store = match self.secure_store {
            Some(store) => store,
            None => provide_default_secure_store()?,
        };

        let file_system = match self.file_system {
            Some(fs) => fs,
            None => provide_default_file_system()?,
        };

        let presenter = match self.presenter {
            Some(presenter) => presenter,
            None => provide_default_presenter()?,
        };

        let config = CoreConfig {
            secure_store,
            file_system,
            provider_client,
            presenter,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            provider_api,
            upload: self.upload.unwrap_or_default(),
            session: self.session.unwrap_or_default(),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{Identity, ProviderResult};
    use bytes::Bytes;
    use std::path::{Path, PathBuf};

    // Mock implementations for testing
    struct MockSecureStore;

    impl SecureStore for MockSecureStore {
        fn set_secret(&self, _key: &str, _value: &[u8]) -> BridgeResult<()> {
            Ok(())
        }

        fn get_secret(&self, _key: &str) -> BridgeResult<Option<Vec<u8>>> {
            Ok(None)
        }

        fn delete_secret(&self, _key: &str) -> BridgeResult<()> {
            Ok(())
        }
    }

    struct MockFileSystem;

    #[async_trait]
    impl FileSystemAccess for MockFileSystem {
        async fn get_data_directory(&self) -> BridgeResult<PathBuf> {
            Ok(PathBuf::from("/data"))
        }

        async fn exists(&self, _path: &Path) -> BridgeResult<bool> {
            Ok(false)
        }

        async fn create_dir_all(&self, _path: &Path) -> BridgeResult<()> {
            Ok(())
        }

        async fn read_file(&self, _path: &Path) -> BridgeResult<Bytes> {
            Ok(Bytes::new())
        }

        async fn write_file(&self, _path: &Path, _data: Bytes) -> BridgeResult<()> {
            Ok(())
        }

        async fn delete_file(&self, _path: &Path) -> BridgeResult<()> {
            Ok(())
        }
    }

    struct MockProvider;

    #[async_trait]
    impl ProviderClient for MockProvider {
        async fn get_current_identity(&self, _token: &str) -> ProviderResult<Identity> {
            Ok(Identity::new("dbid:test"))
        }

        async fn upload(
            &self,
            _token: &str,
            remote_path: &str,
            _bytes: Bytes,
        ) -> ProviderResult<String> {
            Ok(remote_path.to_string())
        }
    }

    struct MockPresenter;

    impl AuthorizationPresenter for MockPresenter {
        fn open_authorization_url(&self, _url: &str) -> BridgeResult<()> {
            Ok(())
        }
    }

    fn complete_builder() -> CoreConfigBuilder {
        CoreConfig::builder()
            .secure_store(Arc::new(MockSecureStore))
            .file_system(Arc::new(MockFileSystem))
            .provider_client(Arc::new(MockProvider))
            .presenter(Arc::new(MockPresenter))
            .provider_api(ProviderApiConfig::new("abc123"))
    }

    #[test]
    fn test_builder_with_all_required_fields() {
        let config = complete_builder().build().unwrap();

        assert_eq!(config.provider_api.app_key, "abc123");
        assert_eq!(config.upload.remote_folder, "/dkexpenses/inbox");
        assert_eq!(config.upload.capture_log_file, "capture_logs.json");
        assert_eq!(config.session.provider_timeout, Duration::from_secs(30));
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
    }

    #[test]
    fn test_builder_requires_provider_api() {
        let result = CoreConfig::builder()
            .secure_store(Arc::new(MockSecureStore))
            .file_system(Arc::new(MockFileSystem))
            .provider_client(Arc::new(MockProvider))
            .presenter(Arc::new(MockPresenter))
            .build();

        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Provider API configuration is required"));
    }

    #[test]
    fn test_builder_requires_provider_client() {
        let result = CoreConfig::builder()
            .secure_store(Arc::new(MockSecureStore))
            .file_system(Arc::new(MockFileSystem))
            .presenter(Arc::new(MockPresenter))
            .provider_api(ProviderApiConfig::new("abc123"))
            .build();

        let err = result.unwrap_err();
        assert!(matches!(err, Error::CapabilityMissing { .. }));
        assert!(err.to_string().contains("ProviderClient"));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_requires_secure_store_without_shims() {
        let result = CoreConfig::builder()
            .file_system(Arc::new(MockFileSystem))
            .provider_client(Arc::new(MockProvider))
            .presenter(Arc::new(MockPresenter))
            .provider_api(ProviderApiConfig::new("abc123"))
            .build();

        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("SecureStore"));
        assert!(err_msg.contains("credential persistence"));
    }

    #[test]
    fn test_provider_api_defaults() {
        let config = ProviderApiConfig::new("abc123");

        assert_eq!(config.authorize_url, DEFAULT_AUTHORIZE_URL);
        assert_eq!(config.redirect_uri, "db-abc123://2/token");
        assert_eq!(config.callback_scheme(), "db-abc123");
        assert_eq!(
            config.scopes,
            vec!["files.content.write".to_string(), "account_info.read".to_string()]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_provider_api_rejects_empty_key() {
        let err = ProviderApiConfig::new("  ").validate().unwrap_err();
        assert!(err.to_string().contains("app key"));
    }

    #[test]
    fn test_provider_api_rejects_redirect_without_scheme() {
        let config = ProviderApiConfig::new("abc123").with_redirect_uri("not-a-uri");
        assert!(config.validate().is_err());
        assert_eq!(config.callback_scheme(), "");
    }

    #[test]
    fn test_provider_api_rejects_plain_http() {
        let config =
            ProviderApiConfig::new("abc123").with_authorize_url("http://example.com/oauth2");
        assert!(config.validate().unwrap_err().to_string().contains("https"));
    }

    #[test]
    fn test_provider_api_rejects_empty_scopes() {
        let config = ProviderApiConfig::new("abc123").with_scopes(Vec::<String>::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_upload_config_validation() {
        assert!(UploadConfig::default().validate().is_ok());
        assert!(UploadConfig::default()
            .with_remote_folder("relative/inbox")
            .validate()
            .is_err());
        assert!(UploadConfig::default()
            .with_remote_folder("/inbox/")
            .validate()
            .is_err());
        assert!(UploadConfig::default()
            .with_capture_log_file("logs/capture.json")
            .validate()
            .is_err());
    }

    #[test]
    fn test_session_config_validation() {
        let config = complete_builder().provider_timeout(Duration::ZERO).build();
        assert!(config
            .unwrap_err()
            .to_string()
            .contains("must be greater than zero"));

        let config = complete_builder()
            .provider_timeout(Duration::from_secs(600))
            .build();
        assert!(config.unwrap_err().to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_validate_rejects_zero_event_buffer() {
        let result = complete_builder().event_buffer_size(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_config_debug_hides_bridges() {
        let config = complete_builder().build().unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("SecureStore { ... }"));
        assert!(debug.contains("abc123"));
    }

    #[test]
    fn test_config_is_cloneable() {
        let config = complete_builder()
            .upload(UploadConfig::default().with_remote_folder("/receipts"))
            .build()
            .unwrap();

        let cloned = config.clone();
        assert_eq!(cloned.upload, config.upload);
        assert_eq!(cloned.provider_api, config.provider_api);
    }
}
