//! # Connector Service
//!
//! Façade host applications talk to. It wires the host-provided bridges
//! from a [`CoreConfig`] into the session, authorization flow, upload
//! coordinator and capture log, and exposes capture → upload as one call.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, ProviderApiConfig};
//! use core_service::ConnectorService;
//!
//! let config = CoreConfig::builder()
//!     .provider_client(client)
//!     .provider_api(ProviderApiConfig::from_env()?)
//!     .build()?;
//!
//! let service = ConnectorService::bootstrap(config).await?;
//! if !service.is_connected() {
//!     service.connect()?;
//! }
//!
//! // Later, from the URL handler registered for the redirect scheme:
//! service.handle_redirect(&callback_url);
//!
//! let job = service.capture(jpeg_bytes).await?;
//! ```
//!
//! Desktop apps typically enable the `desktop-shims` feature, which supplies
//! keychain storage, a tokio filesystem and the system browser as defaults.

pub mod error;

pub use error::{CoreError, Result};

#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
pub use bridge_desktop::{KeyringSecureStore, TokioFileSystem, WebBrowserPresenter};

use std::path::PathBuf;
use std::sync::Arc;

use bridge_traits::{AuthorizationPresenter, Clock, FileSystemAccess};
use bytes::Bytes;
use core_auth::{AuthorizationFlow, SessionSnapshot, SessionStateMachine, TokenStore};
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, EventStream};
use core_upload::{capture_filename, CaptureLog, CaptureLogEntry, UploadCoordinator, UploadJob};
use tracing::{info, instrument, warn};
use url::Url;

/// Primary façade exposed to host applications.
///
/// Cheap to clone; all clones share one session.
#[derive(Clone)]
pub struct ConnectorService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    session: SessionStateMachine,
    flow: AuthorizationFlow,
    uploads: UploadCoordinator,
    capture_log: CaptureLog,
    event_bus: EventBus,
    file_system: Arc<dyn FileSystemAccess>,
    presenter: Arc<dyn AuthorizationPresenter>,
    clock: Arc<dyn Clock>,
}

impl ConnectorService {
    /// Build the service from `config`.
    ///
    /// Loads the capture log and restores a persisted session. A restored
    /// session is reported as connected right away while its validation runs
    /// in the background.
    #[instrument(skip(config))]
    pub async fn bootstrap(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let event_bus = EventBus::new(config.event_buffer_size);
        let token_store = TokenStore::new(
            config.secure_store.clone(),
            config.provider_api.app_identifier.clone(),
        );
        let session = SessionStateMachine::new(
            token_store,
            config.provider_client.clone(),
            event_bus.clone(),
            config.clock.clone(),
            config.session,
        );
        let flow = AuthorizationFlow::new(
            config.provider_api.clone(),
            session.clone(),
            config.clock.clone(),
        );
        let uploads = UploadCoordinator::new(
            session.clone(),
            config.provider_client.clone(),
            event_bus.clone(),
            config.clock.clone(),
            config.upload.clone(),
        );

        let data_dir = config.file_system.get_data_directory().await?;
        config.file_system.create_dir_all(&data_dir).await?;

        let capture_log = CaptureLog::new(
            config.file_system.clone(),
            config.upload.capture_log_file.clone(),
        );
        let captures = capture_log.load().await?;

        let snapshot = session.restore();
        info!(
            state = %snapshot.state,
            captures,
            "Connector service started"
        );

        Ok(Self {
            inner: Arc::new(ServiceInner {
                session,
                flow,
                uploads,
                capture_log,
                event_bus,
                file_system: config.file_system,
                presenter: config.presenter,
                clock: config.clock,
            }),
        })
    }

    pub fn session(&self) -> &SessionStateMachine {
        &self.inner.session
    }

    pub fn authorization(&self) -> &AuthorizationFlow {
        &self.inner.flow
    }

    pub fn uploads(&self) -> &UploadCoordinator {
        &self.inner.uploads
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.inner.event_bus
    }

    /// Subscribe to session and upload events. Drop the stream to unsubscribe.
    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.inner.event_bus.subscribe())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.session.snapshot()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.session.is_authenticated()
    }

    /// Open the provider's sign-in page with the configured presenter.
    pub fn connect(&self) -> Result<Url> {
        Ok(self.inner.flow.begin(self.inner.presenter.as_ref())?)
    }

    /// Forward a callback URL to the authorization flow.
    ///
    /// Returns `false` if the URL was not an expected callback.
    pub fn handle_redirect(&self, url: &str) -> bool {
        self.inner.flow.handle_redirect(url)
    }

    /// Abandon a pending authorization attempt.
    pub fn cancel_connect(&self) -> bool {
        self.inner.flow.cancel()
    }

    /// Forget the stored credential.
    pub fn disconnect(&self) {
        self.inner.session.sign_out();
    }

    /// Keep a captured receipt and upload it.
    ///
    /// The file is written to the data directory and logged before the
    /// upload starts, so a failed upload can be retried later with
    /// [`retry_capture`](Self::retry_capture). Upload failures are reported
    /// through the returned job, not as an error.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn capture(&self, bytes: Bytes) -> Result<UploadJob> {
        let timestamp = self.inner.clock.now();
        let filename = capture_filename(timestamp);

        let path = self.capture_path(&filename).await?;
        self.inner.file_system.write_file(&path, bytes.clone()).await?;
        self.inner
            .capture_log
            .record_capture(filename.clone(), timestamp)
            .await?;

        info!(filename = %filename, "Receipt captured");
        self.upload(bytes, &filename).await
    }

    /// Upload a previously captured receipt again as a new job.
    #[instrument(skip(self))]
    pub async fn retry_capture(&self, filename: &str) -> Result<UploadJob> {
        if filename.is_empty() || filename.contains(['/', '\\']) || filename == ".." {
            return Err(CoreError::CaptureNotFound(filename.to_string()));
        }

        let path = self.capture_path(filename).await?;
        let bytes = match self.inner.file_system.read_file(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => {
                warn!(filename, "Captured file is missing");
                return Err(CoreError::CaptureNotFound(filename.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        self.upload(bytes, filename).await
    }

    /// All captures, oldest first
    pub async fn captures(&self) -> Vec<CaptureLogEntry> {
        self.inner.capture_log.entries().await
    }

    async fn upload(&self, bytes: Bytes, filename: &str) -> Result<UploadJob> {
        let job = self.inner.uploads.submit(bytes, filename).await;

        if let Some(status) = job.status_text() {
            self.inner.capture_log.record_status(filename, status).await?;
        }
        Ok(job)
    }

    async fn capture_path(&self, filename: &str) -> Result<PathBuf> {
        let dir = self.inner.file_system.get_data_directory().await?;
        Ok(dir.join(filename))
    }
}
