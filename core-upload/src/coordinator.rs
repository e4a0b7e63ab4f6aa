//! # Upload Coordinator
//!
//! Sends captured receipts to the storage provider.
//!
//! ## Workflow
//!
//! 1. Validate the destination name
//! 2. Ask the session for credentials; without them the job fails as
//!    `NotConnected` and the user is asked to reconnect, no network call made
//! 3. Refresh the token first if it is about to expire and can be refreshed
//! 4. Upload to `<remote_folder>/<destination_name>`. The call is not
//!    bounded by a timeout; an in-flight upload always reaches a terminal state
//! 5. Classify the outcome. An auth-invalid answer ends the session unless
//!    the credential was replaced meanwhile; a transient one fails the job
//!    without retrying
//!
//! Every step emits an `UploadEvent` on the event bus.

use crate::error::UploadFailure;
use crate::job::{validate_destination_name, UploadJob};
use bridge_traits::provider::{ProviderClient, ProviderError};
use bridge_traits::clock::Clock;
use bytes::Bytes;
use core_auth::{AuthError, Credentials, SessionStateMachine, TransitionOutcome};
use core_runtime::config::UploadConfig;
use core_runtime::events::{CoreEvent, EventBus, SessionEvent, UploadEvent};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Coordinates uploads against the current session
pub struct UploadCoordinator {
    session: SessionStateMachine,
    provider: Arc<dyn ProviderClient>,
    event_bus: EventBus,
    clock: Arc<dyn Clock>,
    config: UploadConfig,
}

impl UploadCoordinator {
    pub fn new(
        session: SessionStateMachine,
        provider: Arc<dyn ProviderClient>,
        event_bus: EventBus,
        clock: Arc<dyn Clock>,
        config: UploadConfig,
    ) -> Self {
        Self {
            session,
            provider,
            event_bus,
            clock,
            config,
        }
    }

    /// Remote path a destination name is uploaded to
    pub fn remote_path(&self, destination_name: &str) -> String {
        format!(
            "{}/{}",
            self.config.remote_folder.trim_end_matches('/'),
            destination_name
        )
    }

    /// Uploads `bytes` as `destination_name` and returns the finished job.
    ///
    /// Uploads are addressed by path: submitting the same destination name
    /// again overwrites the remote file. Each call creates a new job; a
    /// failed job is never retried automatically.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn submit(&self, bytes: Bytes, destination_name: &str) -> UploadJob {
        let mut job = UploadJob::new(bytes, destination_name, self.clock.now());

        if let Err(e) = validate_destination_name(destination_name) {
            warn!(error = %e, "Rejecting upload");
            return self.finish_failed(job, UploadFailure::Other(e.to_string()));
        }

        let credentials = match self.credentials().await {
            Ok(credentials) => credentials,
            Err(failure) => return self.finish_failed(job, failure),
        };

        if let Err(e) = job.start() {
            error!(error = %e, "Upload job could not start");
            return job;
        }
        let _ = self.event_bus.emit(CoreEvent::Upload(UploadEvent::Started {
            job_id: job.id.to_string(),
            destination_name: job.destination_name.clone(),
        }));

        // Runs to completion once in flight; only validation and refresh are time-bounded.
        let remote_path = self.remote_path(destination_name);
        let result = self
            .provider
            .upload(credentials.token.secret(), &remote_path, job.bytes.clone())
            .await;

        match result {
            Ok(stored_path) => {
                if let Err(e) = job.succeed(stored_path.clone()) {
                    error!(error = %e, "Upload job could not complete");
                    return job;
                }
                info!(job_id = %job.id, remote_path = %stored_path, "Upload succeeded");
                let _ = self.event_bus.emit(CoreEvent::Upload(UploadEvent::Succeeded {
                    job_id: job.id.to_string(),
                    remote_path: stored_path,
                }));
                job
            }
            Err(ProviderError::AuthInvalid(reason)) => {
                warn!(job_id = %job.id, "Provider rejected the token during upload");
                match self
                    .session
                    .explicit_validation_failed(reason, credentials.generation)
                {
                    TransitionOutcome::Stale { .. } => {
                        // The credential was replaced while the upload ran
                        self.finish_failed(
                            job,
                            UploadFailure::Transient(
                                "credential changed during upload".to_string(),
                            ),
                        )
                    }
                    _ => self.finish_failed(job, UploadFailure::AuthExpired),
                }
            }
            Err(ProviderError::Transient(reason)) => {
                self.finish_failed(job, UploadFailure::Transient(reason))
            }
            Err(ProviderError::Other(reason)) => {
                self.finish_failed(job, UploadFailure::Other(reason))
            }
        }
    }

    /// Credentials for the upload, refreshed first when close to expiry.
    async fn credentials(&self) -> Result<Credentials, UploadFailure> {
        let credentials = self.session.request_credentials().map_err(|_| {
            self.reconnect_required("Not connected");
            UploadFailure::NotConnected
        })?;

        let refresh_buffer = chrono::Duration::from_std(self.session.config().refresh_buffer)
            .unwrap_or_else(|_| chrono::Duration::minutes(5));
        let expiring = credentials
            .token
            .expires_within(self.clock.now(), refresh_buffer);

        if !expiring || credentials.token.refresh_token().is_none() {
            return Ok(credentials);
        }

        debug!("Token expires soon, refreshing before upload");
        match self.session.refresh().await {
            Ok(_) => {}
            Err(AuthError::AuthExpired(_)) => return Err(UploadFailure::AuthExpired),
            Err(e) => warn!(error = %e, "Refresh before upload failed, using current token"),
        }

        self.session.request_credentials().map_err(|_| {
            self.reconnect_required("Not connected");
            UploadFailure::NotConnected
        })
    }

    fn reconnect_required(&self, reason: &str) {
        let _ = self
            .event_bus
            .emit(CoreEvent::Session(SessionEvent::ReconnectRequired {
                reason: reason.to_string(),
            }));
    }

    fn finish_failed(&self, mut job: UploadJob, failure: UploadFailure) -> UploadJob {
        warn!(job_id = %job.id, reason = %failure, "Upload failed");

        let requires_reconnect = failure.requires_reconnect();
        let message = failure.to_string();
        if let Err(e) = job.fail(failure) {
            error!(error = %e, "Upload job could not be marked failed");
            return job;
        }

        let _ = self.event_bus.emit(CoreEvent::Upload(UploadEvent::Failed {
            job_id: job.id.to_string(),
            message,
            requires_reconnect,
        }));
        job
    }
}
