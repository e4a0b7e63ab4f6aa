//! # Upload Module
//!
//! Delivers captured receipts to the cloud storage provider.
//!
//! ## Overview
//!
//! Captures are uploaded by filename into the configured remote folder. An
//! upload is never attempted without a usable session, and a credential the
//! provider rejects ends the session so the user is asked to reconnect
//! instead of silently losing the file.
//!
//! ## Components
//!
//! - **Upload Job State Machine** (`job`): Lifecycle of one upload with validated transitions
//! - **Upload Coordinator** (`coordinator`): Runs jobs against the session and provider
//! - **Capture Log** (`capture_log`): Local JSON record of captures and their upload status

pub mod capture_log;
pub mod coordinator;
pub mod error;
pub mod job;

pub use capture_log::{capture_filename, CaptureLog, CaptureLogEntry};
pub use coordinator::UploadCoordinator;
pub use error::{Result, UploadError, UploadFailure};
pub use job::{UploadJob, UploadJobId, UploadStatus, SUCCESS_STATUS};
