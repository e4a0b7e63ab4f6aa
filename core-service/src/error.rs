use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Runtime(#[from] core_runtime::Error),

    #[error("Authentication error: {0}")]
    Auth(#[from] core_auth::AuthError),

    #[error("Upload error: {0}")]
    Upload(#[from] core_upload::UploadError),

    #[error("Platform error: {0}")]
    Bridge(#[from] bridge_traits::BridgeError),

    #[error("Capture not found: {0}")]
    CaptureNotFound(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
