//! System Browser Authorization Presenter

use bridge_traits::{
    error::{BridgeError, Result},
    presentation::AuthorizationPresenter,
};
use tracing::{debug, warn};

/// Opens the authorization page in the user's default browser.
///
/// The redirect comes back through the custom URL scheme registered by the
/// host application, so nothing here waits for the page to close.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebBrowserPresenter;

impl AuthorizationPresenter for WebBrowserPresenter {
    fn open_authorization_url(&self, url: &str) -> Result<()> {
        match webbrowser::open(url) {
            Ok(()) => {
                debug!("Opened authorization page in system browser");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to open system browser");
                Err(BridgeError::OperationFailed(format!(
                    "Failed to open browser for authorization: {}",
                    e
                )))
            }
        }
    }
}
