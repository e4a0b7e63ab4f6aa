//! Authorization Presentation
//!
//! The host decides how the provider's authorization page is shown: the
//! system browser on desktop, an in-app web session on mobile.

use crate::error::Result;

/// Opens the provider's authorization page for the user.
///
/// Opening is fire-and-forget: the outcome of the authorization arrives later
/// through the redirect callback. An error means the page could not be shown
/// at all.
pub trait AuthorizationPresenter: Send + Sync {
    fn open_authorization_url(&self, url: &str) -> Result<()>;
}
