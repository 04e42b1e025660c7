//! Contract consumed from the embedded web surface during enrollment.
//!
//! The surface itself is an external collaborator: implementations launch a
//! web view, ask the host overlay to display it and forward every outgoing
//! navigation. The core only needs the handful of capabilities below.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;

use crate::errors::{AuthError, Result, Status};

/// Factory for per-enrollment web surfaces.
///
/// Every interactive enrollment gets a fresh surface in its own context.
pub trait SurfaceSupplier: Send + Sync {
    fn create_surface(&self) -> Result<Box<dyn EnrollmentSurface + Send>>;
}

/// A web view presented over the current UI for the authorization-code
/// flow.
#[async_trait]
pub trait EnrollmentSurface {
    /// Clears session cookies before the flow starts.
    async fn clear_cookies(&mut self) -> Result<()>;

    /// Points the surface at `url` and asks the host to display it.
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// The next outgoing navigation observed by the surface, or `None` once
    /// the surface disconnected.
    async fn next_navigation(&mut self) -> Option<String>;

    /// Dismisses the overlay.
    async fn stop_overlay(&mut self);
}

/// Drives the surface through the authorization flow and returns the
/// captured authorization code.
///
/// Once the surface is displayed, the overlay is stopped exactly once on
/// every terminal path: code captured, user denial, surface disconnect, or
/// timeout.
pub(crate) async fn drive_authorization(
    surface: &mut (dyn EnrollmentSurface + Send),
    auth_url: &str,
    redirect_uri: &str,
    enrollment_timeout: Duration,
) -> Result<String> {
    surface.clear_cookies().await?;
    surface.navigate(auth_url).await?;

    let outcome = timeout(enrollment_timeout, watch_for_redirect(surface, redirect_uri))
        .await
        .unwrap_or_else(|_| {
            Err(AuthError::new(
                Status::UserCancelled,
                "Timed out waiting for the authorization redirect",
            ))
        });
    surface.stop_overlay().await;
    outcome
}

/// Watches every navigation until the identity provider redirects back.
/// Navigations that are not the redirect are the provider's own sign-in
/// pages and pass through untouched.
async fn watch_for_redirect(
    surface: &mut (dyn EnrollmentSurface + Send),
    redirect_uri: &str,
) -> Result<String> {
    let code_prefix = format!("{}?code=", redirect_uri);
    let cancel_prefix = format!("{}?error=access_denied", redirect_uri);

    loop {
        let url = match surface.next_navigation().await {
            Some(url) => url,
            None => {
                return Err(AuthError::new(
                    Status::UserCancelled,
                    "Web surface disconnected during enrollment",
                ))
            }
        };

        if url.starts_with(&cancel_prefix) {
            return Err(AuthError::new(Status::UserCancelled, "User cancelled OAuth flow"));
        }
        if let Some(code) = parse_auth_code(&url, &code_prefix) {
            return Ok(code);
        }
    }
}

/// Extracts the authorization code from a redirect URL, dropping the
/// trailing `#` the provider appends.
fn parse_auth_code(url: &str, code_prefix: &str) -> Option<String> {
    let code = url.strip_prefix(code_prefix)?;
    Some(code.strip_suffix('#').unwrap_or(code).to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;

    struct ScriptedSurface {
        navigations: VecDeque<String>,
        stops: u32,
    }

    impl ScriptedSurface {
        fn new(navigations: &[&str]) -> Self {
            ScriptedSurface {
                navigations: navigations.iter().map(|url| (*url).to_owned()).collect(),
                stops: 0,
            }
        }
    }

    #[async_trait]
    impl EnrollmentSurface for ScriptedSurface {
        async fn clear_cookies(&mut self) -> Result<()> {
            Ok(())
        }

        async fn navigate(&mut self, _url: &str) -> Result<()> {
            Ok(())
        }

        async fn next_navigation(&mut self) -> Option<String> {
            self.navigations.pop_front()
        }

        async fn stop_overlay(&mut self) {
            self.stops += 1;
        }
    }

    const REDIRECT: &str = "com.google.fuchsia.auth:/oauth2redirect";

    #[test]
    fn auth_code_parsing() {
        let prefix = format!("{}?code=", REDIRECT);
        assert_eq!(
            parse_auth_code(&format!("{}?code=4/abc#", REDIRECT), &prefix),
            Some("4/abc".to_owned())
        );
        assert_eq!(
            parse_auth_code(&format!("{}?code=4/abc", REDIRECT), &prefix),
            Some("4/abc".to_owned())
        );
        assert_eq!(
            parse_auth_code("https://accounts.google.com/signin", &prefix),
            None
        );
    }

    #[tokio::test]
    async fn captures_the_code_and_ignores_provider_pages() {
        let mut surface = ScriptedSurface::new(&[
            "https://accounts.google.com/signin/challenge",
            "https://accounts.google.com/signin/consent",
            "com.google.fuchsia.auth:/oauth2redirect?code=XYZ#",
        ]);
        let code =
            drive_authorization(&mut surface, "auth-url", REDIRECT, Duration::from_secs(5)).await;
        assert_eq!(code.unwrap(), "XYZ");
        assert_eq!(surface.stops, 1);
    }

    #[tokio::test]
    async fn denial_cancels_the_flow() {
        let mut surface = ScriptedSurface::new(&[
            "com.google.fuchsia.auth:/oauth2redirect?error=access_denied&hl=en",
        ]);
        let error = drive_authorization(&mut surface, "auth-url", REDIRECT, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(error.status, Status::UserCancelled);
        assert_eq!(surface.stops, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_cancels_the_flow() {
        struct StuckSurface {
            stops: u32,
        }

        #[async_trait]
        impl EnrollmentSurface for StuckSurface {
            async fn clear_cookies(&mut self) -> Result<()> {
                Ok(())
            }

            async fn navigate(&mut self, _url: &str) -> Result<()> {
                Ok(())
            }

            async fn next_navigation(&mut self) -> Option<String> {
                futures::future::pending().await
            }

            async fn stop_overlay(&mut self) {
                self.stops += 1;
            }
        }

        let mut surface = StuckSurface { stops: 0 };
        let error = drive_authorization(&mut surface, "auth-url", REDIRECT, Duration::from_secs(300))
            .await
            .unwrap_err();
        assert_eq!(error.status, Status::UserCancelled);
        assert_eq!(surface.stops, 1);
    }

    #[tokio::test]
    async fn disconnect_cancels_the_flow() {
        let mut surface = ScriptedSurface::new(&["https://accounts.google.com/signin"]);
        let error = drive_authorization(&mut surface, "auth-url", REDIRECT, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(error.status, Status::UserCancelled);
        assert_eq!(surface.stops, 1);
    }
}
