//! Shared fakes for the end-to-end scenarios: a scripted enrollment surface
//! and a config pointing at local mock endpoints.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use oauth_token_manager::{Config, EnrollmentSurface, Result, SurfaceSupplier};

pub const REDIRECT: &str = "com.google.fuchsia.auth:/oauth2redirect";

pub fn code_redirect(code: &str) -> String {
    format!("{}?code={}#", REDIRECT, code)
}

pub fn cancel_redirect() -> String {
    format!("{}?error=access_denied&hl=en", REDIRECT)
}

/// Points every endpoint the manager talks to at the mock server.
pub fn test_config(server_url: &str, credentials_file: PathBuf) -> Config {
    let mut config = Config::default();
    config.token_endpoint = format!("{}/oauth2/v4/token", server_url);
    config.revoke_endpoint = format!("{}/o/oauth2/revoke", server_url);
    config.people_endpoint = format!("{}/plus/v1/people/me", server_url);
    config.firebase_auth_endpoint = format!(
        "{}/identitytoolkit/v3/relyingparty/verifyAssertion",
        server_url
    );
    config.credentials_file = credentials_file;
    config.enrollment_timeout = Duration::from_secs(5);
    config
}

/// Replays canned navigation events and counts overlay teardowns.
pub struct FakeSurface {
    navigations: VecDeque<String>,
    stops: Arc<AtomicUsize>,
}

#[async_trait]
impl EnrollmentSurface for FakeSurface {
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
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakeSurfaceSupplier {
    navigations: Vec<String>,
    pub stops: Arc<AtomicUsize>,
}

impl FakeSurfaceSupplier {
    pub fn new(navigations: &[&str]) -> Self {
        FakeSurfaceSupplier {
            navigations: navigations.iter().map(|url| (*url).to_owned()).collect(),
            stops: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl SurfaceSupplier for FakeSurfaceSupplier {
    fn create_surface(&self) -> Result<Box<dyn EnrollmentSurface + Send>> {
        Ok(Box::new(FakeSurface {
            navigations: self.navigations.clone().into(),
            stops: Arc::clone(&self.stops),
        }))
    }
}
