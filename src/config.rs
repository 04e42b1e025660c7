//! Google OAuth endpoints and client configuration.
//!
//! Production code uses [`Config::default`], which is wired to the compile
//! time constants below. The individual fields exist so tests can point the
//! manager at local mock endpoints.

use std::path::PathBuf;
use std::time::Duration;

// NOTE: A single client id is used for the whole device stack for now.
pub const CLIENT_ID: &str =
    "934259141868-rejmm4ollj1bs7th1vg2ur6antpbug79.apps.googleusercontent.com";
pub const GOOGLE_OAUTH_AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_OAUTH_TOKEN_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v4/token";
pub const GOOGLE_REVOKE_TOKEN_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/revoke";
pub const GOOGLE_PEOPLE_GET_ENDPOINT: &str = "https://www.googleapis.com/plus/v1/people/me";
pub const FIREBASE_AUTH_ENDPOINT: &str =
    "https://www.googleapis.com/identitytoolkit/v3/relyingparty/verifyAssertion";

/// Where the identity provider redirects once the user accepted or denied
/// the requested scopes. Never actually resolved; enrollment intercepts the
/// navigation before it leaves the web surface.
pub const REDIRECT_URI: &str = "com.google.fuchsia.auth:/oauth2redirect";

/// Location of the verified credential table on disk.
pub const CREDENTIALS_FILE: &str = "/data/v2/creds.db";

/// Window subtracted from token lifetimes so that refreshes happen before
/// the expiry time limit is reached.
pub const TOKEN_EXPIRY_PADDING_S: u64 = 600;

/// Upper bound on the wait for the authorization redirect during an
/// interactive enrollment.
pub const ENROLLMENT_TIMEOUT: Duration = Duration::from_secs(300);

pub const SCOPES: &[&str] = &[
    "openid",
    "email",
    "https://www.googleapis.com/auth/admin.directory.user.readonly",
    "https://www.googleapis.com/auth/assistant",
    "https://www.googleapis.com/auth/gmail.modify",
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
    "https://www.googleapis.com/auth/youtube.readonly",
    "https://www.googleapis.com/auth/contacts",
    "https://www.googleapis.com/auth/drive",
    "https://www.googleapis.com/auth/plus.login",
    "https://www.googleapis.com/auth/calendar.readonly",
];

/// Endpoint set and tunables for a [`crate::manager::TokenManager`].
#[derive(Clone, Debug)]
pub struct Config {
    pub client_id: String,
    pub auth_endpoint: String,
    pub token_endpoint: String,
    pub revoke_endpoint: String,
    pub people_endpoint: String,
    pub firebase_auth_endpoint: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub credentials_file: PathBuf,
    pub enrollment_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            client_id: CLIENT_ID.to_owned(),
            auth_endpoint: GOOGLE_OAUTH_AUTH_ENDPOINT.to_owned(),
            token_endpoint: GOOGLE_OAUTH_TOKEN_ENDPOINT.to_owned(),
            revoke_endpoint: GOOGLE_REVOKE_TOKEN_ENDPOINT.to_owned(),
            people_endpoint: GOOGLE_PEOPLE_GET_ENDPOINT.to_owned(),
            firebase_auth_endpoint: FIREBASE_AUTH_ENDPOINT.to_owned(),
            redirect_uri: REDIRECT_URI.to_owned(),
            scopes: SCOPES.iter().map(|scope| (*scope).to_owned()).collect(),
            credentials_file: PathBuf::from(CREDENTIALS_FILE),
            enrollment_timeout: ENROLLMENT_TIMEOUT,
        }
    }
}
