//! Wire documents for the Google OAuth and Firebase endpoints.
//!
//! One struct per endpoint; a response that deserializes is a response with
//! every required field present. Unknown fields are ignored.

use serde::{Deserialize, Serialize};

/// Token endpoint response for the `authorization_code` grant. Both the
/// refresh and the access token must be present for enrollment to succeed.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AuthCodeExchangeResponse {
    pub refresh_token: String,
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
    pub expires_in: u64,
}

/// Token endpoint response for the `refresh_token` grant.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RefreshTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
    pub expires_in: u64,
}

/// Request document for the firebase verify-assertion endpoint.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct VerifyAssertionRequest {
    #[serde(rename = "postBody")]
    pub post_body: String,
    #[serde(rename = "returnIdpCredential")]
    pub return_idp_credential: bool,
    #[serde(rename = "returnSecureToken")]
    pub return_secure_token: bool,
    #[serde(rename = "requestUri")]
    pub request_uri: String,
}

/// Firebase verify-assertion response. `expires_in` arrives as a decimal
/// string.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct VerifyAssertionResponse {
    #[serde(rename = "idToken")]
    pub id_token: String,
    #[serde(rename = "localId")]
    pub local_id: String,
    pub email: String,
    #[serde(rename = "expiresIn")]
    pub expires_in: String,
}

/// People-get response. Every attribute is optional on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct PersonResponse {
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    pub url: Option<String>,
    pub image: Option<PersonImage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct PersonImage {
    pub url: Option<String>,
}
