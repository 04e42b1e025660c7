//! Accounts and the token kinds vended for them.

use ring::rand::{SecureRandom, SystemRandom};

use crate::errors::{AuthError, Result, Status};

/// Backend identity provider an account is provisioned against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum IdentityProvider {
    /// Guest mode. Never persists credentials and never produces non-empty
    /// tokens.
    Dev,
    Google,
}

/// Kind of short-lived token requested from a token provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenType {
    Access,
    Id,
    FirebaseJwt,
}

/// A locally provisioned identity.
///
/// Display attributes are populated best-effort from the provider's profile
/// API; they are empty strings when unknown, never absent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub identity_provider: IdentityProvider,
    pub display_name: String,
    pub url: String,
    pub image_url: String,
}

impl Account {
    /// Creates an account with a freshly generated id and empty display
    /// attributes.
    pub(crate) fn new(identity_provider: IdentityProvider) -> Result<Self> {
        Ok(Account {
            id: generate_account_id()?,
            identity_provider,
            display_name: String::new(),
            url: String::new(),
            image_url: String::new(),
        })
    }
}

/// Draws a uniform 32 bit value from the system CSPRNG and renders it in
/// decimal.
// TODO: check whether the generated id collides with an existing account.
fn generate_account_id() -> Result<String> {
    let mut bytes = [0u8; 4];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AuthError::new(Status::InternalError, "System RNG unavailable"))?;
    Ok(u32::from_le_bytes(bytes).to_string())
}
