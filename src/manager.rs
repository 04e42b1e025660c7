//! Account provisioning and token vending.
//!
//! The manager owns the credential store, the short-lived token cache, one
//! reqwest client and the operation queue. Every flow runs as a queued
//! operation: it validates its inputs, consults the cache, exchanges over
//! HTTP on a miss, updates cache and store, and resolves its completion
//! exactly once.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use log::{error, info, warn};
use tokio::sync::Mutex;

use crate::account::{Account, IdentityProvider, TokenType};
use crate::cache::{now_ts, FirebaseAuthToken, ShortLivedToken, TokenCache};
use crate::config::Config;
use crate::dto;
use crate::errors::{AuthError, Result, Status};
use crate::http::{self, ContentType};
use crate::queue::{OperationQueue, OperationRunner};
use crate::store::CredentialStore;
use crate::surface::{drive_authorization, SurfaceSupplier};

/// Caller-visible firebase token triple. All fields are empty strings for
/// guest accounts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FirebaseToken {
    pub id_token: String,
    pub local_id: String,
    pub email: String,
}

impl From<&FirebaseAuthToken> for FirebaseToken {
    fn from(token: &FirebaseAuthToken) -> Self {
        FirebaseToken {
            id_token: token.id_token.clone(),
            local_id: token.local_id.clone(),
            email: token.email.clone(),
        }
    }
}

struct Inner {
    config: Config,
    client: reqwest::Client,
    store: Mutex<CredentialStore>,
    cache: Mutex<TokenCache>,
    queue: OperationQueue,
    surfaces: Box<dyn SurfaceSupplier>,
}

/// Provisions accounts against Google and vends short-lived tokens for
/// them.
///
/// Cloning is cheap; clones share the store, the cache and the operation
/// queue.
#[derive(Clone)]
pub struct TokenManager {
    inner: Arc<Inner>,
}

impl TokenManager {
    /// Creates a manager, loading the credential store from
    /// `config.credentials_file` and spawning the queue runner.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: Config, surfaces: impl SurfaceSupplier + 'static) -> Self {
        let (queue, runner) = OperationQueue::new();
        tokio::spawn(OperationRunner::run(runner));

        let store = CredentialStore::load(config.credentials_file.clone());
        TokenManager {
            inner: Arc::new(Inner {
                client: reqwest::Client::new(),
                store: Mutex::new(store),
                cache: Mutex::new(TokenCache::new()),
                queue,
                surfaces: Box::new(surfaces),
                config,
            }),
        }
    }

    /// Provisions a new account with the given identity provider.
    ///
    /// A profile fetch failure does not fail enrollment; it is returned
    /// alongside the otherwise valid account.
    pub async fn add_account(
        &self,
        identity_provider: IdentityProvider,
    ) -> Result<(Account, Option<AuthError>)> {
        let account = Account::new(identity_provider)?;
        match identity_provider {
            // Guest mode: nothing to provision, nothing to persist.
            IdentityProvider::Dev => Ok((account, None)),
            IdentityProvider::Google => {
                let inner = Arc::clone(&self.inner);
                let account = run_queued(&self.inner, enroll(inner, account)).await??;

                let inner = Arc::clone(&self.inner);
                let outcome = run_queued(&self.inner, fetch_profile(inner, account)).await?;
                Ok(outcome)
            }
        }
    }

    /// Removes the account locally; with `revoke_all` the refresh token is
    /// also revoked with the identity provider, best effort.
    pub async fn remove_account(&self, account: &Account, revoke_all: bool) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        let account = account.clone();
        run_queued(&self.inner, revoke(inner, account, revoke_all)).await?
    }

    /// Vends the token provider factory for an account.
    pub fn token_provider_factory(&self, account_id: &str) -> TokenProviderFactory {
        TokenProviderFactory {
            inner: Arc::clone(&self.inner),
            account_id: account_id.to_owned(),
        }
    }
}

/// Vends per-consumer token providers for a single account.
pub struct TokenProviderFactory {
    inner: Arc<Inner>,
    account_id: String,
}

impl TokenProviderFactory {
    pub fn get_token_provider(&self) -> TokenProvider {
        TokenProvider {
            inner: Arc::clone(&self.inner),
            account_id: self.account_id.clone(),
        }
    }
}

/// Token vending surface handed to a single consumer.
pub struct TokenProvider {
    inner: Arc<Inner>,
    account_id: String,
}

impl TokenProvider {
    /// Returns a fresh access token, or an empty string for accounts with
    /// no persisted credential.
    pub async fn get_access_token(&self) -> Result<String> {
        self.refresh(TokenType::Access).await
    }

    /// Returns a fresh id token, or an empty string for accounts with no
    /// persisted credential.
    pub async fn get_id_token(&self) -> Result<String> {
        self.refresh(TokenType::Id).await
    }

    /// Exchanges a fresh id token for a firebase JWT scoped to `api_key`.
    pub async fn get_firebase_auth_token(&self, api_key: &str) -> Result<FirebaseToken> {
        // The id token feeds the firebase exchange, so refresh it first.
        let id_token = self.get_id_token().await.map_err(|err| {
            error!("Error in refreshing id token: {}", err);
            err
        })?;

        let inner = Arc::clone(&self.inner);
        let operation = refresh_firebase(
            inner,
            self.account_id.clone(),
            api_key.to_owned(),
            id_token,
        );
        run_queued(&self.inner, operation).await?
    }

    /// The OAuth client id this manager is configured with.
    pub fn client_id(&self) -> &str {
        &self.inner.config.client_id
    }

    async fn refresh(&self, token_type: TokenType) -> Result<String> {
        let inner = Arc::clone(&self.inner);
        let operation = refresh_oauth(inner, self.account_id.clone(), token_type);
        run_queued(&self.inner, operation).await?
    }
}

/// Submits an operation and waits for its single completion.
async fn run_queued<T: Send + 'static>(
    inner: &Arc<Inner>,
    operation: impl Future<Output = T> + Send + 'static,
) -> Result<T> {
    inner
        .queue
        .submit(operation)
        .wait()
        .await
        .ok_or_else(|| AuthError::new(Status::InternalError, "Operation queue stopped"))
}

/// Interactive authorization-code flow: drives the web surface, exchanges
/// the captured code, persists the refresh token and seeds the cache.
async fn enroll(inner: Arc<Inner>, account: Account) -> Result<Account> {
    let config = &inner.config;
    let mut surface = inner
        .surfaces
        .create_surface()
        .map_err(|err| err.context("Unable to create enrollment surface"))?;

    let auth_url = authorization_url(config);
    let code = drive_authorization(
        surface.as_mut(),
        &auth_url,
        &config.redirect_uri,
        config.enrollment_timeout,
    )
    .await?;

    let request_body = format!(
        "code={}&redirect_uri={}&client_id={}&grant_type=authorization_code",
        code, config.redirect_uri, config.client_id
    );
    let document = http::post(
        &inner.client,
        &config.token_endpoint,
        &request_body,
        ContentType::FormUrlEncoded,
    )
    .await?;
    let tokens: dto::AuthCodeExchangeResponse = http::parse_response(document)?;

    inner
        .store
        .lock()
        .await
        .upsert(&account.id, IdentityProvider::Google, &tokens.refresh_token)
        .map_err(|err| err.context("Unable to persist credentials"))?;

    inner.cache.lock().await.store(
        &account.id,
        ShortLivedToken {
            creation_ts: now_ts(),
            expires_in: tokens.expires_in,
            access_token: tokens.access_token,
            id_token: tokens.id_token.unwrap_or_default(),
            firebase_tokens: HashMap::new(),
        },
    );

    Ok(account)
}

/// The scope list is `+`-joined and the URL assembled by hand; a URL
/// builder would re-encode the separator.
fn authorization_url(config: &Config) -> String {
    format!(
        "{}?scope={}&response_type=code&redirect_uri={}&client_id={}",
        config.auth_endpoint,
        config.scopes.join("+"),
        config.redirect_uri,
        config.client_id
    )
}

/// Exchanges the stored refresh token for access and id tokens, consulting
/// the cache first.
async fn refresh_oauth(
    inner: Arc<Inner>,
    account_id: String,
    token_type: TokenType,
) -> Result<String> {
    if account_id.is_empty() {
        return Err(AuthError::new(Status::BadRequest, "Account id is empty."));
    }

    let refresh_token = {
        let store = inner.store.lock().await;
        store
            .get_refresh_token(&account_id, IdentityProvider::Google)
            .map(str::to_owned)
    };
    let refresh_token = match refresh_token {
        Some(token) => token,
        // Not provisioned: guest accounts get empty tokens.
        None => return Ok(String::new()),
    };

    {
        let cache = inner.cache.lock().await;
        if let Some(token) = cache.lookup(&account_id) {
            return short_lived_field(token, token_type);
        }
    }

    let request_body = format!(
        "refresh_token={}&client_id={}&grant_type=refresh_token",
        refresh_token, inner.config.client_id
    );
    let document = http::post(
        &inner.client,
        &inner.config.token_endpoint,
        &request_body,
        ContentType::FormUrlEncoded,
    )
    .await?;
    let tokens: dto::RefreshTokenResponse = http::parse_response(document.clone())?;
    if token_type == TokenType::Id && tokens.id_token.is_none() {
        return Err(AuthError::new(
            Status::BadResponse,
            format!("Invalid response: {}", http::pretty(&document)),
        ));
    }

    let token = ShortLivedToken {
        creation_ts: now_ts(),
        expires_in: tokens.expires_in,
        access_token: tokens.access_token,
        id_token: tokens.id_token.unwrap_or_default(),
        firebase_tokens: HashMap::new(),
    };
    let result = short_lived_field(&token, token_type);
    inner.cache.lock().await.store(&account_id, token);
    result
}

fn short_lived_field(token: &ShortLivedToken, token_type: TokenType) -> Result<String> {
    match token_type {
        TokenType::Access => Ok(token.access_token.clone()),
        TokenType::Id => Ok(token.id_token.clone()),
        TokenType::FirebaseJwt => Err(AuthError::new(Status::InternalError, "invalid token type")),
    }
}

/// Exchanges an oauth id token for a firebase JWT scoped to one api key.
async fn refresh_firebase(
    inner: Arc<Inner>,
    account_id: String,
    api_key: String,
    id_token: String,
) -> Result<FirebaseToken> {
    if account_id.is_empty() {
        return Err(AuthError::new(Status::BadRequest, "Account id is empty."));
    }
    if api_key.is_empty() {
        return Err(AuthError::new(Status::BadRequest, "Firebase api key is empty."));
    }
    if id_token.is_empty() {
        // Guest accounts carry no id token and mint nothing.
        return Ok(FirebaseToken::default());
    }

    {
        let cache = inner.cache.lock().await;
        if let Some(token) = cache.lookup_firebase(&account_id, &api_key) {
            return Ok(FirebaseToken::from(token));
        }
    }

    let request = dto::VerifyAssertionRequest {
        post_body: format!("id_token={}&providerId=google.com", id_token),
        return_idp_credential: true,
        return_secure_token: true,
        request_uri: "http://localhost".to_owned(),
    };
    let request_body = serde_json::to_string(&request).map_err(|err| {
        AuthError::new(
            Status::InternalError,
            format!("Unable to serialize verify-assertion request: {}", err),
        )
    })?;
    let url = format!(
        "{}?key={}",
        inner.config.firebase_auth_endpoint,
        http::url_encode(&api_key)
    );

    let document = http::post(&inner.client, &url, &request_body, ContentType::Json).await?;
    let response: dto::VerifyAssertionResponse = http::parse_response(document.clone())?;
    let expires_in = response.expires_in.parse::<u64>().map_err(|_| {
        AuthError::new(
            Status::BadResponse,
            format!("Invalid response: {}", http::pretty(&document)),
        )
    })?;

    let token = FirebaseAuthToken {
        creation_ts: now_ts(),
        expires_in,
        id_token: response.id_token,
        local_id: response.local_id,
        email: response.email,
    };
    let result = FirebaseToken::from(&token);
    inner
        .cache
        .lock()
        .await
        .store_firebase(&account_id, &api_key, token);
    Ok(result)
}

/// Local removal plus best-effort server-side revocation.
async fn revoke(inner: Arc<Inner>, account: Account, revoke_all: bool) -> Result<()> {
    match account.identity_provider {
        // Guest mode: nothing was ever persisted.
        IdentityProvider::Dev => return Ok(()),
        IdentityProvider::Google => {}
    }

    let refresh_token = {
        let store = inner.store.lock().await;
        store
            .get_refresh_token(&account.id, IdentityProvider::Google)
            .map(str::to_owned)
    };
    let refresh_token = match refresh_token {
        Some(token) => token,
        None => {
            // Maybe a guest or already-removed account.
            info!("Account {} not found; nothing to revoke.", account.id);
            return Ok(());
        }
    };

    // Local state goes first so the account reads as removed even if the
    // server-side revocation fails.
    inner.cache.lock().await.evict(&account.id);
    inner
        .store
        .lock()
        .await
        .remove(&account.id)
        .map_err(|err| err.context("Unable to delete persistent credentials"))?;

    if !revoke_all {
        return Ok(());
    }

    let url = format!("{}?token={}", inner.config.revoke_endpoint, refresh_token);
    http::post(&inner.client, &url, "", ContentType::FormUrlEncoded).await?;
    // The response body is not inspected; revocation is best effort.
    Ok(())
}

/// Best-effort population of display attributes from the people endpoint.
/// Failures leave the account valid and are reported beside it.
async fn fetch_profile(inner: Arc<Inner>, mut account: Account) -> (Account, Option<AuthError>) {
    let access_token = {
        let cache = inner.cache.lock().await;
        cache
            .lookup(&account.id)
            .map(|token| token.access_token.clone())
    };
    let access_token = match access_token {
        Some(token) => token,
        // Nothing cached; the attributes stay empty.
        None => return (account, None),
    };

    let result = http::get(&inner.client, &inner.config.people_endpoint, &access_token)
        .await
        .and_then(|document| http::parse_response::<dto::PersonResponse>(document));

    match result {
        Ok(person) => {
            account.display_name = person.display_name.unwrap_or_default();
            account.url = person.url.unwrap_or_default();
            account.image_url = person.image.and_then(|image| image.url).unwrap_or_default();
            (account, None)
        }
        Err(err) => {
            // Account is missing profile attributes, but still valid.
            warn!("Profile attributes unavailable: {}", err);
            (account, Some(err))
        }
    }
}
