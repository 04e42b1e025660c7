//! In-memory cache of short-lived tokens.
//!
//! Entries live for the lifetime the identity provider granted them, minus
//! [`TOKEN_EXPIRY_PADDING_S`] so refreshes happen proactively. The cache is
//! process-local and lost on restart.

use std::collections::HashMap;

use chrono::Utc;

use crate::config::TOKEN_EXPIRY_PADDING_S;

/// Access and id tokens minted from a refresh token, plus any firebase
/// tokens derived from them, indexed by firebase api key.
#[derive(Clone, Debug, Default)]
pub struct ShortLivedToken {
    /// Seconds since epoch at fetch time.
    pub creation_ts: u64,
    /// Lifetime in seconds, as returned by the identity provider.
    pub expires_in: u64,
    pub access_token: String,
    pub id_token: String,
    pub firebase_tokens: HashMap<String, FirebaseAuthToken>,
}

/// A firebase JWT minted from an oauth id token.
#[derive(Clone, Debug, Default)]
pub struct FirebaseAuthToken {
    pub creation_ts: u64,
    pub expires_in: u64,
    pub id_token: String,
    pub local_id: String,
    pub email: String,
}

/// Seconds since epoch.
pub(crate) fn now_ts() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

fn is_fresh(creation_ts: u64, expires_in: u64, now: u64) -> bool {
    now.saturating_sub(creation_ts) < expires_in.saturating_sub(TOKEN_EXPIRY_PADDING_S)
}

/// Per-account cache of short-lived tokens, indexed by account id.
///
/// Lookups apply the freshness rule; stale entries are treated as absent and
/// left for the next store to overwrite.
#[derive(Default)]
pub struct TokenCache {
    tokens: HashMap<String, ShortLivedToken>,
}

impl TokenCache {
    pub fn new() -> Self {
        TokenCache::default()
    }

    /// Returns the cached entry for `account_id` if it is still fresh.
    pub fn lookup(&self, account_id: &str) -> Option<&ShortLivedToken> {
        let token = self.tokens.get(account_id)?;
        is_fresh(token.creation_ts, token.expires_in, now_ts()).then_some(token)
    }

    /// Returns the cached firebase token for `(account_id, api_key)` if it
    /// is still fresh.
    pub fn lookup_firebase(&self, account_id: &str, api_key: &str) -> Option<&FirebaseAuthToken> {
        let token = self.tokens.get(account_id)?.firebase_tokens.get(api_key)?;
        is_fresh(token.creation_ts, token.expires_in, now_ts()).then_some(token)
    }

    /// Overwrites the per-account entry. The firebase sub-map always starts
    /// out empty: tokens derived from the previous id token are no longer
    /// valid.
    pub fn store(&mut self, account_id: &str, mut token: ShortLivedToken) {
        token.firebase_tokens.clear();
        self.tokens.insert(account_id.to_owned(), token);
    }

    pub fn store_firebase(&mut self, account_id: &str, api_key: &str, token: FirebaseAuthToken) {
        self.tokens
            .entry(account_id.to_owned())
            .or_default()
            .firebase_tokens
            .insert(api_key.to_owned(), token);
    }

    /// Drops the account's entry, firebase sub-map included.
    pub fn evict(&mut self, account_id: &str) -> Option<ShortLivedToken> {
        self.tokens.remove(account_id)
    }
}
