//! Verified on-disk store of long-lived refresh tokens.
//!
//! The file is a tagged binary buffer: a file identifier, a record count,
//! then length-prefixed `{account_id, [(provider, refresh_token)]}` records.
//! Parsing doubles as the verifier; every length is bounds-checked and a
//! buffer that fails verification is treated as empty on read paths and as a
//! hard error on write paths.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use bytes::{Buf, BufMut};
use log::warn;

use crate::account::IdentityProvider;
use crate::errors::{AuthError, Result, Status};

/// File identifier expected at the start of every credential buffer.
const MAGIC: &[u8; 4] = b"CRD2";

type CredentialTable = BTreeMap<String, BTreeMap<IdentityProvider, String>>;

fn provider_tag(provider: IdentityProvider) -> u8 {
    match provider {
        IdentityProvider::Dev => 0,
        IdentityProvider::Google => 1,
    }
}

fn provider_from_tag(tag: u8) -> Option<IdentityProvider> {
    match tag {
        0 => Some(IdentityProvider::Dev),
        1 => Some(IdentityProvider::Google),
        _ => None,
    }
}

/// On-disk table of refresh tokens keyed by account id and identity
/// provider.
///
/// The parsed table is held as an owned structure; mutations rebuild it,
/// re-serialize, re-verify and rewrite the file atomically. A failed write
/// leaves both the file and the in-memory table on the last successful
/// state.
pub struct CredentialStore {
    path: PathBuf,
    table: CredentialTable,
}

impl CredentialStore {
    /// Loads the store from `path`. A missing file is an empty store; a file
    /// that fails verification is logged and read as empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let table = match fs::read(&path) {
            Ok(buffer) => match parse(&buffer) {
                Ok(table) => table,
                Err(reason) => {
                    warn!(
                        "Unable to verify credentials buffer at {}: {}",
                        path.display(),
                        reason
                    );
                    CredentialTable::new()
                }
            },
            Err(error) if error.kind() == io::ErrorKind::NotFound => CredentialTable::new(),
            Err(error) => {
                warn!(
                    "Unable to read credentials file at {}: {}",
                    path.display(),
                    error
                );
                CredentialTable::new()
            }
        };
        CredentialStore { path, table }
    }

    /// Re-reads the store from disk, discarding the in-memory table.
    pub fn reload(&mut self) {
        *self = CredentialStore::load(self.path.clone());
    }

    pub fn get_refresh_token(&self, account_id: &str, provider: IdentityProvider) -> Option<&str> {
        self.table
            .get(account_id)?
            .get(&provider)
            .map(String::as_str)
    }

    /// Inserts a credential, replacing any existing entry for
    /// `(account_id, provider)`.
    pub fn upsert(
        &mut self,
        account_id: &str,
        provider: IdentityProvider,
        refresh_token: &str,
    ) -> Result<()> {
        let mut table = self.table.clone();
        table
            .entry(account_id.to_owned())
            .or_default()
            .insert(provider, refresh_token.to_owned());
        self.commit(table)
    }

    /// Drops every identity provider credential for the account.
    pub fn remove(&mut self, account_id: &str) -> Result<()> {
        let mut table = self.table.clone();
        table.remove(account_id);
        self.commit(table)
    }

    /// Serializes `table`, re-verifies the buffer and rewrites the whole
    /// file. The in-memory table only advances once the rename lands.
    fn commit(&mut self, table: CredentialTable) -> Result<()> {
        let buffer = serialize(&table)?;
        if let Err(reason) = parse(&buffer) {
            return Err(AuthError::new(
                Status::InternalError,
                format!("Serialized credentials failed verification: {}", reason),
            ));
        }

        if let Some(directory) = self.path.parent() {
            fs::create_dir_all(directory)
                .map_err(|error| AuthError::from(error).context("Unable to create directory"))?;
        }
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, &buffer)
            .map_err(|error| AuthError::from(error).context("Unable to write credentials file"))?;
        fs::rename(&staging, &self.path)
            .map_err(|error| AuthError::from(error).context("Unable to write credentials file"))?;

        self.table = table;
        Ok(())
    }
}

fn serialize(table: &CredentialTable) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    buffer.put_slice(MAGIC);
    buffer.put_u32_le(table.len() as u32);
    for (account_id, credentials) in table {
        put_str(&mut buffer, account_id)?;
        buffer.put_u16_le(credentials.len() as u16);
        for (provider, refresh_token) in credentials {
            buffer.put_u8(provider_tag(*provider));
            put_str(&mut buffer, refresh_token)?;
        }
    }
    Ok(buffer)
}

fn put_str(buffer: &mut Vec<u8>, value: &str) -> Result<()> {
    if value.len() > u16::MAX as usize {
        return Err(AuthError::new(
            Status::InternalError,
            "Credential field too long to serialize",
        ));
    }
    buffer.put_u16_le(value.len() as u16);
    buffer.put_slice(value.as_bytes());
    Ok(())
}

/// Parses a credential buffer, verifying it in the process. Unrecognized
/// identity provider tags are skipped so that newer files still load.
fn parse(mut buffer: &[u8]) -> std::result::Result<CredentialTable, String> {
    if buffer.remaining() < MAGIC.len() + 4 {
        return Err("buffer shorter than the header".to_owned());
    }
    let mut magic = [0u8; 4];
    buffer.copy_to_slice(&mut magic);
    if &magic != MAGIC {
        return Err(format!("unrecognized file identifier {:02x?}", magic));
    }

    let record_count = buffer.get_u32_le();
    let mut table = CredentialTable::new();
    for _ in 0..record_count {
        let account_id = get_str(&mut buffer)?;
        if table.contains_key(&account_id) {
            return Err("duplicate account id".to_owned());
        }
        if buffer.remaining() < 2 {
            return Err("truncated credential count".to_owned());
        }
        let credential_count = buffer.get_u16_le();
        let mut credentials = BTreeMap::new();
        for _ in 0..credential_count {
            if !buffer.has_remaining() {
                return Err("truncated identity provider tag".to_owned());
            }
            let tag = buffer.get_u8();
            let refresh_token = get_str(&mut buffer)?;
            match provider_from_tag(tag) {
                Some(provider) => {
                    credentials.insert(provider, refresh_token);
                }
                None => warn!("Skipping credential with unrecognized identity provider {}", tag),
            }
        }
        table.insert(account_id, credentials);
    }
    if buffer.has_remaining() {
        return Err("trailing bytes after the last record".to_owned());
    }
    Ok(table)
}

fn get_str(buffer: &mut &[u8]) -> std::result::Result<String, String> {
    if buffer.remaining() < 2 {
        return Err("truncated length prefix".to_owned());
    }
    let length = buffer.get_u16_le() as usize;
    if buffer.remaining() < length {
        return Err("field length exceeds the buffer".to_owned());
    }
    let mut bytes = vec![0u8; length];
    buffer.copy_to_slice(&mut bytes);
    String::from_utf8(bytes).map_err(|_| "field is not valid UTF-8".to_owned())
}
