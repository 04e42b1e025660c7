//! Account removal and best-effort revocation scenarios.

mod common;

use mockito::Matcher;
use tempfile::TempDir;

use oauth_token_manager::store::CredentialStore;
use oauth_token_manager::{Account, IdentityProvider, Status, TokenManager};

use common::{code_redirect, test_config, FakeSurfaceSupplier};

fn provision(credentials_file: &std::path::Path, account_id: &str, refresh_token: &str) {
    let mut store = CredentialStore::load(credentials_file);
    store
        .upsert(account_id, IdentityProvider::Google, refresh_token)
        .unwrap();
}

fn google_account(id: &str) -> Account {
    Account {
        id: id.to_owned(),
        identity_provider: IdentityProvider::Google,
        display_name: String::new(),
        url: String::new(),
        image_url: String::new(),
    }
}

#[tokio::test]
async fn revoke_all_removes_locally_and_remotely() {
    let mut server = mockito::Server::new_async().await;
    let directory = TempDir::new().unwrap();
    let credentials_file = directory.path().join("v2").join("creds.db");

    server
        .mock("POST", "/oauth2/v4/token")
        .with_body(r#"{"refresh_token":"r","access_token":"a","id_token":"i","expires_in":3600}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/plus/v1/people/me")
        .with_body("{}")
        .create_async()
        .await;
    let revoke_mock = server
        .mock("POST", "/o/oauth2/revoke")
        .match_query(Matcher::UrlEncoded("token".to_owned(), "r".to_owned()))
        .with_body("")
        .expect(1)
        .create_async()
        .await;

    let supplier = FakeSurfaceSupplier::new(&[&code_redirect("XYZ")]);
    let manager = TokenManager::new(
        test_config(&server.url(), credentials_file.clone()),
        supplier,
    );
    let (account, _) = manager
        .add_account(IdentityProvider::Google)
        .await
        .unwrap();

    manager.remove_account(&account, true).await.unwrap();

    let store = CredentialStore::load(&credentials_file);
    assert!(store
        .get_refresh_token(&account.id, IdentityProvider::Google)
        .is_none());

    // The cache is gone too: the account now reads as a guest.
    let provider = manager
        .token_provider_factory(&account.id)
        .get_token_provider();
    assert_eq!(provider.get_access_token().await.unwrap(), "");

    // Removing again is a silent success with no further revocation call.
    manager.remove_account(&account, true).await.unwrap();
    revoke_mock.assert_async().await;
}

#[tokio::test]
async fn local_removal_skips_the_revocation_endpoint() {
    let server = mockito::Server::new_async().await;
    let directory = TempDir::new().unwrap();
    let credentials_file = directory.path().join("v2").join("creds.db");
    provision(&credentials_file, "42", "r");

    let manager = TokenManager::new(
        test_config(&server.url(), credentials_file.clone()),
        FakeSurfaceSupplier::new(&[]),
    );

    // No revocation mock exists; hitting the endpoint would fail the call.
    manager
        .remove_account(&google_account("42"), false)
        .await
        .unwrap();

    let store = CredentialStore::load(&credentials_file);
    assert!(store
        .get_refresh_token("42", IdentityProvider::Google)
        .is_none());
}

#[tokio::test]
async fn server_rejection_still_removes_locally() {
    let mut server = mockito::Server::new_async().await;
    let directory = TempDir::new().unwrap();
    let credentials_file = directory.path().join("v2").join("creds.db");
    provision(&credentials_file, "42", "r");

    server
        .mock("POST", "/o/oauth2/revoke")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_body(r#"{"error":"invalid_token"}"#)
        .create_async()
        .await;

    let manager = TokenManager::new(
        test_config(&server.url(), credentials_file.clone()),
        FakeSurfaceSupplier::new(&[]),
    );

    let error = manager
        .remove_account(&google_account("42"), true)
        .await
        .unwrap_err();
    assert_eq!(error.status, Status::OauthServerError);

    // The local removal already happened; a repeat call reports success.
    let store = CredentialStore::load(&credentials_file);
    assert!(store
        .get_refresh_token("42", IdentityProvider::Google)
        .is_none());
    manager
        .remove_account(&google_account("42"), true)
        .await
        .unwrap();
}

#[tokio::test]
async fn unknown_account_removal_is_a_silent_success() {
    let server = mockito::Server::new_async().await;
    let directory = TempDir::new().unwrap();
    let credentials_file = directory.path().join("v2").join("creds.db");

    let manager = TokenManager::new(
        test_config(&server.url(), credentials_file),
        FakeSurfaceSupplier::new(&[]),
    );
    manager
        .remove_account(&google_account("42"), true)
        .await
        .unwrap();
    manager
        .remove_account(&google_account("42"), false)
        .await
        .unwrap();
}

#[tokio::test]
async fn dev_account_removal_is_a_noop() {
    let server = mockito::Server::new_async().await;
    let directory = TempDir::new().unwrap();
    let credentials_file = directory.path().join("v2").join("creds.db");

    let manager = TokenManager::new(
        test_config(&server.url(), credentials_file.clone()),
        FakeSurfaceSupplier::new(&[]),
    );
    let (account, _) = manager.add_account(IdentityProvider::Dev).await.unwrap();
    manager.remove_account(&account, true).await.unwrap();
    assert!(!credentials_file.exists());
}
