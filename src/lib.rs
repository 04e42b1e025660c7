//! # OAuth 2.0 / Firebase token manager
//!
//! Provisions user accounts against Google via the authorization-code flow,
//! persists long-lived refresh tokens in a verified on-disk store, and vends
//! short-lived access, id and firebase tokens from an in-memory cache.
//!
//! Interactive enrollment drives an embedded web surface (abstracted behind
//! [`SurfaceSupplier`]) through the consent flow and intercepts the redirect
//! to capture the authorization code. All flows run serialized on an
//! internal operation queue, so operations observe the cache and store state
//! their predecessors produced.
//!
//! ```no_run
//! # use oauth_token_manager::*;
//! # async fn demo(surfaces: impl SurfaceSupplier + 'static) -> Result<()> {
//! let manager = manager::TokenManager::new(Config::default(), surfaces);
//! let (account, _profile_warning) = manager.add_account(IdentityProvider::Google).await?;
//!
//! let provider = manager
//!     .token_provider_factory(&account.id)
//!     .get_token_provider();
//! let access_token = provider.get_access_token().await?;
//! # Ok(())
//! # }
//! ```

pub mod account;
pub mod cache;
pub mod config;
pub mod errors;
pub mod manager;
pub mod store;
pub mod surface;

mod dto;
mod http;
mod queue;

// Forward declarations
pub use account::{Account, IdentityProvider, TokenType};
pub use config::Config;
pub use errors::{AuthError, Result, Status};
pub use manager::{FirebaseToken, TokenManager, TokenProvider, TokenProviderFactory};
pub use surface::{EnrollmentSurface, SurfaceSupplier};
