//! Bulwark Guard client
//!
//! Client-side contract for the Bulwark authentication service:
//!
//! - **SessionProtocol**: authenticate, acknowledge, validate, renew and
//!   revoke token pairs against the service
//! - **HttpKeySource**: feeds the service's signing keys into a
//!   [`guard_core::KeyStore`]
//! - **Guard**: both of the above plus local verification, sharing one
//!   HTTP client
//!
//! ## Usage
//!
//! ```rust,no_run
//! use guard_client::{Guard, GuardConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let guard = Guard::new(GuardConfig::new("http://localhost:8080"))?;
//! let device_id = "device-1";
//!
//! let pair = guard.session().authenticate_password("a@x.com", "p1").await?;
//! guard
//!     .session()
//!     .acknowledge(&pair.access_token, &pair.refresh_token, "a@x.com", device_id)
//!     .await?;
//!
//! // Authoritative: observes revocation
//! let claims = guard
//!     .session()
//!     .validate_remote("a@x.com", &pair.access_token, device_id)
//!     .await?;
//! assert_eq!(claims.subject(), "a@x.com");
//!
//! // Advisory: no network call, cannot observe revocation
//! guard.refresh_keys().await?;
//! let local = guard.verify_locally(&pair.access_token)?;
//! if local.has_role("admin") {
//!     // ...
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod guard;
pub mod key_source;
pub mod models;
pub mod session;
pub mod social;
pub mod transport;

pub use config::{ConfigError, GuardConfig};
pub use guard::Guard;
pub use key_source::HttpKeySource;
pub use models::{CredentialClaim, ErrorEnvelope, TokenPair};
pub use session::SessionProtocol;
pub use social::{SocialProvider, UnknownProvider};
pub use transport::HttpTransport;

pub use guard_core::{
    has_permission, has_role, AccessTokenClaims, ClientVerifier, GuardError, KeyStore,
    ProtocolError, Result, VerifiedClaims, UNKNOWN_ERROR,
};
