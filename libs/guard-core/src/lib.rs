//! Offline half of the Bulwark guard
//!
//! Everything needed to trust an access token without a network round trip:
//!
//! - **TokenCodec**: reads token headers and verifies RS256 signatures
//! - **KeyStore**: atomically swapped snapshot of the service's signing keys
//! - **ClientVerifier**: KeyStore + TokenCodec, i.e. local verification
//! - **VerifiedClaims**: claims that passed verification, with role and
//!   permission checks
//!
//! Local verification cannot detect revocation. Its result is bounded by the
//! token's expiry and by how recently the caller refreshed the KeyStore.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use guard_core::{ClientVerifier, KeyStore, TokenCodec};
//! use std::sync::Arc;
//!
//! let store = Arc::new(KeyStore::new(key_source));
//! store.refresh().await?;
//!
//! let verifier = ClientVerifier::new(store, TokenCodec::default());
//! let claims = verifier.verify_locally(&access_token)?;
//! if claims.has_role("admin") {
//!     // ...
//! }
//! ```

pub mod claims;
pub mod codec;
pub mod error;
pub mod keys;
pub mod verifier;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use claims::{has_permission, has_role, AccessTokenClaims, VerificationSource, VerifiedClaims};
pub use codec::{decode_header, TokenCodec, TokenHeader, VerificationOptions, SIGNING_ALGORITHM};
pub use error::{GuardError, ProtocolError, Result, UNKNOWN_ERROR};
pub use keys::{
    KeyError, KeyListing, KeySet, KeySource, KeyStore, PublishedKey, RefreshSummary, SigningKey,
};
pub use verifier::ClientVerifier;
