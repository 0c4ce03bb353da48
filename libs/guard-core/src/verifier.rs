//! Local (offline) access-token verification
//!
//! `verify_locally` answers "was this token signed by a key we currently
//! trust, and is it unexpired" without a network call. It cannot observe
//! revocation, logout, or acknowledgment state. A locally verified result is
//! only as fresh as the token's own `exp` claim and the last
//! [`KeyStore::refresh`]; use remote validation for privileged decisions.
//! Nothing here refreshes keys on the caller's behalf.

use std::sync::Arc;

use tracing::debug;

use crate::claims::VerifiedClaims;
use crate::codec::TokenCodec;
use crate::error::Result;
use crate::keys::KeyStore;

#[derive(Debug, Clone)]
pub struct ClientVerifier {
    key_store: Arc<KeyStore>,
    codec: TokenCodec,
}

impl ClientVerifier {
    pub fn new(key_store: Arc<KeyStore>, codec: TokenCodec) -> Self {
        Self { key_store, codec }
    }

    pub fn key_store(&self) -> &Arc<KeyStore> {
        &self.key_store
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Verify `access_token` against the current key snapshot.
    ///
    /// ## Errors
    ///
    /// - `MalformedToken` if the header cannot be read or has no key id
    /// - `UnknownKey` if the key id is not in the current snapshot
    /// - `SignatureInvalid` if the signature does not verify
    /// - `AuthRejected` if the token is expired or fails issuer/audience checks
    pub fn verify_locally(&self, access_token: &str) -> Result<VerifiedClaims> {
        let header = self.codec.decode_header(access_token)?;
        let key = self.key_store.lookup(&header.key_id)?;

        let verified = self
            .codec
            .verify_and_decode_claims(access_token, key.decoding_key())?;

        debug!(key_id = %header.key_id, "Access token verified locally");
        Ok(verified)
    }
}
