//! Structural decode and RS256 verification of access tokens
//!
//! RS256 ONLY. Any other `alg` in a token header is treated as a signature
//! failure. Claims are never handed out before the signature check passes.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use tracing::debug;

use crate::claims::{AccessTokenClaims, VerifiedClaims};
use crate::error::{GuardError, Result};

/// Signing algorithm used by the issuing service
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::RS256;

/// Clock skew tolerance applied to `exp`/`nbf`
pub const DEFAULT_LEEWAY_SECS: u64 = 30;

/// Header fields read from a token without verifying it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHeader {
    pub key_id: String,
    pub algorithm: Algorithm,
}

/// Claim checks applied after the signature verifies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationOptions {
    /// Required `iss`, if any
    pub issuer: Option<String>,
    /// Required `aud`, if any
    pub audience: Option<String>,
    pub leeway_secs: u64,
}

impl Default for VerificationOptions {
    fn default() -> Self {
        Self {
            issuer: None,
            audience: None,
            leeway_secs: DEFAULT_LEEWAY_SECS,
        }
    }
}

/// Reads token headers and verifies signatures against supplied keys.
/// Holds no key material itself.
#[derive(Debug, Clone, Default)]
pub struct TokenCodec {
    options: VerificationOptions,
}

impl TokenCodec {
    pub fn new(options: VerificationOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &VerificationOptions {
        &self.options
    }

    /// Parse the header segment without checking the signature.
    ///
    /// Fails with [`GuardError::MalformedToken`] if the token is not a
    /// well-formed JWT or carries no key identifier.
    pub fn decode_header(&self, token: &str) -> Result<TokenHeader> {
        decode_header(token)
    }

    /// Verify `token` with `key` and only then decode its claims.
    pub fn verify_and_decode_claims(
        &self,
        token: &str,
        key: &DecodingKey,
    ) -> Result<VerifiedClaims> {
        let validation = self.validation();

        let data = decode::<AccessTokenClaims>(token, key, &validation).map_err(map_jwt_error)?;

        debug!(jti = %data.claims.jti, "Access token signature verified");
        Ok(VerifiedClaims::from_signature(data.claims))
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = self.options.leeway_secs;

        if let Some(issuer) = &self.options.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &self.options.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        validation
    }
}

/// Parse a token header without verifying the signature.
pub fn decode_header(token: &str) -> Result<TokenHeader> {
    let header = jsonwebtoken::decode_header(token)
        .map_err(|e| GuardError::MalformedToken(format!("invalid token header: {e}")))?;

    let key_id = header
        .kid
        .filter(|kid| !kid.trim().is_empty())
        .ok_or_else(|| GuardError::MalformedToken("missing key identifier".to_string()))?;

    Ok(TokenHeader {
        key_id,
        algorithm: header.alg,
    })
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> GuardError {
    match err.kind() {
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidAlgorithmName
        | ErrorKind::InvalidRsaKey(_)
        | ErrorKind::InvalidKeyFormat => GuardError::SignatureInvalid,
        ErrorKind::ExpiredSignature => GuardError::AuthRejected("Token has expired".to_string()),
        ErrorKind::ImmatureSignature => {
            GuardError::AuthRejected("Token is not yet valid".to_string())
        }
        ErrorKind::InvalidIssuer => GuardError::AuthRejected("Token issuer mismatch".to_string()),
        ErrorKind::InvalidAudience => {
            GuardError::AuthRejected("Token audience mismatch".to_string())
        }
        _ => GuardError::MalformedToken(err.to_string()),
    }
}
