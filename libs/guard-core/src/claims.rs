//! Access-token claims and authorization helpers
//!
//! Role and permission checks only accept [`VerifiedClaims`], which can be
//! obtained from a signature-checked token or from the service's
//! authoritative validation response. A decoded-but-unverified token never
//! reaches these helpers.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Claims carried inside an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (account email)
    pub sub: String,
    /// Issuer
    #[serde(default)]
    pub iss: String,
    /// Audience. A JSON array is accepted and its first entry kept.
    #[serde(default, deserialize_with = "string_or_first")]
    pub aud: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Unique token identifier
    #[serde(default)]
    pub jti: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

fn string_or_first<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(aud)) => aud,
        Some(OneOrMany::Many(auds)) => auds.into_iter().next().unwrap_or_default(),
        None => String::new(),
    })
}

/// Claims whose origin has been established, either by RS256 signature
/// verification or by the issuing service itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedClaims {
    claims: AccessTokenClaims,
    source: VerificationSource,
}

/// How a set of claims came to be trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationSource {
    /// Checked locally against a cached signing key. Cannot observe
    /// revocation or acknowledgment state.
    LocalSignature,
    /// Returned by the service's validation endpoint
    RemoteValidation,
}

impl VerifiedClaims {
    pub(crate) fn from_signature(claims: AccessTokenClaims) -> Self {
        Self {
            claims,
            source: VerificationSource::LocalSignature,
        }
    }

    /// Assert that the service's access-token validation endpoint returned
    /// `claims`. Nothing is checked here; the caller vouches for the source.
    #[doc(hidden)]
    pub fn assume_verified_by_service(claims: AccessTokenClaims) -> Self {
        Self {
            claims,
            source: VerificationSource::RemoteValidation,
        }
    }

    pub fn claims(&self) -> &AccessTokenClaims {
        &self.claims
    }

    pub fn into_claims(self) -> AccessTokenClaims {
        self.claims
    }

    pub fn source(&self) -> VerificationSource {
        self.source
    }

    pub fn subject(&self) -> &str {
        &self.claims.sub
    }

    /// Expiry of the token. For locally verified claims this is the upper
    /// bound on how long the result may be trusted.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.claims.exp, 0).single()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.claims.exp <= now.timestamp()
    }

    /// Case-insensitive role membership
    pub fn has_role(&self, role: &str) -> bool {
        contains_normalized(&self.claims.roles, role)
    }

    /// Case-insensitive permission membership
    pub fn has_permission(&self, permission: &str) -> bool {
        contains_normalized(&self.claims.permissions, permission)
    }
}

/// Returns true iff `role` is present in the verified claims' roles.
pub fn has_role(role: &str, claims: &VerifiedClaims) -> bool {
    claims.has_role(role)
}

/// Returns true iff `permission` is present in the verified claims'
/// permissions.
pub fn has_permission(permission: &str, claims: &VerifiedClaims) -> bool {
    claims.has_permission(permission)
}

fn contains_normalized(values: &[String], needle: &str) -> bool {
    let needle = needle.to_lowercase();
    values.iter().any(|v| v.to_lowercase() == needle)
}
