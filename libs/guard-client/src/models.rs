//! Wire models for the authentication service
//!
//! Request bodies borrow from the caller and are serialized in camelCase.
//! Types holding credentials or tokens redact them in `Debug`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::social::SocialProvider;

/// Access/refresh token pair issued by authenticate and renew
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Identity proof presented to obtain a token pair. Consumed by the call
/// that uses it.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialClaim {
    Password { email: String, password: String },
    MagicCode { email: String, code: String },
    Social { provider: SocialProvider, token: String },
}

impl CredentialClaim {
    /// Name of the authentication method, safe to log
    pub fn method(&self) -> &'static str {
        match self {
            Self::Password { .. } => "password",
            Self::MagicCode { .. } => "magic_code",
            Self::Social { .. } => "social",
        }
    }
}

impl fmt::Debug for CredentialClaim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password { email, .. } => f
                .debug_struct("Password")
                .field("email", email)
                .finish_non_exhaustive(),
            Self::MagicCode { email, .. } => f
                .debug_struct("MagicCode")
                .field("email", email)
                .finish_non_exhaustive(),
            Self::Social { provider, .. } => f
                .debug_struct("Social")
                .field("provider", provider)
                .finish_non_exhaustive(),
        }
    }
}

/// Failure body returned by the service on any error status
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
    /// Sent as a number by some service versions and a string by others
    #[serde(default)]
    pub status_code: Option<serde_json::Value>,
}

#[derive(Serialize)]
pub(crate) struct PasswordRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Serialize)]
pub(crate) struct MagicCodeRequest<'a> {
    pub email: &'a str,
    pub code: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SocialRequest<'a> {
    pub provider: SocialProvider,
    pub social_token: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AcknowledgeRequest<'a> {
    pub email: &'a str,
    pub device_id: &'a str,
    pub access_token: &'a str,
    pub refresh_token: &'a str,
}

/// Body shared by validate, renew and revoke
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeviceTokenRequest<'a> {
    pub email: &'a str,
    pub device_id: &'a str,
    pub token: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_token_pair_wire_format() {
        let pair: TokenPair =
            serde_json::from_str(r#"{"accessToken":"a.b.c","refreshToken":"d.e.f"}"#).unwrap();
        assert_eq!(pair.access_token, "a.b.c");
        assert_eq!(pair.refresh_token, "d.e.f");
    }

    #[test]
    fn test_token_pair_requires_both_tokens() {
        assert!(serde_json::from_str::<TokenPair>(r#"{"accessToken":"a.b.c"}"#).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let pair = TokenPair {
            access_token: "secret-access".to_string(),
            refresh_token: "secret-refresh".to_string(),
        };
        let rendered = format!("{pair:?}");
        assert!(!rendered.contains("secret-access"));
        assert!(!rendered.contains("secret-refresh"));

        let claim = CredentialClaim::Password {
            email: "a@x.com".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{claim:?}");
        assert!(rendered.contains("a@x.com"));
        assert!(!rendered.contains("hunter2"));
        assert_eq!(claim.method(), "password");
    }

    #[test]
    fn test_error_envelope_accepts_numeric_or_string_status() {
        let env: ErrorEnvelope = serde_json::from_value(json!({
            "title": "Bad Request",
            "detail": "Invalid credentials",
            "type": "https://tools.ietf.org/html/rfc7231#section-6.5.1",
            "statusCode": 400
        }))
        .unwrap();
        assert_eq!(env.detail.as_deref(), Some("Invalid credentials"));

        let env: ErrorEnvelope =
            serde_json::from_value(json!({"statusCode": "400", "title": "x"})).unwrap();
        assert!(env.detail.is_none());
    }

    #[test]
    fn test_request_bodies_are_camel_case() {
        let body = serde_json::to_value(AcknowledgeRequest {
            email: "a@x.com",
            device_id: "dev-1",
            access_token: "at",
            refresh_token: "rt",
        })
        .unwrap();
        assert_eq!(
            body,
            json!({"email":"a@x.com","deviceId":"dev-1","accessToken":"at","refreshToken":"rt"})
        );

        let body = serde_json::to_value(SocialRequest {
            provider: SocialProvider::Github,
            social_token: "gh-token",
        })
        .unwrap();
        assert_eq!(body, json!({"provider":"github","socialToken":"gh-token"}));

        let body = serde_json::to_value(DeviceTokenRequest {
            email: "a@x.com",
            device_id: "dev-1",
            token: "at",
        })
        .unwrap();
        assert_eq!(body, json!({"email":"a@x.com","deviceId":"dev-1","token":"at"}));
    }
}
