//! Federated identity providers accepted by the social authentication
//! endpoint
//!
//! The provider list and its wire names are declared once in the
//! `social_providers!` invocation below. The enum, [`SocialProvider::ALL`],
//! the wire mapping and parsing are all generated from that single table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unsupported social provider: {0}")]
pub struct UnknownProvider(pub String);

macro_rules! social_providers {
    ($($variant:ident => $wire:literal),+ $(,)?) => {
        /// Supported federated identity providers
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(into = "&'static str", try_from = "String")]
        pub enum SocialProvider {
            $($variant),+
        }

        impl SocialProvider {
            /// Every supported provider, in declaration order
            pub const ALL: &'static [SocialProvider] = &[$(SocialProvider::$variant),+];

            /// Name the service expects in the `provider` field
            pub const fn as_wire(self) -> &'static str {
                match self {
                    $(SocialProvider::$variant => $wire),+
                }
            }
        }
    };
}

social_providers! {
    Google => "google",
    Microsoft => "microsoft",
    Github => "github",
}

impl FromStr for SocialProvider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SocialProvider::ALL
            .iter()
            .copied()
            .find(|p| p.as_wire().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownProvider(s.to_string()))
    }
}

impl TryFrom<String> for SocialProvider {
    type Error = UnknownProvider;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SocialProvider> for &'static str {
    fn from(provider: SocialProvider) -> Self {
        provider.as_wire()
    }
}

impl fmt::Display for SocialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}
