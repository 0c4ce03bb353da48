//! Trusted signing keys for local verification
//!
//! The store holds an immutable [`KeySet`] behind an [`ArcSwap`]. A refresh
//! builds a complete new set and swaps it in with a single store, so readers
//! see either the old snapshot or the new one in full. Lookups never fetch.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use jsonwebtoken::DecodingKey;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::{GuardError, Result};

/// Key record as returned by the service's key listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedKey {
    pub key_id: String,
    #[serde(default)]
    pub format: String,
    pub public_key: String,
    #[serde(default)]
    pub algorithm: String,
    #[serde(default, deserialize_with = "deserialize_created")]
    pub created: Option<DateTime<Utc>>,
}

/// RFC 3339, or an offset-less timestamp taken as UTC
fn deserialize_created<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Some(naive.and_utc()))
        .map_err(|e| serde::de::Error::custom(format!("invalid created timestamp {raw:?}: {e}")))
}

/// One fetched key listing. Records the source could not read are carried
/// alongside the readable ones so they end up in [`RefreshSummary::skipped`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyListing {
    pub keys: Vec<PublishedKey>,
    pub unreadable: Vec<KeyError>,
}

impl From<Vec<PublishedKey>> for KeyListing {
    fn from(keys: Vec<PublishedKey>) -> Self {
        Self {
            keys,
            unreadable: Vec::new(),
        }
    }
}

/// Reasons a published key is left out of the snapshot
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("key {key_id} uses unsupported algorithm {algorithm:?}")]
    UnsupportedAlgorithm { key_id: String, algorithm: String },

    #[error("key {key_id} has an invalid RSA public key: {reason}")]
    InvalidPublicKey { key_id: String, reason: String },

    #[error("key record has an empty key id")]
    MissingKeyId,

    #[error("unreadable key record {}: {reason}", .key_id.as_deref().unwrap_or("<no key id>"))]
    InvalidRecord { key_id: Option<String>, reason: String },
}

/// A parsed, ready-to-use verification key
#[derive(Clone)]
pub struct SigningKey {
    key_id: String,
    public_key_pem: String,
    algorithm: String,
    format: String,
    created_at: Option<DateTime<Utc>>,
    decoding: DecodingKey,
}

impl SigningKey {
    pub fn from_published(key: PublishedKey) -> std::result::Result<Self, KeyError> {
        if key.key_id.trim().is_empty() {
            return Err(KeyError::MissingKeyId);
        }

        // Empty algorithm means RS256
        if !key.algorithm.is_empty() && !key.algorithm.eq_ignore_ascii_case("RS256") {
            return Err(KeyError::UnsupportedAlgorithm {
                key_id: key.key_id,
                algorithm: key.algorithm,
            });
        }

        let decoding = DecodingKey::from_rsa_pem(key.public_key.as_bytes()).map_err(|e| {
            KeyError::InvalidPublicKey {
                key_id: key.key_id.clone(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            key_id: key.key_id,
            public_key_pem: key.public_key,
            algorithm: "RS256".to_string(),
            format: key.format,
            created_at: key.created,
            decoding,
        })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn public_key_pem(&self) -> &str {
        &self.public_key_pem
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .field("format", &self.format)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Point-in-time set of trusted keys, at most one per key id
#[derive(Debug, Default)]
pub struct KeySet {
    keys: HashMap<String, Arc<SigningKey>>,
    refreshed_at: Option<DateTime<Utc>>,
}

impl KeySet {
    pub fn get(&self, key_id: &str) -> Option<&Arc<SigningKey>> {
        self.keys.get(key_id)
    }

    pub fn contains(&self, key_id: &str) -> bool {
        self.keys.contains_key(key_id)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Key ids in sorted order
    pub fn key_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.keys.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }
}

/// Outcome of replacing the key snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub installed: usize,
    pub skipped: Vec<KeyError>,
    pub duplicates: usize,
}

/// Where fresh key sets come from
#[async_trait]
pub trait KeySource: Send + Sync {
    /// Fetch the complete current key listing
    async fn fetch_keys(&self) -> Result<KeyListing>;
}

/// Process-wide store of trusted signing keys
pub struct KeyStore {
    snapshot: ArcSwap<KeySet>,
    source: Arc<dyn KeySource>,
}

impl KeyStore {
    /// Create an empty store. Nothing verifies until [`KeyStore::refresh`]
    /// or [`KeyStore::install`] runs.
    pub fn new(source: Arc<dyn KeySource>) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(KeySet::default()),
            source,
        }
    }

    /// Fetch the current key listing and replace the whole snapshot.
    ///
    /// Keys missing from the listing stop resolving even if they were
    /// previously cached. If the fetch fails the existing snapshot is kept.
    pub async fn refresh(&self) -> Result<RefreshSummary> {
        let listing = self.source.fetch_keys().await?;
        debug!(
            count = listing.keys.len(),
            unreadable = listing.unreadable.len(),
            "Fetched signing keys"
        );
        Ok(self.install_listing(listing))
    }

    /// Replace the snapshot with `published` without contacting the service.
    pub fn install(&self, published: Vec<PublishedKey>) -> RefreshSummary {
        self.install_listing(KeyListing::from(published))
    }

    /// Replace the snapshot with the readable part of `listing`. Unreadable
    /// records are reported as skipped.
    pub fn install_listing(&self, listing: KeyListing) -> RefreshSummary {
        let mut summary = RefreshSummary::default();
        let mut keys: HashMap<String, Arc<SigningKey>> = HashMap::with_capacity(listing.keys.len());

        for e in listing.unreadable {
            warn!(error = %e, "Skipping unreadable key record");
            summary.skipped.push(e);
        }

        for record in listing.keys {
            let key = match SigningKey::from_published(record) {
                Ok(key) => key,
                Err(e) => {
                    warn!(error = %e, "Skipping unusable signing key");
                    summary.skipped.push(e);
                    continue;
                }
            };

            if let Some(existing) = keys.get(key.key_id()) {
                summary.duplicates += 1;
                warn!(key_id = %key.key_id(), "Duplicate key id in key listing");
                // Newest wins when both are timestamped, otherwise the later record
                if let (Some(existing_at), Some(created_at)) = (existing.created_at(), key.created_at()) {
                    if existing_at > created_at {
                        continue;
                    }
                }
            }
            keys.insert(key.key_id().to_string(), Arc::new(key));
        }

        summary.installed = keys.len();
        self.snapshot.store(Arc::new(KeySet {
            keys,
            refreshed_at: Some(Utc::now()),
        }));

        info!(
            installed = summary.installed,
            skipped = summary.skipped.len(),
            "Signing key snapshot replaced"
        );
        summary
    }

    /// Resolve a key id against the current snapshot.
    pub fn lookup(&self, key_id: &str) -> Result<Arc<SigningKey>> {
        self.snapshot
            .load()
            .get(key_id)
            .cloned()
            .ok_or_else(|| GuardError::UnknownKey(key_id.to_string()))
    }

    /// The current snapshot as a whole
    pub fn snapshot(&self) -> Arc<KeySet> {
        self.snapshot.load_full()
    }

    pub fn key_ids(&self) -> Vec<String> {
        self.snapshot.load().key_ids()
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.load().is_empty()
    }

    /// When the snapshot was last replaced; `None` until the first refresh
    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.snapshot.load().refreshed_at()
    }

    /// Drop every key. Subsequent lookups fail until the next refresh.
    pub fn clear(&self) {
        self.snapshot.store(Arc::new(KeySet::default()));
    }
}

impl fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStore")
            .field("key_ids", &self.key_ids())
            .field("refreshed_at", &self.refreshed_at())
            .finish()
    }
}
