use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use guard_core::{KeyError, KeyListing, KeySource, PublishedKey, Result};

use crate::transport::HttpTransport;

const KEYS: &str = "keys";

/// Fetches the service's published signing keys over HTTP
#[derive(Debug, Clone)]
pub struct HttpKeySource {
    transport: Arc<HttpTransport>,
}

impl HttpKeySource {
    pub fn new(transport: Arc<HttpTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl KeySource for HttpKeySource {
    async fn fetch_keys(&self) -> Result<KeyListing> {
        let records: Vec<Value> = self.transport.get_json(KEYS).await?;
        Ok(read_listing(records))
    }
}

/// Parse each record on its own so one bad entry cannot sink the listing
fn read_listing(records: Vec<Value>) -> KeyListing {
    let mut listing = KeyListing::default();

    for record in records {
        let key_id = record
            .get("keyId")
            .and_then(Value::as_str)
            .map(str::to_string);

        match serde_json::from_value::<PublishedKey>(record) {
            Ok(key) => listing.keys.push(key),
            Err(e) => listing.unreadable.push(KeyError::InvalidRecord {
                key_id,
                reason: e.to_string(),
            }),
        }
    }

    listing
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_read_listing_keeps_good_records() {
        let listing = read_listing(vec![
            json!({ "keyId": "good", "publicKey": "pem", "algorithm": "RS256" }),
            json!({ "keyId": "no-pem", "algorithm": "RS256" }),
            json!("not an object"),
        ]);

        assert_eq!(listing.keys.len(), 1);
        assert_eq!(listing.keys[0].key_id, "good");
        assert_eq!(listing.unreadable.len(), 2);
        assert!(matches!(
            &listing.unreadable[0],
            KeyError::InvalidRecord { key_id: Some(id), .. } if id == "no-pem"
        ));
        assert!(matches!(
            &listing.unreadable[1],
            KeyError::InvalidRecord { key_id: None, .. }
        ));
    }
}
