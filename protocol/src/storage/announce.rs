//! # Announcements
//!
//! An announcement is raw text keyed by its chain-compatible hash, so that
//! the 160-bit digest fits the fixed-width on-chain field that anchors it.
//! No JSON, no envelope: the text is stored and fetched verbatim, and the
//! hash is both the address and the integrity check.

use tracing::error;

use crate::crypto::hash::{chain_hash, ContentHash};

use super::error::StorageError;
use super::router::{GetImmutableOptions, ImmutableContent, StorageRouter};

impl StorageRouter {
    /// Fetch an announcement's text by its chain-compatible hash.
    pub async fn get_announcement(&self, announcement_hash: &str) -> Option<String> {
        let opts = GetImmutableOptions {
            hash_func: ContentHash::Chain,
            ..Default::default()
        };

        let bytes = self.get_immutable_raw(announcement_hash, &opts).await?;
        match String::from_utf8(bytes) {
            Ok(text) => Some(text),
            Err(_) => {
                // Cannot happen for data that actually hashed correctly
                // against text we stored, but drivers are untrusted.
                error!(hash = announcement_hash, "announcement is not UTF-8");
                None
            }
        }
    }

    /// Store announcement text, keyed by its chain-compatible hash.
    ///
    /// Returns the hash to embed on-chain.
    pub async fn put_announcement(
        &self,
        announcement_text: &str,
        txid: &str,
    ) -> Result<String, StorageError> {
        let hash = chain_hash(announcement_text.as_bytes());
        self.put_immutable(
            ImmutableContent::Prehashed {
                hash: &hash,
                text: announcement_text,
            },
            txid,
            &[],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::MemoryDriver;
    use crate::storage::registry::DriverRegistry;
    use std::sync::Arc;

    fn router() -> StorageRouter {
        let registry = Arc::new(DriverRegistry::new());
        registry.register(Arc::new(MemoryDriver::new("mem")));
        StorageRouter::new(registry)
    }

    #[tokio::test]
    async fn announcement_roundtrip() {
        let router = router();
        let text = "polaris 0.2 is live; please upgrade before block 412000";

        let hash = router.put_announcement(text, "txid9").await.unwrap();
        // Chain hash: 160 bits, 40 hex characters.
        assert_eq!(hash.len(), 40);
        assert_eq!(hash, chain_hash(text.as_bytes()));

        assert_eq!(router.get_announcement(&hash).await.as_deref(), Some(text));
    }

    #[tokio::test]
    async fn announcement_is_keyed_by_chain_hash_not_content_hash() {
        let router = router();
        let text = "hello";
        let hash = router.put_announcement(text, "txid9").await.unwrap();

        // Looking the text up under its SHA-256 hash must find nothing.
        let sha = crate::crypto::data_hash(text.as_bytes());
        assert_ne!(sha, hash);
        assert!(router.get_announcement(&sha).await.is_none());
    }

    #[tokio::test]
    async fn missing_announcement_is_none() {
        let router = router();
        assert!(router
            .get_announcement("b472a266d0bd89c13706a4132ccfb16f7c3b9fcb")
            .await
            .is_none());
    }
}
