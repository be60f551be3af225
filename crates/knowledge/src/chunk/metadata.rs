//! Chunk identity.

use crate::types::DocumentMetadata;
use sha2::{Digest, Sha256};

/// Derive a stable UUID for a chunk from its attribution, position and text.
///
/// Re-ingesting an unchanged file yields the same ids, so an upsert
/// overwrites the earlier vectors instead of duplicating them.
pub fn chunk_id(metadata: &DocumentMetadata, position: u32, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(metadata.source.as_deref().unwrap_or_default().as_bytes());
    hasher.update([0x1f]);
    if let Some(page) = metadata.page {
        hasher.update(page.to_le_bytes());
    }
    hasher.update([0x1f]);
    hasher.update(position.to_le_bytes());
    hasher.update([0x1f]);
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    uuid::Uuid::from_bytes(bytes).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_is_stable() {
        let meta = DocumentMetadata::new("manual.pdf", Some(2));
        let id = chunk_id(&meta, 0, "Hello, world!");
        assert_eq!(id.len(), 36);
        assert_eq!(id, chunk_id(&meta, 0, "Hello, world!"));
    }

    #[test]
    fn test_chunk_id_depends_on_every_part() {
        let meta = DocumentMetadata::new("manual.pdf", Some(2));
        let base = chunk_id(&meta, 0, "text");

        assert_ne!(base, chunk_id(&meta, 1, "text"));
        assert_ne!(base, chunk_id(&meta, 0, "other"));
        assert_ne!(base, chunk_id(&DocumentMetadata::new("manual.pdf", Some(3)), 0, "text"));
        assert_ne!(base, chunk_id(&DocumentMetadata::new("guide.pdf", Some(2)), 0, "text"));
    }
}
