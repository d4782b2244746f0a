//! # Attachment Ids
//!
//! Ids join an attachment's surface markup to the document model, so they
//! must be unique within a document and valid as a `data-*` token.
//!
//! The seed is the CRC32 of the editor instance name; a counter makes each
//! id in the sequence distinct. Two editors with different names never
//! collide, and the engine skips ids already present in loaded content.

use crc32fast::Hasher;

/// CRC32 seed for an editor instance
pub fn instance_seed(instance: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(instance.as_bytes());
    format!("{:08x}", hasher.finalize())
}

/// Sequential attachment id generator
#[derive(Debug, Clone)]
pub struct AttachmentIdGenerator {
    seed: String,
    count: u32,
}

impl AttachmentIdGenerator {
    pub fn new(instance: &str) -> Self {
        Self {
            seed: instance_seed(instance),
            count: 0,
        }
    }

    /// Next id in the sequence
    pub fn next_id(&mut self) -> String {
        self.count += 1;
        format!("att-{}-{}", self.seed, self.count)
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_is_stable() {
        assert_eq!(instance_seed("editor"), instance_seed("editor"));
        assert_ne!(instance_seed("editor"), instance_seed("other"));
        assert_eq!(instance_seed("editor").len(), 8);
    }

    #[test]
    fn test_sequential_ids() {
        let mut ids = AttachmentIdGenerator::new("doc");
        let first = ids.next_id();
        let second = ids.next_id();

        assert!(first.ends_with("-1"));
        assert!(second.ends_with("-2"));
        assert!(first.starts_with(&format!("att-{}", ids.seed())));
        assert!(first
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-'));
    }
}
