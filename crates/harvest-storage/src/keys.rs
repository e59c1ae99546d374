//! Checkpoint key encoding.
//!
//! One durable record per target, keyed by target name:
//! - RocksDB key: `checkpoint:{target}`
//! - Status file: `{target}.status.json`

use crate::error::StorageError;

/// Key for a target's checkpoint record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointKey {
    /// Target name (e.g., "enwiki")
    pub target: String,
}

impl CheckpointKey {
    /// Create a key, rejecting names that cannot be used as a file name.
    pub fn new(target: impl Into<String>) -> Result<Self, StorageError> {
        let target = target.into();
        let valid = !target.is_empty()
            && !target.starts_with('.')
            && target
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StorageError::Key(format!("Invalid target name: {:?}", target)));
        }
        Ok(Self { target })
    }

    /// Encode key to bytes for RocksDB
    pub fn to_bytes(&self) -> Vec<u8> {
        format!("checkpoint:{}", self.target).into_bytes()
    }

    /// Status file name for the file backend
    pub fn file_name(&self) -> String {
        format!("{}.status.json", self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_key_encoding() {
        let key = CheckpointKey::new("enwiki").unwrap();
        assert_eq!(key.to_bytes(), b"checkpoint:enwiki".to_vec());
        assert_eq!(key.file_name(), "enwiki.status.json");
    }

    #[test]
    fn test_checkpoint_key_rejects_paths() {
        assert!(CheckpointKey::new("../etc/passwd").is_err());
        assert!(CheckpointKey::new("a/b").is_err());
        assert!(CheckpointKey::new("").is_err());
        assert!(CheckpointKey::new(".hidden").is_err());
        assert!(CheckpointKey::new("zh_classicalwiki.ns0").is_ok());
    }
}
