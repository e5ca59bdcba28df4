//! SHA256 checksums of generated files

use sha2::{Digest, Sha256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Hex-encoded SHA256 of a file's content
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checksum(String);

impl Checksum {
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    pub fn of_content(content: &str) -> Self {
        Self::from_bytes(content.as_bytes())
    }

    /// Checksum of the file at `path` as it is on disk
    pub fn of_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self::from_bytes(&std::fs::read(path)?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `content` hashes to this checksum
    pub fn verify(&self, content: &str) -> bool {
        *self == Self::of_content(content)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_consistency() {
        let content = "pub enum Kind { A = 0 }\n";
        assert_eq!(Checksum::of_content(content), Checksum::of_content(content));
        assert_eq!(Checksum::of_content(content).as_str().len(), 64);
    }

    #[test]
    fn test_checksum_known_value() {
        assert_eq!(
            Checksum::of_content("").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_checksum_verification() {
        let checksum = Checksum::of_content("model");
        assert!(checksum.verify("model"));
        assert!(!checksum.verify("different content"));
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let checksum = Checksum::of_content("");
        let json = serde_json::to_string(&checksum).unwrap();
        assert_eq!(json, format!("\"{}\"", checksum));
    }
}
