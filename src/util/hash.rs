//! Hashing for install markers and exported artifact checksums.

use std::collections::BTreeSet;
use std::fs::File;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

/// SHA256 of a file's contents, hex encoded.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("failed to hash {}", path.display()))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(hex::encode(hasher.finalize()))
}

/// Digest of NUL-terminated parts, so `["ab", "c"]` and `["a", "bc"]` differ.
fn digest_parts<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

/// Stable 16-hex-digit hash of a feature set. Ordering never matters since
/// the set is sorted.
pub fn feature_set_hash(features: &BTreeSet<String>) -> String {
    let mut digest =
        digest_parts(std::iter::once("features").chain(features.iter().map(String::as_str)));
    digest.truncate(16);
    digest
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sha256_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("libcalc.a");
        std::fs::write(&path, "hello").unwrap();

        assert_eq!(
            sha256_file(&path).unwrap(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_parts_are_separated() {
        assert_ne!(digest_parts(["ab", "c"]), digest_parts(["a", "bc"]));
    }

    #[test]
    fn test_feature_set_hash_is_order_independent() {
        let one: BTreeSet<String> = ["utf8", "history"].iter().map(|s| s.to_string()).collect();
        let two: BTreeSet<String> = ["history", "utf8"].iter().map(|s| s.to_string()).collect();
        assert_eq!(feature_set_hash(&one), feature_set_hash(&two));

        let other: BTreeSet<String> = ["utf8"].iter().map(|s| s.to_string()).collect();
        assert_ne!(feature_set_hash(&one), feature_set_hash(&other));
        assert_eq!(feature_set_hash(&BTreeSet::new()).len(), 16);
    }
}
