//! Content fingerprinting for dev-dependency build caching.

use std::collections::BTreeSet;
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{DriverError, DriverResult};

/// Computes a deterministic SHA-256 fingerprint over the named inputs,
/// resolved relative to `base_dir`.
///
/// The fingerprint is the cache identity for an expensive environment
/// build: if it is unchanged since the last successful build, the
/// cached result can be reused. Input names are mixed into the hash
/// alongside their content, and an absent input is recorded with an
/// explicit marker so that adding or removing a file always changes
/// the result.
pub fn compute_fingerprint(base_dir: &Path, inputs: &[String]) -> DriverResult<String> {
    let mut hasher = Sha256::new();

    // BTreeSet sorts and dedupes so the hash is order-independent.
    let inputs: BTreeSet<&String> = inputs.iter().collect();

    for input in inputs {
        hasher.update(input.as_bytes());
        hasher.update(b"\0");

        let path = base_dir.join(input);
        if path.is_file() {
            let content = std::fs::read(&path).map_err(|e| DriverError::io(&path, e))?;
            debug!("fingerprint: mixed {} ({} bytes)", input, content.len());
            hasher.update(&content);
        } else {
            debug!("fingerprint: input {} is absent", input);
            hasher.update(b"missing\0");
        }
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_and_content_sensitive() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor = dir.path().join("Appfile.toml");
        std::fs::write(&descriptor, b"[application]\nname = \"svc\"\n").unwrap();

        let inputs = vec!["Appfile.toml".to_string(), "absent.lock".to_string()];

        let first = compute_fingerprint(dir.path(), &inputs).unwrap();
        let second = compute_fingerprint(dir.path(), &inputs).unwrap();
        assert_eq!(first, second);

        std::fs::write(&descriptor, b"[application]\nname = \"svc2\"\n").unwrap();
        let changed = compute_fingerprint(dir.path(), &inputs).unwrap();
        assert_ne!(first, changed);
    }

    #[test]
    fn input_order_does_not_matter() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a"), b"aa").unwrap();
        std::fs::write(dir.path().join("b"), b"bb").unwrap();

        let forward = compute_fingerprint(dir.path(), &["a".into(), "b".into()]).unwrap();
        let reverse = compute_fingerprint(dir.path(), &["b".into(), "a".into()]).unwrap();
        assert_eq!(forward, reverse);
    }

    #[test]
    fn absence_is_distinct_from_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = compute_fingerprint(dir.path(), &["f".into()]).unwrap();

        std::fs::write(dir.path().join("f"), b"").unwrap();
        let empty = compute_fingerprint(dir.path(), &["f".into()]).unwrap();
        assert_ne!(missing, empty);
    }
}
