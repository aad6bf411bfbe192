//! Content hashing for stored media.
//!
//! Uploaded files are addressed by a digest of their bytes so the same
//! content always lands under the same name.

use sha2::{Digest, Sha256};

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Build the content-derived storage name for a file: `{sha256}.{ext}`.
///
/// The extension is lowercased. Files without an extension get the bare
/// digest.
pub fn content_file_name(data: &[u8], extension: Option<&str>) -> String {
    let digest = sha256_hex(data);
    match extension.map(str::trim).filter(|e| !e.is_empty()) {
        Some(ext) => format!("{digest}.{}", ext.to_ascii_lowercase()),
        None => digest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_produces_known_hash() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn file_name_keeps_lowercased_extension() {
        let name = content_file_name(b"frames", Some("MP4"));
        assert!(name.ends_with(".mp4"));
        assert_eq!(name.len(), 64 + 4);
    }

    #[test]
    fn file_name_without_extension_is_bare_digest() {
        assert_eq!(content_file_name(b"frames", None), sha256_hex(b"frames"));
        assert_eq!(content_file_name(b"frames", Some("")), sha256_hex(b"frames"));
    }

    #[test]
    fn same_content_same_name() {
        assert_eq!(
            content_file_name(b"abc", Some("jpg")),
            content_file_name(b"abc", Some("jpg"))
        );
        assert_ne!(
            content_file_name(b"abc", Some("jpg")),
            content_file_name(b"abd", Some("jpg"))
        );
    }
}
