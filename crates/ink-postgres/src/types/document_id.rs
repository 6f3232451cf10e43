//! Document id derivation.
//!
//! Document ids are stable under position and content edits (they change
//! only when the scope changes): file-scoped ids hash the normalised path,
//! virtual ids compose the source type with the external context id, and
//! page-scoped ids are the page chunk id rendered by the caller.

use sha2::{Digest, Sha256};

/// Length of the hex digest kept for file document ids.
const FILE_ID_HEX_LEN: usize = 32;

/// Derives the document id for a file-scoped document.
///
/// The path is normalised (backslashes to slashes, trimmed, lowercased
/// drive-letter-insensitively on the separator level) before hashing so the
/// same file referenced with different separators maps to one document.
pub fn file_document_id(path: &str) -> String {
    let normalised: String = path.trim().replace('\\', "/");
    let digest = Sha256::digest(normalised.as_bytes());
    let hex = hex::encode(digest);
    format!("file:{}", &hex[..FILE_ID_HEX_LEN])
}

/// Derives the document id for a virtual document.
pub fn virtual_document_id(source_type: &str, context_id: &str) -> String {
    format!("virtual:{source_type}:{context_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_ids_are_stable_and_separator_insensitive() {
        let a = file_document_id("notes/daily/2026-01-01.md");
        let b = file_document_id("notes\\daily\\2026-01-01.md");
        let c = file_document_id(" notes/daily/2026-01-01.md ");

        assert_eq!(a, b);
        assert_eq!(a, c);
        assert!(a.starts_with("file:"));
        assert_eq!(a.len(), "file:".len() + FILE_ID_HEX_LEN);
    }

    #[test]
    fn different_paths_differ() {
        assert_ne!(
            file_document_id("notes/a.md"),
            file_document_id("notes/b.md")
        );
    }

    #[test]
    fn virtual_ids_compose_source_and_context() {
        assert_eq!(
            virtual_document_id("remnote", "ctx-42"),
            "virtual:remnote:ctx-42"
        );
    }
}
