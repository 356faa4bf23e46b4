//! Content fingerprints for re-identifying a reference across identity churn.
//!
//! Attach, detach and bind all reissue handles, so a handle alone cannot
//! track the protected title block through the cleanup pipeline. The
//! fingerprint is the durable key: a canonicalized name/path descriptor
//! that two spellings of the same real file reduce to.

use crate::document::path::{self, PathResolver};

/// Reduce a name or file name to its canonical token: lowercased, trimmed,
/// forward-slash separators, file extension stripped.
///
/// `"X-TB.dwg"`, `" x-tb "` and `"X-TB"` all canonicalize to `"x-tb"`.
pub fn canonical_token(name: &str) -> String {
    let normalized = path::normalize_separators(name.trim()).to_lowercase();
    path::file_stem(&normalized).to_string()
}

/// Canonical token of a path's bare file name.
pub fn file_token(file_path: &str) -> String {
    canonical_token(path::file_name(file_path))
}

/// Canonicalized identity of the protected reference.
///
/// Invariant: two references describing the same real file/block produce
/// equal tokens even when one records a bare block name and the other a
/// full file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectionFingerprint {
    /// Canonical block name (falls back to the path's file token)
    pub canonical_name: String,
    /// Canonical token of the source file name
    pub file_name_token: String,
    /// Raw path as recorded when protection was enabled
    pub raw_path: String,
    /// Layout the title block was found on; empty when unknown
    pub layout_name: String,
}

impl ProtectionFingerprint {
    /// Fingerprint a reference from its name, path and layout.
    pub fn new(block_name: &str, path_name: &str, layout_name: &str) -> Self {
        let name_token = canonical_token(block_name);
        let file_name_token = file_token(path_name);
        let canonical_name = if name_token.is_empty() {
            file_name_token.clone()
        } else {
            name_token
        };
        Self {
            canonical_name,
            file_name_token,
            raw_path: path_name.to_string(),
            layout_name: layout_name.to_string(),
        }
    }

    /// Check whether a reference described by `name`/`path_name` is the
    /// same logical reference as this fingerprint.
    ///
    /// Three tiers, any one suffices: the candidate's canonical name or
    /// file token equals the stored canonical name; the candidate's file
    /// token equals the stored file token; or the paths are equivalent.
    /// Identical content is referenced inconsistently across drawings
    /// (absolute path here, bare file name there, renamed block instance
    /// elsewhere), so no single comparison is reliable alone.
    pub fn matches(&self, name: &str, path_name: &str, resolver: Option<&PathResolver>) -> bool {
        let name_token = canonical_token(name);
        let candidate_file = file_token(path_name);

        if !self.canonical_name.is_empty()
            && (name_token == self.canonical_name || candidate_file == self.canonical_name)
        {
            return true;
        }
        if !self.file_name_token.is_empty() && candidate_file == self.file_name_token {
            return true;
        }
        paths_equivalent(path_name, &self.raw_path, resolver)
    }
}

/// Path equivalence: exact case-insensitive match after separator
/// normalization, same resolved location, or matching bare file names.
pub fn paths_equivalent(a: &str, b: &str, resolver: Option<&PathResolver>) -> bool {
    if a.trim().is_empty() || b.trim().is_empty() {
        return false;
    }
    if path::canonical_key(a) == path::canonical_key(b) {
        return true;
    }
    if let Some(resolver) = resolver {
        if resolver.same_file(a, b) {
            return true;
        }
    }
    path::file_name(a).eq_ignore_ascii_case(path::file_name(b))
}
