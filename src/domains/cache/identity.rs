//! Repository identity parsing and local path derivation.
//!
//! A repository reference is either a bare `owner/name` shorthand or a full
//! URL on github.com. The local directory name is derived from the identity
//! plus a short hash of the raw input string, so different repositories with
//! the same owner/name never collide, while the same input always maps to
//! the same directory. Equivalent spellings of the same repository (trailing
//! `.git`, shorthand vs. URL) deliberately map to distinct directories; no
//! canonicalization is attempted across spellings.

use sha2::{Digest, Sha256};
use url::Url;

use super::error::CacheError;

/// Host accepted for full-URL references.
const GITHUB_HOST: &str = "github.com";

/// The owner/name pair identifying a remote repository.
///
/// Derived from input on every call, never stored. Both fields are non-empty
/// once parsing succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoIdentity {
    pub owner: String,
    pub name: String,
}

impl RepoIdentity {
    /// Parse a repository reference.
    ///
    /// Accepts `owner/name` shorthand (no scheme) or a full URL whose host is
    /// github.com with at least two path segments. A trailing `.git` on the
    /// repository name is stripped.
    pub fn parse(input: &str) -> Result<Self, CacheError> {
        let invalid = || CacheError::InvalidReference(input.to_string());

        // Shorthand format: owner/name with no scheme separator. Exactly two
        // segments; anything else would leak separators into the derived
        // directory name.
        if !input.contains("://") {
            let mut parts = input.splitn(2, '/');
            let owner = parts.next().unwrap_or_default();
            let name = parts.next().unwrap_or_default();
            if owner.is_empty() || name.is_empty() || name.contains('/') {
                return Err(invalid());
            }
            return Ok(Self {
                owner: owner.to_string(),
                name: strip_git_suffix(name).to_string(),
            });
        }

        let parsed = Url::parse(input).map_err(|_| invalid())?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid());
        }
        if parsed.host_str() != Some(GITHUB_HOST) {
            return Err(invalid());
        }

        let mut segments = parsed.path_segments().ok_or_else(invalid)?;
        let owner = segments.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;
        let name = segments.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;

        Ok(Self {
            owner: owner.to_string(),
            name: strip_git_suffix(name).to_string(),
        })
    }

    /// Collision-resistant directory name: `{owner}_{name}_{hash8}`.
    ///
    /// The hash is taken over the raw input string, so the mapping is a pure
    /// function of the reference as given.
    pub fn directory_name(&self, input: &str) -> String {
        format!("{}_{}_{}", self.owner, self.name, hash8(input))
    }
}

/// Normalize a reference into a URL that the git engine can clone.
///
/// Shorthand references become `https://github.com/owner/name`; full URLs
/// pass through unchanged.
pub fn clone_url(input: &str) -> String {
    if input.starts_with("http://") || input.starts_with("https://") {
        input.to_string()
    } else {
        format!("https://{}/{}", GITHUB_HOST, input)
    }
}

fn strip_git_suffix(name: &str) -> &str {
    name.strip_suffix(".git").unwrap_or(name)
}

/// Stable 8-hex-character hash of the input string.
///
/// Collision avoidance at cache cardinality, not cryptographic strength, is
/// the requirement here; truncated SHA-256 is stable across platforms and
/// process restarts.
fn hash8(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut out = String::with_capacity(8);
    for byte in &digest[..4] {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}
