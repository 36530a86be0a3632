// Security module for path validation and access control
//
// Read-style tools receive untrusted repository-relative paths from clients;
// this module ensures every resolved path stays inside the cloned repository,
// preventing traversal out of the cache.

pub mod path_validator;

pub use path_validator::{RepoPathError, resolve_repo_path};
