//! Repository navigation tools.
//!
//! One file per tool, each layered on the cache manager: clone on demand,
//! then read, search, and list files against the local clone.

pub(crate) mod common;

pub mod clone;
pub mod glob;
pub mod grep;
pub mod read;
pub mod status;

pub use clone::RepoCloneTool;
pub use glob::RepoGlobTool;
pub use grep::RepoGrepTool;
pub use read::RepoReadTool;
pub use status::RepoStatusTool;
