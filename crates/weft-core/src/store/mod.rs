//! Filesystem-backed pattern and session storage.

mod dir_store;
mod session_file;

pub use dir_store::DirPatternStore;
pub use session_file::FileSessionStore;
