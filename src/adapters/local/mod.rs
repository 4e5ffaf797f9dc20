//! Local adapters: rooted-filesystem storage and the JSON-file status store.

pub mod fs;
pub mod status;

pub use fs::FsAdapter;
pub use status::FsStatusReporter;
