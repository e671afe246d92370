pub mod acquire;
pub mod fetcher;
pub mod workspace;

pub use acquire::{FileAcquirer, MAX_CONCURRENT_TRANSFERS};
pub use fetcher::{FileFetcher, HttpFetcher};
pub use workspace::ScratchWorkspace;
