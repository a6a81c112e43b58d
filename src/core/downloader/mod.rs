pub mod client;
pub mod fetcher;

pub use client::Downloader;
pub use fetcher::{FileFetcher, ASK_DIR_MARKER};
