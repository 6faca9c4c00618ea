//! Parallel HTTP range downloads into a single pre-sized file.
//!
//! The resource length is probed once, the destination is sized to it, and
//! the byte span is split into one range per worker. Every worker fetches its
//! range with its own request and writes straight to its final offset.

pub mod downloader;
pub mod error;
pub mod utils;

pub use downloader::{DownloadRequest, Downloader, download};
pub use error::{ChunkError, ChunkErrorKind, DownloadError};
