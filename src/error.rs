use std::io;

use reqwest::StatusCode;
use thiserror::Error;

use crate::downloader::planer::ChunkRange;
use crate::utils::multierr::MultiError;

/// Errors returned by a whole download.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("concurrency must be at least 1, got {0}")]
    InvalidConcurrency(usize),

    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("connection error, status code: {status}")]
    Connection { status: StatusCode },

    #[error("server did not report a content length")]
    MissingContentLength,

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("destination file error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Chunks(#[from] MultiError<ChunkError>),
}

/// Failure of a single chunk, scoped to its byte range.
#[derive(Debug, Error)]
#[error("chunk {index} ({start}-{end}): {kind}")]
pub struct ChunkError {
    pub index: usize,
    pub start: u64,
    pub end: u64,
    #[source]
    pub kind: ChunkErrorKind,
}

impl ChunkError {
    pub fn new(range: &ChunkRange, kind: ChunkErrorKind) -> Self {
        Self {
            index: range.index,
            start: range.start,
            end: range.end,
            kind,
        }
    }
}

#[derive(Debug, Error)]
pub enum ChunkErrorKind {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status code {0}")]
    Status(StatusCode),

    #[error("server ignored the range request")]
    RangeIgnored,

    #[error("content range mismatch, expected {expected}, got {actual}")]
    ContentRangeMismatch { expected: String, actual: String },

    #[error("server sent more than the requested {expected} bytes")]
    Overflow { expected: u64 },

    #[error("body truncated, expected {expected} bytes, received {received}")]
    Truncated { expected: u64, received: u64 },

    #[error("write failed: {0}")]
    Write(#[source] io::Error),

    #[error("worker panicked: {0}")]
    Panicked(String),
}
