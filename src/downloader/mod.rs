pub mod executor;
pub mod planer;
pub mod target;

#[cfg(test)]
mod test_server;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::{Client, StatusCode, Url};
use tracing::info;

use crate::error::DownloadError;
use target::TargetFile;

/// A validated download job.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    url: Url,
    concurrency: usize,
    destination: Option<PathBuf>,
}

impl DownloadRequest {
    /// Fails without touching the network if `concurrency` is zero or the url
    /// does not parse. A missing `destination` means a temp file is used.
    pub fn new(
        url: &str,
        concurrency: usize,
        destination: Option<PathBuf>,
    ) -> Result<Self, DownloadError> {
        if concurrency < 1 {
            return Err(DownloadError::InvalidConcurrency(concurrency));
        }
        let url = Url::parse(url).map_err(|err| DownloadError::InvalidUrl {
            url: url.to_string(),
            reason: err.to_string(),
        })?;

        Ok(Self {
            url,
            concurrency,
            destination,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn destination(&self) -> Option<&Path> {
        self.destination.as_deref()
    }
}

pub struct Downloader {
    client: Client,
}

impl Default for Downloader {
    fn default() -> Self {
        Self::new()
    }
}

impl Downloader {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Downloader { client }
    }

    /// Asks for the whole resource and reads its length from the response.
    /// The body is never read.
    async fn probe(&self, url: &Url) -> Result<u64, DownloadError> {
        let response = self.client.get(url.clone()).send().await?;
        if response.status() != StatusCode::OK {
            return Err(DownloadError::Connection {
                status: response.status(),
            });
        }
        response
            .content_length()
            .ok_or(DownloadError::MissingContentLength)
    }

    /// Downloads the resource into its destination and returns the path.
    ///
    /// The destination is only created once the probe succeeded. If any chunk
    /// fails, the bytes already written stay in place and the error lists
    /// every failed chunk.
    pub async fn download(&self, request: &DownloadRequest) -> Result<PathBuf, DownloadError> {
        let total = self.probe(request.url()).await?;
        info!(url = %request.url(), total, "content length discovered");

        let target = Arc::new(TargetFile::allocate(request.destination(), total).await?);
        info!(path = %target.path().display(), "saving to destination");

        let ranges = planer::plan(total, request.concurrency());
        for range in &ranges {
            info!(chunk = range.index, start = range.start, end = range.end, "chunk planned");
        }

        executor::execute_chunks(&self.client, request.url(), &target, &ranges).await?;

        info!(path = %target.path().display(), bytes = total, "download complete");
        Ok(target.path().to_path_buf())
    }
}

/// Downloads `url` with `concurrency` parallel range requests.
pub async fn download(
    url: &str,
    concurrency: usize,
    destination: Option<PathBuf>,
) -> Result<PathBuf, DownloadError> {
    let request = DownloadRequest::new(url, concurrency, destination)?;
    Downloader::new().download(&request).await
}
