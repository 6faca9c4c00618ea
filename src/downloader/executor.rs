use std::sync::Arc;

use futures::future::join_all;
use reqwest::header::{CONTENT_RANGE, RANGE};
use reqwest::{Client, StatusCode, Url};
use tokio::task::JoinError;
use tracing::{debug, warn};

use crate::downloader::planer::ChunkRange;
use crate::downloader::target::TargetFile;
use crate::error::{ChunkError, ChunkErrorKind};
use crate::utils::multierr::MultiError;

/// Terminal state of one chunk. A chunk still in flight is represented by
/// its pending task.
#[derive(Debug)]
pub enum ChunkResult {
    Succeeded,
    Failed(ChunkError),
}

impl ChunkResult {
    pub fn into_error(self) -> Option<ChunkError> {
        match self {
            ChunkResult::Succeeded => None,
            ChunkResult::Failed(err) => Some(err),
        }
    }
}

/// `value` must be `bytes <start>-<end>/<total>` for exactly this range and
/// the probed total. An unknown total (`*`) is accepted.
fn content_range_matches(value: &str, range: &ChunkRange, total: u64) -> bool {
    let Some((span, complete)) = value
        .strip_prefix("bytes ")
        .and_then(|rest| rest.split_once('/'))
    else {
        return false;
    };
    let Some((start, end)) = span.split_once('-') else {
        return false;
    };

    start.trim().parse::<u64>().ok() == Some(range.start)
        && end.trim().parse::<u64>().ok() == Some(range.end)
        && (complete.trim() == "*" || complete.trim().parse::<u64>().ok() == Some(total))
}

fn check_content_range(
    response: &reqwest::Response,
    range: &ChunkRange,
    total: u64,
) -> Result<(), ChunkErrorKind> {
    let actual = response
        .headers()
        .get(CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if content_range_matches(actual, range, total) {
        Ok(())
    } else {
        Err(ChunkErrorKind::ContentRangeMismatch {
            expected: format!("bytes {}-{}/{}", range.start, range.end, total),
            actual: actual.to_string(),
        })
    }
}

async fn fetch_range(
    client: &Client,
    url: &Url,
    target: &TargetFile,
    range: &ChunkRange,
) -> Result<u64, ChunkErrorKind> {
    let total = target.len();
    let mut response = client
        .get(url.clone())
        .header(RANGE, range.header_value())
        .send()
        .await?;

    match response.status() {
        StatusCode::PARTIAL_CONTENT => check_content_range(&response, range, total)?,
        // a server that ignores Range only hurts when the chunk is a strict subset
        StatusCode::OK if range.covers(total) => {}
        StatusCode::OK => return Err(ChunkErrorKind::RangeIgnored),
        status => return Err(ChunkErrorKind::Status(status)),
    }

    let expected = range.len();
    let mut written = 0u64;
    while let Some(bytes) = response.chunk().await? {
        let n = bytes.len() as u64;
        if written + n > expected {
            return Err(ChunkErrorKind::Overflow { expected });
        }
        target
            .write_at(range.start + written, bytes)
            .await
            .map_err(ChunkErrorKind::Write)?;
        written += n;
    }

    if written != expected {
        return Err(ChunkErrorKind::Truncated {
            expected,
            received: written,
        });
    }
    Ok(written)
}

/// Downloads one range into `target`. Never returns an error: failures are
/// reported through the returned [`ChunkResult`].
pub async fn run_chunk(
    client: Client,
    url: Url,
    target: Arc<TargetFile>,
    range: ChunkRange,
) -> ChunkResult {
    debug!(chunk = range.index, start = range.start, end = range.end, "chunk started");
    match fetch_range(&client, &url, &target, &range).await {
        Ok(written) => {
            debug!(chunk = range.index, bytes = written, "chunk finished");
            ChunkResult::Succeeded
        }
        Err(kind) => {
            let err = ChunkError::new(&range, kind);
            warn!(chunk = range.index, "{}", err);
            ChunkResult::Failed(err)
        }
    }
}

fn joined_result(range: &ChunkRange, joined: Result<ChunkResult, JoinError>) -> ChunkResult {
    match joined {
        Ok(result) => result,
        Err(err) => ChunkResult::Failed(ChunkError::new(
            range,
            ChunkErrorKind::Panicked(err.to_string()),
        )),
    }
}

/// Runs every range to a terminal state and aggregates the failures.
///
/// Ranges after the first are spawned onto the runtime; the first one runs
/// on the calling task. Failures are returned in range order.
pub async fn execute_chunks(
    client: &Client,
    url: &Url,
    target: &Arc<TargetFile>,
    ranges: &[ChunkRange],
) -> Result<(), MultiError<ChunkError>> {
    let Some((first, rest)) = ranges.split_first() else {
        return Ok(());
    };

    let handles = rest
        .iter()
        .map(|range| {
            tokio::spawn(run_chunk(
                client.clone(),
                url.clone(),
                Arc::clone(target),
                *range,
            ))
        })
        .collect::<Vec<_>>();

    let mut results = Vec::with_capacity(ranges.len());
    results.push(run_chunk(client.clone(), url.clone(), Arc::clone(target), *first).await);

    for (range, joined) in rest.iter().zip(join_all(handles).await) {
        results.push(joined_result(range, joined));
    }

    results
        .into_iter()
        .filter_map(ChunkResult::into_error)
        .collect::<MultiError<_>>()
        .into_result()
}
