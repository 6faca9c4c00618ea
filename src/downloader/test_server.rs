//! In-process HTTP server used by the downloader tests.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Router,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tokio::net::TcpListener;

/// How the server answers requests for the resource.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Serves `206 Partial Content` for every range request.
    Honor,
    /// Answers range requests with the full body and `200 OK`.
    IgnoreRange,
    /// Streams the full body without a `Content-Length`.
    Unsized,
    /// `404` for every request.
    NotFound,
    /// `500` for range requests starting at any of the given offsets.
    FailFrom(Vec<u64>),
    /// Sends only the first half of the range starting at this offset.
    TruncateFrom(u64),
    /// Sends the range starting at this offset followed by extra bytes.
    OverflowFrom(u64),
    /// Reports a `Content-Range` one byte off from what was asked for.
    ShiftContentRange,
    /// Reports a complete length different from the probed one.
    GrowTotal,
}

pub struct ServerState {
    body: Vec<u8>,
    behavior: Behavior,
    requests: AtomicUsize,
}

impl ServerState {
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

pub fn sample_body(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn parse_range(headers: &HeaderMap) -> Option<(u64, u64)> {
    let value = headers.get(header::RANGE)?.to_str().ok()?;
    let (start, end) = value.strip_prefix("bytes=")?.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

fn partial(body: Bytes, content_range: String) -> Response {
    (
        StatusCode::PARTIAL_CONTENT,
        [(header::CONTENT_RANGE, content_range)],
        body,
    )
        .into_response()
}

async fn serve_resource(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);
    let total = state.body.len() as u64;
    let full = Bytes::from(state.body.clone());

    if let Behavior::NotFound = state.behavior {
        return StatusCode::NOT_FOUND.into_response();
    }

    let Some((start, end)) = parse_range(&headers) else {
        return match state.behavior {
            Behavior::Unsized => {
                let stream = futures::stream::once(async move { Ok::<_, Infallible>(full) });
                Body::from_stream(stream).into_response()
            }
            _ => full.into_response(),
        };
    };

    let slice = full.slice(start as usize..end as usize + 1);
    match &state.behavior {
        Behavior::IgnoreRange => full.into_response(),
        Behavior::FailFrom(offsets) if offsets.contains(&start) => {
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Behavior::TruncateFrom(offset) if *offset == start => {
            let half = slice.slice(..slice.len() / 2);
            partial(half, format!("bytes {}-{}/{}", start, end, total))
        }
        Behavior::OverflowFrom(offset) if *offset == start => {
            let mut oversized = slice.to_vec();
            oversized.extend_from_slice(&[0xaa; 10]);
            partial(
                Bytes::from(oversized),
                format!("bytes {}-{}/{}", start, end, total),
            )
        }
        Behavior::ShiftContentRange => {
            partial(slice, format!("bytes {}-{}/{}", start + 1, end + 1, total))
        }
        Behavior::GrowTotal => partial(slice, format!("bytes {}-{}/9999", start, end)),
        _ => partial(slice, format!("bytes {}-{}/{}", start, end, total)),
    }
}

/// Starts a server for `body` on an ephemeral port and returns its resource
/// url together with the shared state.
pub async fn spawn_server(body: Vec<u8>, behavior: Behavior) -> (String, Arc<ServerState>) {
    let state = Arc::new(ServerState {
        body,
        behavior,
        requests: AtomicUsize::new(0),
    });
    let app = Router::new()
        .route("/resource", get(serve_resource))
        .with_state(Arc::clone(&state));

    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/resource", addr), state)
}
