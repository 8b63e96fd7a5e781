//! JSON read API over the local mirror
//!
//! Serves one connection at a time on the configured address. Routes:
//!
//! - `GET /libraries/{id}/items`, `GET /libraries/{id}/items/{key}`
//! - `GET /libraries/{id}/tags|children|collections`
//! - `GET /libraries/{id}/info`
//! - `GET /libraries/{id}/files/{key}`
//! - `GET /libraries/{id}/annotations?tag={tag}`
//! - `POST /sync`, `POST /libraries/{id}/sync`,
//!   `POST /libraries/{id}/sync/{item|collection}/{key}`

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use zqda_core::domain::{LibraryId, RecordKey};
use zqda_sync::{LibraryCache, ObjectKind, SyncError};

type Body = Full<Bytes>;

/// HTTP server exposing a [`LibraryCache`]
pub struct ApiServer {
    cache: Arc<LibraryCache>,
    addr: SocketAddr,
}

impl ApiServer {
    /// # Arguments
    /// * `cache` - The library cache to serve
    /// * `bind` - Address to bind, e.g. `"127.0.0.1:8080"`
    pub fn new(cache: Arc<LibraryCache>, bind: &str) -> anyhow::Result<Self> {
        let addr: SocketAddr = bind.parse()?;
        Ok(Self { cache, addr })
    }

    /// Accept connections until `shutdown` is cancelled
    ///
    /// Connections are served inline, so cancellation takes effect between
    /// connections.
    pub async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "API server listening");

        loop {
            tokio::select! {
                result = listener.accept() => {
                    let (stream, peer) = result?;
                    debug!(%peer, "Connection accepted");
                    let io = TokioIo::new(stream);
                    let cache = Arc::clone(&self.cache);

                    let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                        let cache = Arc::clone(&cache);
                        async move {
                            let target = req.uri().path_and_query().map_or("/", |pq| pq.as_str());
                            Ok::<_, Infallible>(route(&cache, req.method(), target).await)
                        }
                    });

                    if let Err(e) = http1::Builder::new()
                        .keep_alive(false)
                        .serve_connection(io, service)
                        .await
                    {
                        error!(error = %e, "API connection error");
                    }
                }
                _ = shutdown.cancelled() => {
                    info!("API server shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Dispatch one request; `target` is the path with an optional query
pub async fn route(cache: &LibraryCache, method: &Method, target: &str) -> Response<Body> {
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    debug!(%method, path, "Request");

    let result = match (method, segments.as_slice()) {
        (&Method::POST, ["sync"]) => {
            let lines = cache.sync_all().await;
            Ok(json_response(StatusCode::OK, &lines))
        }
        (_, ["libraries", id, rest @ ..]) => match id.parse::<LibraryId>() {
            Ok(library) => library_route(cache, method, library, rest, query).await,
            Err(_) => Ok(text_response(
                StatusCode::NOT_FOUND,
                format!("Unknown library: {id}"),
            )),
        },
        _ => Ok(not_found()),
    };

    result.unwrap_or_else(|e| error_response(&e))
}

async fn library_route(
    cache: &LibraryCache,
    method: &Method,
    library: LibraryId,
    rest: &[&str],
    query: &str,
) -> Result<Response<Body>, SyncError> {
    let response = match (method, rest) {
        (&Method::GET, ["items"]) => json_response(StatusCode::OK, &cache.get_items(library).await?),
        (&Method::GET, ["items", key]) => {
            let Some(key) = parse_key(key) else {
                return Ok(not_found());
            };
            json_response(StatusCode::OK, &cache.get_item(library, &key).await?)
        }
        (&Method::GET, ["tags"]) => json_response(StatusCode::OK, &*cache.get_tags(library).await?),
        (&Method::GET, ["children"]) => {
            json_response(StatusCode::OK, &*cache.get_children(library).await?)
        }
        (&Method::GET, ["collections"]) => {
            json_response(StatusCode::OK, &*cache.get_collections(library).await?)
        }
        (&Method::GET, ["info"]) => match cache.library_info(library).await? {
            Some(info) => json_response(StatusCode::OK, &info),
            None => text_response(
                StatusCode::NOT_FOUND,
                format!("No metadata for library {library}"),
            ),
        },
        (&Method::GET, ["files", key]) => {
            let Some(key) = parse_key(key) else {
                return Ok(not_found());
            };
            let file = cache.attachment(library, &key).await?;
            let bytes = tokio::fs::read(&file.path)
                .await
                .map_err(|e| SyncError::Storage(e.into()))?;
            let mut response = Response::new(Full::new(Bytes::from(bytes)));
            set_content_type(&mut response, &file.content_type);
            response
        }
        (&Method::GET, ["annotations"]) => {
            let Some(tag) = query_param(query, "tag") else {
                return Ok(text_response(
                    StatusCode::BAD_REQUEST,
                    "Missing 'tag' query parameter".to_string(),
                ));
            };
            json_response(StatusCode::OK, &cache.annotations_for_tag(library, &tag).await?)
        }
        (&Method::POST, ["sync"]) => {
            let outcome = cache.sync(library).await?;
            json_response(
                StatusCode::OK,
                &serde_json::json!({ "message": outcome.to_string(), "outcome": outcome }),
            )
        }
        (&Method::POST, ["sync", kind, key]) => {
            let (Ok(kind), Some(key)) = (kind.parse::<ObjectKind>(), parse_key(key)) else {
                return Ok(not_found());
            };
            let outcome = cache.sync_item(library, &key, kind).await?;
            json_response(
                StatusCode::OK,
                &serde_json::json!({ "message": outcome.to_string() }),
            )
        }
        _ => not_found(),
    };
    Ok(response)
}

fn parse_key(key: &str) -> Option<RecordKey> {
    key.parse().ok()
}

fn query_param(query: &str, name: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

// ============================================================================
// Responses
// ============================================================================

fn set_content_type(response: &mut Response<Body>, content_type: &str) {
    let value = HeaderValue::from_str(content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    response.headers_mut().insert(CONTENT_TYPE, value);
}

fn json_response<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Response<Body> {
    match serde_json::to_vec(value) {
        Ok(body) => {
            let mut response = Response::new(Full::new(Bytes::from(body)));
            *response.status_mut() = status;
            set_content_type(&mut response, "application/json");
            response
        }
        Err(e) => text_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode response: {e}"),
        ),
    }
}

fn text_response(status: StatusCode, body: String) -> Response<Body> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    set_content_type(&mut response, "text/plain; charset=utf-8");
    response
}

fn not_found() -> Response<Body> {
    text_response(StatusCode::NOT_FOUND, "Not Found".to_string())
}

fn error_response(error: &SyncError) -> Response<Body> {
    if error.is_not_found() {
        text_response(StatusCode::NOT_FOUND, error.to_string())
    } else {
        error!(error = %error, "Request failed");
        text_response(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
    }
}
