use std::{net::SocketAddr, sync::Arc, sync::LazyLock};

use axum::{
    Json, Router,
    body::Body,
    extract::DefaultBodyLimit,
    http::{Method, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use bytes::Bytes;
use eyre::{Context, Result};
use futures::{StreamExt as _, stream};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};

use crate::constants::{DOWNLOAD_PATH, DOWNLOAD_SIZE_BYTES, MAX_UPLOAD_BODY_SIZE, SPEED_API_PATH};

const CHUNK_SIZE: usize = 64 * 1024;

/// Shared chunk the download payload is sliced from
static ZERO_CHUNK: LazyLock<Arc<Bytes>> =
    LazyLock::new(|| Arc::new(Bytes::from(vec![0u8; CHUNK_SIZE])));

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Allow browser clients on other origins
    pub enable_cors: bool,
}

/// Serves the download payload and the speed API until the process exits.
pub async fn run_server(config: ServerConfig) -> Result<()> {
    let app = router(config.enable_cors);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .wrap_err_with(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Speed server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(enable_cors: bool) -> Router {
    let mut router = Router::new()
        .route(DOWNLOAD_PATH, get(payload_handler))
        .route(SPEED_API_PATH, post(speed_api_handler))
        .layer(DefaultBodyLimit::disable());

    if enable_cors {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(Any),
        );
    }

    router
}

/// Streams exactly `DOWNLOAD_SIZE_BYTES`. Query strings are ignored so cache-busting
/// parameters always hit the same payload.
async fn payload_handler() -> impl IntoResponse {
    let chunks = DOWNLOAD_SIZE_BYTES.div_ceil(CHUNK_SIZE);
    let chunk = Arc::clone(&ZERO_CHUNK);

    let mut remaining = DOWNLOAD_SIZE_BYTES;
    let stream = stream::iter(0..chunks).map(move |_| {
        let len = CHUNK_SIZE.min(remaining);
        remaining -= len;
        Ok::<_, std::io::Error>(chunk.slice(0..len))
    });

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_LENGTH, DOWNLOAD_SIZE_BYTES.to_string()),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        Body::from_stream(stream),
    )
}

#[derive(Debug, Serialize)]
struct SpeedApiResponse {
    success: bool,
}

/// Reads the whole request body before answering, so the client's clock covers
/// the complete upload. Bodies over `MAX_UPLOAD_BODY_SIZE` are refused.
async fn speed_api_handler(body: Body) -> impl IntoResponse {
    let mut stream = body.into_data_stream();
    let mut bytes_received = 0;
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(data) => {
                bytes_received += data.len();
                if bytes_received > MAX_UPLOAD_BODY_SIZE {
                    debug!("Rejecting request body over {MAX_UPLOAD_BODY_SIZE} bytes");
                    return (
                        StatusCode::PAYLOAD_TOO_LARGE,
                        Json(SpeedApiResponse { success: false }),
                    );
                }
            }
            Err(e) => {
                debug!("Request body ended early after {bytes_received} bytes: {e}");
                return (
                    StatusCode::BAD_REQUEST,
                    Json(SpeedApiResponse { success: false }),
                );
            }
        }
    }
    debug!("Drained {bytes_received} bytes");

    (StatusCode::OK, Json(SpeedApiResponse { success: true }))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use url::Url;

    /// Serves `app` on an ephemeral local port and returns its base URL.
    pub(crate) async fn spawn(app: Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Url::parse(&format!("http://{addr}/")).unwrap()
    }

    /// Client that never routes local test traffic through a proxy.
    pub(crate) fn client() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }
}
