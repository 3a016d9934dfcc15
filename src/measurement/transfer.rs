use std::{
    future::Future,
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

use chrono::Utc;
use eyre::{Context, Result};
use futures::stream::StreamExt;
use rand::{RngCore, rng};
use reqwest::{
    Client, ClientBuilder, Method, StatusCode,
    header::{CACHE_CONTROL, CONTENT_TYPE},
};
use tracing::{debug, trace, warn};
use url::Url;

use crate::{
    constants::{
        CACHE_BUST_PARAM, CONNECT_TIMEOUT, DOWNLOAD_PATH, DOWNLOAD_SIZE_BYTES, PING_BODY,
        REQUEST_TIMEOUT, SPEED_API_PATH, UPLOAD_SIZE_BYTES,
    },
    report::{PhaseKind, TransferError},
};

/// Where the bytes of a transfer come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteSource {
    /// A fixed minimal probe body, for latency
    Probe,
    /// A file of known size held by the server
    ServerFile,
    /// Random bytes generated locally right before sending
    RandomBytes { len: usize },
}

/// Describes one transfer. Sizes are fixed before the transfer starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSpec {
    pub kind: PhaseKind,
    pub url: Url,
    pub method: Method,
    pub size_bits: u64,
    pub source: ByteSource,
}

impl TransferSpec {
    pub fn ping(url: Url) -> Self {
        Self {
            kind: PhaseKind::Ping,
            url,
            method: Method::POST,
            size_bits: PING_BODY.len() as u64 * 8,
            source: ByteSource::Probe,
        }
    }

    pub fn download(url: Url, size_bytes: usize) -> Self {
        Self {
            kind: PhaseKind::Download,
            url,
            method: Method::GET,
            size_bits: size_bytes as u64 * 8,
            source: ByteSource::ServerFile,
        }
    }

    pub fn upload(url: Url, size_bytes: usize) -> Self {
        Self {
            kind: PhaseKind::Upload,
            url,
            method: Method::POST,
            size_bits: size_bytes as u64 * 8,
            source: ByteSource::RandomBytes { len: size_bytes },
        }
    }
}

/// The three transfers of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    pub ping: TransferSpec,
    pub download: TransferSpec,
    pub upload: TransferSpec,
}

impl TransferPlan {
    /// Standard plan against a speed server rooted at `base`.
    pub fn for_server(base: &Url) -> Result<Self> {
        let api = base
            .join(SPEED_API_PATH)
            .wrap_err_with(|| format!("Invalid speed API URL under {base}"))?;
        let payload = base
            .join(DOWNLOAD_PATH)
            .wrap_err_with(|| format!("Invalid download URL under {base}"))?;

        Ok(Self {
            ping: TransferSpec::ping(api.clone()),
            download: TransferSpec::download(payload, DOWNLOAD_SIZE_BYTES),
            upload: TransferSpec::upload(api, UPLOAD_SIZE_BYTES),
        })
    }
}

/// Performs one exchange and reports how long it took.
///
/// The clock covers the full body: for downloads it stops only after the last
/// byte is consumed, for uploads it stops when the server acknowledges the
/// body (so the server round trip is included).
pub trait Transfer: Send + Sync {
    fn run(
        &self,
        spec: &TransferSpec,
    ) -> impl Future<Output = Result<Duration, TransferError>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpTransfer {
    client: Client,
}

impl HttpTransfer {
    pub fn new() -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .use_rustls_tls()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn ping(&self, spec: &TransferSpec) -> Result<Duration, TransferError> {
        let start = Instant::now();
        let response = self
            .client
            .request(spec.method.clone(), spec.url.clone())
            .body(PING_BODY)
            .send()
            .await?;
        let elapsed = start.elapsed();
        check_status(spec, response.status())?;

        // Drain outside the timed window so the connection can be reused
        let _ = response.bytes().await;
        Ok(elapsed)
    }

    async fn download(&self, spec: &TransferSpec) -> Result<Duration, TransferError> {
        let mut url = spec.url.clone();
        url.query_pairs_mut()
            .append_pair(CACHE_BUST_PARAM, &cache_bust_stamp().to_string());

        let start = Instant::now();
        let response = self
            .client
            .request(spec.method.clone(), url)
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;
        check_status(spec, response.status())?;

        let mut received = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            received += chunk?.len() as u64;
        }
        let elapsed = start.elapsed();

        // The rate is computed from the fixed size, so any other length is unusable
        let expected = spec.size_bits / 8;
        if received != expected {
            warn!("Download body was {received} bytes, expected {expected}");
            return Err(TransferError::Network(format!(
                "download body was {received} bytes, expected {expected}"
            )));
        }
        trace!("Downloaded {received} bytes in {elapsed:?}");

        Ok(elapsed)
    }

    async fn upload(&self, spec: &TransferSpec, len: usize) -> Result<Duration, TransferError> {
        let payload = random_payload(len);

        let start = Instant::now();
        let response = self
            .client
            .request(spec.method.clone(), spec.url.clone())
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(payload)
            .send()
            .await?;
        let elapsed = start.elapsed();
        check_status(spec, response.status())?;

        let _ = response.bytes().await;
        trace!("Uploaded {len} bytes in {elapsed:?}");

        Ok(elapsed)
    }
}

impl Transfer for HttpTransfer {
    async fn run(&self, spec: &TransferSpec) -> Result<Duration, TransferError> {
        debug!("Starting {} transfer: {} {}", spec.kind, spec.method, spec.url);
        match spec.source {
            ByteSource::Probe => self.ping(spec).await,
            ByteSource::ServerFile => self.download(spec).await,
            ByteSource::RandomBytes { len } => self.upload(spec, len).await,
        }
    }
}

fn check_status(spec: &TransferSpec, status: StatusCode) -> Result<(), TransferError> {
    if status.is_success() {
        return Ok(());
    }
    if status == StatusCode::NOT_FOUND && spec.source == ByteSource::ServerFile {
        return Err(TransferError::ResourceMissing(spec.url.to_string()));
    }
    Err(TransferError::Server(status.as_u16()))
}

/// Strictly increasing per process, based on wall-clock milliseconds.
fn cache_bust_stamp() -> u64 {
    static LAST: AtomicU64 = AtomicU64::new(0);

    let now = Utc::now().timestamp_millis().max(0) as u64;
    let previous = LAST
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |last| {
            Some(now.max(last + 1))
        })
        .unwrap_or_else(|last| last);
    now.max(previous + 1)
}

fn random_payload(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    rng().fill_bytes(&mut data);
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        measurement::rate::rate_from_outcome,
        server::{router, testing},
    };
    use axum::{
        Router,
        body::{Body, Bytes},
        extract::DefaultBodyLimit,
        routing::{get, post},
    };
    use futures::stream;
    use tokio::{net::TcpListener, time::sleep};

    const BODY_DELAY: Duration = Duration::from_millis(300);

    fn local_transfer() -> HttpTransfer {
        HttpTransfer::with_client(testing::client())
    }

    #[test]
    fn test_plan_targets_fixed_paths() {
        let base = Url::parse("http://speed.example:8080/").unwrap();
        let plan = TransferPlan::for_server(&base).unwrap();

        assert_eq!(plan.ping.url.path(), "/api/speed");
        assert_eq!(plan.ping.method, Method::POST);
        assert_eq!(plan.download.url.path(), "/speed.dat");
        assert_eq!(plan.download.method, Method::GET);
        assert_eq!(plan.download.size_bits, 83_886_080);
        assert_eq!(plan.upload.url.path(), "/api/speed");
        assert_eq!(plan.upload.size_bits, 16_777_216);
        assert_eq!(
            plan.upload.source,
            ByteSource::RandomBytes {
                len: UPLOAD_SIZE_BYTES
            }
        );
    }

    #[test]
    fn test_cache_bust_stamp_is_strictly_increasing() {
        let first = cache_bust_stamp();
        let second = cache_bust_stamp();
        let third = cache_bust_stamp();
        assert!(first < second);
        assert!(second < third);
    }

    #[test]
    fn test_random_payload_has_requested_length() {
        assert_eq!(random_payload(4096).len(), 4096);
        assert!(random_payload(0).is_empty());
    }

    #[test]
    fn test_not_found_only_means_missing_for_downloads() {
        let base = Url::parse("http://localhost/").unwrap();
        let plan = TransferPlan::for_server(&base).unwrap();

        assert!(matches!(
            check_status(&plan.download, StatusCode::NOT_FOUND),
            Err(TransferError::ResourceMissing(_))
        ));
        assert_eq!(
            check_status(&plan.upload, StatusCode::NOT_FOUND),
            Err(TransferError::Server(404))
        );
        assert_eq!(check_status(&plan.ping, StatusCode::OK), Ok(()));
    }

    #[tokio::test]
    async fn test_transfers_against_speed_server() {
        let base = testing::spawn(router(false)).await;
        let plan = TransferPlan::for_server(&base).unwrap();
        let transfer = local_transfer();

        for spec in [&plan.ping, &plan.download, &plan.upload] {
            let elapsed = transfer.run(spec).await.unwrap();
            assert!(elapsed > Duration::ZERO, "{} took no time", spec.kind);
        }
    }

    #[tokio::test]
    async fn test_missing_download_resource() {
        let base = testing::spawn(router(false)).await;
        let spec = TransferSpec::download(base.join("/missing.dat").unwrap(), 1024);

        let err = local_transfer().run(&spec).await.unwrap_err();
        assert!(matches!(err, TransferError::ResourceMissing(_)));
    }

    #[tokio::test]
    async fn test_server_failure_status() {
        // Reads the body first so the client is never cut off mid-upload
        let app = Router::new()
            .route(
                SPEED_API_PATH,
                post(|_body: Bytes| async { StatusCode::INTERNAL_SERVER_ERROR }),
            )
            .layer(DefaultBodyLimit::disable());
        let base = testing::spawn(app).await;
        let plan = TransferPlan::for_server(&base).unwrap();
        let transfer = local_transfer();

        assert_eq!(
            transfer.run(&plan.ping).await,
            Err(TransferError::Server(500))
        );
        assert_eq!(
            transfer.run(&plan.upload).await,
            Err(TransferError::Server(500))
        );
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let base = Url::parse(&format!("http://{addr}/")).unwrap();
        let plan = TransferPlan::for_server(&base).unwrap();

        let err = local_transfer().run(&plan.ping).await.unwrap_err();
        assert!(matches!(err, TransferError::Network(_)));
    }

    #[tokio::test]
    async fn test_short_download_body_records_no_rate() {
        // Chunked, so the client cannot tell the size from the headers
        let app = Router::new().route(
            DOWNLOAD_PATH,
            get(|| async {
                Body::from_stream(stream::iter([Ok::<_, std::io::Error>(Bytes::from(
                    vec![0u8; 1024],
                ))]))
            }),
        );
        let base = testing::spawn(app).await;
        let plan = TransferPlan::for_server(&base).unwrap();

        let outcome = local_transfer().run(&plan.download).await;

        assert!(matches!(outcome, Err(TransferError::Network(_))));
        assert_eq!(rate_from_outcome(plan.download.size_bits, &outcome), 0.0);
    }

    #[tokio::test]
    async fn test_download_clock_covers_whole_body() {
        const LEN: usize = 4096;
        let app = Router::new().route(
            DOWNLOAD_PATH,
            get(|| async {
                Body::from_stream(stream::once(async {
                    sleep(BODY_DELAY).await;
                    Ok::<_, std::io::Error>(Bytes::from(vec![0u8; LEN]))
                }))
            }),
        );
        let base = testing::spawn(app).await;
        let spec = TransferSpec::download(base.join(DOWNLOAD_PATH).unwrap(), LEN);

        let elapsed = local_transfer().run(&spec).await.unwrap();
        assert!(elapsed >= BODY_DELAY, "stopped after {elapsed:?}");
    }

    #[tokio::test]
    async fn test_upload_clock_waits_for_acknowledgment() {
        let app = Router::new()
            .route(
                SPEED_API_PATH,
                post(|body: Bytes| async move {
                    sleep(BODY_DELAY).await;
                    format!("{}", body.len())
                }),
            )
            .layer(DefaultBodyLimit::disable());
        let base = testing::spawn(app).await;
        let spec = TransferSpec::upload(base.join(SPEED_API_PATH).unwrap(), 64 * 1024);

        let elapsed = local_transfer().run(&spec).await.unwrap();
        assert!(elapsed >= BODY_DELAY, "stopped after {elapsed:?}");
    }
}
