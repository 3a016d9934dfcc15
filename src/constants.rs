use std::time::Duration;

pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Accepts both the ping probe and the upload body.
pub const SPEED_API_PATH: &str = "/api/speed";
/// Fixed-size download payload.
pub const DOWNLOAD_PATH: &str = "/speed.dat";

pub const DOWNLOAD_SIZE_BYTES: usize = 10 * 1024 * 1024; // 10MiB
/// Upload payload size. Kept small enough to fit under hosted request body ceilings.
pub const UPLOAD_SIZE_BYTES: usize = 2 * 1024 * 1024; // 2MiB
/// Largest request body the speed API accepts.
pub const MAX_UPLOAD_BODY_SIZE: usize = 4 * UPLOAD_SIZE_BYTES;

pub const PING_BODY: &str = "ping";
/// Query parameter carrying the cache-busting stamp on download requests.
pub const CACHE_BUST_PARAM: &str = "t";

/// Interval between progress estimate updates while a timed phase runs.
pub const PROGRESS_TICK: Duration = Duration::from_millis(50);
/// The estimate stops climbing once it reaches this value.
pub const PROGRESS_CEILING: f64 = 90.0;
/// Upper bound (exclusive) of the random increment applied per tick.
pub const PROGRESS_MAX_STEP: f64 = 2.0;
/// Full scale of the live gauge.
pub const GAUGE_MAX: f64 = 100.0;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
