//! Configuration for the assembly worker.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Which storage backend to construct. Selected once at startup, never per
/// call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    Local,
    S3,
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Storage backend selection
    pub storage_mode: StorageMode,
    /// Root directory for the local backend
    pub storage_root: PathBuf,
    /// Bucket for the S3 backend (required only in s3 mode)
    pub s3_bucket: Option<String>,
    /// Directory for per-task status documents
    pub status_dir: PathBuf,
    /// Fetch fan-out bound
    pub max_concurrent_fetches: usize,
    /// Storage retry budget
    pub storage_max_attempts: u32,
    /// First backoff delay; doubles per attempt
    pub storage_retry_base: Duration,
    /// Upper bound on one ffmpeg/ffprobe invocation
    pub tool_timeout: Duration,
    /// Lifetime of the signed result URL
    pub signed_url_ttl: Duration,
    /// Accept absolute storage references (trusted input only)
    pub allow_absolute_paths: bool,
    /// Enforce non-decreasing, non-overlapping move start times
    pub strict_timeline: bool,
    /// Retain workspaces after each run, for debugging
    pub keep_workspace: bool,
    /// Directory to create workspaces under; system temp when unset
    pub workspace_root: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables, with defaults for
    /// everything except the bucket in s3 mode.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let storage_mode = match env::var("STORAGE_MODE").as_deref() {
            Ok("s3") => StorageMode::S3,
            _ => StorageMode::Local,
        };

        Self {
            storage_mode,
            storage_root: PathBuf::from(
                env::var("STORAGE_ROOT").unwrap_or_else(|_| String::from("./media")),
            ),
            s3_bucket: env::var("S3_BUCKET").ok(),
            status_dir: PathBuf::from(
                env::var("STATUS_DIR").unwrap_or_else(|_| String::from("./task_status")),
            ),
            max_concurrent_fetches: parse_or("MAX_CONCURRENT_FETCHES", 10),
            storage_max_attempts: parse_or("STORAGE_MAX_ATTEMPTS", 3),
            storage_retry_base: Duration::from_millis(parse_or("STORAGE_RETRY_BASE_MS", 500)),
            tool_timeout: Duration::from_secs(parse_or("TOOL_TIMEOUT_SECS", 300)),
            signed_url_ttl: Duration::from_secs(parse_or("SIGNED_URL_TTL_SECS", 86_400)),
            allow_absolute_paths: parse_or("ALLOW_ABSOLUTE_PATHS", false),
            strict_timeline: parse_or("STRICT_TIMELINE", false),
            keep_workspace: parse_or("KEEP_WORKSPACE", false),
            workspace_root: env::var("WORKSPACE_ROOT").ok().map(PathBuf::from),
        }
    }
}

fn parse_or<T: std::str::FromStr>(var: &str, default: T) -> T {
    env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
