//! Assembly Worker Binary
//!
//! Takes one blueprint document, validates it, and runs the assembly
//! pipeline against the configured storage backend.
//!
//! The blueprint JSON comes from the ASSEMBLY_BLUEPRINT environment
//! variable, or from a file named as the first argument.
//!
//! Environment Variables:
//! - STORAGE_MODE: "local" (default) or "s3"
//! - STORAGE_ROOT: root directory for the local backend (default ./media)
//! - S3_BUCKET: bucket for the s3 backend (required in s3 mode)
//! - STATUS_DIR: directory for task status documents (default ./task_status)
//! - MAX_CONCURRENT_FETCHES, STORAGE_MAX_ATTEMPTS, STORAGE_RETRY_BASE_MS,
//!   TOOL_TIMEOUT_SECS, SIGNED_URL_TTL_SECS, ALLOW_ABSOLUTE_PATHS,
//!   STRICT_TIMELINE, KEEP_WORKSPACE, WORKSPACE_ROOT

use astaire::adapters::aws::S3Adapter;
use astaire::adapters::local::{FsAdapter, FsStatusReporter};
use astaire::adapters::retry::RetryPolicy;
use astaire::application::{AssemblerConfig, AssemblerService, RunOutcome};
use astaire::config::{Config, StorageMode};
use astaire::domain::blueprint::Blueprint;
use astaire::domain::ffmpeg::FfmpegExecutor;
use astaire::domain::validator::Validator;
use astaire::ports::storage::StoragePort;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // Config::from_env loads .env, so any RUST_LOG set there is visible
    // to the filter below.
    let config = Config::from_env();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let raw = match read_blueprint() {
        Ok(raw) => raw,
        Err(msg) => {
            error!("{}", msg);
            return ExitCode::FAILURE;
        }
    };

    // Validation errors surface here, before any task status is written.
    let validator = Validator {
        allow_absolute_paths: config.allow_absolute_paths,
        strict_timeline: config.strict_timeline,
    };
    let blueprint = match validator.validate_json(&raw) {
        Ok(blueprint) => blueprint,
        Err(errors) => {
            for e in &errors.errors {
                error!(field = %e.field, "{}", e.message);
            }
            error!("blueprint rejected with {} error(s)", errors.errors.len());
            return ExitCode::FAILURE;
        }
    };

    info!(
        task_id = %blueprint.task_id,
        clips = blueprint.moves.len(),
        mode = ?config.storage_mode,
        "starting assembly"
    );

    match config.storage_mode {
        StorageMode::Local => {
            let storage = FsAdapter::new(
                config.storage_root.clone(),
                config.allow_absolute_paths,
                retry_policy(&config),
            );
            run_pipeline(storage, &config, &blueprint).await
        }
        StorageMode::S3 => {
            let bucket = match config.s3_bucket.clone() {
                Some(bucket) => bucket,
                None => {
                    error!("S3_BUCKET env var required when STORAGE_MODE=s3");
                    return ExitCode::FAILURE;
                }
            };
            let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
            let client = aws_sdk_s3::Client::new(&sdk_config);
            let storage = S3Adapter::new(client, bucket, retry_policy(&config));
            run_pipeline(storage, &config, &blueprint).await
        }
    }
}

fn read_blueprint() -> Result<String, String> {
    if let Ok(raw) = std::env::var("ASSEMBLY_BLUEPRINT") {
        return Ok(raw);
    }
    match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path)
            .map_err(|e| format!("could not read blueprint file {}: {}", path, e)),
        None => Err("no blueprint: set ASSEMBLY_BLUEPRINT or pass a file path".to_string()),
    }
}

fn retry_policy(config: &Config) -> RetryPolicy {
    RetryPolicy {
        max_attempts: config.storage_max_attempts,
        base_delay: config.storage_retry_base,
    }
}

async fn run_pipeline<S: StoragePort>(
    storage: S,
    config: &Config,
    blueprint: &Blueprint,
) -> ExitCode {
    let reporter = FsStatusReporter::new(config.status_dir.clone());
    let tool = FfmpegExecutor::new(config.tool_timeout);
    let assembler_config = AssemblerConfig {
        max_concurrent_fetches: config.max_concurrent_fetches,
        keep_workspace: config.keep_workspace,
        workspace_root: config.workspace_root.clone(),
        signed_url_ttl: config.signed_url_ttl,
    };

    let service = AssemblerService::new(storage, reporter, tool, assembler_config);
    match service.run(blueprint).await {
        RunOutcome::Completed(result) => {
            info!(output = %result.output, "done");
            ExitCode::SUCCESS
        }
        RunOutcome::Failed(err) => {
            error!(error = %err, "assembly failed");
            ExitCode::FAILURE
        }
    }
}
