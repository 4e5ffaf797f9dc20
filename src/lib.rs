//! Astaire - Video Assembly Pipeline
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (blueprint, validator, ffmpeg commands)
//! - ports/: Trait definitions (storage, task-status reporting)
//! - adapters/: Concrete implementations (local fs, S3, retry, status store)
//! - application/: The assembly orchestrator and its workspace
//! - config: Environment configuration
//!
//! A run takes one validated [`domain::blueprint::Blueprint`], fetches the
//! referenced media with bounded parallelism, concatenates the clips and
//! muxes in the audio track via ffmpeg, uploads the result, and publishes
//! staged progress to a task-status store throughout.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports for convenience
pub use application::{AssemblerConfig, AssemblerService, RunOutcome};
pub use config::{Config, StorageMode};
pub use domain::blueprint::Blueprint;
pub use domain::validator::Validator;
