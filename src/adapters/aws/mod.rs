//! AWS adapters: S3 object storage.

pub mod s3;

pub use s3::S3Adapter;
