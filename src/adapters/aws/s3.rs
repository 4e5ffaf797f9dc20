use crate::adapters::retry::{with_retry, RetryPolicy};
use crate::ports::storage::{StorageError, StoragePort};
use async_trait::async_trait;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use std::path::Path;
use std::time::Duration;

/// Object-store backend addressed by bucket + key, with SDK presigning for
/// signed URLs.
#[derive(Clone)]
pub struct S3Adapter {
    client: Client,
    bucket: String,
    retry: RetryPolicy,
}

impl S3Adapter {
    pub fn new(client: Client, bucket: String, retry: RetryPolicy) -> Self {
        Self {
            client,
            bucket,
            retry,
        }
    }
}

/// Classify an SDK failure by its error metadata. Service errors with a
/// not-found/permission code are permanent; dispatch, timeout, and other
/// response failures are transient and retried.
fn classify_sdk<E, R>(reference: &str, err: &SdkError<E, R>) -> StorageError
where
    E: ProvideErrorMetadata + std::fmt::Debug,
    R: std::fmt::Debug,
{
    if let SdkError::ServiceError(ctx) = err {
        match ctx.err().code() {
            Some("NoSuchKey") | Some("NotFound") | Some("404") => {
                return StorageError::NotFound {
                    reference: reference.to_string(),
                }
            }
            Some("AccessDenied") | Some("403") => {
                return StorageError::PermissionDenied {
                    reference: reference.to_string(),
                }
            }
            _ => {}
        }
    }
    StorageError::Transient {
        reference: reference.to_string(),
        detail: format!("{:?}", err),
    }
}

fn transient_io(reference: &str, err: std::io::Error) -> StorageError {
    StorageError::Transient {
        reference: reference.to_string(),
        detail: err.to_string(),
    }
}

#[async_trait]
impl StoragePort for S3Adapter {
    async fn fetch(&self, reference: &str, local_path: &Path) -> Result<(), StorageError> {
        with_retry(&self.retry, "s3 fetch", || async {
            let resp = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(reference)
                .send()
                .await
                .map_err(|e| classify_sdk(reference, &e))?;

            let body = resp.body.collect().await.map_err(|e| StorageError::Transient {
                reference: reference.to_string(),
                detail: e.to_string(),
            })?;
            let bytes = body.into_bytes();
            if bytes.is_empty() {
                return Err(StorageError::EmptyObject {
                    reference: reference.to_string(),
                });
            }

            if let Some(parent) = local_path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| transient_io(reference, e))?;
            }
            tokio::fs::write(local_path, &bytes)
                .await
                .map_err(|e| transient_io(reference, e))?;
            Ok(())
        })
        .await
    }

    async fn upload(&self, local_path: &Path, reference: &str) -> Result<String, StorageError> {
        with_retry(&self.retry, "s3 upload", || async {
            let body = tokio::fs::read(local_path)
                .await
                .map_err(|e| transient_io(reference, e))?;
            let byte_stream = aws_sdk_s3::primitives::ByteStream::from(body);

            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(reference)
                .body(byte_stream)
                .send()
                .await
                .map_err(|e| classify_sdk(reference, &e))?;
            Ok(format!("s3://{}/{}", self.bucket, reference))
        })
        .await
    }

    async fn exists(&self, reference: &str) -> Result<bool, StorageError> {
        with_retry(&self.retry, "s3 head", || async {
            match self
                .client
                .head_object()
                .bucket(&self.bucket)
                .key(reference)
                .send()
                .await
            {
                Ok(_) => Ok(true),
                Err(err) => match classify_sdk(reference, &err) {
                    StorageError::NotFound { .. } => Ok(false),
                    other => Err(other),
                },
            }
        })
        .await
    }

    async fn signed_url(&self, reference: &str, ttl: Duration) -> Result<String, StorageError> {
        let config = PresigningConfig::expires_in(ttl).map_err(|e| StorageError::Transient {
            reference: reference.to_string(),
            detail: format!("invalid presigning TTL: {}", e),
        })?;
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(reference)
            .presigned(config)
            .await
            .map_err(|e| classify_sdk(reference, &e))?;
        Ok(presigned.uri().to_string())
    }
}
