use crate::adapters::retry::{with_retry, RetryPolicy};
use crate::domain::paths::{check_reference, resolve_under_root};
use crate::ports::storage::{StorageError, StoragePort};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Local-filesystem storage backend. Every reference resolves under one
/// configured root and passes the same traversal checks as the validator,
/// so the adapter is safe even when handed an unvalidated reference.
#[derive(Clone)]
pub struct FsAdapter {
    root: PathBuf,
    allow_absolute: bool,
    retry: RetryPolicy,
}

impl FsAdapter {
    pub fn new(root: PathBuf, allow_absolute: bool, retry: RetryPolicy) -> Self {
        Self {
            root,
            allow_absolute,
            retry,
        }
    }

    fn resolve(&self, reference: &str) -> Result<PathBuf, StorageError> {
        check_reference(reference, self.allow_absolute).map_err(|violation| {
            StorageError::UnsafeReference {
                reference: reference.to_string(),
                reason: violation.describe().to_string(),
            }
        })?;
        let path = Path::new(reference);
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            Ok(resolve_under_root(&self.root, reference))
        }
    }
}

fn classify_io(reference: &str, err: io::Error) -> StorageError {
    match err.kind() {
        io::ErrorKind::NotFound => StorageError::NotFound {
            reference: reference.to_string(),
        },
        io::ErrorKind::PermissionDenied => StorageError::PermissionDenied {
            reference: reference.to_string(),
        },
        _ => StorageError::Transient {
            reference: reference.to_string(),
            detail: err.to_string(),
        },
    }
}

#[async_trait]
impl StoragePort for FsAdapter {
    async fn fetch(&self, reference: &str, local_path: &Path) -> Result<(), StorageError> {
        let source = self.resolve(reference)?;
        with_retry(&self.retry, "fs fetch", || async {
            if let Some(parent) = local_path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| classify_io(reference, e))?;
            }
            tokio::fs::copy(&source, local_path)
                .await
                .map_err(|e| classify_io(reference, e))?;
            let written = tokio::fs::metadata(local_path)
                .await
                .map_err(|e| classify_io(reference, e))?;
            if written.len() == 0 {
                return Err(StorageError::EmptyObject {
                    reference: reference.to_string(),
                });
            }
            Ok(())
        })
        .await
    }

    async fn upload(&self, local_path: &Path, reference: &str) -> Result<String, StorageError> {
        let destination = self.resolve(reference)?;
        with_retry(&self.retry, "fs upload", || async {
            if let Some(parent) = destination.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| classify_io(reference, e))?;
            }
            tokio::fs::copy(local_path, &destination)
                .await
                .map_err(|e| classify_io(reference, e))?;
            Ok(destination.display().to_string())
        })
        .await
    }

    async fn exists(&self, reference: &str) -> Result<bool, StorageError> {
        let path = self.resolve(reference)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| classify_io(reference, e))
    }

    async fn signed_url(&self, reference: &str, _ttl: Duration) -> Result<String, StorageError> {
        // No signing locally: a direct file reference is the URL.
        let path = self.resolve(reference)?;
        Ok(path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn adapter(root: &Path) -> FsAdapter {
        FsAdapter::new(
            root.to_path_buf(),
            false,
            RetryPolicy {
                max_attempts: 2,
                base_delay: Duration::from_millis(1),
            },
        )
    }

    #[tokio::test]
    async fn fetch_copies_file_under_root() {
        let root = tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("clips")).unwrap();
        std::fs::write(root.path().join("clips/a.mp4"), b"frames").unwrap();

        let dest_dir = tempdir().unwrap();
        let dest = dest_dir.path().join("work/clip_000.mp4");
        adapter(root.path()).fetch("clips/a.mp4", &dest).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"frames");
    }

    #[tokio::test]
    async fn fetch_refuses_traversal_without_prior_validation() {
        let root = tempdir().unwrap();
        let dest_dir = tempdir().unwrap();
        let dest = dest_dir.path().join("out.mp4");
        let err = adapter(root.path())
            .fetch("../outside/secret.mp4", &dest)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UnsafeReference { .. }));
    }

    #[tokio::test]
    async fn fetch_refuses_absolute_reference_by_default() {
        let root = tempdir().unwrap();
        std::fs::write(root.path().join("a.mp4"), b"frames").unwrap();
        let abs = root.path().join("a.mp4").display().to_string();
        let dest_dir = tempdir().unwrap();
        let dest = dest_dir.path().join("out.mp4");

        let err = adapter(root.path()).fetch(&abs, &dest).await.unwrap_err();
        assert!(matches!(err, StorageError::UnsafeReference { .. }));

        // The permissive mode exists for trusted callers only.
        let permissive = FsAdapter::new(root.path().to_path_buf(), true, RetryPolicy::default());
        permissive.fetch(&abs, &dest).await.unwrap();
    }

    #[tokio::test]
    async fn zero_byte_fetch_is_a_failure() {
        let root = tempdir().unwrap();
        std::fs::write(root.path().join("empty.mp4"), b"").unwrap();
        let dest_dir = tempdir().unwrap();
        let dest = dest_dir.path().join("out.mp4");
        let err = adapter(root.path())
            .fetch("empty.mp4", &dest)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::EmptyObject { .. }));
    }

    #[tokio::test]
    async fn missing_source_is_not_found() {
        let root = tempdir().unwrap();
        let dest_dir = tempdir().unwrap();
        let dest = dest_dir.path().join("out.mp4");
        let err = adapter(root.path())
            .fetch("clips/nope.mp4", &dest)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn upload_creates_parents_and_returns_resolved_path() {
        let root = tempdir().unwrap();
        let src_dir = tempdir().unwrap();
        let src = src_dir.path().join("final.mp4");
        std::fs::write(&src, b"muxed").unwrap();

        let a = adapter(root.path());
        let returned = a.upload(&src, "renders/2024/final.mp4").await.unwrap();
        assert_eq!(
            returned,
            root.path().join("renders/2024/final.mp4").display().to_string()
        );
        assert!(a.exists("renders/2024/final.mp4").await.unwrap());
        assert!(!a.exists("renders/2024/other.mp4").await.unwrap());
    }

    #[tokio::test]
    async fn signed_url_is_a_direct_path_locally() {
        let root = tempdir().unwrap();
        let url = adapter(root.path())
            .signed_url("renders/final.mp4", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(
            url,
            root.path().join("renders/final.mp4").display().to_string()
        );
    }
}
