use crate::ports::reporter::{StatusUpdate, TaskStatusReporter};
use async_trait::async_trait;
use std::error::Error;
use std::path::PathBuf;

/// Task-status store backed by one JSON document per task under a status
/// directory. Stands in for the external task record when running the
/// worker binary standalone; each update overwrites the document, so the
/// file always holds the latest state.
#[derive(Clone)]
pub struct FsStatusReporter {
    dir: PathBuf,
}

impl FsStatusReporter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn status_path(&self, task_id: &str) -> PathBuf {
        // task_id is caller-supplied; flatten it so it cannot nest.
        let safe: String = task_id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }
}

#[async_trait]
impl TaskStatusReporter for FsStatusReporter {
    async fn update_task_status(
        &self,
        update: &StatusUpdate,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.status_path(&update.task_id);
        let body = serde_json::to_vec_pretty(update)?;
        tokio::fs::write(&path, body).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::reporter::TaskStatus;
    use tempfile::tempdir;

    #[tokio::test]
    async fn latest_update_wins() {
        let dir = tempdir().unwrap();
        let reporter = FsStatusReporter::new(dir.path().to_path_buf());

        let mut update = StatusUpdate {
            task_id: "task-7".to_string(),
            status: TaskStatus::Started,
            progress: 10,
            stage: "pending".to_string(),
            message: "accepted".to_string(),
            result: None,
            error: None,
        };
        reporter.update_task_status(&update).await.unwrap();

        update.status = TaskStatus::Running;
        update.progress = 50;
        update.stage = "concatenating".to_string();
        reporter.update_task_status(&update).await.unwrap();

        let raw = std::fs::read_to_string(reporter.status_path("task-7")).unwrap();
        let stored: StatusUpdate = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored.status, TaskStatus::Running);
        assert_eq!(stored.progress, 50);
    }

    #[tokio::test]
    async fn task_id_cannot_nest_outside_status_dir() {
        let dir = tempdir().unwrap();
        let reporter = FsStatusReporter::new(dir.path().to_path_buf());
        let path = reporter.status_path("../evil/task");
        assert_eq!(path.parent().unwrap(), dir.path());
    }

    #[test]
    fn status_literals_are_fixed() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::Started).unwrap(),
            "\"started\""
        );
        assert_eq!(
            serde_json::to_string(&TaskStatus::Failed).unwrap(),
            "\"failed\""
        );
    }
}
