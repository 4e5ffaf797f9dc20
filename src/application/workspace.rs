//! Per-run temporary workspace.
//!
//! One assembly run owns one workspace directory holding the fetched media
//! and intermediate files. Ownership of the backing `TempDir` guarantees
//! removal on every exit path; `keep` detaches the directory so a run can
//! be inspected after the fact.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::info;
use uuid::Uuid;

pub struct Workspace {
    path: PathBuf,
    // None when the workspace is retained for debugging.
    guard: Option<TempDir>,
}

impl Workspace {
    /// Create a workspace for one run. `root` overrides the system temp
    /// location; `keep` leaves the directory behind when the run ends.
    pub fn create(task_id: &str, root: Option<&Path>, keep: bool) -> io::Result<Self> {
        let safe_id: String = task_id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        let prefix = format!("assembly_{}_{}_", safe_id, Uuid::new_v4().simple());

        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                tempfile::Builder::new().prefix(&prefix).tempdir_in(root)?
            }
            None => tempfile::Builder::new().prefix(&prefix).tempdir()?,
        };

        if keep {
            let path = dir.into_path();
            info!(task_id, path = %path.display(), "retaining workspace for inspection");
            Ok(Self { path, guard: None })
        } else {
            Ok(Self {
                path: dir.path().to_path_buf(),
                guard: Some(dir),
            })
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Local destination for the clip at a given move index. Index-based
    /// naming keeps concatenation order independent of fetch completion
    /// order.
    pub fn clip_path(&self, index: usize) -> PathBuf {
        self.path.join(format!("clip_{:03}.mp4", index))
    }

    /// Local destination for the audio track, keeping the reference's
    /// extension when it has one.
    pub fn audio_path(&self, reference: &str) -> PathBuf {
        match Path::new(reference).extension() {
            Some(ext) => self.path.join(format!("audio_source.{}", ext.to_string_lossy())),
            None => self.path.join("audio_source"),
        }
    }

    pub fn concat_list_path(&self) -> PathBuf {
        self.path.join("concat_list.txt")
    }

    pub fn concatenated_path(&self) -> PathBuf {
        self.path.join("concatenated.mp4")
    }

    pub fn muxed_path(&self) -> PathBuf {
        self.path.join("assembled.mp4")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let ws = Workspace::create("task-1", Some(root.path()), false).unwrap();
            assert!(ws.path().exists());
            std::fs::write(ws.clip_path(0), b"frames").unwrap();
            ws.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn retained_workspace_survives_drop() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let ws = Workspace::create("task-1", Some(root.path()), true).unwrap();
            ws.path().to_path_buf()
        };
        assert!(path.exists());
    }

    #[test]
    fn clip_names_sort_in_move_order() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::create("task-1", Some(root.path()), false).unwrap();
        let a = ws.clip_path(2);
        let b = ws.clip_path(10);
        assert!(a.file_name().unwrap() < b.file_name().unwrap());
    }

    #[test]
    fn hostile_task_id_stays_inside_workspace_root() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::create("../../etc", Some(root.path()), false).unwrap();
        assert!(ws.path().starts_with(root.path()));
    }

    #[test]
    fn audio_path_keeps_extension() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::create("task-1", Some(root.path()), false).unwrap();
        assert!(ws
            .audio_path("music/track.mp3")
            .to_string_lossy()
            .ends_with("audio_source.mp3"));
    }
}
