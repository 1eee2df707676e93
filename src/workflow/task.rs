//! Units of work and where they come from.

use std::fmt;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::core::{WorkflowError, WorkflowResult};

/// One document to classify.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Task {
    target: String,
}

impl Task {
    /// Create a task for the given target.
    pub fn new(target: impl Into<String>) -> Self {
        Self { target: target.into() }
    }

    /// The file path or identifier this task operates on.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The target as a filesystem path.
    pub fn path(&self) -> &Path {
        Path::new(&self.target)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.target)
    }
}

/// Verdict returned for one task.
///
/// The verdict is kept verbatim; interpreting it is the aggregator's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Target the verdict applies to.
    pub target: String,
    /// Raw verdict, expected to be "Yes" or "No".
    pub verdict: String,
}

impl TaskResult {
    /// Create a result for `target`.
    pub fn new(target: impl Into<String>, verdict: impl Into<String>) -> Self {
        Self { target: target.into(), verdict: verdict.into() }
    }
}

/// Enumerates the tasks of a run.
pub trait TaskSource: Send + Sync {
    /// List every task found at `location`.
    fn enumerate(&self, location: &Path) -> WorkflowResult<Vec<Task>>;
}

/// Lists the regular files directly inside a directory.
///
/// Subdirectories are skipped, symlinks to files are included. Results are
/// sorted by file name.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectorySource;

impl TaskSource for DirectorySource {
    fn enumerate(&self, location: &Path) -> WorkflowResult<Vec<Task>> {
        let enumeration_error =
            |source: io::Error| WorkflowError::Enumeration { path: location.to_path_buf(), source };

        let metadata = std::fs::metadata(location).map_err(enumeration_error)?;
        if !metadata.is_dir() {
            return Err(enumeration_error(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a directory",
            )));
        }

        let mut tasks = Vec::new();
        for entry in WalkDir::new(location)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() > 0 && is_not_found(&e) => {
                    tracing::warn!(path = ?e.path(), "Skipping dangling link");
                    continue;
                }
                Err(e) => return Err(enumeration_error(io::Error::from(e))),
            };
            if !entry.file_type().is_file() {
                continue;
            }

            // Targets travel as strings, so a lossy name would point at a missing file.
            let Some(target) = entry.path().to_str() else {
                return Err(enumeration_error(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("file name is not valid UTF-8: {}", entry.path().display()),
                )));
            };
            tasks.push(Task::new(target));
        }

        tracing::debug!(location = %location.display(), count = tasks.len(), "Enumerated tasks");
        Ok(tasks)
    }
}

fn is_not_found(error: &walkdir::Error) -> bool {
    error.io_error().is_some_and(|e| e.kind() == io::ErrorKind::NotFound)
}

/// A fixed list of tasks, ignoring the location.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    tasks: Vec<Task>,
}

impl StaticSource {
    /// Create a source that always yields `targets`.
    pub fn new<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { tasks: targets.into_iter().map(Task::new).collect() }
    }
}

impl TaskSource for StaticSource {
    fn enumerate(&self, _location: &Path) -> WorkflowResult<Vec<Task>> {
        Ok(self.tasks.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn target_in(dir: &Path, file_name: &str) -> String {
        dir.join(file_name).display().to_string()
    }

    #[test]
    fn test_lists_only_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.pdf"), b"%PDF-b").unwrap();
        fs::write(dir.path().join("a.pdf"), b"%PDF-a").unwrap();
        fs::create_dir(dir.path().join("archive")).unwrap();
        fs::write(dir.path().join("archive").join("old.pdf"), b"%PDF-old").unwrap();

        let tasks = DirectorySource.enumerate(dir.path()).unwrap();

        let targets: Vec<&str> = tasks.iter().map(Task::target).collect();
        assert_eq!(
            targets,
            vec![target_in(dir.path(), "a.pdf"), target_in(dir.path(), "b.pdf")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_link_is_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.pdf"), b"%PDF-a").unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone.pdf"), dir.path().join("link.pdf")).unwrap();

        let tasks = DirectorySource.enumerate(dir.path()).unwrap();

        assert_eq!(tasks, vec![Task::new(target_in(dir.path(), "a.pdf"))]);
    }

    #[cfg(unix)]
    #[test]
    fn test_link_to_file_is_listed() {
        let dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("shared.pdf"), b"%PDF").unwrap();
        std::os::unix::fs::symlink(outside.path().join("shared.pdf"), dir.path().join("shared.pdf"))
            .unwrap();

        let tasks = DirectorySource.enumerate(dir.path()).unwrap();

        assert_eq!(tasks, vec![Task::new(target_in(dir.path(), "shared.pdf"))]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_file_name_is_rejected() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(OsStr::from_bytes(b"permit-\xff.pdf")), b"%PDF").unwrap();

        let err = DirectorySource.enumerate(dir.path()).unwrap_err();

        assert!(matches!(err, WorkflowError::Enumeration { ref source, .. }
            if source.kind() == io::ErrorKind::InvalidData));
        assert!(err.to_string().contains("not valid UTF-8"));
    }

    #[test]
    fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        assert!(DirectorySource.enumerate(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");

        let err = DirectorySource.enumerate(&missing).unwrap_err();
        assert!(matches!(err, WorkflowError::Enumeration { ref path, .. } if *path == missing));
    }

    #[test]
    fn test_file_location_fails() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("single.pdf");
        fs::write(&file, b"%PDF").unwrap();

        assert!(matches!(
            DirectorySource.enumerate(&file),
            Err(WorkflowError::Enumeration { .. })
        ));
    }

    #[test]
    fn test_static_source() {
        let source = StaticSource::new(["x", "y"]);
        let tasks = source.enumerate(Path::new("ignored")).unwrap();
        assert_eq!(tasks, vec![Task::new("x"), Task::new("y")]);
    }

    #[test]
    fn test_task_display_and_path() {
        let task = Task::new("data/permits.pdf");
        assert_eq!(task.to_string(), "data/permits.pdf");
        assert_eq!(task.path(), Path::new("data/permits.pdf"));
    }
}
