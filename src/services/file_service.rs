use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PathError {
    #[error("path contains a backslash")]
    Backslash,
    #[error("path is empty")]
    Empty,
    #[error("path contains '..'")]
    Traversal,
    #[error("path contains an empty segment")]
    DoubleSlash,
    #[error("path escapes the projects root")]
    OutsideRoot,
}

/// Normalize a client supplied path relative to the projects root.
///
/// Any backslash is rejected, so separators are always `/`. A single leading
/// `/` is stripped; the remainder must be non-empty and contain neither `..`
/// nor `//`.
pub fn normalize_path(raw: &str) -> Result<String, PathError> {
    if raw.contains('\\') {
        return Err(PathError::Backslash);
    }
    let normalized = raw.strip_prefix('/').unwrap_or(raw);
    if normalized.is_empty() {
        return Err(PathError::Empty);
    }
    if normalized.contains("..") {
        return Err(PathError::Traversal);
    }
    if normalized.contains("//") {
        return Err(PathError::DoubleSlash);
    }
    Ok(normalized.to_string())
}

/// First segment of a normalized path, which names the owning project.
pub fn project_of(normalized: &str) -> &str {
    normalized.split('/').next().unwrap_or(normalized)
}

/// A path that passed validation, relative to and resolved inside the root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedPath {
    relative: String,
    full: PathBuf,
}

impl ValidatedPath {
    pub fn relative(&self) -> &str {
        &self.relative
    }

    pub fn project(&self) -> &str {
        project_of(&self.relative)
    }

    pub fn full(&self) -> &Path {
        &self.full
    }
}

/// Whole-file access below the projects root.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open the store, creating the root directory when missing.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        std::fs::create_dir_all(root.as_ref())?;
        let root = std::fs::canonicalize(root.as_ref())?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate `raw` and resolve it against the root.
    ///
    /// `.` segments are dropped, so every spelling of a file yields the same
    /// `relative` key.
    pub async fn resolve(&self, raw: &str) -> Result<ValidatedPath, PathError> {
        let normalized = normalize_path(raw)?;
        let rel_path = Path::new(&normalized);
        if rel_path.is_absolute() {
            return Err(PathError::OutsideRoot);
        }
        let mut segments = Vec::new();
        for component in rel_path.components() {
            match component {
                Component::Normal(segment) => segments.push(segment.to_str().ok_or(PathError::OutsideRoot)?),
                Component::CurDir => {}
                _ => return Err(PathError::OutsideRoot),
            }
        }
        if segments.is_empty() {
            return Err(PathError::Empty);
        }
        let relative = segments.join("/");

        let full = self.root.join(&relative);
        // The deepest existing ancestor decides where symlinks really lead.
        for ancestor in full.ancestors() {
            if let Ok(real) = tokio::fs::canonicalize(ancestor).await {
                if !real.starts_with(&self.root) {
                    warn!("Path '{}' resolves outside the projects root", raw);
                    return Err(PathError::OutsideRoot);
                }
                break;
            }
        }

        Ok(ValidatedPath { relative, full })
    }

    pub async fn is_file(&self, path: &ValidatedPath) -> bool {
        tokio::fs::metadata(path.full())
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    pub async fn parent_exists(&self, path: &ValidatedPath) -> bool {
        match path.full().parent() {
            Some(parent) => tokio::fs::metadata(parent)
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false),
            None => false,
        }
    }

    pub async fn read(&self, path: &ValidatedPath) -> io::Result<String> {
        tokio::fs::read_to_string(path.full()).await
    }

    /// Replace the whole file. Readers see either the old or the new content.
    pub async fn write(&self, path: &ValidatedPath, content: &str) -> io::Result<()> {
        let full = path.full();
        let parent = full
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no parent"))?;
        let name = full
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
        let tmp = parent.join(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()));

        tokio::fs::write(&tmp, content).await?;
        if let Err(e) = tokio::fs::rename(&tmp, full).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        debug!("Wrote {} bytes to {}", content.len(), path.relative());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn rejects_unsafe_paths() {
        assert_eq!(normalize_path("../outside"), Err(PathError::Traversal));
        assert_eq!(normalize_path("/../../etc/passwd"), Err(PathError::Traversal));
        assert_eq!(normalize_path("\\windows\\path"), Err(PathError::Backslash));
        assert_eq!(normalize_path(""), Err(PathError::Empty));
        assert_eq!(normalize_path("/"), Err(PathError::Empty));
        assert_eq!(normalize_path("proj//a.txt"), Err(PathError::DoubleSlash));
    }

    #[test]
    fn accepts_and_normalizes_project_paths() {
        assert_eq!(normalize_path("project/sub/file.txt").unwrap(), "project/sub/file.txt");
        assert_eq!(normalize_path("/project/file.txt").unwrap(), "project/file.txt");
        assert_eq!(project_of("project/sub/file.txt"), "project");
        assert_eq!(project_of("project"), "project");
    }

    #[tokio::test]
    async fn resolve_keeps_paths_inside_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();

        for bad in ["../outside", "/../../etc/passwd", "\\windows\\path", "//double/slash"] {
            assert!(store.resolve(bad).await.is_err(), "{bad} should be rejected");
        }
        assert_eq!(store.resolve("//double/slash").await, Err(PathError::OutsideRoot));

        let ok = store.resolve("project/sub/file.txt").await.unwrap();
        assert_eq!(ok.relative(), "project/sub/file.txt");
        assert_eq!(ok.project(), "project");
        assert!(ok.full().starts_with(store.root()));
    }

    #[tokio::test]
    async fn dot_segments_collapse_to_one_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();

        let plain = store.resolve("proj/a.txt").await.unwrap();
        for spelling in ["proj/./a.txt", "./proj/a.txt", "/proj/./a.txt", "proj/a.txt/."] {
            let path = store.resolve(spelling).await.unwrap();
            assert_eq!(path.relative(), "proj/a.txt", "{spelling}");
            assert_eq!(path, plain);
        }
        assert_eq!(store.resolve("./.").await, Err(PathError::Empty));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn resolve_rejects_symlinks_out_of_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("escape")).unwrap();

        assert_eq!(store.resolve("escape/secret.txt").await, Err(PathError::OutsideRoot));
    }

    #[tokio::test]
    async fn write_then_read_round_trips_and_reports_existence() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        std::fs::create_dir_all(dir.path().join("proj")).unwrap();

        let path = store.resolve("proj/a.txt").await.unwrap();
        assert!(!store.is_file(&path).await);
        assert!(store.parent_exists(&path).await);

        store.write(&path, "hello").await.unwrap();
        assert!(store.is_file(&path).await);
        assert_eq!(store.read(&path).await.unwrap(), "hello");

        let orphan = store.resolve("missing/a.txt").await.unwrap();
        assert!(!store.parent_exists(&orphan).await);

        // No temp files left behind.
        let names: Vec<_> = std::fs::read_dir(dir.path().join("proj"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_writes_never_mix() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::new(dir.path()).unwrap());
        std::fs::create_dir_all(dir.path().join("proj")).unwrap();
        let path = store.resolve("proj/race.txt").await.unwrap();

        let first = "a".repeat(64 * 1024);
        let second = "b".repeat(1024);
        let (s1, s2) = (store.clone(), store.clone());
        let (p1, p2) = (path.clone(), path.clone());
        let (c1, c2) = (first.clone(), second.clone());
        let (r1, r2) = tokio::join!(
            tokio::spawn(async move { s1.write(&p1, &c1).await }),
            tokio::spawn(async move { s2.write(&p2, &c2).await }),
        );
        r1.unwrap().unwrap();
        r2.unwrap().unwrap();

        let stored = store.read(&path).await.unwrap();
        assert!(stored == first || stored == second);
    }
}
