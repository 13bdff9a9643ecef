use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directories under the workspace root that documents may never live in.
const FORBIDDEN_DIRS: &[&str] = &[".git", "node_modules", "target"];

/// Confines patch sessions to documents inside one workspace.
#[derive(Debug, Clone)]
pub struct WorkspaceGuard {
    /// Canonical workspace root
    root: PathBuf,
    /// Canonical forbidden directories that exist under the root
    forbidden: Vec<PathBuf>,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("document is outside workspace: {path} (workspace: {workspace})")]
    OutsideWorkspace { path: PathBuf, workspace: PathBuf },

    #[error("document is in forbidden directory: {path} (forbidden: {forbidden})")]
    ForbiddenPath { path: PathBuf, forbidden: PathBuf },

    #[error("failed to resolve {path}: {source}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WorkspaceGuard {
    /// Create a guard rooted at `root`. Symlinks in the root are resolved.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        let root = canonicalize(root.as_ref())?;
        let forbidden = FORBIDDEN_DIRS
            .iter()
            .filter_map(|dir| root.join(dir).canonicalize().ok())
            .collect();
        Ok(Self { root, forbidden })
    }

    /// Resolve a document identity against the workspace.
    ///
    /// Relative paths are joined to the root. Returns the canonical path when
    /// it lies inside the workspace and outside every forbidden directory.
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let canonical = canonicalize(&absolute)?;
        self.check(&canonical)?;
        Ok(canonical)
    }

    /// Re-check a resolved path right before writing to it.
    pub fn revalidate(&self, path: &Path) -> Result<PathBuf, SafetyError> {
        let canonical = canonicalize(path)?;
        self.check(&canonical)?;
        Ok(canonical)
    }

    fn check(&self, canonical: &Path) -> Result<(), SafetyError> {
        if !canonical.starts_with(&self.root) {
            return Err(SafetyError::OutsideWorkspace {
                path: canonical.to_path_buf(),
                workspace: self.root.clone(),
            });
        }
        if let Some(forbidden) = self.forbidden.iter().find(|dir| canonical.starts_with(dir)) {
            return Err(SafetyError::ForbiddenPath {
                path: canonical.to_path_buf(),
                forbidden: forbidden.clone(),
            });
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn canonicalize(path: &Path) -> Result<PathBuf, SafetyError> {
    path.canonicalize().map_err(|source| SafetyError::Resolve {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_resolve_inside_workspace() {
        let temp_dir = tempfile::tempdir().unwrap();
        let workspace = temp_dir.path();
        let file = workspace.join("src/components/Images.tsx");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, b"").unwrap();

        let guard = WorkspaceGuard::new(workspace).unwrap();
        assert!(guard.resolve(&file).is_ok());
        assert_eq!(
            guard.resolve("src/components/Images.tsx").unwrap(),
            file.canonicalize().unwrap()
        );
    }

    #[test]
    fn test_resolve_outside_workspace() {
        let temp_dir = tempfile::tempdir().unwrap();
        let workspace = temp_dir.path().join("workspace");
        fs::create_dir_all(&workspace).unwrap();
        let outside = temp_dir.path().join("outside.txt");
        fs::write(&outside, b"").unwrap();

        let guard = WorkspaceGuard::new(&workspace).unwrap();
        let result = guard.resolve(&outside);
        assert!(matches!(result, Err(SafetyError::OutsideWorkspace { .. })));

        let result = guard.resolve("../outside.txt");
        assert!(matches!(result, Err(SafetyError::OutsideWorkspace { .. })));
    }

    #[test]
    fn test_resolve_forbidden_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let workspace = temp_dir.path();
        let vendored = workspace.join("node_modules/react/index.js");
        fs::create_dir_all(vendored.parent().unwrap()).unwrap();
        fs::write(&vendored, b"").unwrap();

        let guard = WorkspaceGuard::new(workspace).unwrap();
        let result = guard.resolve(&vendored);
        assert!(matches!(result, Err(SafetyError::ForbiddenPath { .. })));
    }

    #[test]
    fn test_resolve_missing_document() {
        let temp_dir = tempfile::tempdir().unwrap();
        let guard = WorkspaceGuard::new(temp_dir.path()).unwrap();
        let result = guard.resolve("nope.txt");
        assert!(matches!(result, Err(SafetyError::Resolve { .. })));
    }

    #[test]
    #[cfg(unix)]
    fn test_resolve_symlink_escape() {
        use std::os::unix::fs::symlink;

        let temp_dir = tempfile::tempdir().unwrap();
        let workspace = temp_dir.path().join("workspace");
        fs::create_dir_all(&workspace).unwrap();
        let outside = temp_dir.path().join("outside.txt");
        fs::write(&outside, b"").unwrap();
        let link = workspace.join("escape.txt");
        symlink(&outside, &link).unwrap();

        let guard = WorkspaceGuard::new(&workspace).unwrap();
        let result = guard.resolve(&link);
        assert!(matches!(result, Err(SafetyError::OutsideWorkspace { .. })));
    }
}
