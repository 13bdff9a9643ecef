use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use xxhash_rust::xxh3::xxh3_64;

/// A text buffer owned by one patch session.
///
/// Loaded fresh at session start and persisted at most once at session end.
/// The original text is kept so the session can tell whether anything changed
/// and skip the write when nothing did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    path: PathBuf,
    original: String,
    original_hash: u64,
    content: String,
}

impl Document {
    /// Read a UTF-8 document from disk.
    ///
    /// Non-UTF-8 content is reported as [`io::ErrorKind::InvalidData`].
    pub fn load(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let original = fs::read_to_string(&path)?;
        Ok(Self::from_text(path, original))
    }

    /// Build a document from text already in memory.
    pub fn from_text(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let original = text.into();
        Self {
            path: path.into(),
            original_hash: content_hash(&original),
            content: original.clone(),
            original,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_content(&mut self, content: String) {
        self.content = content;
    }

    pub fn original_hash(&self) -> u64 {
        self.original_hash
    }

    pub fn content_hash(&self) -> u64 {
        content_hash(&self.content)
    }

    pub fn is_modified(&self) -> bool {
        self.content != self.original
    }

    /// Write the current content back to the document's path.
    ///
    /// Returns `Ok(false)` without touching the file when the content is
    /// unchanged, so timestamps are left alone.
    pub fn persist(&self) -> io::Result<bool> {
        if !self.is_modified() {
            return Ok(false);
        }
        atomic_write(&self.path, self.content.as_bytes())?;
        Ok(true)
    }
}

/// xxh3-64 hash of a document's text.
pub fn content_hash(text: &str) -> u64 {
    xxh3_64(text.as_bytes())
}

/// Atomic file write: tempfile + fsync + rename.
///
/// The temp file lives next to the target so the rename stays on one
/// filesystem. The target's permissions are carried over when it exists.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let permissions = fs::metadata(path).ok().map(|meta| meta.permissions());

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    if let Some(permissions) = permissions {
        temp.as_file().set_permissions(permissions)?;
    }

    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
