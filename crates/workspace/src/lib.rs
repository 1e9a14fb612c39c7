//! Containment-rooted file access.
//!
//! Every path a tool call names is normalized against a fixed project root
//! before any I/O happens; anything that escapes the root is rejected. This
//! is the sole defense against traversal payloads embedded in
//! model-generated arguments, so it runs first and unconditionally.
//!
//! Reads additionally reject oversized and binary files so the conversation
//! is never flooded with unusable bytes. Edits are exact-match,
//! exactly-once snippet replacements; anything ambiguous is refused rather
//! than guessed at.

use std::path::{Component, Path, PathBuf};
use tracing::debug;

use codewright_core::FileAccessError;

/// Default ceiling for file reads and writes: 5 MB.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 5_000_000;

/// How many leading bytes to inspect when sniffing for binary content.
const BINARY_PEEK_BYTES: usize = 1024;

/// A filesystem view rooted at one project directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    max_file_bytes: u64,
}

impl Workspace {
    /// Create a workspace rooted at `root`. The root itself is not
    /// required to exist yet; writes will create it.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }

    pub fn with_max_file_bytes(mut self, limit: u64) -> Self {
        self.max_file_bytes = limit;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Normalize `raw` against the root, lexically.
    ///
    /// Relative paths join the root. Absolute paths must already sit under
    /// the root. `..` pops, but popping past the root is an escape. `~` is
    /// rejected outright. No I/O is performed here, so a rejected path
    /// touches nothing.
    pub fn resolve(&self, raw: &str) -> Result<PathBuf, FileAccessError> {
        let outside = || FileAccessError::OutsideRoot { path: raw.into() };

        if raw.split(['/', '\\']).any(|part| part.starts_with('~')) {
            return Err(outside());
        }

        let candidate = Path::new(raw);
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        };

        let mut normalized = PathBuf::new();
        for component in joined.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    if !normalized.pop() {
                        return Err(outside());
                    }
                }
                other => normalized.push(other),
            }
        }

        if !normalized.starts_with(&self.root) {
            return Err(outside());
        }
        Ok(normalized)
    }

    /// Read a file's text content.
    ///
    /// The size ceiling is checked against metadata before any content is
    /// read, so an oversized file never yields partial content.
    pub async fn read(&self, raw: &str) -> Result<String, FileAccessError> {
        let path = self.resolve(raw)?;

        let meta = tokio::fs::metadata(&path).await.map_err(|e| map_io(raw, e))?;
        if meta.len() > self.max_file_bytes {
            return Err(FileAccessError::TooLarge {
                path: raw.into(),
                size: meta.len(),
                limit: self.max_file_bytes,
            });
        }

        let bytes = tokio::fs::read(&path).await.map_err(|e| map_io(raw, e))?;
        if looks_binary(&bytes) {
            return Err(FileAccessError::Binary { path: raw.into() });
        }

        String::from_utf8(bytes).map_err(|_| FileAccessError::Binary { path: raw.into() })
    }

    /// Create or overwrite a file, creating parent directories as needed.
    /// Returns the resolved path.
    pub async fn write(&self, raw: &str, content: &str) -> Result<PathBuf, FileAccessError> {
        let path = self.resolve(raw)?;

        if content.len() as u64 > self.max_file_bytes {
            return Err(FileAccessError::TooLarge {
                path: raw.into(),
                size: content.len() as u64,
                limit: self.max_file_bytes,
            });
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| map_io(raw, e))?;
        }
        tokio::fs::write(&path, content).await.map_err(|e| map_io(raw, e))?;
        debug!(path = %path.display(), bytes = content.len(), "Wrote file");
        Ok(path)
    }

    /// Replace `original_snippet` with `new_snippet`, requiring the snippet
    /// to occur exactly once. Zero or multiple matches leave the file
    /// byte-for-byte untouched.
    pub async fn edit(
        &self,
        raw: &str,
        original_snippet: &str,
        new_snippet: &str,
    ) -> Result<PathBuf, FileAccessError> {
        let content = self.read(raw).await?;

        let count = content.matches(original_snippet).count();
        if count == 0 {
            return Err(FileAccessError::SnippetNotFound { path: raw.into() });
        }
        if count > 1 {
            return Err(FileAccessError::AmbiguousSnippet { path: raw.into(), count });
        }

        let updated = content.replacen(original_snippet, new_snippet, 1);
        self.write(raw, &updated).await
    }
}

fn map_io(raw: &str, e: std::io::Error) -> FileAccessError {
    if e.kind() == std::io::ErrorKind::NotFound {
        FileAccessError::NotFound { path: raw.into() }
    } else {
        FileAccessError::Io { path: raw.into(), source: e }
    }
}

/// A NUL byte in the leading sample marks the file as binary.
fn looks_binary(bytes: &[u8]) -> bool {
    bytes.iter().take(BINARY_PEEK_BYTES).any(|&b| b == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ws() -> (tempfile::TempDir, Workspace) {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        (dir, ws)
    }

    #[test]
    fn resolve_relative_inside_root() {
        let (_dir, ws) = ws();
        let path = ws.resolve("src/main.py").unwrap();
        assert!(path.starts_with(ws.root()));
        assert!(path.ends_with("src/main.py"));
    }

    #[test]
    fn resolve_rejects_traversal() {
        let (_dir, ws) = ws();
        assert!(matches!(
            ws.resolve("../../../etc/passwd"),
            Err(FileAccessError::OutsideRoot { .. })
        ));
    }

    #[test]
    fn resolve_rejects_traversal_mid_path() {
        let (_dir, ws) = ws();
        // Pops back inside the root's parent
        let err = ws.resolve("src/../../outside.txt").unwrap_err();
        assert!(matches!(err, FileAccessError::OutsideRoot { .. }));
    }

    #[test]
    fn resolve_allows_benign_dotdot() {
        let (_dir, ws) = ws();
        // Pops within the root are fine
        let path = ws.resolve("src/../lib/util.py").unwrap();
        assert!(path.ends_with("lib/util.py"));
    }

    #[test]
    fn resolve_rejects_absolute_outside_root() {
        let (_dir, ws) = ws();
        assert!(matches!(
            ws.resolve("/etc/passwd"),
            Err(FileAccessError::OutsideRoot { .. })
        ));
    }

    #[test]
    fn resolve_accepts_absolute_inside_root() {
        let (_dir, ws) = ws();
        let inside = ws.root().join("a.txt");
        assert!(ws.resolve(inside.to_str().unwrap()).is_ok());
    }

    #[test]
    fn resolve_rejects_home_reference() {
        let (_dir, ws) = ws();
        assert!(ws.resolve("~/secrets.txt").is_err());
        assert!(ws.resolve("sub/~backup/file").is_err());
    }

    #[tokio::test]
    async fn write_then_read_roundtrip() {
        let (_dir, ws) = ws();
        ws.write("src/app.py", "print('hi')\n").await.unwrap();
        let content = ws.read("src/app.py").await.unwrap();
        assert_eq!(content, "print('hi')\n");
    }

    #[tokio::test]
    async fn write_creates_parent_directories() {
        let (_dir, ws) = ws();
        let path = ws.write("a/b/c/deep.txt", "x").await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn read_missing_file_is_not_found() {
        let (_dir, ws) = ws();
        assert!(matches!(
            ws.read("nope.txt").await,
            Err(FileAccessError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn oversized_read_returns_no_content() {
        let (_dir, ws) = ws();
        ws.write("big.txt", &"x".repeat(100)).await.unwrap();
        let ws = Workspace::new(ws.root()).with_max_file_bytes(10);
        assert!(matches!(
            ws.read("big.txt").await,
            Err(FileAccessError::TooLarge { size: 100, limit: 10, .. })
        ));
    }

    #[tokio::test]
    async fn binary_file_rejected() {
        let (_dir, ws) = ws();
        let path = ws.root().join("blob.bin");
        std::fs::write(&path, b"\x00\x01\x02binary").unwrap();
        assert!(matches!(
            ws.read("blob.bin").await,
            Err(FileAccessError::Binary { .. })
        ));
    }

    #[tokio::test]
    async fn edit_replaces_exactly_once() {
        let (_dir, ws) = ws();
        ws.write("app.py", "x = 1\ny = 2\n").await.unwrap();
        ws.edit("app.py", "x = 1", "x = 10").await.unwrap();
        assert_eq!(ws.read("app.py").await.unwrap(), "x = 10\ny = 2\n");
    }

    #[tokio::test]
    async fn edit_zero_matches_leaves_file_untouched() {
        let (_dir, ws) = ws();
        ws.write("app.py", "x = 1\n").await.unwrap();
        let err = ws.edit("app.py", "z = 9", "z = 0").await.unwrap_err();
        assert!(matches!(err, FileAccessError::SnippetNotFound { .. }));
        assert_eq!(ws.read("app.py").await.unwrap(), "x = 1\n");
    }

    #[tokio::test]
    async fn edit_ambiguous_matches_leaves_file_untouched() {
        let (_dir, ws) = ws();
        ws.write("app.py", "pass\npass\n").await.unwrap();
        let err = ws.edit("app.py", "pass", "return").await.unwrap_err();
        assert!(matches!(err, FileAccessError::AmbiguousSnippet { count: 2, .. }));
        assert_eq!(ws.read("app.py").await.unwrap(), "pass\npass\n");
    }

    #[tokio::test]
    async fn outside_root_write_performs_no_io() {
        let (_dir, ws) = ws();
        assert!(ws.write("../escape.txt", "x").await.is_err());
        assert!(!ws.root().parent().unwrap().join("escape.txt").exists());
    }
}
