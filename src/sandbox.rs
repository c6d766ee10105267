//! Filesystem sandbox — confines every tool effect to one directory tree.
//!
//! All planner-supplied paths are treated as relative to the sandbox
//! root, whatever they look like (leading slashes are stripped, `..`
//! is resolved lexically before anything touches the disk). A path
//! that would land outside the root is rejected with
//! [`ToolError::SandboxEscape`] without any filesystem access.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::error::ToolError;

/// The sandbox root. Created once at startup, canonicalized, and
/// injected into the tool executor. Never changes during a run.
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// Creates the root directory if needed and canonicalizes it.
    ///
    /// Failure here is fatal to the process: without a root there is
    /// nowhere safe to execute anything.
    pub fn create(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("cannot create sandbox root {}", path.display()))?;
        let root = path
            .canonicalize()
            .with_context(|| format!("cannot canonicalize sandbox root {}", path.display()))?;
        debug!("Sandbox root: {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a planner-supplied path against the sandbox root.
    ///
    /// Normalization: whitespace trimmed, leading separators stripped
    /// (absolute paths are reinterpreted as sandbox-relative), `.` and
    /// `..` components resolved lexically. Any `..` that would pop past
    /// the root fails with `SandboxEscape` before the filesystem is
    /// touched. The deepest existing ancestor of the target is then
    /// canonicalized and the root-prefix invariant re-checked, so a
    /// symlink pointing outside the tree is rejected whether the target
    /// itself exists yet or not.
    pub fn resolve(&self, raw: &str) -> Result<PathBuf, ToolError> {
        let trimmed = raw.trim().trim_start_matches(['/', '\\']);

        let mut stack: Vec<&std::ffi::OsStr> = Vec::new();
        for component in Path::new(trimmed).components() {
            match component {
                Component::Normal(part) => stack.push(part),
                Component::ParentDir => {
                    if stack.pop().is_none() {
                        return Err(ToolError::SandboxEscape(raw.to_string()));
                    }
                }
                Component::CurDir => {}
                // Leading separators were stripped above; anything left
                // over is reinterpreted as relative.
                Component::RootDir | Component::Prefix(_) => {}
            }
        }

        let mut resolved = self.root.clone();
        resolved.extend(&stack);

        if resolved.exists() {
            let canonical = resolved.canonicalize()?;
            if !canonical.starts_with(&self.root) {
                return Err(ToolError::SandboxEscape(raw.to_string()));
            }
            return Ok(canonical);
        }

        // Target does not exist yet (e.g. a file about to be created).
        // Canonicalize the deepest existing ancestor and re-append the
        // missing components, so a symlinked directory on the way
        // cannot redirect the write outside the root. symlink_metadata
        // (not exists) so a dangling symlink counts as the ancestor and
        // fails canonicalization instead of being written through.
        let mut ancestor = resolved.as_path();
        let mut missing: Vec<&std::ffi::OsStr> = Vec::new();
        while ancestor.symlink_metadata().is_err() {
            match (ancestor.parent(), ancestor.file_name()) {
                (Some(parent), Some(name)) => {
                    missing.push(name);
                    ancestor = parent;
                }
                _ => break,
            }
        }
        let mut checked = ancestor.canonicalize()?;
        checked.extend(missing.iter().rev());
        if !checked.starts_with(&self.root) {
            return Err(ToolError::SandboxEscape(raw.to_string()));
        }
        Ok(checked)
    }

    /// Renders an absolute path inside the sandbox relative to the root
    /// (for user-facing listings). Paths outside the root are returned
    /// unchanged.
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox() -> (tempfile::TempDir, Sandbox) {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Sandbox::create(dir.path()).unwrap();
        (dir, sandbox)
    }

    #[test]
    fn test_resolve_plain_relative_path() {
        let (_dir, sb) = sandbox();
        let resolved = sb.resolve("notes/todo.txt").unwrap();
        assert_eq!(resolved, sb.root().join("notes/todo.txt"));
    }

    #[test]
    fn test_resolve_strips_leading_slash() {
        let (_dir, sb) = sandbox();
        let resolved = sb.resolve("/etc/passwd").unwrap();
        assert_eq!(resolved, sb.root().join("etc/passwd"));
    }

    #[test]
    fn test_resolve_trims_whitespace() {
        let (_dir, sb) = sandbox();
        let resolved = sb.resolve("  report.md \n").unwrap();
        assert_eq!(resolved, sb.root().join("report.md"));
    }

    #[test]
    fn test_resolve_rejects_parent_escape() {
        let (_dir, sb) = sandbox();
        let err = sb.resolve("../outside.txt").unwrap_err();
        assert!(matches!(err, ToolError::SandboxEscape(_)));
    }

    #[test]
    fn test_resolve_rejects_nested_escape() {
        let (_dir, sb) = sandbox();
        let err = sb.resolve("a/../../outside.txt").unwrap_err();
        assert!(matches!(err, ToolError::SandboxEscape(_)));
    }

    #[test]
    fn test_resolve_allows_internal_parent_dirs() {
        let (_dir, sb) = sandbox();
        let resolved = sb.resolve("a/b/../c.txt").unwrap();
        assert_eq!(resolved, sb.root().join("a/c.txt"));
    }

    #[test]
    fn test_resolve_collapses_cur_dir() {
        let (_dir, sb) = sandbox();
        let resolved = sb.resolve("./x/./y.txt").unwrap();
        assert_eq!(resolved, sb.root().join("x/y.txt"));
    }

    #[test]
    fn test_escape_does_not_touch_the_filesystem() {
        let (dir, sb) = sandbox();
        let sibling = dir.path().parent().unwrap().join("escape_probe.txt");
        assert!(sb.resolve("../escape_probe.txt").is_err());
        assert!(!sibling.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_rejects_symlink_escape() {
        let (_dir, sb) = sandbox();
        let outside = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), sb.root().join("link")).unwrap();
        let err = sb.resolve("link").unwrap_err();
        assert!(matches!(err, ToolError::SandboxEscape(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_rejects_new_file_under_symlinked_dir() {
        let (_dir, sb) = sandbox();
        let outside = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), sb.root().join("link")).unwrap();
        // The target does not exist yet; the symlinked ancestor must
        // still be caught before anything gets written through it.
        let err = sb.resolve("link/evil.txt").unwrap_err();
        assert!(matches!(err, ToolError::SandboxEscape(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_rejects_dangling_symlink_target() {
        let (_dir, sb) = sandbox();
        let outside = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path().join("out.txt"), sb.root().join("hole.txt"))
            .unwrap();
        assert!(sb.resolve("hole.txt").is_err());
    }

    #[test]
    fn test_relative_strips_root() {
        let (_dir, sb) = sandbox();
        let abs = sb.root().join("a/b.txt");
        assert_eq!(sb.relative(&abs), Path::new("a/b.txt"));
    }

    #[test]
    fn test_resolve_empty_path_is_the_root() {
        let (_dir, sb) = sandbox();
        assert_eq!(sb.resolve("").unwrap(), sb.root());
        assert_eq!(sb.resolve(".").unwrap(), sb.root());
    }
}
