//! Path sandbox: every physical path stays under the configured root
//!
//! Inputs are validated component-by-component before joining, and the
//! joined result is normalized and prefix-checked again so an encoded
//! traversal cannot slip through either step.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{AssetError, Result};
use crate::paths::LogicalAssetPath;

/// Absolute on-disk path proven to live under an [`AssetRoot`].
///
/// Only this crate can construct one, so holding a `PhysicalPath` is the
/// proof that the sandbox check already ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalPath(PathBuf);

impl PhysicalPath {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl AsRef<Path> for PhysicalPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl std::fmt::Display for PhysicalPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Root directory for all stored assets.
pub struct AssetRoot {
    root: PathBuf,
}

impl AssetRoot {
    /// Open (creating if needed) the upload root. The root is canonicalized
    /// so later prefix checks are not fooled by `.`/symlinked spellings of
    /// the root itself.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let root = fs::canonicalize(&root)?;
        log::info!("asset root: {}", root.display());
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Resolve `<root>/<subdir>/<filename>`, rejecting traversal in either
    /// component and re-checking the normalized result.
    pub fn resolve(&self, subdir: &str, filename: &str) -> Result<PhysicalPath> {
        check_component(subdir)?;
        check_component(filename)?;
        let joined = self.root.join(subdir).join(filename);
        self.confine(joined)
    }

    /// Resolve a subdirectory of the root (no filename).
    pub fn subdir(&self, subdir: &str) -> Result<PhysicalPath> {
        check_component(subdir)?;
        self.confine(self.root.join(subdir))
    }

    /// The one logical → physical conversion.
    pub fn physical(&self, logical: &LogicalAssetPath) -> Result<PhysicalPath> {
        self.resolve(logical.subdir(), logical.filename())
    }

    /// Idempotently create a directory and its ancestors.
    pub fn ensure_dir(&self, dir: &PhysicalPath) -> Result<()> {
        fs::create_dir_all(dir.as_path())?;
        Ok(())
    }

    pub fn contains(&self, path: &Path) -> bool {
        normalize(path).is_ok_and(|p| p.starts_with(&self.root))
    }

    /// Normalize and verify the candidate is still under the root.
    fn confine(&self, candidate: PathBuf) -> Result<PhysicalPath> {
        let normalized = normalize(&candidate)?;
        if !normalized.starts_with(&self.root) {
            return Err(AssetError::PathViolation(format!(
                "{} escapes asset root {}",
                normalized.display(),
                self.root.display()
            )));
        }
        Ok(PhysicalPath::new(normalized))
    }
}

/// Reject empty, dot, traversal, and absolute-looking components before any
/// path arithmetic happens.
fn check_component(part: &str) -> Result<()> {
    if part.trim().is_empty() {
        return Err(AssetError::PathViolation("empty path component".into()));
    }
    if part == "." || part == ".." || part.contains("..") {
        return Err(AssetError::PathViolation(format!(
            "traversal segment in component {part:?}"
        )));
    }
    if part.starts_with('/') || part.starts_with('\\') || part.contains(':') {
        return Err(AssetError::PathViolation(format!(
            "absolute-looking component {part:?}"
        )));
    }
    if part.contains('/') || part.contains('\\') {
        return Err(AssetError::PathViolation(format!(
            "separator inside component {part:?}"
        )));
    }
    Ok(())
}

/// Lexical normalization: drop `.`, refuse `..`. Cannot use
/// `fs::canonicalize` because the target may not exist yet.
fn normalize(path: &Path) -> Result<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(AssetError::PathViolation(format!(
                    "parent segment in {}",
                    path.display()
                )))
            }
            other => out.push(other),
        }
    }
    Ok(out)
}
