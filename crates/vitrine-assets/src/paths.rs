//! Logical asset paths: the repository-relative form stored in variant rows
//!
//! A logical path looks like `/products/3fa1….jpg`. It is never a
//! filesystem path; conversion to a [`PhysicalPath`](crate::PhysicalPath)
//! only happens through [`AssetRoot`](crate::AssetRoot).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AssetError, Result};

/// Repository-relative image reference of the form `/<subdir>/<filename>`.
///
/// Stored verbatim in the database and used to derive the public URL.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalAssetPath(String);

impl LogicalAssetPath {
    /// Build a logical path from already-validated components.
    ///
    /// Callers outside this crate go through [`parse`](Self::parse) or
    /// receive paths from the staging store.
    pub(crate) fn from_parts(subdir: &str, filename: &str) -> Self {
        Self(format!("/{subdir}/{filename}"))
    }

    /// Parse a stored path string, rejecting anything that is not exactly
    /// `/<subdir>/<filename>` with plain single components.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let rest = trimmed
            .strip_prefix('/')
            .ok_or_else(|| AssetError::PathViolation(format!("not repository-relative: {raw:?}")))?;

        let mut parts = rest.split('/');
        let (subdir, filename) = match (parts.next(), parts.next(), parts.next()) {
            (Some(s), Some(f), None) => (s, f),
            _ => {
                return Err(AssetError::PathViolation(format!(
                    "expected /<subdir>/<filename>, got {raw:?}"
                )))
            }
        };

        for part in [subdir, filename] {
            if part.is_empty() || part == "." || part == ".." || part.contains('\\') {
                return Err(AssetError::PathViolation(format!(
                    "illegal path component {part:?} in {raw:?}"
                )));
            }
        }

        Ok(Self(format!("/{subdir}/{filename}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Subdirectory component, e.g. `products`.
    pub fn subdir(&self) -> &str {
        self.0[1..].split('/').next().unwrap_or("")
    }

    /// Filename component, e.g. `3fa1….jpg`.
    pub fn filename(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or("")
    }

    /// Public URL served by the image endpoint: `/api/image/<subdir>/<filename>`.
    pub fn public_url(&self) -> String {
        format!("/api/image/{}/{}", self.subdir(), self.filename())
    }
}

impl fmt::Display for LogicalAssetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// MIME type for a stored filename, by extension.
///
/// Returns `None` for extensions the catalog never stores.
pub fn media_type_for(filename: &str) -> Option<&'static str> {
    let ext = filename.rsplit('.').next()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}
