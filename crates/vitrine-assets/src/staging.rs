//! Staging store: upload → temp file → deferred promote or discard
//!
//! `stage` runs outside any database transaction. The resulting
//! [`StagedAsset`] carries both the temp location and the final logical
//! path it will occupy if the owning transaction commits; the caller
//! promotes or discards it once the outcome is known.

use std::fs;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{AssetError, Result};
use crate::paths::LogicalAssetPath;
use crate::sandbox::{AssetRoot, PhysicalPath};

const TEMP_SUBDIR: &str = "temp";
const SUPPORTED_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];
const KNOWN_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// An uploaded file parked in the temp area, not yet part of the catalog.
///
/// Immutable once created; owned by the staging flow until it is promoted
/// or discarded, exactly once.
#[derive(Debug, Clone)]
pub struct StagedAsset {
    /// Logical key the asset was uploaded for (a color, scoped to a product).
    pub key: String,
    /// Where the bytes currently live.
    pub temp_path: PhysicalPath,
    /// Where they will live after promotion; this is the value written to
    /// the variant row.
    pub final_path: LogicalAssetPath,
    pub staged_at: DateTime<Utc>,
}

/// Filesystem half of the catalog write path.
pub struct StagingStore {
    root: AssetRoot,
    temp_dir: PhysicalPath,
}

impl StagingStore {
    /// Open a store over `root`, creating the temp area.
    pub fn new(root: AssetRoot) -> Result<Self> {
        let temp_dir = root.subdir(TEMP_SUBDIR)?;
        root.ensure_dir(&temp_dir)?;
        Ok(Self { root, temp_dir })
    }

    pub fn root(&self) -> &AssetRoot {
        &self.root
    }

    /// Write an upload to the temp area and compute its final location.
    ///
    /// The original filename is only consulted for extension sniffing; the
    /// stored name is a fresh UUID, so concurrent uploads cannot collide
    /// and client-supplied names never reach the filesystem.
    pub fn stage(
        &self,
        bytes: &[u8],
        content_type: &str,
        original_filename: Option<&str>,
        key: &str,
        final_subdir: &str,
    ) -> Result<StagedAsset> {
        check_upload(bytes, content_type)?;

        // Validate + pre-create the destination before touching the temp
        // area, so a bad subdir fails with no file written.
        let final_dir = self.root.subdir(final_subdir)?;
        self.root.ensure_dir(&final_dir)?;

        let extension = extension_for(original_filename);
        let final_filename = format!("{}{extension}", Uuid::new_v4());
        // Resolves cleanly by construction; keeps the prefix re-check on.
        self.root.resolve(final_subdir, &final_filename)?;
        let final_path = LogicalAssetPath::from_parts(final_subdir, &final_filename);

        let temp_name = format!("temp_{}.tmp", Uuid::new_v4());
        let temp_path = self.root.resolve(TEMP_SUBDIR, &temp_name)?;

        if let Err(err) = fs::write(&temp_path, bytes) {
            // Do not leave a partial file behind.
            let _ = fs::remove_file(&temp_path);
            log::error!("staging write failed for key {key:?}: {err}");
            return Err(err.into());
        }

        log::info!(
            "staged {} byte(s) for key {key:?}: {temp_path} -> {final_path}",
            bytes.len()
        );
        Ok(StagedAsset {
            key: key.to_string(),
            temp_path,
            final_path,
            staged_at: Utc::now(),
        })
    }

    /// Remove a staged temp file. Missing file is not an error; a path
    /// outside the temp area is refused (logged) rather than deleted, in
    /// case a caller hands back a forged or already-promoted path.
    pub fn discard(&self, asset: &StagedAsset) {
        let path = asset.temp_path.as_path();
        if !path.starts_with(self.temp_dir.as_path()) {
            log::warn!("refusing to discard {} (outside temp area)", asset.temp_path);
            return;
        }
        match fs::remove_file(path) {
            Ok(()) => log::info!("discarded staged file {}", asset.temp_path),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("staged file already gone: {}", asset.temp_path);
            }
            Err(err) => log::error!("failed to discard {}: {err}", asset.temp_path),
        }
    }

    /// Move a staged file to its final location. Called only after the
    /// owning transaction committed.
    ///
    /// The temp file is removed even when the move fails; a failed move
    /// must not leave a temp artifact behind.
    pub fn promote(&self, asset: &StagedAsset) -> Result<()> {
        if !asset.temp_path.as_path().exists() {
            log::warn!(
                "temp file missing at promote time (already moved or swept?): {}",
                asset.temp_path
            );
            return Ok(());
        }

        let destination = self.root.physical(&asset.final_path)?;
        if let Some(parent) = destination.as_path().parent() {
            fs::create_dir_all(parent)?;
        }

        let moved = rename_or_copy(&asset.temp_path, &destination);
        if asset.temp_path.as_path().exists() {
            if let Err(err) = fs::remove_file(&asset.temp_path) {
                log::warn!("could not remove temp file {}: {err}", asset.temp_path);
            }
        }

        match moved {
            Ok(()) => {
                log::info!("promoted {} -> {destination}", asset.final_path);
                Ok(())
            }
            Err(err) => {
                log::error!("promotion failed: {} -> {destination}: {err}", asset.temp_path);
                Err(err.into())
            }
        }
    }

    /// Delete a file from the final store. Returns whether a file was
    /// actually removed; deleting an absent file is success.
    pub fn delete_final(&self, path: &LogicalAssetPath) -> Result<bool> {
        let physical = self.root.physical(path)?;
        match fs::remove_file(&physical) {
            Ok(()) => {
                log::info!("deleted final file {physical}");
                Ok(true)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("final file already absent: {physical}");
                Ok(false)
            }
            Err(err) => {
                log::error!("failed to delete final file {physical}: {err}");
                Err(err.into())
            }
        }
    }

    /// Immediate-write variant used for standalone images (no transaction):
    /// the file lands directly in its final location and the caller issues a
    /// compensating delete if the record update fails.
    pub fn save_direct(
        &self,
        bytes: &[u8],
        content_type: &str,
        original_filename: Option<&str>,
        subdir: &str,
    ) -> Result<(LogicalAssetPath, PhysicalPath)> {
        check_upload(bytes, content_type)?;

        let dir = self.root.subdir(subdir)?;
        self.root.ensure_dir(&dir)?;

        let filename = format!("{}{}", Uuid::new_v4(), extension_for(original_filename));
        let physical = self.root.resolve(subdir, &filename)?;
        if let Err(err) = fs::write(&physical, bytes) {
            let _ = fs::remove_file(&physical);
            return Err(err.into());
        }

        log::info!("saved {} byte(s) directly to {physical}", bytes.len());
        Ok((LogicalAssetPath::from_parts(subdir, &filename), physical))
    }

    /// Names of the `temp_*.tmp` files currently parked in the temp area.
    pub fn stale_temp_files(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.temp_dir.as_path())? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with("temp_") && name.ends_with(".tmp") && entry.path().is_file() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Remove stale `temp_*.tmp` files left behind by crashed operations.
    /// Only safe while no operation is mid-flight.
    pub fn sweep_temp(&self) -> Result<usize> {
        let mut removed = 0;
        for name in self.stale_temp_files()? {
            log::info!("sweeping stale temp file {name}");
            fs::remove_file(self.temp_dir.as_path().join(&name))?;
            removed += 1;
        }
        Ok(removed)
    }
}

fn check_upload(bytes: &[u8], content_type: &str) -> Result<()> {
    if bytes.is_empty() {
        return Err(AssetError::InvalidAsset("empty upload".into()));
    }
    let normalized = content_type.trim().to_ascii_lowercase();
    if !SUPPORTED_TYPES.contains(&normalized.as_str()) {
        return Err(AssetError::InvalidAsset(format!(
            "unsupported content type {content_type:?} (want JPEG, PNG or WebP)"
        )));
    }
    Ok(())
}

/// Extension for the stored filename, sniffed from the client filename's
/// suffix when recognized. Defaults to `.jpg`; the client name is never
/// used for path construction.
fn extension_for(original_filename: Option<&str>) -> String {
    if let Some(name) = original_filename {
        if let Some((_, ext)) = name.rsplit_once('.') {
            let ext = ext.to_ascii_lowercase();
            if KNOWN_EXTENSIONS.contains(&ext.as_str()) {
                return format!(".{ext}");
            }
        }
    }
    log::debug!("no recognized extension on {original_filename:?}, defaulting to .jpg");
    ".jpg".to_string()
}

/// `fs::rename`, falling back to copy + delete when the temp and final
/// areas sit on different filesystems.
fn rename_or_copy(from: &PhysicalPath, to: &PhysicalPath) -> std::io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::CrossesDevices => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        Err(err) => Err(err),
    }
}
