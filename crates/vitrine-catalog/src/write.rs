//! Catalog write path: stage, reconcile, write, then settle the files
//!
//! `save_listing` is the one entry point through which variant rows and
//! their image paths change. Order is the correctness property: uploads
//! are staged before any database write, the row writes happen inside a
//! single repository transaction, and the staged files are promoted or
//! discarded strictly after the outcome is known and before the caller
//! gets its result.

use std::collections::{BTreeMap, BTreeSet};

use vitrine_assets::{LogicalAssetPath, StagingStore};

use crate::coordinator::{AssetCoordinator, FinalizeReport};
use crate::error::Result;
use crate::reconcile::reconcile;
use crate::repository::{CatalogRepository, StorageError, VariantStore};
use crate::variant::{ProductId, VariantInput};

const DEFAULT_FINAL_SUBDIR: &str = "products";

/// One uploaded image, keyed by the color it belongs to.
#[derive(Debug, Clone)]
pub struct ColorUpload {
    pub color: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub original_filename: Option<String>,
}

/// What a completed save did, row- and file-wise.
#[derive(Debug)]
pub struct WriteSummary {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    pub assets: FinalizeReport,
}

/// The business operation driver for product add/edit.
pub struct CatalogWriter<'a, R: CatalogRepository> {
    repo: &'a R,
    store: &'a StagingStore,
    final_subdir: String,
}

impl<'a, R: CatalogRepository> CatalogWriter<'a, R> {
    pub fn new(repo: &'a R, store: &'a StagingStore) -> Self {
        Self {
            repo,
            store,
            final_subdir: DEFAULT_FINAL_SUBDIR.to_string(),
        }
    }

    /// Store promoted images under a different subdirectory of the root.
    pub fn with_final_subdir(mut self, subdir: impl Into<String>) -> Self {
        self.final_subdir = subdir.into();
        self
    }

    /// Save a product's variant listing: adds when the product has no
    /// persisted variants, edits otherwise.
    ///
    /// Any error before the transaction leaves the filesystem untouched
    /// apart from temp files, which the coordinator discards on its way
    /// out. A database error rolls the rows back and discards the staged
    /// files. Promotion failures after commit are reported in
    /// [`WriteSummary::assets`], not as an error.
    pub fn save_listing(
        &self,
        product: ProductId,
        incoming: &[VariantInput],
        uploads: &[ColorUpload],
        deleted_colors: &BTreeSet<String>,
    ) -> Result<WriteSummary> {
        let mut coordinator = AssetCoordinator::new(self.store);

        // Staging phase: outside the transaction. Built once, read-only
        // afterwards; a second upload for the same color supersedes the
        // first, which stays tracked and is discarded at the end.
        let mut staged_by_color = BTreeMap::new();
        for upload in uploads {
            let asset = self.store.stage(
                &upload.bytes,
                &upload.content_type,
                upload.original_filename.as_deref(),
                &upload.color,
                &self.final_subdir,
            )?;
            coordinator.track(&asset);
            if staged_by_color.insert(upload.color.clone(), asset).is_some() {
                log::warn!("duplicate upload for color {:?}, keeping the last", upload.color);
            }
        }

        let existing = self.repo.variants_for_product(product)?;
        let plan = reconcile(&existing, incoming, &staged_by_color, deleted_colors)?;
        log::info!(
            "product {product}: {} insert(s), {} update(s), {} delete(s), {} promotion(s)",
            plan.inserts.len(),
            plan.updates.len(),
            plan.deletes.len(),
            plan.promote.len()
        );
        coordinator.adopt(&plan);

        let cleared_colors: Vec<String> = deleted_colors.iter().cloned().collect();
        let (outcome, result) = self.repo.with_transaction(|tx| {
            if !plan.deletes.is_empty() {
                tx.delete_variants_by_ids(&plan.deletes)?;
            }
            if !cleared_colors.is_empty() {
                tx.clear_images_by_colors(product, &cleared_colors)?;
            }
            if !plan.updates.is_empty() {
                tx.update_variants(&plan.updates)?;
            }
            if !plan.inserts.is_empty() {
                tx.insert_variants(product, &plan.inserts)?;
            }
            Ok(())
        });

        // Deferred filesystem phase, strictly after the outcome is known.
        let assets = coordinator.finalize(outcome);
        result?;

        Ok(WriteSummary {
            inserted: plan.inserts.len(),
            updated: plan.updates.len(),
            deleted: plan.deletes.len(),
            assets,
        })
    }

    /// Replace a standalone image (the avatar pattern): write the new file
    /// first, run the record update, then delete the old file. If the
    /// update fails the new file is removed again.
    pub fn replace_standalone_image(
        &self,
        bytes: &[u8],
        content_type: &str,
        original_filename: Option<&str>,
        subdir: &str,
        old_path: Option<&LogicalAssetPath>,
        update_record: impl FnOnce(&LogicalAssetPath) -> std::result::Result<(), StorageError>,
    ) -> Result<LogicalAssetPath> {
        let (logical, physical) =
            self.store
                .save_direct(bytes, content_type, original_filename, subdir)?;

        if let Err(err) = update_record(&logical) {
            log::error!("record update failed, removing freshly written {logical}: {err}");
            if let Err(cleanup) = std::fs::remove_file(physical.as_path()) {
                log::error!("compensating delete failed for {physical}: {cleanup}");
            }
            return Err(err.into());
        }

        if let Some(old) = old_path {
            if let Err(err) = self.store.delete_final(old) {
                log::warn!("old image {old} could not be deleted: {err}");
            }
        }
        Ok(logical)
    }
}

#[cfg(test)]
mod tests {
    use vitrine_assets::AssetRoot;

    use super::*;
    use crate::repository::MemoryRepository;

    fn setup() -> (tempfile::TempDir, StagingStore, MemoryRepository) {
        let dir = tempfile::tempdir().unwrap();
        let root = AssetRoot::new(dir.path()).unwrap();
        let store = StagingStore::new(root).unwrap();
        (dir, store, MemoryRepository::new())
    }

    fn upload(color: &str) -> ColorUpload {
        ColorUpload {
            color: color.into(),
            bytes: b"img".to_vec(),
            content_type: "image/png".into(),
            original_filename: Some("a.png".into()),
        }
    }

    fn input(color: &str, size: &str) -> VariantInput {
        VariantInput {
            id: None,
            color: color.into(),
            size: size.into(),
            price_cents: 100,
            stock_quantity: 1,
        }
    }

    #[test]
    fn duplicate_color_upload_keeps_last_discards_first() {
        let (_dir, store, repo) = setup();
        let writer = CatalogWriter::new(&repo, &store);

        let summary = writer
            .save_listing(
                ProductId(1),
                &[input("red", "S")],
                &[upload("red"), upload("red")],
                &BTreeSet::new(),
            )
            .unwrap();

        // Two staged, one promoted, one discarded.
        assert_eq!(summary.assets.promoted, 1);
        assert_eq!(summary.assets.discarded, 1);
        assert_eq!(store.sweep_temp().unwrap(), 0);
    }

    #[test]
    fn staging_failure_aborts_before_any_db_write() {
        let (_dir, store, repo) = setup();
        let writer = CatalogWriter::new(&repo, &store);

        let bad = ColorUpload {
            color: "red".into(),
            bytes: vec![],
            content_type: "image/png".into(),
            original_filename: None,
        };
        let err = writer.save_listing(ProductId(1), &[input("red", "S")], &[bad], &BTreeSet::new());
        assert!(err.is_err());
        assert!(repo.variants_for_product(ProductId(1)).unwrap().is_empty());
    }

    #[test]
    fn validation_failure_discards_staged_uploads() {
        let (_dir, store, repo) = setup();
        let writer = CatalogWriter::new(&repo, &store);

        let mut bad = input("red", "S");
        bad.price_cents = -5;
        let err = writer.save_listing(ProductId(1), &[bad], &[upload("red")], &BTreeSet::new());
        assert!(err.is_err());
        // The staged file was cleaned up by the coordinator drop.
        assert_eq!(store.sweep_temp().unwrap(), 0);
        assert!(repo.variants_for_product(ProductId(1)).unwrap().is_empty());
    }

    #[test]
    fn replace_standalone_image_swaps_files() {
        let (_dir, store, repo) = setup();
        let writer = CatalogWriter::new(&repo, &store);

        let first = writer
            .replace_standalone_image(b"v1", "image/png", Some("a.png"), "avatars", None, |_| Ok(()))
            .unwrap();
        let second = writer
            .replace_standalone_image(
                b"v2",
                "image/png",
                Some("b.png"),
                "avatars",
                Some(&first),
                |_| Ok(()),
            )
            .unwrap();

        assert!(!store.root().physical(&first).unwrap().as_path().exists());
        assert!(store.root().physical(&second).unwrap().as_path().exists());
    }

    #[test]
    fn replace_standalone_image_compensates_on_db_failure() {
        let (_dir, store, repo) = setup();
        let writer = CatalogWriter::new(&repo, &store);

        let mut written: Option<LogicalAssetPath> = None;
        let err = writer.replace_standalone_image(
            b"v1",
            "image/png",
            None,
            "avatars",
            None,
            |path| {
                written = Some(path.clone());
                Err(StorageError::Backend("db down".into()))
            },
        );
        assert!(err.is_err());
        let path = written.unwrap();
        assert!(!store.root().physical(&path).unwrap().as_path().exists());
    }
}
