//! End-to-end coverage of the catalog write path against a real
//! filesystem and the in-memory repository.

use std::collections::BTreeSet;
use std::path::Path;

use vitrine_assets::{AssetRoot, StagingStore};
use vitrine_catalog::{
    CatalogRepository, CatalogWriter, ColorUpload, MemoryRepository, ProductId, Variant,
    VariantInput,
};

fn setup() -> (tempfile::TempDir, StagingStore, MemoryRepository) {
    let dir = tempfile::tempdir().unwrap();
    let root = AssetRoot::new(dir.path()).unwrap();
    let store = StagingStore::new(root).unwrap();
    (dir, store, MemoryRepository::new())
}

fn upload(color: &str) -> ColorUpload {
    ColorUpload {
        color: color.into(),
        bytes: format!("bytes-{color}").into_bytes(),
        content_type: "image/jpeg".into(),
        original_filename: Some(format!("{color}.jpg")),
    }
}

fn input(color: &str, size: &str) -> VariantInput {
    VariantInput {
        id: None,
        color: color.into(),
        size: size.into(),
        price_cents: 1999,
        stock_quantity: 3,
    }
}

fn file_count(dir: &Path) -> usize {
    let mut count = 0;
    for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            count += file_count(&path);
        } else {
            count += 1;
        }
    }
    count
}

#[test]
fn shared_color_upload_lands_on_every_variant_of_that_color() {
    let (dir, store, repo) = setup();
    let writer = CatalogWriter::new(&repo, &store);

    let summary = writer
        .save_listing(
            ProductId(1),
            &[input("red", "S"), input("red", "M"), input("blue", "S")],
            &[upload("red")],
            &BTreeSet::new(),
        )
        .unwrap();

    assert_eq!(summary.inserted, 3);
    assert_eq!(summary.assets.promoted, 1);
    assert!(summary.assets.failed_promotions.is_empty());

    let rows = repo.variants_for_product(ProductId(1)).unwrap();
    let red_images: Vec<_> = rows
        .iter()
        .filter(|v| v.color == "red")
        .map(|v| v.image.clone().unwrap())
        .collect();
    assert_eq!(red_images.len(), 2);
    // One file, both rows point at it.
    assert_eq!(red_images[0], red_images[1]);
    assert!(rows.iter().find(|v| v.color == "blue").unwrap().image.is_none());

    // Exactly one promoted file on disk, nothing lingering in temp.
    assert_eq!(file_count(dir.path()), 1);
    assert_eq!(store.sweep_temp().unwrap(), 0);
}

#[test]
fn deleted_color_wins_over_fresh_upload() {
    let (dir, store, repo) = setup();
    let writer = CatalogWriter::new(&repo, &store);

    let deleted: BTreeSet<String> = ["red".to_string()].into();
    let summary = writer
        .save_listing(ProductId(1), &[input("red", "S")], &[upload("red")], &deleted)
        .unwrap();

    // The upload was staged, then discarded rather than promoted.
    assert_eq!(summary.assets.promoted, 0);
    assert_eq!(summary.assets.discarded, 1);

    let rows = repo.variants_for_product(ProductId(1)).unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].image.is_none());
    assert_eq!(file_count(dir.path()), 0);
}

#[test]
fn db_failure_after_staging_leaves_no_rows_and_no_files() {
    let (dir, store, repo) = setup();
    let writer = CatalogWriter::new(&repo, &store);
    repo.fail_next_write();

    let result = writer.save_listing(
        ProductId(1),
        &[input("red", "S"), input("blue", "M")],
        &[upload("red"), upload("blue")],
        &BTreeSet::new(),
    );

    assert!(result.is_err());
    assert!(repo.variants_for_product(ProductId(1)).unwrap().is_empty());
    // Both staged files discarded on rollback.
    assert_eq!(file_count(dir.path()), 0);
}

#[test]
fn removing_a_color_deletes_its_rows_and_its_file() {
    let (dir, store, repo) = setup();
    let writer = CatalogWriter::new(&repo, &store);

    // First save: red (with image) and blue.
    writer
        .save_listing(
            ProductId(1),
            &[input("red", "S"), input("red", "M"), input("blue", "S")],
            &[upload("red")],
            &BTreeSet::new(),
        )
        .unwrap();
    assert_eq!(file_count(dir.path()), 1);

    // Second save: red is gone, its two rows are not resubmitted.
    let rows = repo.variants_for_product(ProductId(1)).unwrap();
    let blue = rows.iter().find(|v| v.color == "blue").unwrap();
    let keep = VariantInput {
        id: blue.id,
        color: blue.color.clone(),
        size: blue.size.clone(),
        price_cents: blue.price_cents,
        stock_quantity: blue.stock_quantity,
    };
    let deleted: BTreeSet<String> = ["red".to_string()].into();
    let summary = writer
        .save_listing(ProductId(1), &[keep], &[], &deleted)
        .unwrap();

    assert_eq!(summary.deleted, 2);
    assert_eq!(summary.updated, 1);
    // The shared red file was deleted exactly once.
    assert_eq!(summary.assets.deleted, 1);

    let rows = repo.variants_for_product(ProductId(1)).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].color, "blue");
    assert_eq!(file_count(dir.path()), 0);
}

#[test]
fn replacing_a_color_image_swaps_the_file() {
    let (dir, store, repo) = setup();
    let writer = CatalogWriter::new(&repo, &store);

    writer
        .save_listing(ProductId(1), &[input("red", "S")], &[upload("red")], &BTreeSet::new())
        .unwrap();
    let rows = repo.variants_for_product(ProductId(1)).unwrap();
    let old_image = rows[0].image.clone().unwrap();

    // Resubmit the row with a new upload for the same color.
    let resubmit = VariantInput {
        id: rows[0].id,
        color: "red".into(),
        size: "S".into(),
        price_cents: 2499,
        stock_quantity: 1,
    };
    let summary = writer
        .save_listing(ProductId(1), &[resubmit], &[upload("red")], &BTreeSet::new())
        .unwrap();

    assert_eq!(summary.updated, 1);
    assert_eq!(summary.assets.promoted, 1);

    let rows = repo.variants_for_product(ProductId(1)).unwrap();
    let new_image = rows[0].image.clone().unwrap();
    assert_ne!(new_image, old_image);
    assert_eq!(rows[0].price_cents, 2499);

    // Old file gone, new file present, one file total.
    assert!(!store.root().physical(&old_image).unwrap().as_path().exists());
    assert!(store.root().physical(&new_image).unwrap().as_path().exists());
    assert_eq!(file_count(dir.path()), 1);
}

#[test]
fn edit_without_uploads_keeps_persisted_images() {
    let (_dir, store, repo) = setup();
    let writer = CatalogWriter::new(&repo, &store);

    writer
        .save_listing(ProductId(1), &[input("red", "S")], &[upload("red")], &BTreeSet::new())
        .unwrap();
    let rows = repo.variants_for_product(ProductId(1)).unwrap();
    let image = rows[0].image.clone().unwrap();

    // Resubmit without a new upload, adding a second red size.
    let resubmit = VariantInput {
        id: rows[0].id,
        color: "red".into(),
        size: "S".into(),
        price_cents: rows[0].price_cents,
        stock_quantity: rows[0].stock_quantity,
    };
    writer
        .save_listing(
            ProductId(1),
            &[resubmit, input("red", "L")],
            &[],
            &BTreeSet::new(),
        )
        .unwrap();

    let rows = repo.variants_for_product(ProductId(1)).unwrap();
    assert_eq!(rows.len(), 2);
    // The resubmitted row keeps its image; the brand-new size starts
    // imageless since nothing was uploaded for it.
    let kept = rows.iter().find(|v| v.size == "S").unwrap();
    assert_eq!(kept.image.as_ref(), Some(&image));
    let added = rows.iter().find(|v| v.size == "L").unwrap();
    assert!(added.image.is_none());
}

#[test]
fn stale_client_id_becomes_an_insert() {
    let (_dir, store, repo) = setup();
    let writer = CatalogWriter::new(&repo, &store);

    let mut stale = input("red", "S");
    stale.id = Some(vitrine_catalog::VariantId(999));
    let summary = writer
        .save_listing(ProductId(1), &[stale], &[], &BTreeSet::new())
        .unwrap();

    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.deleted, 0);
    let rows = repo.variants_for_product(ProductId(1)).unwrap();
    assert_eq!(rows.len(), 1);
    assert_ne!(rows[0].id, Some(vitrine_catalog::VariantId(999)));
}

#[test]
fn products_do_not_interfere() {
    let (_dir, store, repo) = setup();
    let writer = CatalogWriter::new(&repo, &store);

    // Same color on another product must be untouched by a deleted color.
    let other = Variant {
        id: None,
        color: "red".into(),
        size: "S".into(),
        price_cents: 100,
        stock_quantity: 1,
        image: None,
    };
    repo.seed_variant(ProductId(2), other);

    let deleted: BTreeSet<String> = ["red".to_string()].into();
    writer
        .save_listing(ProductId(1), &[], &[], &deleted)
        .unwrap();

    assert_eq!(repo.variants_for_product(ProductId(2)).unwrap().len(), 1);
}
