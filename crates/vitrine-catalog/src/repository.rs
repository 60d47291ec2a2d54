//! Persistence collaborators: record-level writes inside one transaction
//!
//! The coordinator does not know a schema or SQL dialect; it only needs a
//! repository that can run the plan's row writes atomically and report
//! the transaction's outcome explicitly. `MemoryRepository` is the
//! in-memory implementation used by tests and wiring examples.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use thiserror::Error;

use crate::coordinator::TransactionOutcome;
use crate::error::CatalogError;
use crate::variant::{ProductId, Variant, VariantId};

/// Repository-side failure.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("storage backend: {0}")]
    Backend(String),
}

/// Record-level variant writes, valid only inside a transaction.
pub trait VariantStore {
    /// Insert new rows for a product; returns the assigned identities in
    /// input order.
    fn insert_variants(
        &mut self,
        product: ProductId,
        rows: &[Variant],
    ) -> Result<Vec<VariantId>, StorageError>;

    /// Update rows matched by their `id`. A row without an id or with an
    /// unknown id is a programming error and fails the transaction.
    fn update_variants(&mut self, rows: &[Variant]) -> Result<(), StorageError>;

    /// Delete rows by id; unknown ids are ignored (delete is idempotent).
    fn delete_variants_by_ids(&mut self, ids: &[VariantId]) -> Result<(), StorageError>;

    /// Clear the image column for every row of `product` whose color is in
    /// `colors`.
    fn clear_images_by_colors(
        &mut self,
        product: ProductId,
        colors: &[String],
    ) -> Result<(), StorageError>;
}

/// The transaction seam. `with_transaction` runs `body` against a
/// transactional view and returns the settled [`TransactionOutcome`]
/// alongside the body's result, so callers hand the outcome to the asset
/// coordinator without any global registration.
pub trait CatalogRepository {
    type Tx: VariantStore;

    fn variants_for_product(&self, product: ProductId) -> Result<Vec<Variant>, StorageError>;

    fn with_transaction<T>(
        &self,
        body: impl FnOnce(&mut Self::Tx) -> Result<T, CatalogError>,
    ) -> (TransactionOutcome, Result<T, CatalogError>);
}

#[derive(Debug, Clone, Default)]
struct Tables {
    next_id: i64,
    rows: BTreeMap<VariantId, (ProductId, Variant)>,
}

/// In-memory repository. Transactions operate on a snapshot that replaces
/// the live tables only when the body succeeds; not durable.
#[derive(Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
    fail_next_write: AtomicBool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the first write of the next transaction fail, to exercise
    /// rollback paths.
    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    /// Seed a persisted row outside any transaction.
    pub fn seed_variant(&self, product: ProductId, mut variant: Variant) -> VariantId {
        let mut tables = self.lock();
        tables.next_id += 1;
        let id = VariantId(tables.next_id);
        variant.id = Some(id);
        tables.rows.insert(id, (product, variant));
        id
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CatalogRepository for MemoryRepository {
    type Tx = MemoryTx;

    fn variants_for_product(&self, product: ProductId) -> Result<Vec<Variant>, StorageError> {
        let tables = self.lock();
        Ok(tables
            .rows
            .values()
            .filter(|(p, _)| *p == product)
            .map(|(_, v)| v.clone())
            .collect())
    }

    fn with_transaction<T>(
        &self,
        body: impl FnOnce(&mut Self::Tx) -> Result<T, CatalogError>,
    ) -> (TransactionOutcome, Result<T, CatalogError>) {
        let mut guard = self.lock();
        let mut tx = MemoryTx {
            tables: guard.clone(),
            fail_next_write: self.fail_next_write.swap(false, Ordering::SeqCst),
        };
        match body(&mut tx) {
            Ok(value) => {
                *guard = tx.tables;
                log::debug!("transaction committed");
                (TransactionOutcome::Committed, Ok(value))
            }
            Err(err) => {
                log::warn!("transaction rolled back: {err}");
                (TransactionOutcome::RolledBack, Err(err))
            }
        }
    }
}

/// Transactional view over a snapshot of the tables.
pub struct MemoryTx {
    tables: Tables,
    fail_next_write: bool,
}

impl MemoryTx {
    fn check_injected_failure(&mut self) -> Result<(), StorageError> {
        if self.fail_next_write {
            self.fail_next_write = false;
            return Err(StorageError::Backend("injected write failure".into()));
        }
        Ok(())
    }
}

impl VariantStore for MemoryTx {
    fn insert_variants(
        &mut self,
        product: ProductId,
        rows: &[Variant],
    ) -> Result<Vec<VariantId>, StorageError> {
        self.check_injected_failure()?;
        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            self.tables.next_id += 1;
            let id = VariantId(self.tables.next_id);
            let mut row = row.clone();
            row.id = Some(id);
            self.tables.rows.insert(id, (product, row));
            ids.push(id);
        }
        Ok(ids)
    }

    fn update_variants(&mut self, rows: &[Variant]) -> Result<(), StorageError> {
        self.check_injected_failure()?;
        for row in rows {
            let id = row
                .id
                .ok_or_else(|| StorageError::Backend("update without id".into()))?;
            let entry = self
                .tables
                .rows
                .get_mut(&id)
                .ok_or_else(|| StorageError::NotFound(format!("variant {id}")))?;
            entry.1 = row.clone();
        }
        Ok(())
    }

    fn delete_variants_by_ids(&mut self, ids: &[VariantId]) -> Result<(), StorageError> {
        self.check_injected_failure()?;
        for id in ids {
            self.tables.rows.remove(id);
        }
        Ok(())
    }

    fn clear_images_by_colors(
        &mut self,
        product: ProductId,
        colors: &[String],
    ) -> Result<(), StorageError> {
        self.check_injected_failure()?;
        for (p, variant) in self.tables.rows.values_mut() {
            if *p == product && colors.contains(&variant.color) {
                variant.image = None;
            }
        }
        Ok(())
    }
}
