//! vitrine-catalog: variant reconciliation and the transactional asset coordinator
//!
//! The database commits or rolls back atomically; the filesystem does
//! not. This crate keeps the two consistent for product add/edit:
//! uploads are staged first, the variant diff is computed as a pure
//! [`ReconciliationPlan`], the plan's rows are written inside one
//! repository transaction, and only once the outcome is known does the
//! coordinator promote or discard the staged files.

pub mod coordinator;
pub mod error;
pub mod reconcile;
pub mod repository;
pub mod variant;
pub mod write;

pub use coordinator::{AssetCoordinator, FinalizeReport, TransactionOutcome};
pub use error::CatalogError;
pub use reconcile::{reconcile, ReconciliationPlan};
pub use repository::{CatalogRepository, MemoryRepository, StorageError, VariantStore};
pub use variant::{ProductId, Variant, VariantId, VariantInput};
pub use write::{CatalogWriter, ColorUpload, WriteSummary};
