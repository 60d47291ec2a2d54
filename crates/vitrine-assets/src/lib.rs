//! vitrine-assets: sandboxed filesystem storage for catalog images
//!
//! Uploaded images are written to a temp area first and only moved to
//! their final, publicly referenceable location once the owning catalog
//! transaction has committed. Every physical path is resolved through a
//! sandbox that keeps it under the configured upload root.

pub mod error;
pub mod paths;
pub mod sandbox;
pub mod staging;

pub use error::AssetError;
pub use paths::{media_type_for, LogicalAssetPath};
pub use sandbox::{AssetRoot, PhysicalPath};
pub use staging::{StagedAsset, StagingStore};
