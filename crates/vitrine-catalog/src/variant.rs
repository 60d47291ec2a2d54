//! Variant rows and their client-submitted counterparts

use serde::{Deserialize, Serialize};

use vitrine_assets::LogicalAssetPath;

/// Database identity of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub i64);

/// Database identity of a persisted variant row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantId(pub i64);

/// A purchasable variant of a product (one color/size combination).
///
/// `id` is `None` for rows not yet persisted. `image` is only ever set by
/// the reconciler; color is the join key between variants and images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: Option<VariantId>,
    pub color: String,
    pub size: String,
    /// Price in minor units. Never negative once persisted.
    pub price_cents: i64,
    pub stock_quantity: i64,
    pub image: Option<LogicalAssetPath>,
}

/// Variant as submitted by the client. Carries no image path: clients
/// upload bytes per color, never paths.
///
/// A present `id` claims an existing row; an unmatched id is treated as a
/// stale client-side value and the variant becomes an insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantInput {
    pub id: Option<VariantId>,
    pub color: String,
    pub size: String,
    pub price_cents: i64,
    pub stock_quantity: i64,
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for VariantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
