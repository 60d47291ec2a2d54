//! Variant reconciliation: diff incoming variants against persisted rows
//!
//! Pure computation. Given the persisted set, the client's submission,
//! the per-color staged uploads and the colors marked for image removal,
//! produce the row writes and the filesystem actions they imply. No I/O
//! happens here; the coordinator executes the filesystem side after the
//! transaction settles.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use vitrine_assets::{LogicalAssetPath, StagedAsset};

use crate::error::{CatalogError, Result};
use crate::variant::{Variant, VariantId, VariantInput};

/// The computed write set for one save operation. A plain value: building
/// it mutates nothing.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationPlan {
    /// Variants with no matching persisted row. `id` is `None`; the
    /// repository assigns identities on insert.
    pub inserts: Vec<Variant>,
    /// Variants matched to a persisted row by id.
    pub updates: Vec<Variant>,
    /// Persisted rows the client no longer lists.
    pub deletes: Vec<VariantId>,
    /// Staged uploads referenced by at least one variant; promoted on commit.
    pub promote: Vec<StagedAsset>,
    /// Previously promoted files whose color was removed or whose image is
    /// being replaced; deleted on commit, after the promotions.
    pub delete_final: Vec<LogicalAssetPath>,
}

/// Diff `incoming` against `existing` and assign each variant's image.
///
/// Image assignment per color, in precedence order:
/// 1. color listed in `deleted_colors` — image cleared, even if a new
///    upload for the same color arrived in the same request;
/// 2. a staged upload for the color — its final path, promoted once no
///    matter how many sizes share the color; a persisted image it
///    supersedes is scheduled for deletion behind the promotion;
/// 3. (updates only) the color's previously persisted image, falling back
///    to the row's own prior image — except one this same plan deletes,
///    as with a row changing color away from a removed or replaced one;
/// 4. otherwise no image. Inserts without an upload start imageless.
///
/// Fails atomically: one invalid variant rejects the whole call before any
/// plan is produced.
pub fn reconcile(
    existing: &[Variant],
    incoming: &[VariantInput],
    staged_by_color: &BTreeMap<String, StagedAsset>,
    deleted_colors: &BTreeSet<String>,
) -> Result<ReconciliationPlan> {
    validate(incoming)?;

    let existing_by_id: HashMap<VariantId, &Variant> = existing
        .iter()
        .filter_map(|v| v.id.map(|id| (id, v)))
        .collect();

    // First persisted image per color wins, matching how a color shared
    // across sizes carries one image.
    let mut existing_image_by_color: BTreeMap<&str, &LogicalAssetPath> = BTreeMap::new();
    for variant in existing {
        if let Some(image) = &variant.image {
            existing_image_by_color.entry(&variant.color).or_insert(image);
        }
    }

    // Files this save removes from the final store: images of deleted
    // colors, and images superseded by an upload that will be promoted.
    // No surviving row may reference one of these.
    let incoming_colors: HashSet<&str> = incoming.iter().map(|i| i.color.as_str()).collect();
    let mut doomed: HashSet<&LogicalAssetPath> = HashSet::new();
    for (color, image) in &existing_image_by_color {
        if deleted_colors.contains(*color)
            || (staged_by_color.contains_key(*color) && incoming_colors.contains(*color))
        {
            doomed.insert(*image);
        }
    }

    let mut plan = ReconciliationPlan::default();
    let mut matched: HashSet<VariantId> = HashSet::new();
    let mut promoted_colors: BTreeSet<&str> = BTreeSet::new();

    for input in incoming {
        let matched_row = input
            .id
            .filter(|id| existing_by_id.contains_key(id))
            .map(|id| {
                matched.insert(id);
                existing_by_id[&id]
            });

        let image = if deleted_colors.contains(&input.color) {
            None
        } else if let Some(staged) = staged_by_color.get(&input.color) {
            if promoted_colors.insert(input.color.as_str()) {
                plan.promote.push(staged.clone());
                // Replacement: the superseded file goes after promotion.
                if let Some(old) = existing_image_by_color.get(input.color.as_str()) {
                    plan.delete_final.push((*old).clone());
                }
            }
            Some(staged.final_path.clone())
        } else if let Some(row) = matched_row {
            existing_image_by_color
                .get(input.color.as_str())
                .copied()
                .or_else(|| row.image.as_ref().filter(|image| !doomed.contains(image)))
                .cloned()
        } else {
            None
        };

        let variant = Variant {
            id: matched_row.and_then(|row| row.id),
            color: input.color.clone(),
            size: input.size.clone(),
            price_cents: input.price_cents,
            stock_quantity: input.stock_quantity,
            image,
        };

        if variant.image.is_none() && !deleted_colors.contains(&variant.color) {
            log::warn!(
                "variant {}/{} has no image (none uploaded, none persisted)",
                variant.color,
                variant.size
            );
        }

        if matched_row.is_some() {
            plan.updates.push(variant);
        } else {
            if let Some(id) = input.id {
                log::warn!("variant id {id} not found, treating as new (stale client id?)");
            }
            plan.inserts.push(variant);
        }
    }

    plan.deletes = existing
        .iter()
        .filter_map(|v| v.id)
        .filter(|id| !matched.contains(id))
        .collect();

    // One file per removed color, however many sizes referenced it.
    for color in deleted_colors {
        if let Some(image) = existing_image_by_color.get(color.as_str()) {
            plan.delete_final.push((*image).clone());
        }
    }

    for color in staged_by_color.keys() {
        if !promoted_colors.contains(color.as_str()) {
            log::warn!("upload for color {color:?} referenced by no variant, will be discarded");
        }
    }

    Ok(plan)
}

fn validate(incoming: &[VariantInput]) -> Result<()> {
    for input in incoming {
        if input.price_cents < 0 {
            return Err(CatalogError::Validation(format!(
                "negative price for variant {}/{}",
                input.color, input.size
            )));
        }
        if input.stock_quantity < 0 {
            return Err(CatalogError::Validation(format!(
                "negative stock for variant {}/{}",
                input.color, input.size
            )));
        }
    }
    Ok(())
}
