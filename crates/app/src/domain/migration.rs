//! Anonymous-to-authenticated cart migration.
//!
//! When an anonymous session signs in, every line in its local cart is moved
//! into the user's durable cart. Lines for a `(product, variant key)` the
//! durable cart already holds merge by summing quantities; everything else is
//! inserted as-is. Successfully moved lines leave the local store immediately,
//! so a re-run after a partial failure retries only what is still pending,
//! and the local store is destroyed only once nothing remains in it.

use rustc_hash::FxHashSet;
use tracing::{info, warn};
use trolley::lines::VariantKey;
use uuid::Uuid;

use crate::domain::carts::{
    errors::CartsServiceError,
    local::LocalCartStore,
    models::NewCartLine,
    store::CartStore,
};

/// What a migration run did with the local lines it found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Lines inserted into the durable cart as new lines.
    pub migrated: usize,

    /// Lines merged into an existing durable line by summing quantities.
    pub merged: usize,

    /// Lines left in the local store because their write failed.
    pub skipped: usize,
}

impl MigrationReport {
    /// Whether every local line made it across.
    pub fn is_complete(&self) -> bool {
        self.skipped == 0
    }
}

/// Move every line from a local anonymous cart into a durable cart.
///
/// Line order follows the local store's listing order, so durable insertion
/// order matches the order the shopper built the cart in.
///
/// # Errors
///
/// Returns an error only if either store's initial listing fails. Failures
/// writing individual lines are counted as skipped, not returned, so one bad
/// line never strands the rest.
#[tracing::instrument(name = "migration.migrate_cart", skip(local, remote), err)]
pub async fn migrate_cart(
    local: &LocalCartStore,
    remote: &dyn CartStore,
) -> Result<MigrationReport, CartsServiceError> {
    let local_lines = local.list().await?;

    let existing: FxHashSet<(Uuid, VariantKey)> = remote
        .list()
        .await?
        .iter()
        .map(|line| (line.product_uuid, line.variant_key()))
        .collect();

    let mut report = MigrationReport::default();

    for line in local_lines {
        let key = (line.product_uuid, line.variant_key());

        // The durable identity belongs to the durable store; the local uuid
        // dies with the local line.
        let new_line = NewCartLine {
            uuid: Uuid::now_v7(),
            product_uuid: line.product_uuid,
            size: line.size.clone(),
            color: line.color.clone(),
            quantity: line.quantity,
            original_unit_price: line.original_unit_price,
            pricing: line.pricing.clone(),
        };

        match remote.add_line(new_line).await {
            Ok(_) => {
                local.remove_line(line.uuid).await?;

                if existing.contains(&key) {
                    report.merged += 1;
                } else {
                    report.migrated += 1;
                }
            }
            Err(error) => {
                warn!(
                    product_uuid = %line.product_uuid,
                    %error,
                    "failed to migrate cart line, leaving it in the local cart"
                );

                report.skipped += 1;
            }
        }
    }

    if report.is_complete() {
        local.destroy().await;
    } else {
        warn!(
            skipped = report.skipped,
            "migration incomplete, local cart retained for retry"
        );
    }

    info!(
        migrated = report.migrated,
        merged = report.merged,
        skipped = report.skipped,
        "cart migration finished"
    );

    Ok(report)
}
