//! Adding a bundle offer to a cart.
//!
//! A bundle enters the cart as one line per component, each carrying its
//! allocated share of the special price. The whole operation is
//! all-or-nothing: variant selections are validated and stock for every
//! component is reserved before any line is written, and a failure partway
//! through line insertion removes the lines already added and releases every
//! reservation.

use jiff::Timestamp;
use tracing::warn;
use trolley::bundles::BundleOffer;
use uuid::Uuid;

use crate::domain::{
    carts::{
        errors::CartsServiceError,
        models::{CartLine, LinePricing, NewCartLine},
        store::CartStore,
    },
    stock::StockService,
};

/// The shopper's variant choice for one bundle component.
#[derive(Debug, Clone)]
pub struct ComponentSelection {
    /// The component product this selection answers for.
    pub product_uuid: Uuid,

    /// The chosen variant, `None` while the shopper has not picked one.
    pub variant_uuid: Option<Uuid>,

    /// Chosen size, empty if the product has no sizes.
    pub size: String,

    /// Chosen color, empty if the product has no colors.
    pub color: String,

    /// Undiscounted unit price of the selected variant, in minor units.
    pub unit_price: u64,
}

/// The lines and reservations a validated bundle add will perform.
#[derive(Debug, Clone)]
pub(crate) struct BundlePlan {
    pub(crate) lines: Vec<NewCartLine>,
    pub(crate) reservations: Vec<(Uuid, u32)>,
}

/// Validate a bundle add and plan its lines without touching any backend.
///
/// Selections are validated first, then the offer window and usage cap, then
/// the special price is allocated; when several preconditions fail at once
/// the selection error is the one surfaced.
///
/// # Errors
///
/// - [`CartsServiceError::MissingVariantSelection`] if a component has no
///   selection or the selection carries no variant.
/// - [`CartsServiceError::OfferUnavailable`] if the offer is outside its
///   active window or its usage cap is exhausted.
pub(crate) fn plan_bundle_lines(
    offer_uuid: Uuid,
    bundle: &BundleOffer<'static, Uuid>,
    selections: &[ComponentSelection],
    now: Timestamp,
) -> Result<BundlePlan, CartsServiceError> {
    let mut picks = Vec::with_capacity(bundle.components().len());

    for component in bundle.components() {
        let product = *component.product();

        let selection = selections
            .iter()
            .find(|s| s.product_uuid == product)
            .ok_or(CartsServiceError::MissingVariantSelection { product })?;

        let variant = selection
            .variant_uuid
            .ok_or(CartsServiceError::MissingVariantSelection { product })?;

        picks.push((component, selection, variant));
    }

    bundle.availability(now)?;

    let allocation = bundle.line_allocation()?;

    let mut lines = Vec::with_capacity(picks.len());
    let mut reservations = Vec::with_capacity(picks.len());

    for ((component, selection, variant), allocated) in picks.into_iter().zip(&allocation) {
        let allocated_price = u64::try_from(allocated.to_minor_units())?;

        reservations.push((variant, component.quantity()));

        lines.push(NewCartLine {
            uuid: Uuid::now_v7(),
            product_uuid: *component.product(),
            size: selection.size.clone(),
            color: selection.color.clone(),
            quantity: component.quantity(),
            original_unit_price: selection.unit_price,
            pricing: LinePricing::Bundle {
                offer: offer_uuid,
                allocated_price,
            },
        });
    }

    Ok(BundlePlan {
        lines,
        reservations,
    })
}

/// Execute a planned bundle add against the backends.
///
/// # Errors
///
/// - [`CartsServiceError::InsufficientStock`] if any component cannot be
///   covered; no reservation survives.
/// - Any store error from line insertion, after lines already inserted have
///   been removed and every reservation released.
pub(crate) async fn commit_bundle(
    store: &dyn CartStore,
    stock: &dyn StockService,
    plan: &BundlePlan,
) -> Result<Vec<CartLine>, CartsServiceError> {
    // Every component is reserved before any line is written, so a partial
    // bundle can never appear in the cart because of a stock shortfall.
    stock.reserve_all(&plan.reservations).await?;

    let mut added = Vec::with_capacity(plan.lines.len());

    for line in &plan.lines {
        match store.add_line(line.clone()).await {
            Ok(stored) => added.push(stored),
            Err(error) => {
                unwind(store, stock, &added, &plan.reservations).await;

                return Err(error);
            }
        }
    }

    Ok(added)
}

/// Resolve a bundle offer into cart lines.
///
/// Validates that every component has a variant selected and that the offer
/// is purchasable at `now`, reserves stock for all components as a unit, then
/// inserts one line per component with its allocated share of the special
/// price. The allocated line prices sum to the special price exactly.
///
/// Display-state callers should prefer
/// [`OptimisticCart::add_bundle`](super::controller::OptimisticCart::add_bundle),
/// which wraps this commit in the optimistic apply/rollback protocol.
///
/// # Errors
///
/// - [`CartsServiceError::MissingVariantSelection`] if a component has no
///   selection or the selection carries no variant. Nothing is reserved.
/// - [`CartsServiceError::OfferUnavailable`] if the offer is outside its
///   active window or its usage cap is exhausted. Nothing is reserved.
/// - [`CartsServiceError::InsufficientStock`] if any component cannot be
///   covered; no reservation survives.
/// - Any store error from line insertion, after lines already inserted have
///   been removed and every reservation released.
#[tracing::instrument(
    name = "carts.bundles.add_bundle_to_cart",
    skip(store, stock, bundle, selections),
    fields(offer_uuid = %offer_uuid, component_count = bundle.components().len()),
    err
)]
pub async fn add_bundle_to_cart(
    store: &dyn CartStore,
    stock: &dyn StockService,
    offer_uuid: Uuid,
    bundle: &BundleOffer<'static, Uuid>,
    selections: &[ComponentSelection],
    now: Timestamp,
) -> Result<Vec<CartLine>, CartsServiceError> {
    let plan = plan_bundle_lines(offer_uuid, bundle, selections, now)?;

    commit_bundle(store, stock, &plan).await
}

/// Compensate a partially inserted bundle: remove the lines that made it in
/// and return every reservation.
async fn unwind(
    store: &dyn CartStore,
    stock: &dyn StockService,
    added: &[CartLine],
    reservations: &[(Uuid, u32)],
) {
    for line in added {
        if let Err(error) = store.remove_line(line.uuid).await {
            warn!(line_uuid = %line.uuid, %error, "failed to remove bundle line during unwind");
        }
    }

    for &(variant, quantity) in reservations {
        if let Err(error) = stock.release(variant, quantity).await {
            warn!(%variant, quantity, %error, "failed to release reservation during unwind");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use rusty_money::{Money, iso::GBP};
    use testresult::TestResult;
    use trolley::bundles::BundleComponent;

    use crate::domain::{
        carts::store::MockCartStore,
        identity::Owner,
        stock::{MockStockService, StockServiceError},
    };

    use super::*;

    fn bundle(
        special_minor: i64,
        components: Vec<BundleComponent<Uuid>>,
    ) -> BundleOffer<'static, Uuid> {
        BundleOffer::new(
            Money::from_minor(special_minor, GBP),
            Money::from_minor(special_minor * 2, GBP),
            components,
            Timestamp::default(),
            None,
            None,
            0,
        )
    }

    fn selection(product: Uuid) -> ComponentSelection {
        ComponentSelection {
            product_uuid: product,
            variant_uuid: Some(Uuid::now_v7()),
            size: "M".into(),
            color: "Black".into(),
            unit_price: 400,
        }
    }

    fn stored(line: NewCartLine) -> CartLine {
        let now = Timestamp::default();

        CartLine {
            uuid: line.uuid,
            owner: Owner::User(Uuid::now_v7()),
            product_uuid: line.product_uuid,
            size: line.size,
            color: line.color,
            quantity: line.quantity,
            original_unit_price: line.original_unit_price,
            pricing: line.pricing,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn bundle_lines_carry_the_exact_special_price() -> TestResult {
        let products = [Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7()];
        let offer_uuid = Uuid::now_v7();

        // 1000 over three lines cannot divide evenly.
        let bundle = bundle(
            1000,
            products
                .iter()
                .map(|p| BundleComponent::new(*p, 1))
                .collect(),
        );

        let selections: Vec<_> = products.iter().map(|p| selection(*p)).collect();

        let mut store = MockCartStore::new();
        let mut stock = MockStockService::new();

        stock
            .expect_reserve_all()
            .times(1)
            .withf(|reservations| reservations.len() == 3)
            .returning(|_| Ok(()));

        store
            .expect_add_line()
            .times(3)
            .returning(|line| Ok(stored(line)));

        let added = add_bundle_to_cart(
            &store,
            &stock,
            offer_uuid,
            &bundle,
            &selections,
            Timestamp::now(),
        )
        .await?;

        let total: u64 = added.iter().map(CartLine::line_total).sum();

        assert_eq!(total, 1000, "allocated line prices must sum exactly");
        assert!(added.iter().all(|line| matches!(
            line.pricing,
            LinePricing::Bundle { offer, .. } if offer == offer_uuid
        )));

        Ok(())
    }

    #[tokio::test]
    async fn missing_variant_selection_reserves_nothing() {
        let products = [Uuid::now_v7(), Uuid::now_v7()];

        let bundle = bundle(
            500,
            products
                .iter()
                .map(|p| BundleComponent::new(*p, 1))
                .collect(),
        );

        let unselected = products.get(1).copied().unwrap_or_default();

        let selections = vec![
            selection(products.first().copied().unwrap_or_default()),
            ComponentSelection {
                variant_uuid: None,
                ..selection(unselected)
            },
        ];

        let mut store = MockCartStore::new();
        let mut stock = MockStockService::new();

        stock.expect_reserve_all().times(0);
        store.expect_add_line().times(0);

        let result = add_bundle_to_cart(
            &store,
            &stock,
            Uuid::now_v7(),
            &bundle,
            &selections,
            Timestamp::now(),
        )
        .await;

        assert!(matches!(
            result,
            Err(CartsServiceError::MissingVariantSelection { product }) if product == unselected
        ));
    }

    #[tokio::test]
    async fn insufficient_stock_writes_no_lines() {
        let products = [Uuid::now_v7(), Uuid::now_v7()];

        let bundle = bundle(
            500,
            products
                .iter()
                .map(|p| BundleComponent::new(*p, 2))
                .collect(),
        );

        let selections: Vec<_> = products.iter().map(|p| selection(*p)).collect();
        let short_variant = selections
            .first()
            .and_then(|s| s.variant_uuid)
            .unwrap_or_default();

        let mut store = MockCartStore::new();
        let mut stock = MockStockService::new();

        stock.expect_reserve_all().times(1).returning(move |_| {
            Err(StockServiceError::InsufficientStock {
                variant: short_variant,
            })
        });

        store.expect_add_line().times(0);

        let result = add_bundle_to_cart(
            &store,
            &stock,
            Uuid::now_v7(),
            &bundle,
            &selections,
            Timestamp::now(),
        )
        .await;

        assert!(matches!(
            result,
            Err(CartsServiceError::InsufficientStock { variant }) if variant == short_variant
        ));
    }

    #[tokio::test]
    async fn partial_insert_failure_unwinds_lines_and_reservations() {
        let products = [Uuid::now_v7(), Uuid::now_v7()];

        let bundle = bundle(
            600,
            products
                .iter()
                .map(|p| BundleComponent::new(*p, 1))
                .collect(),
        );

        let selections: Vec<_> = products.iter().map(|p| selection(*p)).collect();

        let mut store = MockCartStore::new();
        let mut stock = MockStockService::new();

        stock.expect_reserve_all().times(1).returning(|_| Ok(()));

        let first_line_uuid = Arc::new(Mutex::new(None));
        let added_uuid = Arc::clone(&first_line_uuid);

        let mut adds = 0u32;

        store.expect_add_line().times(2).returning(move |line| {
            adds += 1;

            if adds == 1 {
                if let Ok(mut slot) = added_uuid.lock() {
                    *slot = Some(line.uuid);
                }

                Ok(stored(line))
            } else {
                Err(CartsServiceError::Sql(sqlx::Error::PoolClosed))
            }
        });

        let removed = Arc::new(Mutex::new(Vec::new()));
        let removed_sink = Arc::clone(&removed);

        store.expect_remove_line().times(1).returning(move |uuid| {
            if let Ok(mut sink) = removed_sink.lock() {
                sink.push(uuid);
            }

            Ok(())
        });

        // Both reservations come back even though only one line landed.
        stock.expect_release().times(2).returning(|_, _| Ok(()));

        let result = add_bundle_to_cart(
            &store,
            &stock,
            Uuid::now_v7(),
            &bundle,
            &selections,
            Timestamp::now(),
        )
        .await;

        assert!(result.is_err(), "the insertion failure must surface");

        let expected = first_line_uuid.lock().ok().and_then(|slot| *slot);
        let removed = removed.lock().map(|sink| sink.clone()).unwrap_or_default();

        assert_eq!(removed, expected.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn missing_selection_outranks_an_unavailable_offer() {
        let product = Uuid::now_v7();

        // Expired window AND no variant selected: the shopper is told about
        // the selection first, since that is the precondition they can fix.
        let expired = BundleOffer::new(
            Money::from_minor(500, GBP),
            Money::from_minor(800, GBP),
            vec![BundleComponent::new(product, 1)],
            Timestamp::default(),
            Timestamp::from_second(100).ok(),
            None,
            0,
        );

        let selections = vec![ComponentSelection {
            variant_uuid: None,
            ..selection(product)
        }];

        let result = plan_bundle_lines(Uuid::now_v7(), &expired, &selections, Timestamp::now());

        assert!(matches!(
            result,
            Err(CartsServiceError::MissingVariantSelection { product: p }) if p == product
        ));
    }

    #[tokio::test]
    async fn unavailable_offer_is_rejected_before_any_side_effect() {
        let product = Uuid::now_v7();

        let expired = BundleOffer::new(
            Money::from_minor(500, GBP),
            Money::from_minor(800, GBP),
            vec![BundleComponent::new(product, 1)],
            Timestamp::default(),
            Timestamp::from_second(100).ok(),
            None,
            0,
        );

        let mut store = MockCartStore::new();
        let mut stock = MockStockService::new();

        stock.expect_reserve_all().times(0);
        store.expect_add_line().times(0);

        let result = add_bundle_to_cart(
            &store,
            &stock,
            Uuid::now_v7(),
            &expired,
            &[selection(product)],
            Timestamp::now(),
        )
        .await;

        assert!(matches!(result, Err(CartsServiceError::OfferUnavailable(_))));
    }
}
