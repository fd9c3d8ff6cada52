//! Offers service.

use async_trait::async_trait;
use mockall::automock;
use rusty_money::{Money, iso::Currency};
use tracing::debug;
use trolley::tiers::tier_unit_price;
use uuid::Uuid;

use crate::{
    database::Db,
    domain::offers::{
        errors::OffersServiceError,
        models::{BulkPricing, BulkTierRecord, Offer},
        repository::PgOffersRepository,
    },
};

#[derive(Debug, Clone)]
pub struct PgOffersService {
    db: Db,
    currency: &'static Currency,
    repository: PgOffersRepository,
}

impl PgOffersService {
    #[must_use]
    pub fn new(db: Db, currency: &'static Currency) -> Self {
        Self {
            db,
            currency,
            repository: PgOffersRepository::new(),
        }
    }
}

#[async_trait]
impl OffersService for PgOffersService {
    async fn bulk_tiers(
        &self,
        product_uuid: Uuid,
    ) -> Result<Vec<BulkTierRecord>, OffersServiceError> {
        let mut tx = self.db.begin().await.map_err(OffersServiceError::from)?;

        let tiers = self.repository.get_bulk_tiers(&mut tx, product_uuid).await?;

        tx.commit().await.map_err(OffersServiceError::from)?;

        Ok(tiers)
    }

    async fn offer(&self, uuid: Uuid) -> Result<Offer, OffersServiceError> {
        let mut tx = self.db.begin().await.map_err(OffersServiceError::from)?;

        let offer = self.repository.get_offer(&mut tx, uuid).await?;

        tx.commit().await.map_err(OffersServiceError::from)?;

        Ok(offer)
    }

    #[tracing::instrument(
        name = "offers.service.resolve_bulk_pricing",
        skip(self),
        fields(product_uuid = %product_uuid, total_quantity, base_unit_price),
        err
    )]
    async fn resolve_bulk_pricing(
        &self,
        product_uuid: Uuid,
        total_quantity: u32,
        base_unit_price: u64,
    ) -> Result<Option<BulkPricing>, OffersServiceError> {
        let records = self.bulk_tiers(product_uuid).await?;

        resolve_bulk_pricing_from(&records, total_quantity, base_unit_price, self.currency)
    }
}

/// Resolve the applicable tier from loaded rows and compute the discounted
/// unit price. Returns `None` when no band contains the total quantity.
///
/// # Errors
///
/// Returns an [`OffersServiceError`] if a row cannot be represented in minor
/// units or the price calculation fails.
pub fn resolve_bulk_pricing_from(
    records: &[BulkTierRecord],
    total_quantity: u32,
    base_unit_price: u64,
    currency: &'static Currency,
) -> Result<Option<BulkPricing>, OffersServiceError> {
    let mut tiers = Vec::with_capacity(records.len());

    for record in records {
        tiers.push((record.uuid, record.to_bulk_tier(currency)?));
    }

    // Highest matching min_quantity wins, mirroring the core resolver's
    // tie-break for overlapping bands.
    let Some((tier_uuid, tier)) = tiers
        .iter()
        .filter(|(_, tier)| tier.contains(total_quantity))
        .max_by_key(|(_, tier)| tier.min_quantity())
    else {
        debug!("no bulk tier matched");

        return Ok(None);
    };

    let base = i64::try_from(base_unit_price).map_err(|_| OffersServiceError::ValueOutOfRange)?;

    let unit = tier_unit_price(&Money::from_minor(base, currency), tier)?;

    let unit_price =
        u64::try_from(unit.to_minor_units()).map_err(|_| OffersServiceError::ValueOutOfRange)?;

    Ok(Some(BulkPricing {
        tier_uuid: *tier_uuid,
        unit_price,
    }))
}

/// Read-only access to bulk tiers and special offers.
#[automock]
#[async_trait]
pub trait OffersService: Send + Sync {
    /// All tier rows for a product, ordered by `min_quantity`.
    async fn bulk_tiers(
        &self,
        product_uuid: Uuid,
    ) -> Result<Vec<BulkTierRecord>, OffersServiceError>;

    /// A special offer with its ordered component rows.
    async fn offer(&self, uuid: Uuid) -> Result<Offer, OffersServiceError>;

    /// Resolve the tier applicable to a product at a total quantity and
    /// compute the unit price it grants, or `None` if no tier matches.
    async fn resolve_bulk_pricing(
        &self,
        product_uuid: Uuid,
        total_quantity: u32,
        base_unit_price: u64,
    ) -> Result<Option<BulkPricing>, OffersServiceError>;
}
