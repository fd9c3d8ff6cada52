//! Offers Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as};
use uuid::Uuid;

use crate::domain::offers::models::{BulkTierRecord, Offer, OfferComponent, TierDiscountKind};

const GET_BULK_TIERS_SQL: &str = include_str!("sql/get_bulk_tiers.sql");
const GET_OFFER_SQL: &str = include_str!("sql/get_offer.sql");
const GET_OFFER_COMPONENTS_SQL: &str = include_str!("sql/get_offer_components.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgOffersRepository;

impl PgOffersRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn get_bulk_tiers(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product_uuid: Uuid,
    ) -> Result<Vec<BulkTierRecord>, sqlx::Error> {
        query_as::<Postgres, BulkTierRecord>(GET_BULK_TIERS_SQL)
            .bind(product_uuid)
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn get_offer(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        uuid: Uuid,
    ) -> Result<Offer, sqlx::Error> {
        let mut offer = query_as::<Postgres, Offer>(GET_OFFER_SQL)
            .bind(uuid)
            .fetch_one(&mut **tx)
            .await?;

        let components = query_as::<Postgres, OfferComponent>(GET_OFFER_COMPONENTS_SQL)
            .bind(uuid)
            .fetch_all(&mut **tx)
            .await?;

        offer.components.extend(components);

        Ok(offer)
    }
}

fn decode_column_u32(row: &PgRow, index: &str) -> sqlx::Result<u32> {
    let value: i32 = row.try_get(index)?;

    u32::try_from(value).map_err(|e| sqlx::Error::ColumnDecode {
        index: index.to_string(),
        source: Box::new(e),
    })
}

fn decode_column_u64(row: &PgRow, index: &str) -> sqlx::Result<u64> {
    let value: i64 = row.try_get(index)?;

    u64::try_from(value).map_err(|e| sqlx::Error::ColumnDecode {
        index: index.to_string(),
        source: Box::new(e),
    })
}

impl<'r> FromRow<'r, PgRow> for BulkTierRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let kind: String = row.try_get("discount_type")?;

        let discount_kind = match kind.as_str() {
            "percentage" => TierDiscountKind::Percentage,
            "fixed_amount_off" => TierDiscountKind::FixedAmountOff,
            "fixed_unit_price" => TierDiscountKind::FixedUnitPrice,
            other => {
                return Err(sqlx::Error::ColumnDecode {
                    index: "discount_type".to_string(),
                    source: format!("unknown discount type {other:?}").into(),
                });
            }
        };

        let max_quantity = row
            .try_get::<Option<i32>, _>("max_quantity")?
            .map(|max| {
                u32::try_from(max).map_err(|e| sqlx::Error::ColumnDecode {
                    index: "max_quantity".to_string(),
                    source: Box::new(e),
                })
            })
            .transpose()?;

        Ok(Self {
            uuid: row.try_get("uuid")?,
            product_uuid: row.try_get("product_uuid")?,
            min_quantity: decode_column_u32(row, "min_quantity")?,
            max_quantity,
            discount_kind,
            discount_value: row.try_get::<Decimal, _>("discount_value")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for Offer {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let max_uses = row
            .try_get::<Option<i32>, _>("max_uses")?
            .map(|max| {
                u32::try_from(max).map_err(|e| sqlx::Error::ColumnDecode {
                    index: "max_uses".to_string(),
                    source: Box::new(e),
                })
            })
            .transpose()?;

        Ok(Self {
            uuid: row.try_get("uuid")?,
            special_price: decode_column_u64(row, "special_price")?,
            original_price: decode_column_u64(row, "original_price")?,
            starts_at: row.try_get::<SqlxTimestamp, _>("starts_at")?.to_jiff(),
            ends_at: row
                .try_get::<Option<SqlxTimestamp>, _>("ends_at")?
                .map(SqlxTimestamp::to_jiff),
            max_uses,
            current_uses: decode_column_u32(row, "current_uses")?,
            components: Vec::new(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for OfferComponent {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            product_uuid: row.try_get("product_uuid")?,
            quantity: decode_column_u32(row, "quantity")?,
        })
    }
}
