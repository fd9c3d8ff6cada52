//! Cart Lines Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};
use uuid::Uuid;

use crate::domain::{
    carts::{
        errors::CartsServiceError,
        models::{CartLine, LinePricing, NewCartLine},
    },
    identity::Owner,
};

const UPSERT_CART_LINE_SQL: &str = include_str!("sql/upsert_cart_line.sql");
const LIST_CART_LINES_SQL: &str = include_str!("sql/list_cart_lines.sql");
const UPDATE_CART_LINE_QUANTITY_SQL: &str = include_str!("sql/update_cart_line_quantity.sql");
const DELETE_CART_LINE_SQL: &str = include_str!("sql/delete_cart_line.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCartLinesRepository;

impl PgCartLinesRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn upsert_line(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        owner_uuid: Uuid,
        line: NewCartLine,
    ) -> Result<CartLine, CartsServiceError> {
        let (basis, tier_uuid, bundle_uuid, charged_price) = encode_pricing(&line.pricing)?;

        query_as::<Postgres, CartLine>(UPSERT_CART_LINE_SQL)
            .bind(line.uuid)
            .bind(owner_uuid)
            .bind(line.product_uuid)
            .bind(&line.size)
            .bind(&line.color)
            .bind(i32::try_from(line.quantity)?)
            .bind(i64::try_from(line.original_unit_price)?)
            .bind(basis)
            .bind(tier_uuid)
            .bind(bundle_uuid)
            .bind(charged_price)
            .fetch_one(&mut **tx)
            .await
            .map_err(CartsServiceError::from)
    }

    pub(crate) async fn list_lines(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        owner_uuid: Uuid,
    ) -> Result<Vec<CartLine>, CartsServiceError> {
        query_as::<Postgres, CartLine>(LIST_CART_LINES_SQL)
            .bind(owner_uuid)
            .fetch_all(&mut **tx)
            .await
            .map_err(CartsServiceError::from)
    }

    pub(crate) async fn update_quantity(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        owner_uuid: Uuid,
        uuid: Uuid,
        new_quantity: u32,
    ) -> Result<u64, CartsServiceError> {
        let result = query(UPDATE_CART_LINE_QUANTITY_SQL)
            .bind(owner_uuid)
            .bind(uuid)
            .bind(i32::try_from(new_quantity)?)
            .execute(&mut **tx)
            .await
            .map_err(CartsServiceError::from)?;

        Ok(result.rows_affected())
    }

    pub(crate) async fn delete_line(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        owner_uuid: Uuid,
        uuid: Uuid,
    ) -> Result<u64, CartsServiceError> {
        let result = query(DELETE_CART_LINE_SQL)
            .bind(owner_uuid)
            .bind(uuid)
            .execute(&mut **tx)
            .await
            .map_err(CartsServiceError::from)?;

        Ok(result.rows_affected())
    }
}

/// Split a pricing basis into its column representation.
fn encode_pricing(
    pricing: &LinePricing,
) -> Result<(&'static str, Option<Uuid>, Option<Uuid>, Option<i64>), CartsServiceError> {
    Ok(match pricing {
        LinePricing::Regular => ("regular", None, None, None),
        LinePricing::Bulk { tier, unit_price } => (
            "bulk",
            Some(*tier),
            None,
            Some(i64::try_from(*unit_price)?),
        ),
        LinePricing::Bundle {
            offer,
            allocated_price,
        } => (
            "bundle",
            None,
            Some(*offer),
            Some(i64::try_from(*allocated_price)?),
        ),
    })
}

/// Rebuild a pricing basis from its column representation.
fn decode_pricing(row: &PgRow) -> sqlx::Result<LinePricing> {
    let basis: String = row.try_get("pricing_basis")?;

    let charged = || -> sqlx::Result<u64> {
        let minor: i64 = row.try_get("charged_price")?;

        u64::try_from(minor).map_err(|e| sqlx::Error::ColumnDecode {
            index: "charged_price".to_string(),
            source: Box::new(e),
        })
    };

    match basis.as_str() {
        "regular" => Ok(LinePricing::Regular),
        "bulk" => Ok(LinePricing::Bulk {
            tier: row.try_get("bulk_tier_uuid")?,
            unit_price: charged()?,
        }),
        "bundle" => Ok(LinePricing::Bundle {
            offer: row.try_get("bundle_uuid")?,
            allocated_price: charged()?,
        }),
        other => Err(sqlx::Error::ColumnDecode {
            index: "pricing_basis".to_string(),
            source: format!("unknown pricing basis {other:?}").into(),
        }),
    }
}

impl<'r> FromRow<'r, PgRow> for CartLine {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let quantity_i32: i32 = row.try_get("quantity")?;

        let quantity = u32::try_from(quantity_i32).map_err(|e| sqlx::Error::ColumnDecode {
            index: "quantity".to_string(),
            source: Box::new(e),
        })?;

        let original_i64: i64 = row.try_get("original_unit_price")?;

        let original_unit_price =
            u64::try_from(original_i64).map_err(|e| sqlx::Error::ColumnDecode {
                index: "original_unit_price".to_string(),
                source: Box::new(e),
            })?;

        Ok(Self {
            uuid: row.try_get("uuid")?,
            owner: Owner::User(row.try_get("owner_uuid")?),
            product_uuid: row.try_get("product_uuid")?,
            size: row.try_get("size")?,
            color: row.try_get("color")?,
            quantity,
            original_unit_price,
            pricing: decode_pricing(row)?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
