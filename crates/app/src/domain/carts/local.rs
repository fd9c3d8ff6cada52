//! Local ephemeral cart store for anonymous sessions.
//!
//! Holds lines in process memory, scoped to one anonymous session. It is
//! destroyed (not merely emptied) when its lines are migrated into a user's
//! durable cart; [`CartSession`](super::session::CartSession) guarantees it
//! is never read again after that point.

use async_trait::async_trait;
use jiff::Timestamp;
use rustc_hash::FxHashMap;
use tokio::sync::Mutex;
use trolley::lines::VariantKey;
use uuid::Uuid;

use crate::domain::{
    carts::{
        errors::CartsServiceError,
        models::{CartLine, NewCartLine},
        store::CartStore,
    },
    identity::Owner,
};

/// In-memory cart store keyed by `(product, variant key)`.
#[derive(Debug)]
pub struct LocalCartStore {
    owner: Owner,
    lines: Mutex<FxHashMap<(Uuid, VariantKey), CartLine>>,
}

impl LocalCartStore {
    /// Create an empty store owned by the given identity.
    #[must_use]
    pub fn new(owner: Owner) -> Self {
        Self {
            owner,
            lines: Mutex::new(FxHashMap::default()),
        }
    }

    /// The identity this store belongs to.
    pub fn owner(&self) -> Owner {
        self.owner
    }

    /// Drop every line. Called once migration into a durable cart completes.
    pub async fn destroy(&self) {
        self.lines.lock().await.clear();
    }
}

#[async_trait]
impl CartStore for LocalCartStore {
    async fn add_line(&self, line: NewCartLine) -> Result<CartLine, CartsServiceError> {
        if line.quantity == 0 {
            return Err(CartsServiceError::InvalidQuantity);
        }

        let key = (line.product_uuid, line.variant_key());
        let now = Timestamp::now();

        let mut lines = self.lines.lock().await;

        let merged = match lines.get(&key) {
            Some(existing) => {
                let mut merged = existing.clone();

                merged.quantity = merged.quantity.saturating_add(line.quantity);
                merged.pricing = line.pricing;
                merged.updated_at = now;
                merged
            }
            None => CartLine {
                uuid: line.uuid,
                owner: self.owner,
                product_uuid: line.product_uuid,
                size: line.size,
                color: line.color,
                quantity: line.quantity,
                original_unit_price: line.original_unit_price,
                pricing: line.pricing,
                created_at: now,
                updated_at: now,
            },
        };

        lines.insert(key, merged.clone());

        Ok(merged)
    }

    async fn remove_line(&self, uuid: Uuid) -> Result<(), CartsServiceError> {
        // Idempotent: unknown lines are a no-op success.
        self.lines.lock().await.retain(|_, line| line.uuid != uuid);

        Ok(())
    }

    async fn update_quantity(
        &self,
        uuid: Uuid,
        new_quantity: u32,
    ) -> Result<(), CartsServiceError> {
        if new_quantity == 0 {
            return self.remove_line(uuid).await;
        }

        let mut lines = self.lines.lock().await;

        let Some(line) = lines.values_mut().find(|line| line.uuid == uuid) else {
            return Err(CartsServiceError::NotFound);
        };

        line.quantity = new_quantity;
        line.updated_at = Timestamp::now();

        Ok(())
    }

    async fn list(&self) -> Result<Vec<CartLine>, CartsServiceError> {
        let lines = self.lines.lock().await;

        let mut snapshot: Vec<CartLine> = lines.values().cloned().collect();

        snapshot.sort_by_key(|line| (line.created_at, line.uuid));

        Ok(snapshot)
    }
}
