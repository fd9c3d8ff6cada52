//! Optimistic update controller.
//!
//! Every mutating cart call goes through [`OptimisticCart`]: the expected
//! post-state is applied to the displayed lines immediately, the durable
//! write is issued, and on failure the displayed lines are restored to their
//! exact prior value (the captured snapshot, not a recomputation). On success
//! a full [`CartStore::list`] refresh reconciles any server-side derived
//! fields, and the cart's change signal is published so other views of the
//! same cart refresh too. Displayed state therefore never diverges from
//! durable state for longer than one round trip.

use jiff::Timestamp;
use tokio::sync::Mutex;
use tracing::warn;
use trolley::bundles::BundleOffer;
use uuid::Uuid;

use crate::domain::{
    carts::{
        bundles::{ComponentSelection, commit_bundle, plan_bundle_lines},
        errors::CartsServiceError,
        models::{CartLine, NewCartLine},
        store::CartStore,
    },
    identity::Owner,
    notifications::{CartChanges, CartWatch},
    stock::StockService,
};

/// A mutation command: the optimistic `apply` lives here, the durable commit
/// is the matching [`CartStore`] call, and compensation is the snapshot the
/// controller captured before applying.
#[derive(Debug, Clone)]
pub enum CartMutation {
    /// Add a line (merging on `(product, variant key)`).
    Add(NewCartLine),

    /// Remove a line.
    Remove(Uuid),

    /// Set a line's quantity; zero behaves as removal.
    SetQuantity {
        /// The line to update.
        line: Uuid,
        /// The new quantity.
        quantity: u32,
    },
}

impl CartMutation {
    /// Apply the expected effect of this mutation to displayed lines.
    fn apply(&self, lines: &mut Vec<CartLine>, owner: Owner, now: Timestamp) {
        match self {
            CartMutation::Add(new) => {
                let key = (new.product_uuid, new.variant_key());

                if let Some(existing) = lines
                    .iter_mut()
                    .find(|line| (line.product_uuid, line.variant_key()) == key)
                {
                    existing.quantity = existing.quantity.saturating_add(new.quantity);
                    existing.pricing = new.pricing.clone();
                    existing.updated_at = now;
                } else {
                    lines.push(CartLine {
                        uuid: new.uuid,
                        owner,
                        product_uuid: new.product_uuid,
                        size: new.size.clone(),
                        color: new.color.clone(),
                        quantity: new.quantity,
                        original_unit_price: new.original_unit_price,
                        pricing: new.pricing.clone(),
                        created_at: now,
                        updated_at: now,
                    });
                }
            }
            CartMutation::Remove(uuid) => lines.retain(|line| line.uuid != *uuid),
            CartMutation::SetQuantity { line, quantity } => {
                if *quantity == 0 {
                    lines.retain(|l| l.uuid != *line);
                } else if let Some(l) = lines.iter_mut().find(|l| l.uuid == *line) {
                    l.quantity = *quantity;
                    l.updated_at = now;
                }
            }
        }
    }
}

#[derive(Debug, Default)]
struct CartState {
    lines: Vec<CartLine>,
    /// Monotonic token bumped on every applied mutation; compared at
    /// compensation time to detect interleaved mutations.
    version: u64,
}

/// Wraps a cart store with optimistic apply-then-rollback semantics.
#[derive(Debug)]
pub struct OptimisticCart<S> {
    store: S,
    owner: Owner,
    watch: CartWatch,
    state: Mutex<CartState>,
}

impl<S: CartStore> OptimisticCart<S> {
    /// Create a controller over a store, starting from an empty display state.
    ///
    /// Call [`Self::refresh`] to load the initial authoritative snapshot.
    pub fn new(store: S, owner: Owner) -> Self {
        Self::with_watch(store, owner, CartWatch::new())
    }

    /// Create a controller publishing on a shared change signal.
    ///
    /// Several controllers over the same backing cart share one [`CartWatch`]
    /// so that a commit through any of them wakes the others' subscriptions.
    pub fn with_watch(store: S, owner: Owner, watch: CartWatch) -> Self {
        Self {
            store,
            owner,
            watch,
            state: Mutex::new(CartState::default()),
        }
    }

    /// The currently displayed lines.
    pub async fn lines(&self) -> Vec<CartLine> {
        self.state.lock().await.lines.clone()
    }

    /// Subscribe to this cart's change signal.
    #[must_use]
    pub fn subscribe(&self) -> CartChanges {
        self.watch.subscribe()
    }

    /// Replace displayed state with the store's authoritative snapshot.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the fetch fails; displayed state is left
    /// untouched in that case.
    pub async fn refresh(&self) -> Result<(), CartsServiceError> {
        let lines = self.store.list().await?;

        self.state.lock().await.lines = lines;

        Ok(())
    }

    /// Refresh whenever the change signal fires, until the signal closes.
    ///
    /// A burst of notifications coalesces into one refresh. Failed refreshes
    /// are logged and the loop keeps listening; the next change tries again.
    pub async fn refresh_on_change(&self, mut changes: CartChanges) {
        while changes.changed().await {
            if let Err(error) = self.refresh().await {
                warn!(%error, "change-triggered refresh failed");
            }
        }
    }

    /// Add a line optimistically.
    ///
    /// # Errors
    ///
    /// Returns the store's error after rolling displayed state back.
    pub async fn add_line(&self, line: NewCartLine) -> Result<(), CartsServiceError> {
        self.mutate(CartMutation::Add(line)).await
    }

    /// Remove a line optimistically.
    ///
    /// # Errors
    ///
    /// Returns the store's error after rolling displayed state back.
    pub async fn remove_line(&self, line: Uuid) -> Result<(), CartsServiceError> {
        self.mutate(CartMutation::Remove(line)).await
    }

    /// Set a line's quantity optimistically.
    ///
    /// # Errors
    ///
    /// Returns the store's error after rolling displayed state back.
    pub async fn set_quantity(&self, line: Uuid, quantity: u32) -> Result<(), CartsServiceError> {
        self.mutate(CartMutation::SetQuantity { line, quantity })
            .await
    }

    /// Add a bundle offer optimistically.
    ///
    /// The planned component lines are applied to displayed state before the
    /// durable commit (stock reservation plus line inserts); a failure at any
    /// step restores the displayed lines exactly, the same protocol as every
    /// single-line mutation.
    ///
    /// # Errors
    ///
    /// Planning errors ([`CartsServiceError::MissingVariantSelection`],
    /// [`CartsServiceError::OfferUnavailable`]) surface before displayed
    /// state is touched; commit errors (such as
    /// [`CartsServiceError::InsufficientStock`]) surface after rollback.
    pub async fn add_bundle(
        &self,
        stock: &dyn StockService,
        offer_uuid: Uuid,
        bundle: &BundleOffer<'static, Uuid>,
        selections: &[ComponentSelection],
        now: Timestamp,
    ) -> Result<(), CartsServiceError> {
        let plan = plan_bundle_lines(offer_uuid, bundle, selections, now)?;

        let (snapshot, token) = {
            let mut state = self.state.lock().await;
            let snapshot = state.lines.clone();
            let applied_at = Timestamp::now();

            for line in &plan.lines {
                CartMutation::Add(line.clone()).apply(&mut state.lines, self.owner, applied_at);
            }

            state.version += 1;

            (snapshot, state.version)
        };

        let result = commit_bundle(&self.store, stock, &plan).await.map(|_| ());

        self.settle(result, snapshot, token).await
    }

    /// Run one mutation through the optimistic protocol.
    async fn mutate(&self, mutation: CartMutation) -> Result<(), CartsServiceError> {
        let (snapshot, token) = {
            let mut state = self.state.lock().await;
            let snapshot = state.lines.clone();

            mutation.apply(&mut state.lines, self.owner, Timestamp::now());
            state.version += 1;

            (snapshot, state.version)
        };

        let result = self.commit(mutation).await;

        self.settle(result, snapshot, token).await
    }

    /// Reconcile displayed state with a commit outcome: refresh and notify on
    /// success, roll back to the snapshot on failure.
    async fn settle(
        &self,
        result: Result<(), CartsServiceError>,
        snapshot: Vec<CartLine>,
        token: u64,
    ) -> Result<(), CartsServiceError> {
        match result {
            Ok(()) => {
                // The durable cart changed; wake every other view of it.
                self.watch.notify_changed();

                self.refresh().await
            }
            Err(error) => {
                let mut state = self.state.lock().await;

                if state.version == token {
                    // No other mutation landed: restore the exact prior value.
                    state.lines = snapshot;
                } else {
                    // Snapshot is stale; fall back to an authoritative refresh.
                    drop(state);

                    if let Err(refresh_error) = self.refresh().await {
                        warn!(%refresh_error, "refresh after stale rollback failed");
                    }
                }

                Err(error)
            }
        }
    }

    /// Issue the durable write for a mutation.
    async fn commit(&self, mutation: CartMutation) -> Result<(), CartsServiceError> {
        match mutation {
            CartMutation::Add(line) => self.store.add_line(line).await.map(|_| ()),
            CartMutation::Remove(uuid) => self.store.remove_line(uuid).await,
            CartMutation::SetQuantity { line, quantity } => {
                self.store.update_quantity(line, quantity).await
            }
        }
    }
}
