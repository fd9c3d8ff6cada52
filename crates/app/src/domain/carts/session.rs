//! Cart session lifecycle.
//!
//! A [`CartSession`] starts anonymous, backed by an ephemeral
//! [`LocalCartStore`], and switches to a durable backend exactly once when
//! the shopper authenticates. Which backend [`CartSession::store`] hands out
//! is decided solely by that state, never mixed: once authenticated, cart
//! reads and writes go to the durable store and the local one is released
//! (or held only for migration retries, never for reads).

use std::sync::Arc;

use crate::domain::{
    carts::{errors::CartsServiceError, local::LocalCartStore, store::CartStore},
    identity::{Owner, SessionToken},
    migration::{MigrationReport, migrate_cart},
};

enum Backend {
    Anonymous(Arc<LocalCartStore>),
    Authenticated {
        store: Arc<dyn CartStore>,
        /// Retained only while a migration left lines behind.
        pending_local: Option<Arc<LocalCartStore>>,
    },
}

/// One shopper's cart session, anonymous or authenticated.
pub struct CartSession {
    token: SessionToken,
    backend: Backend,
}

impl CartSession {
    /// Start a fresh anonymous session with an empty local cart.
    #[must_use]
    pub fn anonymous() -> Self {
        let token = SessionToken::new();

        Self {
            token,
            backend: Backend::Anonymous(Arc::new(LocalCartStore::new(Owner::Anonymous(token)))),
        }
    }

    /// The session token identifying the anonymous period of this session.
    pub fn token(&self) -> SessionToken {
        self.token
    }

    /// Whether the session has switched to a durable backend.
    pub fn is_authenticated(&self) -> bool {
        matches!(self.backend, Backend::Authenticated { .. })
    }

    /// The cart store all reads and writes for this session go through.
    pub fn store(&self) -> Arc<dyn CartStore> {
        match &self.backend {
            Backend::Anonymous(local) => Arc::clone(local) as Arc<dyn CartStore>,
            Backend::Authenticated { store, .. } => Arc::clone(store),
        }
    }

    /// Switch the session to a durable backend, migrating the local cart
    /// into it.
    ///
    /// Happens at most once per session. The local store stops serving reads
    /// immediately; if some lines could not be migrated it is held back
    /// solely so [`Self::retry_migration`] can move them later.
    ///
    /// # Errors
    ///
    /// - [`CartsServiceError::AlreadyAuthenticated`] if the session has
    ///   already switched backends.
    /// - Any error from listing either cart before migration begins.
    pub async fn authenticate(
        &mut self,
        remote: Arc<dyn CartStore>,
    ) -> Result<MigrationReport, CartsServiceError> {
        let local = match &self.backend {
            Backend::Anonymous(local) => Arc::clone(local),
            Backend::Authenticated { .. } => return Err(CartsServiceError::AlreadyAuthenticated),
        };

        let report = migrate_cart(&local, remote.as_ref()).await?;

        let pending_local = (!report.is_complete()).then_some(local);

        self.backend = Backend::Authenticated {
            store: remote,
            pending_local,
        };

        Ok(report)
    }

    /// Retry migrating lines a previous [`Self::authenticate`] left behind.
    ///
    /// A no-op returning an empty report when nothing is pending.
    ///
    /// # Errors
    ///
    /// - [`CartsServiceError::AuthorizationRequired`] while the session is
    ///   still anonymous.
    /// - Any error from listing either cart before migration begins.
    pub async fn retry_migration(&mut self) -> Result<MigrationReport, CartsServiceError> {
        let Backend::Authenticated {
            store,
            pending_local,
        } = &mut self.backend
        else {
            return Err(CartsServiceError::AuthorizationRequired);
        };

        let Some(local) = pending_local else {
            return Ok(MigrationReport::default());
        };

        let report = migrate_cart(local, store.as_ref()).await?;

        if report.is_complete() {
            *pending_local = None;
        }

        Ok(report)
    }
}

impl Default for CartSession {
    fn default() -> Self {
        Self::anonymous()
    }
}
