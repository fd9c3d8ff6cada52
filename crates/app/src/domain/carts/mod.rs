//! Carts
//!
//! The dual-backend cart store and the operations layered on top of it:
//! optimistic mutations, bundle adds and the anonymous session lifecycle.

pub mod bundles;
pub mod controller;
pub mod errors;
pub mod local;
pub mod models;
mod repository;
pub mod session;
pub mod store;

pub use errors::CartsServiceError;
pub use local::LocalCartStore;
pub use session::CartSession;
pub use store::{CartStore, PgCartStore};
