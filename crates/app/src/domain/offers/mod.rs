//! Offers
//!
//! Read-only access to the bulk tier tables and special-offer definitions
//! maintained by the content-management collaborator. This engine consumes
//! them to price cart lines; it never writes them, and `current_uses` is
//! incremented by order finalization, not here.

pub mod errors;
pub mod models;
mod repository;
pub mod service;

pub use errors::OffersServiceError;
pub use service::*;
