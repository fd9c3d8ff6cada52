//! Trolley Domain Concerns

pub mod carts;
pub mod identity;
pub mod migration;
pub mod notifications;
pub mod offers;
pub mod stock;
