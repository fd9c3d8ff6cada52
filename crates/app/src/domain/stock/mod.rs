//! Stock Reservation

pub mod errors;
mod repository;
pub mod service;

pub use errors::StockServiceError;
pub use service::*;
