//! Trolley
//!
//! Trolley is a cart and pricing consistency engine: it resolves the
//! effective unit price of a cart line under competing discount mechanisms
//! (quantity-tiered bulk pricing and fixed-price multi-product bundles) and
//! defines the variant and pricing-basis types shared with the storage layer.

pub mod bundles;
pub mod discounts;
pub mod lines;
pub mod tiers;
