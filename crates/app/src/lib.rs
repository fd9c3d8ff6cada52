//! Cart storage, reservation and reconciliation for the trolley pricing engine.

pub mod database;
pub mod domain;

#[cfg(test)]
mod test;
