//! Shared types and domain logic for the Wholesale Produce Trading Platform
//!
//! This crate contains the types shared between the backend services and the
//! pure decision logic of the inventory ledger: status projection, FIFO
//! allocation planning, cost derivation and event ordering. Nothing in here
//! performs I/O.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
