//! Domain models and the pure decision logic of the inventory ledger

pub mod audit;
pub mod document;
pub mod lot;
pub mod matching;
pub mod stock;

pub use audit::*;
pub use document::*;
pub use lot::*;
pub use matching::*;
pub use stock::*;
