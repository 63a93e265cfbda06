//! HTTP handlers for the Wholesale Produce Trading Platform

pub mod adjustments;
pub mod audits;
pub mod companies;
pub mod documents;
pub mod health;
pub mod history;
pub mod integrity;
pub mod lots;
pub mod matchings;
pub mod productions;
pub mod products;
pub mod returns;
pub mod transfers;
pub mod warehouses;

pub use adjustments::*;
pub use audits::*;
pub use companies::*;
pub use documents::*;
pub use health::*;
pub use history::*;
pub use integrity::*;
pub use lots::*;
pub use matchings::*;
pub use productions::*;
pub use products::*;
pub use returns::*;
pub use transfers::*;
pub use warehouses::*;
