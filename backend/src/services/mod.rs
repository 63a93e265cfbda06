//! Business logic services for the Wholesale Produce Trading Platform

pub mod adjustment;
pub mod audit;
pub mod company;
pub mod document;
pub mod history;
pub mod integrity;
pub mod lot;
pub mod matching;
pub mod product;
pub mod production;
pub mod returns;
pub mod transfer;
pub mod warehouse;

pub use adjustment::AdjustmentService;
pub use audit::AuditService;
pub use company::CompanyService;
pub use document::DocumentService;
pub use history::HistoryService;
pub use integrity::IntegrityService;
pub use lot::LotService;
pub use matching::MatchingService;
pub use product::ProductService;
pub use production::ProductionService;
pub use returns::ReturnService;
pub use transfer::TransferService;
pub use warehouse::WarehouseService;
