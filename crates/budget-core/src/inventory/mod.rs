pub mod policy;
pub mod valuation;

pub use policy::{CostingPolicy, LotSource};
pub use valuation::{valuate, InventoryLot, LotDraw, ValuationResult};
