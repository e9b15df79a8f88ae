//! Domain types for PriceLab

pub mod asset;
pub mod portfolio;
pub mod position;

pub use asset::{Asset, PositionStatus};
pub use portfolio::Portfolio;
pub use position::Position;
