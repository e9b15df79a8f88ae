//! Position lifecycle engines.
//!
//! Within one asset the order is fixed: thresholds first, then stops. The stop
//! engine recognises a just-opened position by `opening_price == price`.

pub mod stop_loss;
pub mod threshold;
pub mod tick;

pub use stop_loss::apply_stop_loss;
pub use threshold::{evaluate_thresholds, open_position};
pub use tick::{process_tick, TickConfig, TickError, TickOutcome};
