//! Price sources that drive ticks.

pub mod ohlc;
pub mod random_walk;

pub use ohlc::{is_valid_ohlc_path, parse_ohlc, read_ohlc_file, OhlcBar, OhlcError, OhlcFeed};
pub use random_walk::{RandomWalk, WalkConfig};

/// Supplies the next price given the current one. `None` means the feed is exhausted.
pub trait PriceFeed {
    fn next_price(&mut self, current: f64) -> Option<f64>;
}
