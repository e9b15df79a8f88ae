//! Seeded additive random walk.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::PriceFeed;

/// Shape of the random walk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    /// Largest absolute step per tick, in price units.
    pub max_step: f64,
    /// Lowest price the walk can reach.
    pub floor: f64,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            max_step: 10.0,
            floor: 0.01,
        }
    }
}

/// Next price is `max(floor, current + U[-max_step, max_step))`.
///
/// Never exhausts.
#[derive(Debug, Clone)]
pub struct RandomWalk {
    config: WalkConfig,
    rng: StdRng,
}

impl RandomWalk {
    pub fn new(config: WalkConfig, rng: StdRng) -> Self {
        Self { config, rng }
    }
}

impl PriceFeed for RandomWalk {
    fn next_price(&mut self, current: f64) -> Option<f64> {
        let step = if self.config.max_step > 0.0 {
            self.rng
                .gen_range(-self.config.max_step..self.config.max_step)
        } else {
            0.0
        };
        Some((current + step).max(self.config.floor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn steps_stay_within_bounds() {
        let mut walk = RandomWalk::new(WalkConfig::default(), StdRng::seed_from_u64(1));
        let mut price = 100.0;
        for _ in 0..1_000 {
            let next = walk.next_price(price).unwrap();
            assert!(next >= 0.01);
            assert!(next == 0.01 || (next - price).abs() <= 10.0);
            price = next;
        }
    }

    #[test]
    fn floor_is_respected() {
        let config = WalkConfig {
            max_step: 10.0,
            floor: 5.0,
        };
        let mut walk = RandomWalk::new(config, StdRng::seed_from_u64(2));
        for _ in 0..100 {
            assert!(walk.next_price(5.0).unwrap() >= 5.0);
        }
    }

    #[test]
    fn zero_step_walk_is_flat() {
        let config = WalkConfig {
            max_step: 0.0,
            floor: 0.01,
        };
        let mut walk = RandomWalk::new(config, StdRng::seed_from_u64(3));
        assert_eq!(walk.next_price(42.0), Some(42.0));
    }

    #[test]
    fn same_seed_same_path() {
        let mut a = RandomWalk::new(WalkConfig::default(), StdRng::seed_from_u64(9));
        let mut b = RandomWalk::new(WalkConfig::default(), StdRng::seed_from_u64(9));
        let mut pa = 100.0;
        let mut pb = 100.0;
        for _ in 0..50 {
            pa = a.next_price(pa).unwrap();
            pb = b.next_price(pb).unwrap();
            assert_eq!(pa, pb);
        }
    }
}
