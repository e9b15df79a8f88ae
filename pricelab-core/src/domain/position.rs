use serde::{Deserialize, Serialize};

/// One synthetic trade record.
///
/// Positions are bookkeeping entries, not broker orders. The opening price and
/// quantity are fixed at creation; only the protective stop and the active flag
/// change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub opening_price: f64,
    pub quantity: f64,
    /// Protective exit price. `None` until the first ratchet sets a real level.
    pub stop_loss: Option<f64>,
    /// `true` while counted as open exposure. Only ever goes `true -> false`.
    pub is_active: bool,
}

impl Position {
    /// Open a unit position at `price` with no stop.
    pub fn open(price: f64) -> Self {
        Self {
            opening_price: price,
            quantity: 1.0,
            stop_loss: None,
            is_active: true,
        }
    }

    pub fn has_stop(&self) -> bool {
        self.stop_loss.is_some()
    }

    /// Apply the ratchet to a proposed stop level.
    ///
    /// The stop may only rise: the stored level becomes `max(current, proposed)`.
    /// An unset stop takes the proposed level as-is. Returns `true` if the stored
    /// level changed.
    ///
    /// # Example
    /// ```
    /// use pricelab_core::Position;
    ///
    /// let mut pos = Position::open(100.0);
    /// assert!(pos.ratchet_stop(101.0));
    /// assert!(!pos.ratchet_stop(99.0));
    /// assert_eq!(pos.stop_loss, Some(101.0));
    /// ```
    pub fn ratchet_stop(&mut self, proposed: f64) -> bool {
        let next = match self.stop_loss {
            Some(current) => current.max(proposed),
            None => proposed,
        };
        let changed = self.stop_loss != Some(next);
        self.stop_loss = Some(next);
        changed
    }

    /// Close the position. Closing is terminal.
    pub fn close(&mut self) {
        self.is_active = false;
    }

    /// Bookkeeping value: `opening_price * quantity`.
    pub fn book_value(&self) -> f64 {
        self.opening_price * self.quantity
    }
}
