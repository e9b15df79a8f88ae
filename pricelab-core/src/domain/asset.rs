use serde::{Deserialize, Serialize};

use super::position::Position;

/// Summary of which kinds of positions an asset holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    NoPositions,
    OnlyActive,
    OnlyClosed,
    Mixed,
}

impl std::fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PositionStatus::NoPositions => "none",
            PositionStatus::OnlyActive => "active",
            PositionStatus::OnlyClosed => "closed",
            PositionStatus::Mixed => "mixed",
        };
        f.write_str(label)
    }
}

/// One simulated instrument and its full position history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    pub price: f64,
    pub previous_price: f64,
    /// Append-only, in creation order.
    pub positions: Vec<Position>,
    /// Reference ceiling for threshold math. Frozen while a reversal is active.
    pub highest_opening_price: f64,
    pub trend_reversed: bool,
    /// Drop below the ceiling, in percent, at which a reversal ends.
    pub trend_reversal_percentage: f64,
    /// Price at the moment the reversal latched. `None` whenever not reversed.
    #[serde(default)]
    pub reverse_trend_trigger_value: Option<f64>,
    /// Anchor for scale-in re-entries during a pullback.
    #[serde(default)]
    pub initial_reverse_trend_trigger_value: Option<f64>,
}

impl Asset {
    /// Create an asset with no positions, sitting at `price`.
    pub fn new(name: impl Into<String>, price: f64, trend_reversal_percentage: f64) -> Self {
        Self {
            name: name.into(),
            price,
            previous_price: price,
            positions: Vec::new(),
            highest_opening_price: price,
            trend_reversed: false,
            trend_reversal_percentage,
            reverse_trend_trigger_value: None,
            initial_reverse_trend_trigger_value: None,
        }
    }

    /// Move to the next tick: the current price becomes the previous one.
    pub fn advance(&mut self, new_price: f64) {
        self.previous_price = self.price;
        self.price = new_price;
    }

    /// Percent change from `previous_price` to `price`.
    pub fn change_percentage(&self) -> f64 {
        (self.price - self.previous_price) / self.previous_price * 100.0
    }

    pub fn active_positions(&self) -> usize {
        self.positions.iter().filter(|p| p.is_active).count()
    }

    pub fn closed_positions(&self) -> usize {
        self.positions.iter().filter(|p| !p.is_active).count()
    }

    pub fn position_status(&self) -> PositionStatus {
        match (self.active_positions(), self.closed_positions()) {
            (0, 0) => PositionStatus::NoPositions,
            (_, 0) => PositionStatus::OnlyActive,
            (0, _) => PositionStatus::OnlyClosed,
            _ => PositionStatus::Mixed,
        }
    }

    /// Σ opening value of active positions.
    pub fn active_positions_value(&self) -> f64 {
        self.positions
            .iter()
            .filter(|p| p.is_active)
            .map(Position::book_value)
            .sum()
    }

    /// Σ opening value of closed positions.
    pub fn closed_positions_value(&self) -> f64 {
        self.positions
            .iter()
            .filter(|p| !p.is_active)
            .map(Position::book_value)
            .sum()
    }

    /// Highest opening price among active positions that carry a real stop.
    pub(crate) fn highest_protected_opening_price(&self) -> Option<f64> {
        self.positions
            .iter()
            .filter(|p| p.is_active && p.has_stop())
            .map(|p| p.opening_price)
            .reduce(f64::max)
    }

    /// Highest opening price over every position, active or not.
    pub(crate) fn highest_opening_price_overall(&self) -> Option<f64> {
        self.positions
            .iter()
            .map(|p| p.opening_price)
            .reduce(f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closed(price: f64) -> Position {
        let mut p = Position::open(price);
        p.close();
        p
    }

    #[test]
    fn new_asset_has_no_positions() {
        let asset = Asset::new("Apple", 100.0, 10.0);
        assert_eq!(asset.price, 100.0);
        assert_eq!(asset.previous_price, 100.0);
        assert!(asset.positions.is_empty());
        assert!(!asset.trend_reversed);
        assert_eq!(asset.position_status(), PositionStatus::NoPositions);
    }

    #[test]
    fn advance_shifts_prices() {
        let mut asset = Asset::new("Apple", 100.0, 10.0);
        asset.advance(110.0);
        assert_eq!(asset.previous_price, 100.0);
        assert_eq!(asset.price, 110.0);
        assert!((asset.change_percentage() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn position_status_variants() {
        let mut asset = Asset::new("Apple", 100.0, 10.0);
        asset.positions.push(Position::open(100.0));
        assert_eq!(asset.position_status(), PositionStatus::OnlyActive);

        asset.positions.push(closed(110.0));
        assert_eq!(asset.position_status(), PositionStatus::Mixed);

        asset.positions[0].close();
        assert_eq!(asset.position_status(), PositionStatus::OnlyClosed);
        assert_eq!(asset.closed_positions(), 2);
        assert_eq!(asset.active_positions(), 0);
    }

    #[test]
    fn position_status_labels() {
        assert_eq!(PositionStatus::NoPositions.to_string(), "none");
        assert_eq!(PositionStatus::OnlyActive.to_string(), "active");
        assert_eq!(PositionStatus::OnlyClosed.to_string(), "closed");
        assert_eq!(PositionStatus::Mixed.to_string(), "mixed");
    }

    #[test]
    fn values_split_by_activity() {
        let mut asset = Asset::new("Apple", 100.0, 10.0);
        asset.positions.push(Position::open(100.0));
        asset.positions.push(closed(110.0));
        asset.positions.push(Position::open(90.0));
        assert_eq!(asset.active_positions_value(), 190.0);
        assert_eq!(asset.closed_positions_value(), 110.0);
    }

    #[test]
    fn protected_ceiling_ignores_unset_stops_and_closed() {
        let mut asset = Asset::new("Apple", 100.0, 10.0);
        let mut protected = Position::open(100.0);
        protected.stop_loss = Some(101.0);
        let mut closed_protected = Position::open(130.0);
        closed_protected.stop_loss = Some(131.0);
        closed_protected.close();
        asset.positions.push(protected);
        asset.positions.push(closed_protected);
        asset.positions.push(Position::open(120.0));

        assert_eq!(asset.highest_protected_opening_price(), Some(100.0));
        assert_eq!(asset.highest_opening_price_overall(), Some(130.0));
    }

    #[test]
    fn optional_fields_default_when_missing() {
        let json = r#"{
            "name": "Apple",
            "price": 100.0,
            "previous_price": 95.0,
            "positions": [],
            "highest_opening_price": 100.0,
            "trend_reversed": false,
            "trend_reversal_percentage": 10.0
        }"#;
        let asset: Asset = serde_json::from_str(json).unwrap();
        assert_eq!(asset.reverse_trend_trigger_value, None);
        assert_eq!(asset.initial_reverse_trend_trigger_value, None);
    }
}
