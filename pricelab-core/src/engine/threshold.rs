//! Threshold engine: decides when to open positions and tracks trend reversals.
//!
//! The reference point for every threshold is `highest_opening_price`. It is
//! ratcheted to the max opening price whenever a position opens, frozen while a
//! reversal is latched, and recomputed from protected positions only when the
//! reversal resets.
//!
//! Per call, in order:
//! 1. Bootstrap an empty ledger.
//! 2. Stop if price sits exactly on the ceiling.
//! 3. Latch a reversal on a down tick.
//! 4. Scale in when price falls a full downward step below the anchor.
//! 5. While reversed: either reset, or allow only downward-threshold opens.
//! 6. Ordinary upward / downward threshold checks.
//!
//! At most one position opens per call once step 4 has opened one.

use crate::domain::{Asset, Position};
use crate::events::{emit, ActionKind, ActionSink, OpenReason};

/// Evaluate upward/downward thresholds for one tick and open a position if warranted.
///
/// Both thresholds are percentages. Comparisons are strict: a move exactly equal
/// to a threshold does not open anything. The caller guarantees positive finite
/// `price`, `previous_price` and `highest_opening_price`; nothing here guards
/// against division by zero.
pub fn evaluate_thresholds(
    asset: &mut Asset,
    upward_threshold: f64,
    downward_threshold: f64,
    sink: &mut dyn ActionSink,
) {
    if asset.positions.is_empty() {
        open_position(asset, OpenReason::Bootstrap, sink);
        return;
    }

    let uptrend = asset.price > asset.previous_price;
    let ceiling = asset.highest_opening_price;
    let difference_percentage = ((ceiling - asset.price) / ceiling * 100.0).abs();

    if difference_percentage == 0.0 {
        return;
    }

    if !asset.trend_reversed && asset.price < asset.previous_price {
        latch_reversal(asset, sink);
    }

    let scaled_in = scale_in(asset, uptrend, downward_threshold, sink);

    if asset.trend_reversed {
        // A scale-in open may have moved the ceiling since step 2.
        let highest = asset.highest_opening_price;
        let price_below_top_percentage = (highest - asset.price) / highest * 100.0;

        let recovered_past_ceiling = asset.price > highest;
        let dropped_past_band = price_below_top_percentage >= asset.trend_reversal_percentage;
        let bounced_above_trigger = asset
            .reverse_trend_trigger_value
            .is_some_and(|trigger| asset.price > trigger);
        let ticked_up = asset.price > asset.previous_price;

        let should_reset =
            recovered_past_ceiling || dropped_past_band || bounced_above_trigger || ticked_up;

        if !should_reset {
            // Still inside the reversal band: only a downward breach may open.
            if !scaled_in && !uptrend && difference_percentage > downward_threshold {
                open_position(asset, OpenReason::DownwardDuringReversal, sink);
            }
            return;
        }

        reset_reversal(asset, sink);

        if !scaled_in && uptrend && difference_percentage > upward_threshold {
            open_position(asset, OpenReason::UpwardAfterReset, sink);
            return;
        }
    }

    if scaled_in {
        return;
    }

    if uptrend && difference_percentage > upward_threshold {
        open_position(asset, OpenReason::Upward, sink);
    } else if !uptrend && difference_percentage > downward_threshold {
        open_position(asset, OpenReason::Downward, sink);
    }
}

/// Append a unit position at the current price and ratchet the ceiling to the
/// max opening price over all positions.
pub fn open_position(asset: &mut Asset, reason: OpenReason, sink: &mut dyn ActionSink) {
    asset.positions.push(Position::open(asset.price));
    if let Some(highest) = asset.highest_opening_price_overall() {
        asset.highest_opening_price = highest;
    }
    emit(
        sink,
        &asset.name,
        ActionKind::PositionOpened {
            price: asset.price,
            reason,
        },
    );
}

fn latch_reversal(asset: &mut Asset, sink: &mut dyn ActionSink) {
    let trigger = asset.price;
    asset.trend_reversed = true;
    asset.reverse_trend_trigger_value = Some(trigger);
    emit(sink, &asset.name, ActionKind::ReversalLatched { trigger });

    let anchor = match asset.initial_reverse_trend_trigger_value {
        Some(anchor) if trigger > anchor => Some(trigger),
        Some(_) => None,
        None => Some(trigger),
    };
    if let Some(anchor) = anchor {
        move_anchor(asset, anchor, sink);
    }
}

/// Open a position when price has fallen a full downward step below the anchor.
///
/// Returns `true` if a position was opened.
fn scale_in(
    asset: &mut Asset,
    uptrend: bool,
    downward_threshold: f64,
    sink: &mut dyn ActionSink,
) -> bool {
    let Some(anchor) = asset.initial_reverse_trend_trigger_value else {
        return false;
    };
    if uptrend || asset.price >= anchor * (1.0 - downward_threshold / 100.0) {
        return false;
    }

    let price = asset.price;
    open_position(asset, OpenReason::ScaleIn, sink);
    move_anchor(asset, price, sink);
    true
}

fn move_anchor(asset: &mut Asset, anchor: f64, sink: &mut dyn ActionSink) {
    asset.initial_reverse_trend_trigger_value = Some(anchor);
    emit(sink, &asset.name, ActionKind::AnchorMoved { anchor });
}

/// End the reversal and recompute the ceiling from protected positions.
///
/// Positions without a real stop are excluded so a position opened at the very
/// top cannot become the new ceiling. With no protected position the ceiling
/// falls back to the current price.
fn reset_reversal(asset: &mut Asset, sink: &mut dyn ActionSink) {
    asset.trend_reversed = false;
    asset.reverse_trend_trigger_value = None;
    asset.highest_opening_price = asset
        .highest_protected_opening_price()
        .unwrap_or(asset.price);
    emit(
        sink,
        &asset.name,
        ActionKind::ReversalReset {
            price: asset.price,
            highest_opening_price: asset.highest_opening_price,
        },
    );
}
