//! Stop-loss engine: ratchets protective stops on gains and closes positions
//! whose stop was breached on a loss.

use crate::domain::Asset;
use crate::events::{emit, ActionKind, ActionSink};

/// Apply the stop-loss rules for one tick.
///
/// `change_percentage` is the tick's move from `previous_price`;
/// `stop_loss_threshold` is the trailing distance in percent.
///
/// - Up tick: every active position not opened at the current price gets a
///   candidate stop `price * (1 - threshold / 100)`. The candidate is only
///   applied when it locks in at least the opening price, and only ratchets up.
/// - Down tick: an active position closes once price falls below its stop.
///   A position whose stop was never set is left alone.
/// - Flat tick: nothing happens.
pub fn apply_stop_loss(
    asset: &mut Asset,
    change_percentage: f64,
    stop_loss_threshold: f64,
    sink: &mut dyn ActionSink,
) {
    if change_percentage > 0.0 {
        ratchet_stops(asset, stop_loss_threshold, sink);
    } else if change_percentage < 0.0 {
        close_breached(asset, sink);
    }
}

fn ratchet_stops(asset: &mut Asset, stop_loss_threshold: f64, sink: &mut dyn ActionSink) {
    let price = asset.price;
    let calculated = price * (1.0 - stop_loss_threshold / 100.0);

    for (index, position) in asset.positions.iter_mut().enumerate() {
        // Opened on this very tick: no move to protect yet.
        if !position.is_active || position.opening_price == price {
            continue;
        }
        if calculated < position.opening_price {
            continue;
        }

        let previous = position.stop_loss;
        if position.ratchet_stop(calculated) {
            emit(
                sink,
                &asset.name,
                ActionKind::StopAdjusted {
                    index,
                    previous,
                    stop: calculated,
                },
            );
        }
    }
}

fn close_breached(asset: &mut Asset, sink: &mut dyn ActionSink) {
    let price = asset.price;

    for (index, position) in asset.positions.iter_mut().enumerate() {
        if !position.is_active {
            continue;
        }
        let Some(stop) = position.stop_loss else {
            continue;
        };
        if price >= stop {
            continue;
        }

        position.close();
        emit(
            sink,
            &asset.name,
            ActionKind::PositionClosed { index, price, stop },
        );
    }
}
