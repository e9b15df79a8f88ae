//! Diagnostics: observe every engine decision without influencing it.
//!
//! Engines receive a `&mut dyn ActionSink` and report each transition
//! (position opened, stop adjusted, position closed, reversal latched/reset,
//! scale-in anchor moved). Sinks are pure observers: an engine run with
//! `NullSink` produces exactly the same asset state as one with `ActionHistory`.
//!
//! Every emitted event is also logged at `debug` level through `tracing`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a position was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenReason {
    /// First position of an empty ledger.
    Bootstrap,
    /// Price fell a full downward step below the scale-in anchor.
    ScaleIn,
    /// Downward threshold breached while a reversal suppresses other opens.
    DownwardDuringReversal,
    /// Upward threshold crossed on the tick that ended a reversal.
    UpwardAfterReset,
    Upward,
    Downward,
}

/// A single engine transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    PositionOpened {
        price: f64,
        reason: OpenReason,
    },
    StopAdjusted {
        index: usize,
        previous: Option<f64>,
        stop: f64,
    },
    PositionClosed {
        index: usize,
        price: f64,
        stop: f64,
    },
    ReversalLatched {
        trigger: f64,
    },
    ReversalReset {
        price: f64,
        highest_opening_price: f64,
    },
    AnchorMoved {
        anchor: f64,
    },
}

impl ActionKind {
    /// Short label used in text and CSV exports.
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::PositionOpened { .. } => "position_opened",
            ActionKind::StopAdjusted { .. } => "stop_adjusted",
            ActionKind::PositionClosed { .. } => "position_closed",
            ActionKind::ReversalLatched { .. } => "reversal_latched",
            ActionKind::ReversalReset { .. } => "reversal_reset",
            ActionKind::AnchorMoved { .. } => "anchor_moved",
        }
    }
}

/// An engine transition on a named asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEvent {
    pub asset: String,
    pub kind: ActionKind,
}

/// Receiver of engine transitions.
pub trait ActionSink {
    fn record(&mut self, event: ActionEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ActionSink for NullSink {
    fn record(&mut self, _event: ActionEvent) {}
}

impl ActionSink for Vec<ActionEvent> {
    fn record(&mut self, event: ActionEvent) {
        self.push(event);
    }
}

/// Log an event and hand it to the sink.
pub(crate) fn emit(sink: &mut dyn ActionSink, asset: &str, kind: ActionKind) {
    tracing::debug!(asset, action = kind.label(), ?kind, "engine transition");
    sink.record(ActionEvent {
        asset: asset.to_string(),
        kind,
    });
}

/// An event stamped with the time it was recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedAction {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: ActionEvent,
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to serialize history: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV output is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Recording sink with export to JSON, plain text and CSV.
#[derive(Debug, Clone, Default)]
pub struct ActionHistory {
    actions: Vec<RecordedAction>,
}

impl ActionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actions(&self) -> &[RecordedAction] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }

    /// Pretty-printed JSON array of recorded actions.
    pub fn export_json(&self) -> Result<String, HistoryError> {
        Ok(serde_json::to_string_pretty(&self.actions)?)
    }

    /// One line per action: `[timestamp] label on asset: details`.
    pub fn export_text(&self) -> Result<String, HistoryError> {
        let mut lines = Vec::with_capacity(self.actions.len());
        for action in &self.actions {
            lines.push(format!(
                "[{}] {} on {}: {}",
                action.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
                action.event.kind.label(),
                action.event.asset,
                serde_json::to_string(&action.event.kind)?
            ));
        }
        Ok(lines.join("\n"))
    }

    /// CSV with columns `timestamp, action, asset, details`.
    ///
    /// An empty history exports as an empty string (no header).
    pub fn export_csv(&self) -> Result<String, HistoryError> {
        if self.actions.is_empty() {
            return Ok(String::new());
        }

        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.write_record(["timestamp", "action", "asset", "details"])?;
        for action in &self.actions {
            wtr.write_record([
                action
                    .timestamp
                    .to_rfc3339_opts(SecondsFormat::Millis, true)
                    .as_str(),
                action.event.kind.label(),
                action.event.asset.as_str(),
                serde_json::to_string(&action.event.kind)?.as_str(),
            ])?;
        }
        let data = wtr.into_inner().map_err(|e| e.into_error())?;
        Ok(String::from_utf8(data)?)
    }
}

impl ActionSink for ActionHistory {
    fn record(&mut self, event: ActionEvent) {
        self.actions.push(RecordedAction {
            timestamp: Utc::now(),
            event,
        });
    }
}
