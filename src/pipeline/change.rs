use std::collections::HashMap;

use chrono::{DateTime, Duration, FixedOffset};

use super::aggregate::{self, AggregationSnapshot};
use super::fleet::FleetEvent;

// How long the presentation layer should keep a highlight active.
const SIGNAL_TTL_SECS: i64 = 10;

/// A vessel whose alert count increased since the previous snapshot,
/// with the equipment responsible for its most recent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedVessel {
    pub vessel: String,
    pub equipment: Option<String>,
}

/// Short-lived highlight signal produced once per refresh cycle and
/// discarded when superseded or expired.
#[derive(Debug, Clone)]
pub struct ChangeSignal {
    pub changed: Vec<ChangedVessel>,
    pub expires_at: DateTime<FixedOffset>,
}

impl ChangeSignal {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    pub fn is_active(&self, now: DateTime<FixedOffset>) -> bool {
        !self.changed.is_empty() && now < self.expires_at
    }
}

/// Diffs the current snapshot against the previous cycle's counts.
/// Only strict increases are signalled; decreases happen when events
/// age out of the rolling window and are not alarm-worthy.
pub fn detect_changes(
    current: &AggregationSnapshot,
    previous: &HashMap<String, u32>,
    events: &[FleetEvent],
    roster: &[String],
    now: DateTime<FixedOffset>,
) -> ChangeSignal {
    let mut changed = Vec::new();

    for vessel in roster {
        let current_count = current.counts.get(vessel).copied().unwrap_or(0);
        let previous_count = previous.get(vessel).copied().unwrap_or(0);
        if current_count > previous_count {
            changed.push(ChangedVessel {
                vessel: vessel.clone(),
                equipment: aggregate::most_recent_equipment(events, vessel),
            });
        }
    }

    if !changed.is_empty() {
        log::info!(
            "alert increase on {} vessel(s): {}",
            changed.len(),
            changed
                .iter()
                .map(|c| c.vessel.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    ChangeSignal {
        changed,
        expires_at: now + Duration::seconds(SIGNAL_TTL_SECS),
    }
}
