use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};

use super::fleet::FleetEvent;

/// Placeholder labels for rows without an equipment or alert-type
/// field, matching what the feed's operators expect to see.
pub const UNSPECIFIED_EQUIPMENT: &str = "SIN ACTIVO";
pub const UNSPECIFIED_ALERT: &str = "SIN ALERTA";

// A vessel counts toward the "critical" fleet statistic from this many
// alerts in the window.
const CRITICAL_STAT_THRESHOLD: u32 = 3;

/// Display severity tier for a vessel's rolling-window alert count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Clear,
    Alert,
    Critical,
    CriticalMax,
}

impl Severity {
    pub fn for_count(count: u32) -> Self {
        match count {
            0 => Self::Clear,
            1..=6 => Self::Alert,
            7..=10 => Self::Critical,
            _ => Self::CriticalMax,
        }
    }
}

impl AsRef<str> for Severity {
    fn as_ref(&self) -> &str {
        match self {
            Self::Clear => "clear",
            Self::Alert => "alert",
            Self::Critical => "critical",
            Self::CriticalMax => "critical_max",
        }
    }
}

/// One complete aggregation over a refresh cycle. Superseded wholesale
/// by the next cycle's snapshot, never mutated incrementally.
#[derive(Debug, Clone)]
pub struct AggregationSnapshot {
    pub taken_at: DateTime<FixedOffset>,
    /// Alert count per canonical vessel. Every roster vessel is
    /// present, vessels without events at 0.
    pub counts: HashMap<String, u32>,
    /// In-window fleet events whose vessel could not be mapped to a
    /// roster entry.
    pub unresolved: u32,
    pub diagnostics: Vec<String>,
}

/// Fleet-level statistics derived from a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FleetStats {
    pub total_alerts: u32,
    pub vessels_alerting: u32,
    pub vessels_critical: u32,
    pub unresolved: u32,
}

impl AggregationSnapshot {
    pub fn severity(&self, vessel: &str) -> Option<Severity> {
        self.counts.get(vessel).map(|count| Severity::for_count(*count))
    }

    pub fn stats(&self) -> FleetStats {
        let identified: u32 = self.counts.values().sum();
        FleetStats {
            total_alerts: identified + self.unresolved,
            vessels_alerting: self.counts.values().filter(|c| **c > 0).count() as u32,
            vessels_critical: self
                .counts
                .values()
                .filter(|c| **c >= CRITICAL_STAT_THRESHOLD)
                .count() as u32,
            unresolved: self.unresolved,
        }
    }
}

/// Builds the per-vessel count map for one cycle. Events resolved to a
/// roster vessel are counted under it, everything else lands in the
/// unresolved bucket.
pub fn build_snapshot(
    events: &[FleetEvent],
    roster: &[String],
    now: DateTime<FixedOffset>,
    mut diagnostics: Vec<String>,
) -> AggregationSnapshot {
    let mut counts: HashMap<String, u32> =
        roster.iter().map(|vessel| (vessel.clone(), 0)).collect();
    let mut unresolved = 0u32;

    for event in events {
        match event.vessel.as_ref().and_then(|name| counts.get_mut(name)) {
            Some(count) => *count += 1,
            None => unresolved += 1,
        }
    }

    let identified: u32 = counts.values().sum();
    diagnostics.push(format!("events with vessel identified: {identified}"));
    diagnostics.push(format!("events without vessel: {unresolved}"));
    diagnostics.push(format!("total fleet alerts in window: {}", identified + unresolved));

    AggregationSnapshot {
        taken_at: now,
        counts,
        unresolved,
        diagnostics,
    }
}

/// One row of the per-vessel detail table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRow {
    pub equipment: String,
    pub alert_type: String,
    pub count: u32,
}

fn label(value: &Option<String>, placeholder: &str) -> String {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => placeholder.to_string(),
    }
}

/// Groups one vessel's events by (equipment, alert type) and counts
/// them, sorted by count descending. Ties break on equipment then
/// alert type so the ordering is deterministic.
pub fn vessel_detail(events: &[FleetEvent], vessel: &str) -> Vec<DetailRow> {
    let mut groups: HashMap<(String, String), u32> = HashMap::new();

    for event in events.iter().filter(|e| e.vessel.as_deref() == Some(vessel)) {
        let key = (
            label(&event.equipment, UNSPECIFIED_EQUIPMENT),
            label(&event.alert_type, UNSPECIFIED_ALERT),
        );
        *groups.entry(key).or_insert(0) += 1;
    }

    let mut rows: Vec<DetailRow> = groups
        .into_iter()
        .map(|((equipment, alert_type), count)| DetailRow {
            equipment,
            alert_type,
            count,
        })
        .collect();

    rows.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.equipment.cmp(&b.equipment))
            .then_with(|| a.alert_type.cmp(&b.alert_type))
    });

    rows
}

/// Equipment of the vessel's most recent in-window event, or `None` if
/// the vessel has no events or the latest one has no equipment field.
pub fn most_recent_equipment(events: &[FleetEvent], vessel: &str) -> Option<String> {
    events
        .iter()
        .filter(|e| e.vessel.as_deref() == Some(vessel))
        .max_by_key(|e| e.timestamp)
        .and_then(|e| e.equipment.as_deref())
        .map(|equipment| equipment.trim().to_string())
        .filter(|equipment| !equipment.is_empty())
}
