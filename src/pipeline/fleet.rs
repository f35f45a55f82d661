use chrono::{DateTime, FixedOffset};

use super::resolver;
use super::timeparse::TimedRecord;
use crate::config::FleetConfig;

/// An in-window event attributed to the fleet. `vessel` holds the
/// normalized name when one could be extracted; it is not guaranteed
/// to be a roster entry.
#[derive(Debug, Clone)]
pub struct FleetEvent {
    pub timestamp: DateTime<FixedOffset>,
    pub area: String,
    pub equipment: Option<String>,
    pub alert_type: Option<String>,
    pub vessel: Option<String>,
}

/// Keeps records whose area field contains any fleet marker
/// (case-insensitive), then resolves the vessel name from the same
/// field.
pub fn filter_fleet(
    records: Vec<TimedRecord>,
    config: &FleetConfig,
    diagnostics: &mut Vec<String>,
) -> Vec<FleetEvent> {
    let markers: Vec<String> = config
        .fleet_markers
        .iter()
        .map(|marker| marker.to_uppercase())
        .collect();

    let mut events = Vec::new();
    for TimedRecord { timestamp, record } in records {
        let area_upper = record.area.to_uppercase();
        if !markers.iter().any(|marker| area_upper.contains(marker)) {
            continue;
        }

        let vessel = resolver::extract_vessel_name(&record.area).and_then(|name| {
            resolver::normalize_vessel_name(&name, &config.roster, &config.aliases)
        });

        events.push(FleetEvent {
            timestamp,
            area: record.area,
            equipment: record.equipment,
            alert_type: record.alert_type,
            vessel,
        });
    }

    diagnostics.push(format!("fleet records in window: {}", events.len()));
    events
}
