use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

pub const MIN_REFRESH_SECS: u64 = 30;
pub const MAX_REFRESH_SECS: u64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FleetConfig {
    /// Spreadsheet document id of the alert feed.
    pub sheet_id: String,
    /// Canonical vessel roster, in display order. Fuzzy name
    /// resolution breaks ties by roster position.
    pub roster: Vec<String>,
    /// Alias table mapping common alternate spellings to roster names.
    pub aliases: HashMap<String, String>,
    /// Substrings identifying fleet records in the area field.
    pub fleet_markers: Vec<String>,
    pub window_hours: i64,
    pub refresh_secs: u64,
    pub fetch_timeout_secs: u64,
    pub cache_ttl_secs: u64,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            sheet_id: "1kt9igSja2pUTTwzVvWGmGptErH3FUviSb1bymsOx0iU".to_string(),
            roster: [
                "MILENA A",
                "MARIA DEL MAR",
                "ROSA F",
                "BP RICKY A",
                "MILAGROS A",
                "EL MARQUEZ",
                "ROBERTO A",
                "MARIA EULOGIA",
                "ELIZABETH F",
                "GLORIA A",
                "VIA SIMOUN",
                "DRENNEC",
                "GABRIELA A",
                "GURIA",
                "RAFA A",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            aliases: [
                ("RICKY A", "BP RICKY A"),
                ("BP RICKY", "BP RICKY A"),
                ("RICK A", "BP RICKY A"),
                ("MARIA D MAR", "MARIA DEL MAR"),
                ("MARIA D EL MAR", "MARIA DEL MAR"),
                ("ELIZABETH", "ELIZABETH F"),
                ("ROSA", "ROSA F"),
                ("MILENA", "MILENA A"),
                ("MILAGROS", "MILAGROS A"),
                ("GLORIA", "GLORIA A"),
                ("ROBERTO", "ROBERTO A"),
                ("GABRIELA", "GABRIELA A"),
                ("RAFA", "RAFA A"),
            ]
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect(),
            // Matching is case-insensitive, one casing per marker is enough.
            fleet_markers: vec![
                "🐟".to_string(),
                "FLOTA ATUNERA".to_string(),
                "ATUNERA".to_string(),
            ],
            window_hours: 24,
            refresh_secs: 60,
            fetch_timeout_secs: 30,
            cache_ttl_secs: 60,
        }
    }
}

impl FleetConfig {
    fn try_init_from_string(raw: &str) -> Result<Self, ConfigError> {
        let config: FleetConfig = toml::from_str(raw)?;
        Ok(config.clamped())
    }

    /// Loads the config file named on the command line, falling back to
    /// the compiled-in defaults when the file does not exist.
    pub fn try_init() -> Result<Self, ConfigError> {
        let args = crate::cli::get_cli_args();
        let mut config = match std::fs::read_to_string(&args.config) {
            Ok(raw) => Self::try_init_from_string(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("no config file at {:?}, using defaults", args.config);
                Self::default()
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(refresh) = args.refresh {
            config.refresh_secs = refresh;
            config = config.clamped();
        }

        Ok(config)
    }

    fn clamped(mut self) -> Self {
        let requested = self.refresh_secs;
        self.refresh_secs = requested.clamp(MIN_REFRESH_SECS, MAX_REFRESH_SECS);
        if self.refresh_secs != requested {
            log::warn!(
                "refresh interval {requested}s out of range, clamped to {}s",
                self.refresh_secs
            );
        }
        self
    }

    pub fn export_url(&self) -> String {
        format!(
            "https://docs.google.com/spreadsheets/d/{}/export?format=csv",
            self.sheet_id
        )
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
