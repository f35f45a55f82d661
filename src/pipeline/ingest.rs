use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::FleetConfig;

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error {0}")]
    Status(u16),
    #[error("timeout contacting the feed")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::Timeout;
        }
        if let Some(status) = e.status() {
            return Self::Status(status.as_u16());
        }
        Self::Transport(e.to_string())
    }
}

#[derive(Error, Debug)]
#[error("required columns missing, available: [{}]", available.join(", "))]
pub struct SchemaError {
    pub available: Vec<String>,
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// One row of the feed after column aliases have been resolved.
/// Downstream components never look fields up by column name.
#[derive(Debug, Clone)]
pub struct RawEventRecord {
    pub timestamp_raw: String,
    pub area: String,
    pub equipment: Option<String>,
    pub alert_type: Option<String>,
}

// Column headings vary across feed versions. Each logical field is
// resolved through its alias list, first hit wins.
const TIMESTAMP_ALIASES: &[&str] = &["Fecha", "FECHA", "fecha", "FECHA Y HORA", "Fecha y hora"];
const AREA_ALIASES: &[&str] = &[
    "Área",
    "Area",
    "ÁREA",
    "AREA",
    "Área de Alerta",
    "AREA DE ALERTA",
];
const EQUIPMENT_ALIASES: &[&str] = &["Activo", "ACTIVO", "activo", "Equipo", "EQUIPO", "equipo"];
const ALERT_TYPE_ALIASES: &[&str] = &[
    "Alerta",
    "ALERTA",
    "alerta",
    "Tipo de Alerta",
    "TIPO DE ALERTA",
    "Tipo de alerta",
];

struct ColumnMap {
    timestamp: usize,
    area: usize,
    equipment: Option<usize>,
    alert_type: Option<usize>,
}

fn find_column(header: &[String], aliases: &[&str]) -> Option<usize> {
    aliases
        .iter()
        .find_map(|alias| header.iter().position(|h| h.trim() == *alias))
}

fn resolve_columns(header: &[String]) -> std::result::Result<ColumnMap, SchemaError> {
    let timestamp = find_column(header, TIMESTAMP_ALIASES);
    let area = find_column(header, AREA_ALIASES);

    match (timestamp, area) {
        (Some(timestamp), Some(area)) => Ok(ColumnMap {
            timestamp,
            area,
            equipment: find_column(header, EQUIPMENT_ALIASES),
            alert_type: find_column(header, ALERT_TYPE_ALIASES),
        }),
        _ => Err(SchemaError {
            available: header.iter().map(|h| h.trim().to_string()).collect(),
        }),
    }
}

/// Splits a CSV payload into rows of fields. Quoted fields may contain
/// commas, newlines and doubled quotes.
fn parse_rows(payload: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;

    let mut chars = payload.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            _ => field.push(c),
        }
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    rows
}

fn optional_field(row: &[String], index: Option<usize>) -> Option<String> {
    let value = row.get(index?)?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Parses the delimited payload into records, resolving column aliases
/// from the header row first.
pub fn parse_records(payload: &str) -> std::result::Result<Vec<RawEventRecord>, SchemaError> {
    let mut rows = parse_rows(payload).into_iter();
    let header = rows.next().unwrap_or_default();
    let columns = resolve_columns(&header)?;

    let records = rows
        .filter(|row| row.iter().any(|field| !field.trim().is_empty()))
        .map(|row| RawEventRecord {
            timestamp_raw: row
                .get(columns.timestamp)
                .map(|f| f.trim().to_string())
                .unwrap_or_default(),
            area: row
                .get(columns.area)
                .map(|f| f.trim().to_string())
                .unwrap_or_default(),
            equipment: optional_field(&row, columns.equipment),
            alert_type: optional_field(&row, columns.alert_type),
        })
        .collect();

    Ok(records)
}

/// Single-slot payload cache with a TTL. The slot lock is held across
/// the fetch, so concurrent callers inside the TTL window observe the
/// same payload and at most one request is in flight at a time.
pub struct FetchCache {
    ttl: Duration,
    slot: Mutex<Option<(Instant, Arc<str>)>>,
}

impl FetchCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> std::result::Result<Arc<str>, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<String, FetchError>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some((fetched_at, payload)) = slot.as_ref() {
            if fetched_at.elapsed() < self.ttl {
                return Ok(Arc::clone(payload));
            }
        }

        let payload: Arc<str> = fetch().await?.into();
        *slot = Some((Instant::now(), Arc::clone(&payload)));
        Ok(payload)
    }
}

pub struct FeedClient {
    http: reqwest::Client,
    url: String,
    cache: FetchCache,
}

impl FeedClient {
    pub fn new(config: &FleetConfig) -> std::result::Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(config.fetch_timeout())
            .build()?;

        Ok(Self {
            http,
            url: config.export_url(),
            cache: FetchCache::new(config.cache_ttl()),
        })
    }

    pub async fn fetch_records(&self) -> Result<Vec<RawEventRecord>> {
        let payload = self.cache.get_or_fetch(|| self.fetch_payload()).await?;
        Ok(parse_records(&payload)?)
    }

    async fn fetch_payload(&self) -> std::result::Result<String, FetchError> {
        log::debug!("fetching feed from {}", self.url);
        let response = self.http.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        Ok(response.text().await?)
    }
}
