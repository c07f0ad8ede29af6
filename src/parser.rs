//! Parser for the GDELT 2.0 event export (tab separated, no header row).
//!
//! Columns are read by position. A row with fewer than [`MIN_COLUMNS`] fields
//! is skipped; a field that fails numeric parsing becomes NaN (or `None` for
//! counts) and never drops the row.

use tracing::debug;

use crate::data::{ActionGeo, Actor, Event};

/// Every export row carries at least this many tab-separated fields.
pub const MIN_COLUMNS: usize = 61;

/// Positions of the export columns that are read.
mod col {
    pub const GLOBAL_EVENT_ID: usize = 0;
    pub const DAY: usize = 1;
    pub const MONTH_YEAR: usize = 2;
    pub const YEAR: usize = 3;
    pub const FRACTION_DATE: usize = 4;
    pub const ACTOR1_CODE: usize = 5;
    pub const ACTOR1_NAME: usize = 6;
    pub const ACTOR1_COUNTRY: usize = 7;
    pub const ACTOR2_CODE: usize = 15;
    pub const ACTOR2_NAME: usize = 16;
    pub const ACTOR2_COUNTRY: usize = 17;
    pub const IS_ROOT_EVENT: usize = 25;
    pub const EVENT_CODE: usize = 26;
    pub const EVENT_BASE_CODE: usize = 27;
    // 28 is EventRootCode; the root code is derived from EVENT_CODE instead.
    pub const QUAD_CLASS: usize = 29;
    pub const GOLDSTEIN_SCALE: usize = 30;
    pub const NUM_MENTIONS: usize = 31;
    pub const NUM_SOURCES: usize = 32;
    pub const NUM_ARTICLES: usize = 33;
    pub const AVG_TONE: usize = 34;
    pub const ACTION_GEO_FULL_NAME: usize = 52;
    pub const ACTION_GEO_COUNTRY: usize = 53;
    pub const ACTION_GEO_LAT: usize = 56;
    pub const ACTION_GEO_LONG: usize = 57;
    pub const DATE_ADDED: usize = 59;
    pub const SOURCE_URL: usize = 60;
}

/// Parse the decompressed export text into events, preserving row order.
pub fn parse_events(raw: &str) -> Vec<Event> {
    let mut events = Vec::new();
    let mut skipped = 0usize;

    for row in raw.split('\n') {
        let row = row.strip_suffix('\r').unwrap_or(row);
        match parse_row(row) {
            Some(event) => events.push(event),
            None => skipped += 1,
        }
    }

    debug!(parsed = events.len(), skipped, "parsed export rows");
    events
}

/// Parse one row, `None` if it is too short.
pub fn parse_row(row: &str) -> Option<Event> {
    let columns: Vec<&str> = row.split('\t').collect();
    if columns.len() < MIN_COLUMNS {
        return None;
    }

    let mut actor1 = actor(columns[col::ACTOR1_CODE], columns[col::ACTOR1_NAME]);
    let mut actor2 = actor(columns[col::ACTOR2_CODE], columns[col::ACTOR2_NAME]);
    let own1 = own_country_code(columns[col::ACTOR1_COUNTRY], columns[col::ACTOR1_CODE]);
    let own2 = own_country_code(columns[col::ACTOR2_COUNTRY], columns[col::ACTOR2_CODE]);

    // Bloc fallback: an actor without its own country takes the other's.
    // Codes that exist but name no known country are borrowed over at
    // resolution time.
    actor1.country_borrowed = own1.is_none() && own2.is_some();
    actor2.country_borrowed = own2.is_none() && own1.is_some();
    actor1.country_code = own1.clone().or_else(|| own2.clone());
    actor2.country_code = own2.or(own1);

    let event_code = columns[col::EVENT_CODE].trim().to_string();

    Some(Event {
        global_event_id: columns[col::GLOBAL_EVENT_ID].to_string(),
        day: columns[col::DAY].to_string(),
        month_year: columns[col::MONTH_YEAR].to_string(),
        year: columns[col::YEAR].to_string(),
        fraction_date: parse_float(columns[col::FRACTION_DATE]),
        actor1,
        actor2,
        is_root_event: columns[col::IS_ROOT_EVENT].trim() == "1",
        event_root_code: root_code(&event_code),
        event_code,
        event_base_code: columns[col::EVENT_BASE_CODE].to_string(),
        quad_class: columns[col::QUAD_CLASS].trim().parse().ok(),
        goldstein_scale: parse_float(columns[col::GOLDSTEIN_SCALE]),
        num_mentions: parse_count(columns[col::NUM_MENTIONS]),
        num_sources: parse_count(columns[col::NUM_SOURCES]),
        num_articles: parse_count(columns[col::NUM_ARTICLES]),
        avg_tone: parse_float(columns[col::AVG_TONE]),
        action_geo: ActionGeo {
            full_name: non_empty(columns[col::ACTION_GEO_FULL_NAME]),
            country_code: non_empty(columns[col::ACTION_GEO_COUNTRY]),
            lat: parse_coordinate(columns[col::ACTION_GEO_LAT]),
            lng: parse_coordinate(columns[col::ACTION_GEO_LONG]),
        },
        date_added: columns[col::DATE_ADDED].to_string(),
        source_url: columns[col::SOURCE_URL].trim().to_string(),
    })
}

/// First two characters of the event code; `None` for an empty code.
pub fn root_code(event_code: &str) -> Option<String> {
    if event_code.is_empty() {
        None
    } else {
        Some(event_code.chars().take(2).collect())
    }
}

fn actor(code: &str, name: &str) -> Actor {
    Actor {
        code: non_empty(code),
        name: non_empty(name),
        ..Actor::default()
    }
}

/// The country column when present, else the three-letter prefix of the
/// actor code (CAMEO actor codes lead with the country).
fn own_country_code(country: &str, actor_code: &str) -> Option<String> {
    non_empty(country).or_else(|| {
        let code = actor_code.trim();
        let prefix: String = code.chars().take(3).collect();
        (prefix.chars().count() == 3).then_some(prefix)
    })
}

fn non_empty(field: &str) -> Option<String> {
    let field = field.trim();
    (!field.is_empty()).then(|| field.to_string())
}

fn parse_float(field: &str) -> f64 {
    field.trim().parse().unwrap_or(f64::NAN)
}

fn parse_count(field: &str) -> Option<u32> {
    field.trim().parse().ok()
}

fn parse_coordinate(field: &str) -> Option<f64> {
    let value = parse_float(field);
    value.is_finite().then_some(value)
}
