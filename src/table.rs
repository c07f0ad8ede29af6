//! Event table view models.

use serde::Serialize;

use crate::color::{goldstein_background_color, Color};
use crate::data::{Event, NOT_AVAILABLE};
use crate::geo::GeoResolver;
use crate::reference::ReferenceData;

/// Column count; error and empty rows span all of them.
pub const TABLE_COLUMNS: usize = 5;

pub const EMPTY_MESSAGE: &str = "表示可能なイベントが見つかりませんでした。";
const UNKNOWN_SUBJECT: &str = "不明な主体";
const UNKNOWN_OBJECT: &str = "不明な対象";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    /// `YYYY-MM-DD`
    pub date: String,
    pub actor_summary: String,
    pub action_summary: String,
    pub event_label: String,
    pub source_link: Option<String>,
    pub background: Color,
    /// Position of the event in the parsed sequence.
    pub index: usize,
    pub actor1_country: Option<String>,
    pub actor2_country: Option<String>,
    pub root_code: Option<String>,
}

/// What the table shows after a cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TableView {
    Rows { rows: Vec<TableRow> },
    Empty { message: String, colspan: usize },
    Error { message: String, colspan: usize },
}

impl Default for TableView {
    fn default() -> Self {
        TableView::Empty {
            message: EMPTY_MESSAGE.to_string(),
            colspan: TABLE_COLUMNS,
        }
    }
}

impl TableView {
    pub fn error(message: impl std::fmt::Display) -> Self {
        TableView::Error {
            message: format!("エラー: {}", message),
            colspan: TABLE_COLUMNS,
        }
    }

    pub fn rows(&self) -> &[TableRow] {
        match self {
            TableView::Rows { rows } => rows,
            _ => &[],
        }
    }

    pub fn filtered<'a>(&'a self, filter: &'a TableFilter) -> impl Iterator<Item = &'a TableRow> + 'a {
        self.rows().iter().filter(move |row| filter.matches(row))
    }
}

/// Row filter; unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableFilter {
    /// Matches either actor's country.
    pub country: Option<String>,
    pub root_code: Option<String>,
}

impl TableFilter {
    pub fn matches(&self, row: &TableRow) -> bool {
        let country_ok = self.country.as_ref().map_or(true, |c| {
            row.actor1_country.as_ref() == Some(c) || row.actor2_country.as_ref() == Some(c)
        });
        let root_ok = self
            .root_code
            .as_ref()
            .map_or(true, |r| row.root_code.as_ref() == Some(r));
        country_ok && root_ok
    }
}

/// One row per drawn event, in the order given.
pub fn build_table(events: &[Event], rendered: &[usize], reference: &ReferenceData) -> TableView {
    let geo = GeoResolver::new(&reference.countries);
    let rows: Vec<TableRow> = rendered
        .iter()
        .filter_map(|&index| events.get(index).map(|e| table_row(e, index, &geo, reference)))
        .collect();

    if rows.is_empty() {
        TableView::default()
    } else {
        TableView::Rows { rows }
    }
}

pub fn table_row(event: &Event, index: usize, geo: &GeoResolver<'_>, reference: &ReferenceData) -> TableRow {
    let country_name = |code: Option<&str>| -> String {
        code.map(|c| geo.display_name(c).unwrap_or(c))
            .unwrap_or(NOT_AVAILABLE)
            .to_string()
    };
    let a1 = &event.actor1;
    let a2 = &event.actor2;

    let event_label = reference
        .cameo_name(Some(&event.event_code))
        .map(str::to_string)
        .or_else(|| (!event.event_code.is_empty()).then(|| event.event_code.clone()))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    TableRow {
        date: format_day(&event.day),
        actor_summary: format!(
            "{} → {}",
            country_name(a1.country_code.as_deref()),
            country_name(a2.country_code.as_deref())
        ),
        action_summary: format!(
            "{}が{}に対し行動",
            a1.name.as_deref().or(a1.code.as_deref()).unwrap_or(UNKNOWN_SUBJECT),
            a2.name.as_deref().or(a2.code.as_deref()).unwrap_or(UNKNOWN_OBJECT)
        ),
        event_label,
        source_link: event.source_link().map(str::to_string),
        background: goldstein_background_color(event.goldstein_scale),
        index,
        actor1_country: a1.country_code.clone(),
        actor2_country: a2.country_code.clone(),
        root_code: event.event_root_code.clone(),
    }
}

/// `20240101` -> `2024-01-01`. Anything not shaped like a date is shown raw.
pub fn format_day(day: &str) -> String {
    let day = day.trim();
    if day.is_empty() {
        return NOT_AVAILABLE.to_string();
    }
    match (day.get(0..4), day.get(4..6), day.get(6..8)) {
        (Some(y), Some(m), Some(d)) if day.len() == 8 && day.bytes().all(|b| b.is_ascii_digit()) => {
            format!("{}-{}-{}", y, m, d)
        }
        _ => day.to_string(),
    }
}
