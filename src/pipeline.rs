//! Turns fetched cycle data into the immutable snapshot the renderer reads.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::aggregate::{aggregate, country_polygons, CountryPolygon, DominantCategory};
use crate::config::RenderConfig;
use crate::data::{Event, RenderableArc, RenderablePoint};
use crate::fetch::CycleData;
use crate::geo::GeoResolver;
use crate::parser::parse_events;
use crate::reference::ReferenceData;
use crate::table::{build_table, TableView};

/// Everything one cycle produced. Replaced whole, never patched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub archive_url: Option<String>,
    pub archive_time: Option<DateTime<Utc>>,
    pub next_update: Option<DateTime<Utc>>,
    pub events: Vec<Event>,
    pub arcs: Vec<RenderableArc>,
    pub points: Vec<RenderablePoint>,
    /// Dominant category per country code.
    pub dominant: BTreeMap<String, DominantCategory>,
    pub polygons: Vec<CountryPolygon>,
    pub table: TableView,
}

impl Snapshot {
    /// Snapshot of a failed cycle: no data, the error in place of the table.
    pub fn failed(message: impl std::fmt::Display) -> Self {
        Self {
            table: TableView::error(message),
            ..Self::default()
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.table, TableView::Error { .. })
    }
}

/// Resolve, aggregate and tabulate already-parsed events.
pub fn build_snapshot(mut events: Vec<Event>, reference: &ReferenceData, render: &RenderConfig) -> Snapshot {
    GeoResolver::new(&reference.countries).resolve_events(&mut events);

    let aggregation = aggregate(&events, reference, render);
    let table = build_table(&events, &aggregation.rendered, reference);
    let polygons = country_polygons(&reference.boundaries, &aggregation.dominant);

    Snapshot {
        archive_url: None,
        archive_time: None,
        next_update: None,
        arcs: aggregation.arcs,
        points: aggregation.points,
        dominant: aggregation.dominant,
        polygons,
        table,
        events,
    }
}

/// Parse raw export text straight through to a snapshot.
pub fn process_text(raw: &str, reference: &ReferenceData, render: &RenderConfig) -> Snapshot {
    build_snapshot(parse_events(raw), reference, render)
}

pub fn process_cycle(data: CycleData, render: &RenderConfig) -> Snapshot {
    let mut snapshot = build_snapshot(data.events, &data.reference, render);
    snapshot.archive_url = Some(data.archive_url);
    snapshot.archive_time = data.archive_time;
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::tests::reference;

    #[test]
    fn test_failed_snapshot_carries_no_data() {
        let snapshot = Snapshot::failed("boom");
        assert!(snapshot.is_failed());
        assert!(snapshot.events.is_empty());
        assert!(snapshot.arcs.is_empty());
        assert!(snapshot.polygons.is_empty());
    }

    #[test]
    fn test_empty_feed_gives_empty_table() {
        let snapshot = process_text("", &reference(), &RenderConfig::default());
        assert!(snapshot.events.is_empty());
        assert!(matches!(snapshot.table, TableView::Empty { .. }));
        assert!(!snapshot.is_failed());
        assert_eq!(snapshot.polygons.len(), 2);
    }

    #[test]
    fn test_snapshot_serializes_for_renderer() {
        let snapshot = Snapshot::failed("boom");
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["table"]["kind"], "error");
        assert_eq!(json["table"]["message"], "エラー: boom");
        assert_eq!(json["table"]["colspan"], 5);
        assert!(json["arcs"].as_array().unwrap().is_empty());
    }
}
