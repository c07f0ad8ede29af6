//! Splits resolved events into arcs and points, spreads co-located points,
//! and tallies each country's dominant event category.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::color::{event_root_code_color, Color, NEUTRAL_POLYGON};
use crate::config::RenderConfig;
use crate::data::{
    Actor, Event, RenderableArc, RenderablePoint, NOT_AVAILABLE, UNKNOWN_CATEGORY_LABEL,
    UNKNOWN_DETAIL_LABEL,
};
use crate::geo::GeoResolver;
use crate::reference::{CountryBoundary, ReferenceData};

/// How an event is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement<'e> {
    /// Arc from actor1's country to actor2's.
    Bilateral { start: (f64, f64), end: (f64, f64) },
    /// Point at the given actor's country.
    Single(&'e Actor),
    /// Neither actor has a known location.
    Unplaced,
}

/// The category a country sees most often among its single-actor events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DominantCategory {
    pub root_code: String,
    pub count: u32,
    pub fill: Color,
}

/// Boundary feature with its area tint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryPolygon {
    pub iso_a3: Option<String>,
    pub admin: Option<String>,
    pub dominant_root_code: Option<String>,
    pub fill: Color,
    pub feature: geojson::Feature,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregation {
    pub arcs: Vec<RenderableArc>,
    pub points: Vec<RenderablePoint>,
    /// Keyed by country code.
    pub dominant: BTreeMap<String, DominantCategory>,
    /// Indices of every drawn event (arc or point), in input order.
    pub rendered: Vec<usize>,
}

/// Decide how to draw an event from its resolved actors.
///
/// Bilateral needs two distinct, resolvable country codes. A borrowed code
/// equals the partner's, so bloc actors always land here as points.
/// Otherwise the event is a point at the first actor that is a place, or
/// failing that the first actor with any coordinate.
pub fn classify(event: &Event) -> Placement<'_> {
    let (a1, a2) = (&event.actor1, &event.actor2);

    if let (Some(c1), Some(c2), Some(start), Some(end)) = (
        a1.country_code.as_deref(),
        a2.country_code.as_deref(),
        a1.coordinates(),
        a2.coordinates(),
    ) {
        if c1 != c2 {
            return Placement::Bilateral { start, end };
        }
    }

    [a1, a2]
        .into_iter()
        .find(|a| a.is_place && a.coordinates().is_some())
        .or_else(|| [a1, a2].into_iter().find(|a| a.coordinates().is_some()))
        .map_or(Placement::Unplaced, Placement::Single)
}

/// Spiral offset for the `n`th (1-based) marker at one coordinate.
pub fn jitter(lat: f64, lng: f64, n: u32) -> (f64, f64) {
    let n = f64::from(n);
    (
        lat + n.sin() * 0.2 * n / 3.0,
        lng + n.cos() * 0.4 * n / 3.0,
    )
}

/// Running count of markers per exact coordinate.
#[derive(Debug, Default)]
pub struct Occupancy {
    seen: HashMap<(u64, u64), u32>,
}

impl Occupancy {
    /// Register one more marker at `(lat, lng)` and return where to draw it.
    pub fn place(&mut self, lat: f64, lng: f64) -> (f64, f64) {
        let n = self.seen.entry((lat.to_bits(), lng.to_bits())).or_insert(0);
        *n += 1;
        jitter(lat, lng, *n)
    }
}

/// Per-country tally of root categories.
#[derive(Debug, Default)]
pub struct CategoryTally {
    counts: HashMap<String, BTreeMap<String, u32>>,
}

impl CategoryTally {
    pub fn record(&mut self, country: &str, root_code: &str) {
        *self
            .counts
            .entry(country.to_string())
            .or_default()
            .entry(root_code.to_string())
            .or_insert(0) += 1;
    }

    /// Highest count per country; ties go to the lowest root code.
    pub fn dominant(&self, alpha: f64) -> BTreeMap<String, DominantCategory> {
        self.counts
            .iter()
            .filter_map(|(country, by_root)| {
                let mut best: Option<(&String, u32)> = None;
                for (root, &count) in by_root {
                    if best.map_or(true, |(_, top)| count > top) {
                        best = Some((root, count));
                    }
                }
                let (root, count) = best?;
                Some((
                    country.clone(),
                    DominantCategory {
                        root_code: root.clone(),
                        count,
                        fill: event_root_code_color(Some(root)).with_alpha(alpha),
                    },
                ))
            })
            .collect()
    }
}

pub fn aggregate(events: &[Event], reference: &ReferenceData, render: &RenderConfig) -> Aggregation {
    let geo = GeoResolver::new(&reference.countries);
    let mut out = Aggregation::default();
    let mut occupancy = Occupancy::default();
    let mut tally = CategoryTally::default();

    for (index, event) in events.iter().enumerate() {
        let color = render
            .color_scheme
            .event_color(event.event_root_code.as_deref(), event.avg_tone);

        match classify(event) {
            Placement::Bilateral { start, end } => {
                out.arcs.push(RenderableArc {
                    start_lat: start.0,
                    start_lng: start.1,
                    end_lat: end.0,
                    end_lng: end.1,
                    color,
                    label: arc_label(event, reference),
                    event: event.clone(),
                    index,
                });
            }
            Placement::Single(actor) => {
                let Some((lat, lng)) = actor.coordinates() else {
                    continue;
                };
                let (lat, lng) = occupancy.place(lat, lng);
                if let (Some(country), Some(root)) =
                    (actor.country_code.as_deref(), event.event_root_code.as_deref())
                {
                    tally.record(country, root);
                }
                out.points.push(RenderablePoint {
                    lat,
                    lng,
                    size: render.point_size,
                    color,
                    label: point_label(event, actor, &geo, reference),
                    event: event.clone(),
                    index,
                });
            }
            Placement::Unplaced => continue,
        }
        out.rendered.push(index);
    }

    out.dominant = tally.dominant(render.polygon_alpha);
    out
}

/// Tint every boundary by its country's dominant category.
pub fn country_polygons(
    boundaries: &[CountryBoundary],
    dominant: &BTreeMap<String, DominantCategory>,
) -> Vec<CountryPolygon> {
    boundaries
        .iter()
        .map(|boundary| {
            let top = boundary.iso_a3.as_deref().and_then(|iso| dominant.get(iso));
            CountryPolygon {
                iso_a3: boundary.iso_a3.clone(),
                admin: boundary.admin.clone(),
                dominant_root_code: top.map(|d| d.root_code.clone()),
                fill: top.map_or(NEUTRAL_POLYGON, |d| d.fill),
                feature: boundary.feature.clone(),
            }
        })
        .collect()
}

fn category_lines(event: &Event, reference: &ReferenceData) -> String {
    let root = event.event_root_code.as_deref();
    format!(
        "カテゴリ: {} ({})\nイベント詳細: {}",
        reference.cameo_name(root).unwrap_or(UNKNOWN_CATEGORY_LABEL),
        root.unwrap_or(NOT_AVAILABLE),
        reference
            .cameo_name(Some(&event.event_code))
            .unwrap_or(UNKNOWN_DETAIL_LABEL),
    )
}

fn arc_label(event: &Event, reference: &ReferenceData) -> String {
    format!(
        "関係: {} → {}\n{}",
        event.actor1.display(),
        event.actor2.display(),
        category_lines(event, reference)
    )
}

fn point_label(event: &Event, actor: &Actor, geo: &GeoResolver<'_>, reference: &ReferenceData) -> String {
    let place = actor
        .country_code
        .as_deref()
        .map(|c| geo.display_name(c).unwrap_or(c))
        .unwrap_or(NOT_AVAILABLE);
    format!(
        "場所: {} ({})\n{}",
        place,
        actor.display(),
        category_lines(event, reference)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::tests::reference;

    fn actor(country: Option<&str>, coords: Option<(f64, f64)>, is_place: bool) -> Actor {
        Actor {
            country_code: country.map(str::to_string),
            lat: coords.map(|c| c.0),
            lng: coords.map(|c| c.1),
            is_place,
            ..Actor::default()
        }
    }

    fn event(a1: Actor, a2: Actor, code: &str) -> Event {
        Event {
            actor1: a1,
            actor2: a2,
            event_code: code.to_string(),
            event_root_code: crate::parser::root_code(code),
            goldstein_scale: f64::NAN,
            avg_tone: f64::NAN,
            ..Event::default()
        }
    }

    const USA: (f64, f64) = (38.0, -97.0);
    const CHN: (f64, f64) = (35.0, 105.0);

    #[test]
    fn test_distinct_countries_are_bilateral() {
        let e = event(
            actor(Some("USA"), Some(USA), true),
            actor(Some("CHN"), Some(CHN), true),
            "042",
        );
        assert_eq!(classify(&e), Placement::Bilateral { start: USA, end: CHN });
    }

    #[test]
    fn test_same_country_is_single() {
        let e = event(
            actor(Some("USA"), Some(USA), true),
            actor(Some("USA"), Some(USA), false),
            "010",
        );
        assert_eq!(classify(&e), Placement::Single(&e.actor1));
    }

    #[test]
    fn test_borrowed_partner_is_never_an_arc() {
        let mut borrowed = actor(Some("CHN"), Some(CHN), false);
        borrowed.country_borrowed = true;
        let e = event(borrowed, actor(Some("CHN"), Some(CHN), true), "190");
        assert_eq!(classify(&e), Placement::Single(&e.actor2));
    }

    #[test]
    fn test_missing_country_uses_other_actor() {
        let e = event(actor(None, None, false), actor(Some("CHN"), Some(CHN), true), "190");
        assert_eq!(classify(&e), Placement::Single(&e.actor2));

        let lost = event(actor(None, None, false), actor(Some("EUR"), None, false), "190");
        assert_eq!(classify(&lost), Placement::Unplaced);
    }

    #[test]
    fn test_place_preferred_over_placeholder() {
        let e = event(
            actor(Some("USA"), Some(USA), false),
            actor(Some("CHN"), None, true),
            "010",
        );
        // actor2 is flagged a place but has no coordinates, so actor1 it is
        assert_eq!(classify(&e), Placement::Single(&e.actor1));

        let unresolved_partner = event(
            actor(Some("XXX"), None, false),
            actor(Some("CHN"), Some(CHN), true),
            "010",
        );
        assert_eq!(classify(&unresolved_partner), Placement::Single(&unresolved_partner.actor2));
    }

    #[test]
    fn test_jitter_is_a_deterministic_spiral() {
        let mut occupancy = Occupancy::default();
        let first = occupancy.place(CHN.0, CHN.1);
        let second = occupancy.place(CHN.0, CHN.1);
        let elsewhere = occupancy.place(USA.0, USA.1);

        assert_eq!(first, jitter(CHN.0, CHN.1, 1));
        assert_eq!(second, jitter(CHN.0, CHN.1, 2));
        assert_eq!(elsewhere, jitter(USA.0, USA.1, 1));
        assert_ne!(second, first);
        assert_ne!(second, CHN);

        let (lat, lng) = jitter(0.0, 0.0, 2);
        assert!((lat - 2f64.sin() * 0.2 * 2.0 / 3.0).abs() < 1e-12);
        assert!((lng - 2f64.cos() * 0.4 * 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_dominant_category_ties_go_to_lowest_code() {
        let mut tally = CategoryTally::default();
        tally.record("USA", "19");
        tally.record("USA", "04");
        tally.record("USA", "19");
        tally.record("USA", "04");
        tally.record("CHN", "14");
        tally.record("CHN", "03");
        tally.record("CHN", "14");

        let dominant = tally.dominant(0.25);
        assert_eq!(dominant["USA"].root_code, "04");
        assert_eq!(dominant["USA"].count, 2);
        assert_eq!(dominant["CHN"].root_code, "14");
        assert_eq!(dominant["CHN"].fill.to_string(), "rgba(247, 129, 191, 0.25)");
    }

    #[test]
    fn test_aggregate_partitions_and_tallies() {
        let reference = reference();
        let render = RenderConfig::default();
        let events = vec![
            event(actor(Some("USA"), Some(USA), true), actor(Some("CHN"), Some(CHN), true), "042"),
            event(actor(Some("CHN"), Some(CHN), true), actor(Some("CHN"), Some(CHN), false), "190"),
            event(actor(None, None, false), actor(None, None, false), "010"),
            event(actor(Some("CHN"), Some(CHN), true), actor(None, None, false), "193"),
        ];

        let out = aggregate(&events, &reference, &render);
        assert_eq!(out.arcs.len(), 1);
        assert_eq!(out.arcs[0].index, 0);
        assert_eq!(out.arcs[0].color, event_root_code_color(Some("04")));
        assert!(out.arcs[0].label.contains("協議 (04)"));
        assert!(out.arcs[0].label.contains("他国を訪問"));

        assert_eq!(out.points.len(), 2);
        assert_eq!(out.points[0].index, 1);
        assert_eq!((out.points[0].lat, out.points[0].lng), jitter(CHN.0, CHN.1, 1));
        assert_eq!((out.points[1].lat, out.points[1].lng), jitter(CHN.0, CHN.1, 2));
        assert!(out.points[0].label.starts_with("場所: 中国"));
        assert_eq!(out.rendered, vec![0, 1, 3]);

        assert_eq!(out.dominant["CHN"].root_code, "19");
        assert_eq!(out.dominant["CHN"].count, 2);
        assert!(!out.dominant.contains_key("USA"));

        let polygons = country_polygons(&reference.boundaries, &out.dominant);
        assert!(polygons.iter().all(|p| p.fill == NEUTRAL_POLYGON));
    }

    #[test]
    fn test_polygon_takes_dominant_fill() {
        let reference = reference();
        let mut tally = CategoryTally::default();
        tally.record("JPN", "05");
        let polygons = country_polygons(&reference.boundaries, &tally.dominant(0.25));
        let japan = polygons
            .iter()
            .find(|p| p.iso_a3.as_deref() == Some("JPN"))
            .unwrap();
        assert_eq!(japan.dominant_root_code.as_deref(), Some("05"));
        assert_eq!(japan.fill.to_string(), "rgba(51, 160, 44, 0.25)");
    }
}
