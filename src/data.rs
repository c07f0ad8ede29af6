use serde::{Deserialize, Serialize};

use crate::color::Color;

pub const APP_ID: &str = "eventglobe";
pub const GDELT_LASTUPDATE_URL: &str =
    "http://data.gdeltproject.org/gdeltv2/lastupdate-translation.txt";
pub const BOUNDARIES_URL: &str = "https://raw.githubusercontent.com/vasturiano/react-globe.gl/master/example/datasets/ne_110m_admin_0_countries.geojson";

/// Sentinel the feed uses for a missing source URL.
pub const NULL_SOURCE: &str = "NULL";
pub const NOT_AVAILABLE: &str = "N/A";
pub const UNKNOWN_CATEGORY_LABEL: &str = "不明なカテゴリ";
pub const UNKNOWN_DETAIL_LABEL: &str = "詳細不明";

/// One side of an interaction record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub code: Option<String>,
    pub name: Option<String>,
    /// Three-letter country code, possibly borrowed from the other actor.
    pub country_code: Option<String>,
    /// True when `country_code` came from the other actor (bloc fallback).
    pub country_borrowed: bool,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[serde(rename = "isplace")]
    pub is_place: bool,
}

impl Actor {
    /// Name, then raw code, then `N/A`.
    pub fn display(&self) -> &str {
        self.name
            .as_deref()
            .or(self.code.as_deref())
            .unwrap_or(NOT_AVAILABLE)
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.lat?, self.lng?))
    }
}

/// Where the event itself took place, as geocoded by the feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionGeo {
    pub full_name: Option<String>,
    pub country_code: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

/// One observed interaction record from the export feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "globalEventID")]
    pub global_event_id: String,
    /// `YYYYMMDD`
    pub day: String,
    pub month_year: String,
    pub year: String,
    pub fraction_date: f64,
    pub actor1: Actor,
    pub actor2: Actor,
    pub is_root_event: bool,
    pub event_code: String,
    pub event_base_code: String,
    /// First two characters of `event_code`, `None` when the code is empty.
    pub event_root_code: Option<String>,
    pub quad_class: Option<u8>,
    /// NaN when the column was unparsable.
    pub goldstein_scale: f64,
    pub num_mentions: Option<u32>,
    pub num_sources: Option<u32>,
    pub num_articles: Option<u32>,
    /// NaN when the column was unparsable.
    pub avg_tone: f64,
    pub action_geo: ActionGeo,
    pub date_added: String,
    pub source_url: String,
}

impl Event {
    pub fn source_link(&self) -> Option<&str> {
        let url = self.source_url.trim();
        if url.is_empty() || url == NULL_SOURCE {
            None
        } else {
            Some(url)
        }
    }
}

/// Country reference entry keyed by three-letter code.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct GeoEntry {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub name_jp: String,
    #[serde(default)]
    pub icon: Option<String>,
}

/// CAMEO reference entry keyed by event code or root code.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct CameoEntry {
    #[serde(default)]
    pub name_ja: String,
}

/// Great-circle arc between the two actors of a bilateral event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderableArc {
    pub start_lat: f64,
    pub start_lng: f64,
    pub end_lat: f64,
    pub end_lng: f64,
    pub color: Color,
    pub label: String,
    pub event: Event,
    /// Position of `event` in the parsed sequence.
    pub index: usize,
}

/// Marker for a single-actor event, jittered away from co-located markers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderablePoint {
    pub lat: f64,
    pub lng: f64,
    pub size: f64,
    pub color: Color,
    pub label: String,
    pub event: Event,
    pub index: usize,
}
