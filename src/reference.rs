//! Read-only reference data: CAMEO labels, country table, country boundaries.

use geojson::{Feature, GeoJson};
use serde::Serialize;
use std::collections::HashMap;

use crate::data::{CameoEntry, GeoEntry};

/// A country boundary feature and the properties the pipeline keys on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryBoundary {
    /// `ISO_A3` property, three-letter code.
    pub iso_a3: Option<String>,
    /// `ADMIN` property, English display name.
    pub admin: Option<String>,
    pub feature: Feature,
}

/// All reference resources for one cycle.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub cameo: HashMap<String, CameoEntry>,
    pub countries: HashMap<String, GeoEntry>,
    pub boundaries: Vec<CountryBoundary>,
}

impl ReferenceData {
    /// CAMEO label for an event or root code.
    pub fn cameo_name(&self, code: Option<&str>) -> Option<&str> {
        let entry = self.cameo.get(code?)?;
        (!entry.name_ja.is_empty()).then_some(entry.name_ja.as_str())
    }

    pub fn boundary(&self, iso_a3: &str) -> Option<&CountryBoundary> {
        self.boundaries
            .iter()
            .find(|b| b.iso_a3.as_deref() == Some(iso_a3))
    }
}

pub fn parse_cameo(json: &str) -> Result<HashMap<String, CameoEntry>, serde_json::Error> {
    serde_json::from_str(json)
}

pub fn parse_countries(json: &str) -> Result<HashMap<String, GeoEntry>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Boundaries from a GeoJSON document. A bare feature is accepted as a
/// collection of one; a bare geometry yields nothing to key on.
pub fn parse_boundaries(text: &str) -> Result<Vec<CountryBoundary>, geojson::Error> {
    let features = match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(_) => Vec::new(),
    };

    Ok(features
        .into_iter()
        .map(|feature| CountryBoundary {
            iso_a3: string_property(&feature, "ISO_A3"),
            admin: string_property(&feature, "ADMIN"),
            feature,
        })
        .collect())
}

fn string_property(feature: &Feature, key: &str) -> Option<String> {
    feature
        .property(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
}
