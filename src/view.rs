//! Interaction state for the rendering collaborator, as pure transitions.
//!
//! The pipeline never reads this; the renderer owns it and feeds it the
//! latest reference data when resolving a country selection.

use serde::Serialize;
use tracing::warn;

use crate::geo::GeoResolver;
use crate::reference::ReferenceData;

/// Camera altitude when the globe focuses a country.
pub const GLOBE_FOCUS_ALTITUDE: f64 = 1.5;
/// Zoom level when the flat map focuses a country.
pub const MAP_FOCUS_ZOOM: u8 = 5;

/// Sidebar regions and their countries, by Japanese display name.
pub const REGIONS: &[(&str, &[&str])] = &[
    (
        "アジア",
        &[
            "日本", "中国", "韓国", "北朝鮮", "インド", "ロシア", "ベトナム", "タイ", "マレーシア",
            "インドネシア", "フィリピン", "パキスタン", "イラン", "イラク", "シリア", "イスラエル",
            "トルコ", "サウジアラビア", "UAE", "カタール", "パレスチナ",
        ],
    ),
    (
        "ヨーロッパ",
        &[
            "イギリス", "フランス", "ドイツ", "イタリア", "スペイン", "ウクライナ", "ポーランド",
            "オランダ", "ベルギー", "スイス", "オーストリア", "スウェーデン",
        ],
    ),
    ("北アメリカ", &["アメリカ合衆国", "カナダ", "メキシコ"]),
    (
        "南アメリカ",
        &["ブラジル", "アルゼンチン", "コロンビア", "ペルー", "チリ", "ベネズエラ"],
    ),
    ("アフリカ", &["エジプト", "ナイジェリア", "南アフリカ", "ケニア", "エチオピア"]),
    ("オセアニア", &["オーストラリア", "ニュージーランド"]),
];

/// Countries of a region, sorted for display.
pub fn region_countries(region: &str) -> Option<Vec<&'static str>> {
    REGIONS.iter().find(|(name, _)| *name == region).map(|(_, countries)| {
        let mut sorted = countries.to_vec();
        sorted.sort_unstable();
        sorted
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Globe,
    Map,
}

/// Where the camera should move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Focus {
    Globe { lat: f64, lng: f64, altitude: f64 },
    Map { lat: f64, lng: f64, zoom: u8 },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub mode: ViewMode,
    pub selected_region: Option<String>,
    /// ISO code of the highlighted boundary; globe mode only.
    pub highlighted_country: Option<String>,
    pub focus: Option<Focus>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewAction {
    SwitchMode(ViewMode),
    ToggleRegion(String),
    /// Sidebar click on a country's Japanese display name.
    SelectCountry(String),
}

impl ViewState {
    pub fn apply(&self, action: ViewAction, reference: &ReferenceData) -> ViewState {
        let mut next = self.clone();
        match action {
            ViewAction::SwitchMode(mode) => {
                if mode == self.mode {
                    return next;
                }
                next.mode = mode;
                // the new view starts unfocused with no highlight
                next.focus = None;
                next.highlighted_country = None;
            }
            ViewAction::ToggleRegion(region) => {
                next.selected_region = if self.selected_region.as_deref() == Some(region.as_str()) {
                    None
                } else {
                    Some(region)
                };
            }
            ViewAction::SelectCountry(name) => {
                let geo = GeoResolver::new(&reference.countries);
                let Some(code) = geo.code_for_name(&name) else {
                    warn!(country = %name, "no country data for sidebar entry");
                    return next;
                };
                let Some(location) = geo.resolve(code) else {
                    warn!(country = %code, "no coordinates for country");
                    return next;
                };
                next.focus = Some(match self.mode {
                    ViewMode::Globe => Focus::Globe {
                        lat: location.lat,
                        lng: location.lng,
                        altitude: GLOBE_FOCUS_ALTITUDE,
                    },
                    ViewMode::Map => Focus::Map {
                        lat: location.lat,
                        lng: location.lng,
                        zoom: MAP_FOCUS_ZOOM,
                    },
                });
                if self.mode == ViewMode::Globe && reference.boundary(code).is_some() {
                    next.highlighted_country = Some(code.to_string());
                }
            }
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::tests::reference;

    #[test]
    fn test_toggle_region() {
        let reference = reference();
        let state = ViewState::default()
            .apply(ViewAction::ToggleRegion("アジア".into()), &reference);
        assert_eq!(state.selected_region.as_deref(), Some("アジア"));

        let other = state.apply(ViewAction::ToggleRegion("アフリカ".into()), &reference);
        assert_eq!(other.selected_region.as_deref(), Some("アフリカ"));

        let closed = other.apply(ViewAction::ToggleRegion("アフリカ".into()), &reference);
        assert_eq!(closed.selected_region, None);
    }

    #[test]
    fn test_select_country_on_globe_highlights() {
        let reference = reference();
        let state = ViewState::default().apply(ViewAction::SelectCountry("日本".into()), &reference);
        assert_eq!(
            state.focus,
            Some(Focus::Globe { lat: 36.0, lng: 138.0, altitude: 1.5 })
        );
        assert_eq!(state.highlighted_country.as_deref(), Some("JPN"));
    }

    #[test]
    fn test_select_country_on_map_only_focuses() {
        let reference = reference();
        let state = ViewState::default()
            .apply(ViewAction::SwitchMode(ViewMode::Map), &reference)
            .apply(ViewAction::SelectCountry("中国".into()), &reference);
        assert_eq!(state.focus, Some(Focus::Map { lat: 35.0, lng: 105.0, zoom: 5 }));
        assert_eq!(state.highlighted_country, None);
    }

    #[test]
    fn test_unknown_country_is_ignored() {
        let reference = reference();
        let before = ViewState::default();
        let after = before.apply(ViewAction::SelectCountry("アトランティス".into()), &reference);
        assert_eq!(after, before);
        // name known but no coordinates
        let after = before.apply(ViewAction::SelectCountry("ヨーロッパ".into()), &reference);
        assert_eq!(after, before);
    }

    #[test]
    fn test_switch_mode_clears_focus() {
        let reference = reference();
        let focused = ViewState::default().apply(ViewAction::SelectCountry("日本".into()), &reference);
        let same = focused.apply(ViewAction::SwitchMode(ViewMode::Globe), &reference);
        assert_eq!(same, focused);

        let flat = focused.apply(ViewAction::SwitchMode(ViewMode::Map), &reference);
        assert_eq!(flat.mode, ViewMode::Map);
        assert_eq!(flat.focus, None);
        assert_eq!(flat.highlighted_country, None);
    }

    #[test]
    fn test_region_countries_are_sorted() {
        let countries = region_countries("北アメリカ").unwrap();
        let mut sorted = countries.clone();
        sorted.sort_unstable();
        assert_eq!(countries, sorted);
        assert_eq!(countries.len(), 3);
        assert!(region_countries("南極").is_none());
    }
}
