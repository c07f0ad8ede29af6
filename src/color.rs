//! Color encodings for event categories, tone and Goldstein score.
//!
//! Every function here is total: NaN, out-of-range scores and unknown codes
//! all map to a defined color.

use serde::{Serialize, Serializer};
use std::fmt;

/// Alpha shared by every category color.
pub const CATEGORY_ALPHA: f64 = 0.8;
/// Alpha of the Goldstein table-row wash.
pub const GOLDSTEIN_ALPHA: f64 = 0.12;

pub const UNKNOWN_CATEGORY: Color = Color::Rgba(200, 200, 200, CATEGORY_ALPHA);
pub const UNKNOWN_TONE: Color = Color::Rgb(128, 128, 128);
/// Cap color of a country polygon with nothing to tint it.
pub const NEUTRAL_POLYGON: Color = Color::Rgba(200, 200, 200, 0.1);

/// A CSS color value as handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Color {
    Rgb(u8, u8, u8),
    Rgba(u8, u8, u8, f64),
    Transparent,
}

impl Color {
    /// Same hue with a different alpha. `Transparent` stays transparent.
    pub fn with_alpha(self, alpha: f64) -> Color {
        match self {
            Color::Rgb(r, g, b) | Color::Rgba(r, g, b, _) => Color::Rgba(r, g, b, alpha),
            Color::Transparent => Color::Transparent,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Rgb(r, g, b) => write!(f, "rgb({}, {}, {})", r, g, b),
            Color::Rgba(r, g, b, a) => write!(f, "rgba({}, {}, {}, {})", r, g, b, a),
            Color::Transparent => f.write_str("transparent"),
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Which encoding drives arc and point colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    /// Fixed palette per CAMEO root code.
    #[default]
    Category,
    /// Red-yellow-green gradient over average tone.
    Tone,
}

impl ColorScheme {
    pub fn event_color(self, root_code: Option<&str>, avg_tone: f64) -> Color {
        match self {
            ColorScheme::Category => event_root_code_color(root_code),
            ColorScheme::Tone => avg_tone_color(avg_tone),
        }
    }
}

/// Fixed palette for the twenty CAMEO root categories.
///
/// 01-09 are the cooperative categories (blues and greens), 10-20 the
/// conflictual ones (reds and yellows). Anything else is gray.
pub fn event_root_code_color(root_code: Option<&str>) -> Color {
    let (r, g, b) = match root_code {
        Some("01") => (178, 223, 138), // make public statement
        Some("02") => (166, 206, 227), // appeal
        Some("03") => (31, 120, 180),  // express intent to cooperate
        Some("04") => (118, 118, 118), // consult
        Some("05") => (51, 160, 44),   // diplomatic cooperation
        Some("06") => (152, 78, 163),  // material cooperation
        Some("07") => (102, 194, 165), // provide aid
        Some("08") => (66, 146, 198),  // yield
        Some("09") => (253, 191, 111), // investigate
        Some("10") => (255, 127, 0),   // demand
        Some("11") => (252, 141, 98),  // disapprove
        Some("12") => (231, 41, 138),  // reject
        Some("13") => (255, 255, 153), // threaten
        Some("14") => (247, 129, 191), // protest
        Some("15") => (177, 89, 40),   // exhibit force posture
        Some("16") => (227, 26, 28),   // reduce relations
        Some("17") => (255, 20, 147),  // coerce
        Some("18") => (128, 0, 0),     // assault
        Some("19") => (255, 0, 0),     // fight
        Some("20") => (0, 0, 0),       // unconventional mass violence
        _ => return UNKNOWN_CATEGORY,
    };
    Color::Rgba(r, g, b, CATEGORY_ALPHA)
}

/// Yellow at 0, fading to green at +10 and to red at -10. Clamped beyond.
pub fn avg_tone_color(tone: f64) -> Color {
    if tone.is_nan() {
        return UNKNOWN_TONE;
    }
    let factor = tone.abs().min(10.0) / 10.0;
    let faded = (255.0 * (1.0 - factor)).round() as u8;
    if tone >= 0.0 {
        Color::Rgb(faded, 255, 0)
    } else {
        Color::Rgb(255, faded, 0)
    }
}

/// Low-alpha row wash: blue-leaning for cooperation, red-leaning for
/// conflict, saturating at magnitude 10. NaN is transparent.
pub fn goldstein_background_color(score: f64) -> Color {
    if score.is_nan() {
        return Color::Transparent;
    }
    let factor = score.abs().min(10.0) / 10.0;
    let (r, g, b) = if score >= 0.0 {
        (230.0 - 30.0 * factor, 230.0 + 25.0 * factor, 255.0)
    } else {
        (255.0, 230.0 - 30.0 * factor, 230.0 - 30.0 * factor)
    };
    Color::Rgba(
        r.round() as u8,
        g.round() as u8,
        b.round() as u8,
        GOLDSTEIN_ALPHA,
    )
}
