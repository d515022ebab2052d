//! Color specifications and their resolution to canonical colors.
//!
//! Particle configuration accepts colors in several shapes:
//!
//! ```json
//! "#ff0000"                       // hex, shorthand "#f00" also accepted
//! "random"                        // random channels in 1..=255
//! ["#ff0000", "#00ff00"]          // one picked at random
//! { "r": 255, "g": 0, "b": 0 }    // rgb passthrough
//! { "h": 0, "s": 100, "l": 50 }   // hsl passthrough
//! ```
//!
//! [`resolve_color`] reduces any of them to a [`ParsedColor`]. Inputs that
//! cannot be understood resolve to [`ParsedColor::Empty`] instead of failing;
//! consumers treat an empty color as "leave unset".

use palette::{IntoColor, Srgb};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

// ============================================================================
// Canonical Colors
// ============================================================================

/// An 8-bit RGB triplet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// An HSL triplet as authored: hue in degrees, saturation and lightness in
/// percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

impl Hsl {
    pub fn new(h: f64, s: f64, l: f64) -> Self {
        Self { h, s, l }
    }
}

/// The canonical form every [`ColorSpec`] resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ParsedColor {
    /// The specification could not be resolved.
    #[default]
    Empty,
    Rgb(Rgb),
    Hsl(Hsl),
}

impl ParsedColor {
    /// Returns true if no color was resolved.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns the RGB triplet if this color was resolved as RGB.
    pub fn rgb(&self) -> Option<Rgb> {
        match self {
            Self::Rgb(rgb) => Some(*rgb),
            _ => None,
        }
    }

    /// Returns the HSL triplet if this color was resolved as HSL.
    pub fn hsl(&self) -> Option<Hsl> {
        match self {
            Self::Hsl(hsl) => Some(*hsl),
            _ => None,
        }
    }

    /// Converts the color to RGB, going through sRGB for HSL colors.
    pub fn to_rgb(&self) -> Option<Rgb> {
        match self {
            Self::Empty => None,
            Self::Rgb(rgb) => Some(*rgb),
            Self::Hsl(hsl) => {
                let hsl = palette::Hsl::new(
                    hsl.h as f32,
                    (hsl.s / 100.0).clamp(0.0, 1.0) as f32,
                    (hsl.l / 100.0).clamp(0.0, 1.0) as f32,
                );
                let rgb: Srgb = hsl.into_color();
                Some(Rgb::new(
                    (rgb.red * 255.0).round().clamp(0.0, 255.0) as u8,
                    (rgb.green * 255.0).round().clamp(0.0, 255.0) as u8,
                    (rgb.blue * 255.0).round().clamp(0.0, 255.0) as u8,
                ))
            }
        }
    }

    /// Formats the color as a CSS `rgba(...)` value with the given opacity.
    ///
    /// HSL channels are written as-is into the `rgba` slots. Returns `None`
    /// for an empty color.
    pub fn to_rgba_css(&self, opacity: f64) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::Rgb(Rgb { r, g, b }) => Some(format!("rgba( {r}, {g}, {b}, {opacity} )")),
            Self::Hsl(Hsl { h, s, l }) => Some(format!("rgba( {h}, {s}, {l}, {opacity} )")),
        }
    }
}

// ============================================================================
// ColorSpec
// ============================================================================

/// A color as written in configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ColorSpec {
    /// The literal string `"random"`.
    Random,
    /// A hex string such as `#abc`, `aabbcc` or `#AABBCC`.
    Hex(String),
    /// A list of hex strings, one of which is picked per resolution.
    Choices(Vec<String>),
    Rgb(Rgb),
    Hsl(Hsl),
    /// Anything else, including `null`.
    #[default]
    Unknown,
}

impl ColorSpec {
    pub fn hex(hex: impl Into<String>) -> Self {
        Self::Hex(hex.into())
    }
}

impl<'de> Deserialize<'de> for ColorSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Choices(Vec<String>),
            Rgb { r: u8, g: u8, b: u8 },
            Hsl { h: f64, s: f64, l: f64 },
            Other(IgnoredAny),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Text(text) if text == "random" => Self::Random,
            Repr::Text(text) => Self::Hex(text),
            Repr::Choices(choices) => Self::Choices(choices),
            Repr::Rgb { r, g, b } => Self::Rgb(Rgb { r, g, b }),
            Repr::Hsl { h, s, l } => Self::Hsl(Hsl { h, s, l }),
            Repr::Other(IgnoredAny) => Self::Unknown,
        })
    }
}

impl Serialize for ColorSpec {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Random => serializer.serialize_str("random"),
            Self::Hex(hex) => serializer.serialize_str(hex),
            Self::Choices(choices) => choices.serialize(serializer),
            Self::Rgb(rgb) => rgb.serialize(serializer),
            Self::Hsl(hsl) => hsl.serialize(serializer),
            Self::Unknown => serializer.serialize_none(),
        }
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolves a color specification to its canonical form.
///
/// `rng` drives the `Random` and `Choices` variants; all other variants are
/// deterministic.
pub fn resolve_color<R: Rng + ?Sized>(spec: &ColorSpec, rng: &mut R) -> ParsedColor {
    let resolved = match spec {
        ColorSpec::Random => Some(ParsedColor::Rgb(Rgb::new(
            rng.gen_range(1..=255),
            rng.gen_range(1..=255),
            rng.gen_range(1..=255),
        ))),
        ColorSpec::Hex(hex) => hex_to_rgb(hex).map(ParsedColor::Rgb),
        ColorSpec::Choices(choices) => choices
            .choose(rng)
            .and_then(|hex| hex_to_rgb(hex))
            .map(ParsedColor::Rgb),
        ColorSpec::Rgb(rgb) => Some(ParsedColor::Rgb(*rgb)),
        ColorSpec::Hsl(hsl) => Some(ParsedColor::Hsl(*hsl)),
        ColorSpec::Unknown => None,
    };

    resolved.unwrap_or_else(|| {
        tracing::debug!(?spec, "color specification did not resolve");
        ParsedColor::Empty
    })
}

/// Parses a 3 or 6 digit hex color with an optional leading `#`.
pub fn hex_to_rgb(hex: &str) -> Option<Rgb> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    // Short form #rgb -> #rrggbb
    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_owned(),
        _ => return None,
    };

    let channel = |at: usize| u8::from_str_radix(&expanded[at..at + 2], 16).ok();
    Some(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
}

// ============================================================================
// Tests
// ============================================================================
