//! Parameter types for image operations.
//!
//! These structs describe *what* to render, not *how*. They are the interface
//! between the [`operations`](super::operations) module (which decides the
//! transformation matrix) and the [`backend`](super::backend) (which does the
//! pixel work), so a mock backend can stand in for tests.
//!
//! ## Types
//!
//! - [`Quality`]: lossy encoding quality (1–100). Clamped on construction.
//! - [`Position`]: crop anchor used when an output is cropped to a square.
//! - [`Transformation`]: one output to render (format, width, optional
//!   square/cover height, anchor, quality).

use crate::types::OutputFormat;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Responsive width ladder for full-size renditions.
pub const FULL_WIDTHS: &[u32] = &[640, 960, 1280, 1920, 3840];

/// Square thumbnail sides.
pub const THUMB_WIDTHS: &[u32] = &[160, 320];

/// Formats rendered for every still source.
pub const STILL_FORMATS: &[OutputFormat] = &[OutputFormat::Avif, OutputFormat::Webp];

/// Formats rendered for animated (GIF) sources.
pub const ANIMATED_FORMATS: &[OutputFormat] = &[OutputFormat::Gif, OutputFormat::Webp];

/// Width of the inline low-quality placeholder.
pub const LQIP_WIDTH: u32 = 64;

/// Quality of the inline low-quality placeholder.
pub const LQIP_QUALITY: Quality = Quality(20);

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Default encoder quality for a format.
    pub fn for_format(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Avif => Self(50),
            OutputFormat::Webp => Self(80),
            OutputFormat::Gif => Self(100),
        }
    }
}

/// Crop anchor: which part of the source survives a cover crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Position {
    #[default]
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
    Center,
}

impl Position {
    /// Horizontal and vertical anchor weights in `0.0..=1.0` (0 = left/top).
    pub fn weights(self) -> (f64, f64) {
        match self {
            Position::North => (0.5, 0.0),
            Position::NorthEast => (1.0, 0.0),
            Position::East => (1.0, 0.5),
            Position::SouthEast => (1.0, 1.0),
            Position::South => (0.5, 1.0),
            Position::SouthWest => (0.0, 1.0),
            Position::West => (0.0, 0.5),
            Position::NorthWest => (0.0, 0.0),
            Position::Center => (0.5, 0.5),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Position::North => "north",
            Position::NorthEast => "northeast",
            Position::East => "east",
            Position::SouthEast => "southeast",
            Position::South => "south",
            Position::SouthWest => "southwest",
            Position::West => "west",
            Position::NorthWest => "northwest",
            Position::Center => "center",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPosition(pub String);

impl fmt::Display for UnknownPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown crop position '{}' (expected a compass direction such as \
             'north' or 'south west', an edge such as 'left top', or 'center')",
            self.0
        )
    }
}

impl std::error::Error for UnknownPosition {}

impl FromStr for Position {
    type Err = UnknownPosition;

    /// Accepts compass names (`north`, `southwest`, `south west`), edge names
    /// (`top`, `left bottom`, `right top`) and `center`/`centre`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .to_ascii_lowercase()
            .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
            .filter(|part| !part.is_empty())
            .map(|part| match part {
                "top" => "north",
                "bottom" => "south",
                "left" => "west",
                "right" => "east",
                other => other,
            })
            .collect::<Vec<_>>()
            .join(" ");

        let position = match normalized.as_str() {
            "north" => Position::North,
            "south" => Position::South,
            "east" => Position::East,
            "west" => Position::West,
            "center" | "centre" => Position::Center,
            "northeast" | "north east" | "east north" => Position::NorthEast,
            "southeast" | "south east" | "east south" => Position::SouthEast,
            "southwest" | "south west" | "west south" => Position::SouthWest,
            "northwest" | "north west" | "west north" => Position::NorthWest,
            _ => return Err(UnknownPosition(s.to_string())),
        };
        Ok(position)
    }
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One output to render from a decoded source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transformation {
    pub format: OutputFormat,
    /// Requested width. Never exceeded by the output, and never enlarged past
    /// the source.
    pub width: u32,
    /// When set, the output is cover-cropped to `width x height` around
    /// `position`; otherwise the aspect ratio is preserved.
    pub height: Option<u32>,
    pub position: Position,
    pub quality: Quality,
}

impl Transformation {
    pub fn resize(format: OutputFormat, width: u32) -> Self {
        Self {
            format,
            width,
            height: None,
            position: Position::default(),
            quality: Quality::for_format(format),
        }
    }

    pub fn square(format: OutputFormat, side: u32, position: Position) -> Self {
        Self {
            format,
            width: side,
            height: Some(side),
            position,
            quality: Quality::for_format(format),
        }
    }

    pub fn with_quality(self, quality: Quality) -> Self {
        Self { quality, ..self }
    }
}
