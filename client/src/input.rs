//! Line commands read by the headless client, one per line:
//!
//! ```text
//! draw 10 10 20 20
//! color ff0000
//! width 8 | opacity 50 | dashed on | cap square | mode spray
//! diameter 20 | density 300
//! save | export [path] | quit
//! ```
use std::path::PathBuf;
use std::str::FromStr;

use system::{BrushMode, BrushSettings, CapStyle, Color, Point};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum InputCommand {
    Draw(Point, Point),
    Color(Color),
    Brush(BrushChange),
    Save,
    Export(Option<PathBuf>),
    Quit,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BrushChange {
    Width(u32),
    Opacity(u8),
    Dashed(bool),
    Cap(CapStyle),
    Mode(BrushMode),
    SprayDiameter(u32),
    SprayDensity(u32),
}

impl BrushChange {
    pub fn apply_to(self, mut brush: BrushSettings) -> BrushSettings {
        match self {
            Self::Width(width) => brush.width = width,
            Self::Opacity(opacity) => brush.opacity = opacity,
            Self::Dashed(dashed) => brush.dashed = dashed,
            Self::Cap(cap) => brush.cap_style = cap,
            Self::Mode(mode) => brush.mode = mode,
            Self::SprayDiameter(diameter) => brush.spray_diameter = diameter,
            Self::SprayDensity(density) => brush.spray_density = density,
        }
        brush
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("{command}: expected {expected}")]
    BadArguments {
        command: String,
        expected: &'static str,
    },
}

impl FromStr for InputCommand {
    type Err = InputError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();
        let bad = |expected| InputError::BadArguments {
            command: command.to_string(),
            expected,
        };

        let parsed = match (command, args.as_slice()) {
            ("draw", [x1, y1, x2, y2]) => {
                let coords = [x1, y1, x2, y2]
                    .iter()
                    .map(|value| value.parse::<i32>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| bad("four integer coordinates"))?;
                Self::Draw(
                    Point::new(coords[0], coords[1]),
                    Point::new(coords[2], coords[3]),
                )
            }
            ("draw", _) => return Err(bad("four integer coordinates")),
            ("color", [hex]) => {
                let rgb = u32::from_str_radix(hex.trim_start_matches('#'), 16)
                    .ok()
                    .filter(|rgb| *rgb <= 0xFF_FFFF)
                    .ok_or_else(|| bad("a hex colour like ff0000"))?;
                Self::Color(Color(rgb))
            }
            ("width", [value]) => {
                Self::Brush(BrushChange::Width(value.parse().map_err(|_| bad("a number"))?))
            }
            ("opacity", [value]) => Self::Brush(BrushChange::Opacity(
                value.parse().map_err(|_| bad("a percentage"))?,
            )),
            ("dashed", [value]) => Self::Brush(BrushChange::Dashed(match *value {
                "on" => true,
                "off" => false,
                _ => return Err(bad("on or off")),
            })),
            ("cap", [value]) => Self::Brush(BrushChange::Cap(match *value {
                "round" => CapStyle::Round,
                "square" => CapStyle::Square,
                _ => return Err(bad("round or square")),
            })),
            ("mode", [value]) => Self::Brush(BrushChange::Mode(match *value {
                "line" => BrushMode::Line,
                "spray" => BrushMode::Spray,
                _ => return Err(bad("line or spray")),
            })),
            ("diameter", [value]) => Self::Brush(BrushChange::SprayDiameter(
                value.parse().map_err(|_| bad("a number"))?,
            )),
            ("density", [value]) => Self::Brush(BrushChange::SprayDensity(
                value.parse().map_err(|_| bad("a number"))?,
            )),
            ("save", []) => Self::Save,
            ("export", []) => Self::Export(None),
            ("export", [path]) => Self::Export(Some(PathBuf::from(*path))),
            ("quit", []) | ("exit", []) => Self::Quit,
            (other, _) => return Err(InputError::UnknownCommand(other.to_string())),
        };
        Ok(parsed)
    }
}
