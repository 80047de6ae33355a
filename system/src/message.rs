use serde::{Deserialize, Serialize};

pub type SessionId = u32;

pub const DEFAULT_BRUSH_WIDTH: u32 = 5;
pub const DEFAULT_SPRAY_DIAMETER: u32 = 10;
pub const DEFAULT_SPRAY_DENSITY: u32 = 100;

pub const MAX_BRUSH_WIDTH: u32 = 256;
pub const MAX_OPACITY: u8 = 100;
pub const MAX_SPRAY_DIAMETER: u32 = 512;
pub const MAX_SPRAY_DENSITY: u32 = 10_000;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// 32-bit `0xAARRGGBB` color. The alpha byte travels on the wire but is
/// ignored when painting.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(pub u32);

impl Color {
    pub const BLACK: Color = Color(0x000000);
    pub const WHITE: Color = Color(0xFFFFFF);

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    pub fn r(&self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn g(&self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn b(&self) -> u8 {
        self.0 as u8
    }
}

impl std::default::Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BrushMode {
    Line,
    Spray,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CapStyle {
    Round,
    Square,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrushSettings {
    pub mode: BrushMode,
    pub width: u32,
    pub opacity: u8,
    #[serde(default)]
    pub dashed: bool,
    pub cap_style: CapStyle,
    #[serde(default = "default_spray_diameter")]
    pub spray_diameter: u32,
    #[serde(default = "default_spray_density")]
    pub spray_density: u32,
}

fn default_spray_diameter() -> u32 {
    DEFAULT_SPRAY_DIAMETER
}

fn default_spray_density() -> u32 {
    DEFAULT_SPRAY_DENSITY
}

impl std::default::Default for BrushSettings {
    fn default() -> Self {
        Self {
            mode: BrushMode::Line,
            width: DEFAULT_BRUSH_WIDTH,
            opacity: MAX_OPACITY,
            dashed: false,
            cap_style: CapStyle::Round,
            spray_diameter: DEFAULT_SPRAY_DIAMETER,
            spray_density: DEFAULT_SPRAY_DENSITY,
        }
    }
}

impl BrushSettings {
    pub fn spray() -> Self {
        Self {
            mode: BrushMode::Spray,
            ..Self::default()
        }
    }

    /// Checks every field against its declared range.
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.width > MAX_BRUSH_WIDTH {
            return Err(format!(
                "width {} outside 1..={}",
                self.width, MAX_BRUSH_WIDTH
            ));
        }
        if self.opacity > MAX_OPACITY {
            return Err(format!(
                "opacity {} outside 0..={}",
                self.opacity, MAX_OPACITY
            ));
        }
        if self.spray_diameter > MAX_SPRAY_DIAMETER {
            return Err(format!(
                "sprayDiameter {} outside 0..={}",
                self.spray_diameter, MAX_SPRAY_DIAMETER
            ));
        }
        if self.spray_density > MAX_SPRAY_DENSITY {
            return Err(format!(
                "sprayDensity {} outside 0..={}",
                self.spray_density, MAX_SPRAY_DENSITY
            ));
        }
        Ok(())
    }
}

/// One incremental piece of a freehand stroke. Carries its own brush so a
/// replay never consults local brush state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StrokeSegment {
    pub from: Point,
    pub to: Point,
    pub color: Color,
    pub brush: BrushSettings,
}

impl StrokeSegment {
    pub fn new(from: Point, to: Point, color: Color, brush: BrushSettings) -> Self {
        Self {
            from,
            to,
            color,
            brush,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WireMessage {
    Draw(StrokeSegment),
    /// Followed on the wire by a bulk payload holding the PNG snapshot.
    Save,
    Saved { name: String },
    SaveFailed { reason: String },
}

impl WireMessage {
    pub const TAGS: [&'static str; 4] = ["draw", "save", "saved", "saveFailed"];

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Draw(_) => "draw",
            Self::Save => "save",
            Self::Saved { .. } => "saved",
            Self::SaveFailed { .. } => "saveFailed",
        }
    }
}
