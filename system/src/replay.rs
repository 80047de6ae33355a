//! Deterministic rendering of stroke segments.
//!
//! The local input path and the remote receive path both go through
//! [`StrokeReplay::apply`]. Rendering reads nothing but the segment itself:
//! no clock, no local brush state, and the spray generator is seeded from the
//! segment's fields. Equal segment sequences therefore produce equal pixels
//! on every participant.

use crate::canvas::Canvas;
use crate::message::{BrushMode, CapStyle, Point, StrokeSegment};
use euclid::default::{Point2D, Vector2D};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Dash pattern in pen-width units: 4 painted, 2 skipped.
const DASH_ON: f32 = 4.0;
const DASH_OFF: f32 = 2.0;

pub trait StrokeReplay {
    fn canvas(&mut self) -> &mut Canvas;

    fn apply(&mut self, segment: &StrokeSegment) {
        let canvas = self.canvas();
        match segment.brush.mode {
            BrushMode::Line => draw_line(canvas, segment),
            BrushMode::Spray => draw_spray(canvas, segment),
        }
    }

    fn apply_all<'a, I>(&mut self, segments: I)
    where
        I: IntoIterator<Item = &'a StrokeSegment>,
    {
        for segment in segments {
            self.apply(segment);
        }
    }
}

fn to_point2d(point: Point) -> Point2D<f32> {
    Point2D::new(point.x as f32, point.y as f32)
}

fn draw_line(canvas: &mut Canvas, segment: &StrokeSegment) {
    let brush = &segment.brush;
    let width = brush.width as f32;
    let half = width / 2.0;

    let from = to_point2d(segment.from);
    let to = to_point2d(segment.to);
    let delta: Vector2D<f32> = to - from;
    let len = delta.length();
    let dir = if len > 0.0 {
        delta / len
    } else {
        Vector2D::new(1.0, 0.0)
    };

    let reach = half.ceil() as i64 + 1;
    let min_x = (segment.from.x.min(segment.to.x) as i64 - reach).max(0);
    let min_y = (segment.from.y.min(segment.to.y) as i64 - reach).max(0);
    let max_x =
        (segment.from.x.max(segment.to.x) as i64 + reach).min(canvas.width() as i64 - 1);
    let max_y =
        (segment.from.y.max(segment.to.y) as i64 + reach).min(canvas.height() as i64 - 1);

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let center = Point2D::new(x as f32 + 0.5, y as f32 + 0.5);
            let rel = center - from;
            let along = rel.dot(dir);
            let across = rel.cross(dir).abs();

            let covered = match brush.cap_style {
                CapStyle::Round => {
                    let distance = if along < 0.0 {
                        rel.length()
                    } else if along > len {
                        (center - to).length()
                    } else {
                        across
                    };
                    distance <= half
                }
                CapStyle::Square => along >= -half && along <= len + half && across <= half,
            };
            if !covered {
                continue;
            }
            if brush.dashed && !dash_is_on(along.max(0.0).min(len), width) {
                continue;
            }
            canvas.blend(x, y, segment.color, brush.opacity);
        }
    }
}

fn dash_is_on(along: f32, width: f32) -> bool {
    along % ((DASH_ON + DASH_OFF) * width) < DASH_ON * width
}

fn draw_spray(canvas: &mut Canvas, segment: &StrokeSegment) {
    let brush = &segment.brush;
    let mut rng = StdRng::seed_from_u64(spray_seed(segment));
    let sigma = brush.spray_diameter as f64;
    let center_x = segment.to.x as f64;
    let center_y = segment.to.y as f64;

    for _ in 0..brush.spray_density {
        let (offset_x, offset_y) = gaussian_pair(&mut rng);
        // `as` truncates toward zero.
        let x = (center_x + offset_x * sigma) as i64;
        let y = (center_y + offset_y * sigma) as i64;
        canvas.blend(x, y, segment.color, 100);
    }
}

/// Two independent standard normal samples (Box-Muller).
fn gaussian_pair<R: Rng>(rng: &mut R) -> (f64, f64) {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen::<f64>();
    let radius = (-2.0 * u1.ln()).sqrt();
    let theta = 2.0 * std::f64::consts::PI * u2;
    (radius * theta.cos(), radius * theta.sin())
}

fn spray_seed(segment: &StrokeSegment) -> u64 {
    let brush = &segment.brush;
    [
        segment.from.x as u32 as u64,
        segment.from.y as u32 as u64,
        segment.to.x as u32 as u64,
        segment.to.y as u32 as u64,
        segment.color.0 as u64,
        brush.width as u64,
        brush.spray_diameter as u64,
        brush.spray_density as u64,
    ]
    .iter()
    .fold(0x9E37_79B9_7F4A_7C15, |state, value| splitmix64(state ^ value))
}

fn splitmix64(state: u64) -> u64 {
    let mut z = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
