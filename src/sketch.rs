//! Freehand pose sketching.
//!
//! [`StrokeSurface`] is a fixed-size raster that accumulates pointer strokes and
//! exports itself as a PNG [`ImageAsset`] when a stroke ends. The backing raster
//! is sized at `logical size × device pixel ratio` so strokes stay crisp on
//! high-density displays, while all input is recorded in logical coordinates.
//!
//! ```
//! use genedit::sketch::{ClientPoint, DrawingChange, StrokeSurface};
//!
//! let mut surface = StrokeSurface::new(100, 50, 2.0);
//! surface.begin_stroke(ClientPoint::new(10.0, 10.0));
//! surface.extend_stroke(ClientPoint::new(60.0, 30.0));
//! match surface.end_stroke() {
//!     Some(DrawingChange::Drawn(png)) => assert_eq!(png.mime_type(), "image/png"),
//!     other => panic!("expected a drawing, got {other:?}"),
//! }
//! ```

use crate::error::Result;
use crate::image::{ImageAsset, ImageFormat};
use ::image::codecs::png::PngEncoder;
use ::image::{ImageEncoder, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

/// Default logical width of the sketch pad.
pub const DEFAULT_WIDTH: u32 = 500;
/// Default logical height of the sketch pad (16:9).
pub const DEFAULT_HEIGHT: u32 = 281;

/// Background fill (`#1f2937`).
pub const BACKGROUND: Rgba<u8> = Rgba([0x1f, 0x29, 0x37, 0xff]);
/// Stroke colour.
pub const STROKE_COLOR: Rgba<u8> = Rgba([0xff, 0xff, 0xff, 0xff]);
/// Stroke width in logical pixels.
pub const STROKE_WIDTH: f32 = 3.0;
/// Largest backing raster, in bytes, a surface will allocate.
pub const MAX_RASTER_BYTES: u64 = 256 * 1024 * 1024;

/// A pointer position in screen/client space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClientPoint {
    /// Horizontal client coordinate.
    pub x: f32,
    /// Vertical client coordinate.
    pub y: f32,
}

impl ClientPoint {
    /// Creates a point.
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// On-screen rectangle of the surface, in client coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingRect {
    /// Left edge.
    pub left: f32,
    /// Top edge.
    pub top: f32,
}

/// What the owner of a surface should do with its pose drawing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawingChange {
    /// The surface holds a drawing; replace the pose drawing with this PNG.
    Drawn(ImageAsset),
    /// The surface was wiped; there is no pose drawing.
    Cleared,
}

impl DrawingChange {
    /// Returns the drawing, if any.
    pub fn into_drawing(self) -> Option<ImageAsset> {
        match self {
            Self::Drawn(asset) => Some(asset),
            Self::Cleared => None,
        }
    }
}

/// A pointer-driven raster canvas.
#[derive(Debug)]
pub struct StrokeSurface {
    /// `None` when the backing raster could not be allocated.
    raster: Option<RgbaImage>,
    logical_size: (u32, u32),
    scale: f32,
    bounds: BoundingRect,
    /// Last recorded point of the stroke in progress, in logical coordinates.
    cursor: Option<(f32, f32)>,
    has_content: bool,
}

/// Device-pixel dimensions that are non-empty and fit in [`MAX_RASTER_BYTES`].
fn raster_size(width: f64, height: f64) -> Option<(u32, u32)> {
    let in_range = |v: f64| (1.0..=f64::from(u32::MAX)).contains(&v);
    if !in_range(width) || !in_range(height) {
        return None;
    }
    let (w, h) = (width as u32, height as u32);
    u64::from(w)
        .checked_mul(u64::from(h))
        .and_then(|px| px.checked_mul(4))
        .filter(|&bytes| bytes <= MAX_RASTER_BYTES)
        .map(|_| (w, h))
}

impl Default for StrokeSurface {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT, 1.0)
    }
}

impl StrokeSurface {
    /// Creates a surface of the given logical size for a display with the
    /// given device pixel ratio.
    pub fn new(logical_width: u32, logical_height: u32, device_pixel_ratio: f32) -> Self {
        let scale = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };
        let width = (f64::from(logical_width) * f64::from(scale)).round();
        let height = (f64::from(logical_height) * f64::from(scale)).round();

        let raster = match raster_size(width, height) {
            Some((w, h)) => Some(RgbaImage::from_pixel(w, h, BACKGROUND)),
            None => {
                tracing::warn!(width, height, "sketch surface has no backing raster");
                None
            }
        };

        Self {
            raster,
            logical_size: (logical_width, logical_height),
            scale,
            bounds: BoundingRect::default(),
            cursor: None,
            has_content: false,
        }
    }

    /// Records where the surface sits on screen.
    pub fn set_bounds(&mut self, bounds: BoundingRect) {
        self.bounds = bounds;
    }

    /// Logical size in CSS-style pixels.
    pub fn logical_size(&self) -> (u32, u32) {
        self.logical_size
    }

    /// Backing raster size in device pixels, if the raster exists.
    pub fn pixel_size(&self) -> Option<(u32, u32)> {
        self.raster.as_ref().map(|r| r.dimensions())
    }

    /// The backing raster.
    pub fn raster(&self) -> Option<&RgbaImage> {
        self.raster.as_ref()
    }

    /// True once any segment has been drawn since creation or the last clear.
    pub fn has_content(&self) -> bool {
        self.has_content
    }

    /// True while a stroke is in progress.
    pub fn is_drawing(&self) -> bool {
        self.cursor.is_some()
    }

    fn to_local(&self, point: ClientPoint) -> (f32, f32) {
        (point.x - self.bounds.left, point.y - self.bounds.top)
    }

    /// Starts a stroke at `point`. Does nothing if a stroke is in progress.
    pub fn begin_stroke(&mut self, point: ClientPoint) {
        if self.raster.is_none() || self.cursor.is_some() {
            return;
        }
        self.cursor = Some(self.to_local(point));
    }

    /// Draws a segment from the last point to `point`.
    ///
    /// Ignored when no stroke is in progress.
    pub fn extend_stroke(&mut self, point: ClientPoint) {
        let Some(from) = self.cursor else {
            return;
        };
        let to = self.to_local(point);
        let scale = self.scale;
        if let Some(raster) = self.raster.as_mut() {
            draw_segment(
                raster,
                (from.0 * scale, from.1 * scale),
                (to.0 * scale, to.1 * scale),
                STROKE_WIDTH * scale / 2.0,
                STROKE_COLOR,
            );
            self.has_content = true;
        }
        self.cursor = Some(to);
    }

    /// Ends the current stroke and exports the raster if anything was drawn.
    pub fn end_stroke(&mut self) -> Option<DrawingChange> {
        self.cursor = None;
        if !self.has_content {
            return None;
        }
        let raster = self.raster.as_ref()?;
        match encode_png(raster) {
            Ok(png) => Some(DrawingChange::Drawn(ImageAsset::from_bytes(
                png,
                ImageFormat::Png.mime_type(),
            ))),
            Err(e) => {
                tracing::warn!("failed to export sketch: {e}");
                None
            }
        }
    }

    /// Wipes the surface back to the background fill.
    pub fn clear(&mut self) -> Option<DrawingChange> {
        let raster = self.raster.as_mut()?;
        for pixel in raster.pixels_mut() {
            *pixel = BACKGROUND;
        }
        self.cursor = None;
        self.has_content = false;
        Some(DrawingChange::Cleared)
    }

    /// Plays recorded strokes back through the surface.
    ///
    /// Each inner list is one stroke: its first point begins the stroke and
    /// every following point extends it. Returns the last change reported.
    pub fn replay(&mut self, strokes: &[Vec<ClientPoint>]) -> Option<DrawingChange> {
        let mut last = None;
        for stroke in strokes {
            let Some((first, rest)) = stroke.split_first() else {
                continue;
            };
            self.begin_stroke(*first);
            for point in rest {
                self.extend_stroke(*point);
            }
            if let Some(change) = self.end_stroke() {
                last = Some(change);
            }
        }
        last
    }
}

fn encode_png(raster: &RgbaImage) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    PngEncoder::new(&mut out).write_image(
        raster.as_raw(),
        raster.width(),
        raster.height(),
        ::image::ExtendedColorType::Rgba8,
    )?;
    Ok(out)
}

/// Rasterizes a capsule (a segment with round ends) with coverage antialiasing.
///
/// Consecutive capsules sharing an endpoint give round joins for free.
fn draw_segment(
    raster: &mut RgbaImage,
    from: (f32, f32),
    to: (f32, f32),
    radius: f32,
    color: Rgba<u8>,
) {
    let (width, height) = raster.dimensions();
    let reach = radius + 1.0;
    let min_x = (from.0.min(to.0) - reach).floor().max(0.0) as u32;
    let min_y = (from.1.min(to.1) - reach).floor().max(0.0) as u32;
    let max_x = ((from.0.max(to.0) + reach).ceil().max(0.0) as u32).min(width);
    let max_y = ((from.1.max(to.1) + reach).ceil().max(0.0) as u32).min(height);

    for y in min_y..max_y {
        for x in min_x..max_x {
            let center = (x as f32 + 0.5, y as f32 + 0.5);
            let d = distance_to_segment(center, from, to);
            let coverage = (radius + 0.5 - d).clamp(0.0, 1.0);
            if coverage > 0.0 {
                blend(raster.get_pixel_mut(x, y), color, coverage);
            }
        }
    }
}

fn distance_to_segment(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    let ab = (b.0 - a.0, b.1 - a.1);
    let ap = (p.0 - a.0, p.1 - a.1);
    let len_sq = ab.0 * ab.0 + ab.1 * ab.1;
    let t = if len_sq > 0.0 {
        ((ap.0 * ab.0 + ap.1 * ab.1) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let closest = (a.0 + ab.0 * t, a.1 + ab.1 * t);
    ((p.0 - closest.0).powi(2) + (p.1 - closest.1).powi(2)).sqrt()
}

fn blend(dst: &mut Rgba<u8>, src: Rgba<u8>, coverage: f32) {
    for c in 0..3 {
        let d = dst.0[c] as f32;
        let s = src.0[c] as f32;
        dst.0[c] = (d + (s - d) * coverage).round() as u8;
    }
    dst.0[3] = 0xff;
}
