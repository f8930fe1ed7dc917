//! Drawing primitives over `RgbaImage`: text with a loaded TrueType font,
//! filled shapes, stroked polylines and PNG data URLs.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use base64::Engine;
use image::codecs::png::PngEncoder;
use image::{ImageEncoder, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_polygon_mut, draw_text_mut};
use imageproc::point::Point;
use imageproc::rect::Rect;
use tracing::{debug, info, warn};
use unicode_width::UnicodeWidthStr;

use super::color::Color;

/// Average advance per em used when no font could be loaded.
const FALLBACK_ADVANCE: f32 = 0.55;
const FALLBACK_ASCENT: f32 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

/// Text renderer.  Without a font, text is measured approximately and not
/// drawn; shapes still render.
pub struct Painter {
    font: Option<FontVec>,
}

impl Painter {
    /// Load the configured font, or the first candidate that parses.
    pub fn load(configured: Option<&Path>, candidates: &[PathBuf]) -> Self {
        let ordered = configured
            .map(Path::to_path_buf)
            .into_iter()
            .chain(candidates.iter().cloned());
        for path in ordered {
            let Ok(bytes) = std::fs::read(&path) else {
                continue;
            };
            match FontVec::try_from_vec(bytes) {
                Ok(font) => {
                    info!("font loaded from {:?}", path);
                    return Self { font: Some(font) };
                }
                Err(e) => warn!("font {:?} unusable: {}", path, e),
            }
        }
        debug!("no font candidate could be loaded");
        Self { font: None }
    }

    pub fn without_font() -> Self {
        Self { font: None }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Advance width of `text` at `size` px.
    pub fn measure(&self, text: &str, size: f32) -> f32 {
        match &self.font {
            Some(font) => {
                let scaled = font.as_scaled(PxScale::from(size));
                text.chars()
                    .map(|ch| scaled.h_advance(font.glyph_id(ch)))
                    .sum()
            }
            None => text.width() as f32 * size * FALLBACK_ADVANCE,
        }
    }

    pub fn ascent(&self, size: f32) -> f32 {
        match &self.font {
            Some(font) => font.as_scaled(PxScale::from(size)).ascent(),
            None => size * FALLBACK_ASCENT,
        }
    }

    /// Draw with `y` as the top of the text box.
    pub fn text_top(
        &self,
        img: &mut RgbaImage,
        text: &str,
        x: f32,
        y: f32,
        size: f32,
        color: Color,
        align: Align,
    ) {
        let Some(font) = &self.font else { return };
        if text.is_empty() {
            return;
        }
        let left = match align {
            Align::Left => x,
            Align::Center => x - self.measure(text, size) / 2.0,
        };
        draw_text_mut(
            img,
            color.rgba(),
            left.round() as i32,
            y.round() as i32,
            PxScale::from(size),
            font,
            text,
        );
    }

    /// Draw with `baseline` as the alphabetic baseline.
    pub fn text_baseline(
        &self,
        img: &mut RgbaImage,
        text: &str,
        x: f32,
        baseline: f32,
        size: f32,
        color: Color,
        align: Align,
    ) {
        let top = baseline - self.ascent(size);
        self.text_top(img, text, x, top, size, color, align);
    }

    /// Draw vertically centred on `middle`.
    pub fn text_middle(
        &self,
        img: &mut RgbaImage,
        text: &str,
        x: f32,
        middle: f32,
        size: f32,
        color: Color,
        align: Align,
    ) {
        let height = match &self.font {
            Some(font) => {
                let s = font.as_scaled(PxScale::from(size));
                s.ascent() - s.descent()
            }
            None => size,
        };
        self.text_top(img, text, x, middle - height / 2.0, size, color, align);
    }
}

pub fn canvas(width: u32, height: u32, fill: Option<Color>) -> RgbaImage {
    match fill {
        Some(c) => RgbaImage::from_pixel(width, height, c.rgba()),
        None => RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0])),
    }
}

/// Filled rectangle; fractional sizes are rounded, empty ones skipped.
pub fn fill_rect(img: &mut RgbaImage, x: f32, y: f32, w: f32, h: f32, color: Color) {
    let (w, h) = (w.round() as i64, h.round() as i64);
    if w <= 0 || h <= 0 {
        return;
    }
    let rect = Rect::at(x.round() as i32, y.round() as i32).of_size(w as u32, h as u32);
    draw_filled_rect_mut(img, rect, color.rgba());
}

/// Filled polygon from an open point list.
pub fn fill_polygon(img: &mut RgbaImage, points: &[(f32, f32)], color: Color) {
    let mut pts: Vec<Point<i32>> = Vec::with_capacity(points.len());
    for &(x, y) in points {
        let p = Point::new(x.round() as i32, y.round() as i32);
        if pts.last() != Some(&p) {
            pts.push(p);
        }
    }
    while pts.len() > 1 && pts.first() == pts.last() {
        pts.pop();
    }
    if pts.len() < 3 {
        return;
    }
    draw_polygon_mut(img, &pts, color.rgba());
}

/// Polyline of the given width with round joins and caps.
pub fn stroke_path(img: &mut RgbaImage, points: &[(f32, f32)], width: f32, color: Color) {
    let half = width / 2.0;
    for seg in points.windows(2) {
        let ((x0, y0), (x1, y1)) = (seg[0], seg[1]);
        let (dx, dy) = (x1 - x0, y1 - y0);
        let len = (dx * dx + dy * dy).sqrt();
        if len < f32::EPSILON {
            continue;
        }
        let (nx, ny) = (-dy / len * half, dx / len * half);
        fill_polygon(
            img,
            &[
                (x0 + nx, y0 + ny),
                (x1 + nx, y1 + ny),
                (x1 - nx, y1 - ny),
                (x0 - nx, y0 - ny),
            ],
            color,
        );
    }
    let radius = half.round().max(1.0) as i32;
    for &(x, y) in points {
        draw_filled_circle_mut(img, (x.round() as i32, y.round() as i32), radius, color.rgba());
    }
}

/// Points along a quadratic Bézier from `p0` to `p2`, excluding `p0`.
pub fn quad_curve(p0: (f32, f32), ctrl: (f32, f32), p2: (f32, f32), steps: usize) -> Vec<(f32, f32)> {
    (1..=steps)
        .map(|i| {
            let t = i as f32 / steps as f32;
            let u = 1.0 - t;
            (
                u * u * p0.0 + 2.0 * u * t * ctrl.0 + t * t * p2.0,
                u * u * p0.1 + 2.0 * u * t * ctrl.1 + t * t * p2.1,
            )
        })
        .collect()
}

/// Darken every pixel as if covered by black at `alpha`.
pub fn dim(img: &mut RgbaImage, alpha: f32) {
    let keep = 1.0 - alpha.clamp(0.0, 1.0);
    for px in img.pixels_mut() {
        for c in px.0.iter_mut().take(3) {
            *c = (*c as f32 * keep).round() as u8;
        }
    }
}

pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buffer = Vec::new();
    PngEncoder::new(Cursor::new(&mut buffer)).write_image(
        img.as_raw(),
        img.width(),
        img.height(),
        image::ExtendedColorType::Rgba8,
    )?;
    Ok(buffer)
}

/// `data:image/png;base64,...` for the host.
pub fn data_url(img: &RgbaImage) -> Result<String, image::ImageError> {
    let png = encode_png(img)?;
    Ok(format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fonts_leave_painter_without_font() {
        let missing = PathBuf::from("/nonexistent/ampdeck/font.ttf");
        let p = Painter::load(Some(missing.as_path()), &[missing.clone()]);
        assert!(!p.has_font());
        assert!(!Painter::without_font().has_font());
    }

    #[test]
    fn test_fallback_measure_scales_with_size() {
        let p = Painter::without_font();
        assert_eq!(p.measure("abcd", 10.0), 4.0 * 10.0 * FALLBACK_ADVANCE);
        assert!(p.measure("abcd", 20.0) > p.measure("abcd", 10.0));
        assert_eq!(p.measure("", 16.0), 0.0);
    }

    #[test]
    fn test_fill_rect_clips_and_skips_empty() {
        let mut img = canvas(10, 10, Some(Color(0, 0, 0)));
        fill_rect(&mut img, 8.0, 8.0, 5.0, 5.0, Color(255, 0, 0));
        fill_rect(&mut img, 0.0, 0.0, 0.2, 5.0, Color(0, 255, 0));
        assert_eq!(img.get_pixel(9, 9).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_polygon_tolerates_closed_input() {
        let mut img = canvas(20, 20, None);
        fill_polygon(
            &mut img,
            &[(2.0, 2.0), (18.0, 10.0), (2.0, 18.0), (2.0, 2.0)],
            Color(255, 255, 255),
        );
        assert_eq!(img.get_pixel(6, 10).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_dim_darkens_rgb_only() {
        let mut img = canvas(1, 1, Some(Color(100, 200, 50)));
        dim(&mut img, 0.4);
        assert_eq!(img.get_pixel(0, 0).0, [60, 120, 30, 255]);
    }

    #[test]
    fn test_data_url_prefix() {
        let url = data_url(&canvas(4, 4, None)).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }
}
