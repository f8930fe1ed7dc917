use std::sync::Arc;

use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};

use crate::error::Result;
use crate::render::color::{Color, DEFAULT_ACCENT};
use crate::render::KEY_SIZE;

/// Sample edge used for color analysis.
const SAMPLE_SIZE: u32 = 50;

/// Decoded cover art, pre-scaled for the album-art key.
#[derive(Debug, Clone)]
pub struct Artwork {
    pub image: Arc<RgbaImage>,
    pub dominant: Color,
}

pub fn decode(bytes: &[u8]) -> Result<Artwork> {
    let img = image::load_from_memory(bytes)?;
    let dominant = dominant_color(&img);
    let image = img
        .resize_exact(KEY_SIZE, KEY_SIZE, FilterType::Triangle)
        .to_rgba8();
    Ok(Artwork {
        image: Arc::new(image),
        dominant,
    })
}

/// Average of the saturated mid-tone pixels of a 50×50 sample, pushed 20%
/// away from its own minimum channel.  Falls back to the brand accent when
/// nothing qualifies.
pub fn dominant_color(img: &DynamicImage) -> Color {
    let sample = img
        .resize_exact(SAMPLE_SIZE, SAMPLE_SIZE, FilterType::Triangle)
        .to_rgba8();

    let (mut r, mut g, mut b, mut count) = (0u64, 0u64, 0u64, 0u64);
    for px in sample.pixels() {
        let [pr, pg, pb, _] = px.0;
        let brightness = (pr as f64 + pg as f64 + pb as f64) / 3.0;
        if brightness <= 30.0 || brightness >= 220.0 {
            continue;
        }
        let mx = pr.max(pg).max(pb) as f64;
        let mn = pr.min(pg).min(pb) as f64;
        if mx > 0.0 && (mx - mn) / mx > 0.2 {
            r += pr as u64;
            g += pg as u64;
            b += pb as u64;
            count += 1;
        }
    }
    if count == 0 {
        return DEFAULT_ACCENT;
    }

    let avg = |sum: u64| (sum as f64 / count as f64).round();
    let (r, g, b) = (avg(r), avg(g), avg(b));
    let mn = r.min(g).min(b);
    let push = |c: f64| (c + (c - mn) * 0.2).round().min(255.0) as u8;
    Color(push(r), push(g), push(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(rgb: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            80,
            80,
            Rgba([rgb[0], rgb[1], rgb[2], 255]),
        ))
    }

    #[test]
    fn test_saturated_color_is_pushed() {
        // avg (200,100,50): min 50 → (230,110,50)
        assert_eq!(dominant_color(&solid([200, 100, 50])), Color(230, 110, 50));
    }

    #[test]
    fn test_grey_and_extremes_fall_back() {
        assert_eq!(dominant_color(&solid([128, 128, 128])), DEFAULT_ACCENT);
        assert_eq!(dominant_color(&solid([5, 0, 0])), DEFAULT_ACCENT);
        assert_eq!(dominant_color(&solid([250, 250, 240])), DEFAULT_ACCENT);
    }

    #[test]
    fn test_channel_clamped() {
        // avg (250,120,120) brightness 163; min 120 → 250+26=276 → 255
        assert_eq!(dominant_color(&solid([250, 120, 120])), Color(255, 120, 120));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode(b"not an image").is_err());
    }

    #[test]
    fn test_decode_png_scales_to_key() {
        let mut bytes = Vec::new();
        solid([200, 100, 50])
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        let art = decode(&bytes).unwrap();
        assert_eq!(art.image.dimensions(), (KEY_SIZE, KEY_SIZE));
        assert_eq!(art.dominant, Color(230, 110, 50));
    }
}
