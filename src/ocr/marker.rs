//! Special-edition marker detection by color segmentation.
//!
//! Special-edition cards carry a small orange-yellow rectangle in the lower
//! left corner. The lower third of the card is thresholded in HSV space and
//! the connected components of the mask are checked for one of plausible
//! size and position.

use image::{GrayImage, Luma, Rgba, RgbaImage};
use imageproc::region_labelling::{connected_components, Connectivity};
use tracing::debug;

use crate::config::MarkerConfig;

/// Bounding box and pixel count of one connected component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blob {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    pub area: u32,
}

/// Converts an RGB pixel to HSV on the 0..180 / 0..255 / 0..255 scale.
pub fn rgb_to_hsv(pixel: &Rgba<u8>) -> (u8, u8, u8) {
    let r = pixel[0] as f32;
    let g = pixel[1] as f32;
    let b = pixel[2] as f32;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let v = max;
    let s = if max > 0.0 { delta / max * 255.0 } else { 0.0 };

    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    ((h / 2.0).round() as u8 % 180, s.round() as u8, v as u8)
}

/// Builds a binary mask (255 = selected) of pixels inside the marker hue range.
pub fn marker_mask(img: &RgbaImage, config: &MarkerConfig) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut mask = GrayImage::new(width, height);

    for (x, y, pixel) in img.enumerate_pixels() {
        let (h, s, v) = rgb_to_hsv(pixel);
        let selected = (config.hue_min..=config.hue_max).contains(&h)
            && s >= config.saturation_min
            && v >= config.value_min;
        if selected {
            mask.put_pixel(x, y, Luma([255]));
        }
    }

    mask
}

/// Labels 8-connected components of the mask and measures each one.
pub fn find_blobs(mask: &GrayImage) -> Vec<Blob> {
    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));
    let mut blobs: Vec<Option<Blob>> = Vec::new();

    for (x, y, label) in labels.enumerate_pixels() {
        let label = label[0] as usize;
        if label == 0 {
            continue;
        }
        if blobs.len() < label {
            blobs.resize(label, None);
        }
        let blob = blobs[label - 1].get_or_insert(Blob {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
            area: 0,
        });
        blob.min_x = blob.min_x.min(x);
        blob.min_y = blob.min_y.min(y);
        blob.max_x = blob.max_x.max(x);
        blob.max_y = blob.max_y.max(y);
        blob.area += 1;
    }

    blobs.into_iter().flatten().collect()
}

/// Returns true if the card shows a special-edition color marker.
///
/// Only the lower third is inspected, so every component found already lies
/// in the lower half; the horizontal position and the area band decide.
pub fn detect_special_edition(card: &RgbaImage, config: &MarkerConfig) -> bool {
    let (w, h) = card.dimensions();
    let top = h - h / 3;
    let lower_third = image::imageops::crop_imm(card, 0, top, w, h - top).to_image();

    let mask = marker_mask(&lower_third, config);
    let max_left = w as f32 * config.max_left_fraction;

    let found = find_blobs(&mask).into_iter().find(|blob| {
        (blob.min_x as f32) < max_left
            && (config.min_area..=config.max_area).contains(&blob.area)
    });

    if let Some(blob) = found {
        debug!("Special-edition marker found: {:?}", blob);
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORANGE: Rgba<u8> = Rgba([255, 140, 0, 255]);
    const GREY: Rgba<u8> = Rgba([40, 40, 40, 255]);

    fn card_with_rect(x0: u32, y0: u32, rw: u32, rh: u32) -> RgbaImage {
        RgbaImage::from_fn(200, 300, |x, y| {
            if x >= x0 && x < x0 + rw && y >= y0 && y < y0 + rh {
                ORANGE
            } else {
                GREY
            }
        })
    }

    #[test]
    fn test_rgb_to_hsv() {
        assert_eq!(rgb_to_hsv(&Rgba([255, 0, 0, 255])), (0, 255, 255));
        assert_eq!(rgb_to_hsv(&Rgba([0, 255, 0, 255])), (60, 255, 255));
        assert_eq!(rgb_to_hsv(&Rgba([0, 0, 255, 255])), (120, 255, 255));
        assert_eq!(rgb_to_hsv(&Rgba([128, 128, 128, 255])), (0, 0, 128));
        // Orange sits inside the default marker hue range
        let (h, s, v) = rgb_to_hsv(&ORANGE);
        assert!((5..=25).contains(&h), "hue {}", h);
        assert_eq!((s, v), (255, 255));
    }

    #[test]
    fn test_find_blobs_separates_components() {
        let mut mask = GrayImage::new(20, 10);
        for x in 0..3 {
            for y in 0..2 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        mask.put_pixel(10, 5, Luma([255]));
        // Diagonal neighbour joins under 8-connectivity
        mask.put_pixel(11, 6, Luma([255]));

        let mut blobs = find_blobs(&mask);
        blobs.sort_by_key(|b| b.min_x);
        assert_eq!(blobs.len(), 2);
        assert_eq!(blobs[0].area, 6);
        assert_eq!((blobs[0].max_x, blobs[0].max_y), (2, 1));
        assert_eq!(blobs[1].area, 2);
    }

    #[test]
    fn test_detects_marker_lower_left() {
        let card = card_with_rect(10, 260, 30, 20);
        assert!(detect_special_edition(&card, &MarkerConfig::default()));
    }

    #[test]
    fn test_rejects_marker_on_right() {
        let card = card_with_rect(150, 260, 30, 20);
        assert!(!detect_special_edition(&card, &MarkerConfig::default()));
    }

    #[test]
    fn test_rejects_marker_above_lower_third() {
        let card = card_with_rect(10, 50, 30, 20);
        assert!(!detect_special_edition(&card, &MarkerConfig::default()));
    }

    #[test]
    fn test_rejects_specks_and_large_areas() {
        // 5x5 = 25 px, below min_area
        let card = card_with_rect(10, 260, 5, 5);
        assert!(!detect_special_edition(&card, &MarkerConfig::default()));
        // 100x90 = 9000 px, above max_area
        let card = card_with_rect(0, 205, 100, 90);
        assert!(!detect_special_edition(&card, &MarkerConfig::default()));
    }

    #[test]
    fn test_plain_card_has_no_marker() {
        let card = RgbaImage::from_pixel(120, 90, GREY);
        assert!(!detect_special_edition(&card, &MarkerConfig::default()));
    }
}
