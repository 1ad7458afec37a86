use image::RgbaImage;

use crate::config::{RegionGeometry, ScreenshotCrop};

/// The text regions of one card image.
#[derive(Debug, Clone)]
pub struct CardRegions {
    /// Bottom band holding the name; always contains the quantity-and-price band
    pub name: RgbaImage,
    /// Left part of the quantity-and-price band
    pub quantity: RgbaImage,
    /// Right part of the quantity-and-price band
    pub price: RgbaImage,
}

/// Pixel length of `fraction` of `total`, truncated and clamped to `total`.
fn scaled(total: u32, fraction: f32) -> u32 {
    ((total as f32 * fraction.max(0.0)) as u32).min(total)
}

/// Crops a rectangle given in absolute pixels, clamped to image bounds.
fn crop(img: &RgbaImage, x: u32, y: u32, width: u32, height: u32) -> RgbaImage {
    let (w, h) = img.dimensions();
    let x = x.min(w);
    let y = y.min(h);
    let width = width.min(w - x);
    let height = height.min(h - y);
    image::imageops::crop_imm(img, x, y, width, height).to_image()
}

/// Slices a card image into name, quantity and price regions.
///
/// Cuts are proportional and fixed; no layout detection. Regions keep the
/// source pixel format and are not resized. Quantity and price regions may
/// overlap horizontally.
pub fn extract_regions(card: &RgbaImage, geometry: &RegionGeometry) -> CardRegions {
    let (w, h) = card.dimensions();

    let band_h = scaled(h, geometry.band_height);
    let name_h = scaled(h, geometry.name_band).max(band_h);
    let band = crop(card, 0, h - band_h, w, band_h);

    let quantity_w = scaled(w, geometry.quantity_left);
    let price_x = scaled(w, geometry.price_left_start);

    CardRegions {
        name: crop(card, 0, h - name_h, w, name_h),
        quantity: crop(&band, 0, 0, quantity_w, band_h),
        price: crop(&band, price_x, 0, w - price_x, band_h),
    }
}

/// Trims a full inventory screenshot to the card grid using edge fractions.
pub fn crop_screenshot(img: &RgbaImage, cut: &ScreenshotCrop) -> RgbaImage {
    let (w, h) = img.dimensions();

    let left = scaled(w, cut.left);
    let top = scaled(h, cut.top);
    let right = w - scaled(w, cut.right);
    let bottom = h - scaled(h, cut.bottom);

    crop(
        img,
        left,
        top,
        right.saturating_sub(left),
        bottom.saturating_sub(top),
    )
}
