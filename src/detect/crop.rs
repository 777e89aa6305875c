//! Square cropping around a detection box.

use super::BoundingBox;
use image::RgbImage;

/// Crop `image` around `bbox`, expanded to a square where the image allows it.
///
/// The short side of the box is grown symmetrically to match the long side,
/// then the region is clamped to the image bounds, so crops near a border may
/// stay rectangular. Classifiers expect roughly square inputs; distorting the
/// aspect ratio instead would hurt them more than a partial crop does.
pub fn square_crop(image: &RgbImage, bbox: BoundingBox) -> RgbImage {
    let [mut x1, mut y1, mut x2, mut y2] = bbox;
    let xsize = x2 - x1;
    let ysize = y2 - y1;
    if xsize > ysize {
        let pad = ((xsize - ysize) / 2.0).floor();
        y1 -= pad;
        y2 += pad;
    } else if ysize > xsize {
        let pad = ((ysize - xsize) / 2.0).floor();
        x1 -= pad;
        x2 += pad;
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (x1, y1) = (x1.max(0.0) as u32, y1.max(0.0) as u32);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (x2, y2) = (
        (x2.max(0.0) as u32).min(image.width()),
        (y2.max(0.0) as u32).min(image.height()),
    );

    let width = x2.saturating_sub(x1).max(1);
    let height = y2.saturating_sub(y1).max(1);
    image::imageops::crop_imm(image, x1, y1, width, height).to_image()
}
