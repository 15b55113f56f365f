use std::io::Cursor;

use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};

/// Encodes a solid-colour `width x height` PNG in memory.
pub fn png_bytes(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb(rgb));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageOutputFormat::Png)
        .unwrap();
    out.into_inner()
}
