#![allow(dead_code)]

use std::fs;
use std::path::Path;

use image::{DynamicImage, RgbImage};
use tilewatch::detection::{BBoxXYXY, Detection, Local};
use tilewatch::TilewatchError;

pub fn blank_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    blank_image(width, height)
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode png");
    bytes
}

pub fn write_png(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, png_bytes(width, height)).expect("write png file");
}

/// One box covering the whole input, with the input's width as class id.
pub fn whole_image_box(image: &DynamicImage) -> Result<Vec<Detection<Local>>, TilewatchError> {
    let (w, h) = (image.width(), image.height());
    Ok(vec![Detection::new(
        BBoxXYXY::from_xyxy(0.0, 0.0, f64::from(w), f64::from(h)),
        0.9,
        w,
    )])
}

/// A fixed `(10, 10, 20, 20)` box on every input.
pub fn fixed_box(_: &DynamicImage) -> Result<Vec<Detection<Local>>, TilewatchError> {
    Ok(vec![Detection::new(
        BBoxXYXY::from_xyxy(10.0, 10.0, 20.0, 20.0),
        0.75,
        3u32,
    )])
}
