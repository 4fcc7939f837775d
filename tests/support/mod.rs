//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod socket_guard;

use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};

/// Encodes a small solid-color PNG page.
#[must_use]
pub fn png_page(width: u32, height: u32, shade: u8) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([shade, shade, shade]));
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("encode test PNG");
    bytes.into_inner()
}

/// Series page markup listing `total` chapters.
#[must_use]
pub fn series_page_html(total: usize) -> String {
    format!(
        "<html><body><div class=\"meta\"><span>Total chapters</span><span>{total}</span></div></body></html>"
    )
}

/// Chapter page markup with the given page image URLs inside `div#content`.
#[must_use]
pub fn chapter_page_html(image_urls: &[String]) -> String {
    let images: String = image_urls
        .iter()
        .map(|url| format!("<img data-src=\"{url}\" src=\"/placeholder.gif\">"))
        .collect();
    format!("<html><body><div id=\"content\">{images}</div></body></html>")
}
