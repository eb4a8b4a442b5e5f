//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bgremove_client::{BgRemovalError, RemovalService, Result, SelectedImage};
use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Encode a small gradient image in `format`
pub fn encoded_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let image = match format {
        // JPEG has no alpha channel
        ImageFormat::Jpeg => {
            let mut image = RgbImage::new(width, height);
            for (x, y, pixel) in image.enumerate_pixels_mut() {
                let intensity = ((x + y) % 100) as u8;
                *pixel = image::Rgb([intensity, 128, 255 - intensity]);
            }
            DynamicImage::ImageRgb8(image)
        },
        _ => {
            let mut image = RgbaImage::new(width, height);
            for (x, y, pixel) in image.enumerate_pixels_mut() {
                let intensity = ((x + y) % 100) as u8;
                *pixel = image::Rgba([intensity, 128, 255 - intensity, 255]);
            }
            DynamicImage::ImageRgba8(image)
        },
    };

    let mut buffer = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut buffer), format)
        .expect("encode test image");
    buffer
}

/// A transparent PNG standing in for an API result
pub fn transparent_png() -> Vec<u8> {
    let image = DynamicImage::ImageRgba8(RgbaImage::new(4, 4));
    let mut buffer = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut buffer), ImageFormat::Png)
        .expect("encode result image");
    buffer
}

/// Write `data` to `dir/name` and return the path
pub fn write_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).expect("write fixture");
    path
}

/// Scripted response of a [`MockService`]
#[derive(Debug, Clone)]
pub enum MockResponse {
    Image(Vec<u8>),
    Fail(String),
}

/// In-process [`RemovalService`] that records every upload
pub struct MockService {
    response: MockResponse,
    uploads: Mutex<Vec<(String, String)>>,
}

impl MockService {
    pub fn succeeding(result: Vec<u8>) -> Self {
        Self::new(MockResponse::Image(result))
    }

    pub fn failing(reason: &str) -> Self {
        Self::new(MockResponse::Fail(reason.to_string()))
    }

    fn new(response: MockResponse) -> Self {
        Self {
            response,
            uploads: Mutex::new(Vec::new()),
        }
    }

    /// (file name, MIME type) of every request received
    pub fn uploads(&self) -> Vec<(String, String)> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemovalService for MockService {
    async fn remove_background(&self, image: &SelectedImage) -> Result<Vec<u8>> {
        self.uploads
            .lock()
            .unwrap()
            .push((image.file_name().to_string(), image.mime().to_string()));

        match &self.response {
            MockResponse::Image(bytes) => Ok(bytes.clone()),
            MockResponse::Fail(reason) => Err(BgRemovalError::removal_failed(reason.clone())),
        }
    }
}
