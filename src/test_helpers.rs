//! Shared test utilities.
//!
//! Synthetic image writers for backend tests, and a fixture bundling a temp
//! media root, an in-memory store and a mock-backed materializer for pipeline
//! and payload tests.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let mut fx = MockFixture::new();
//! let path = upload(&fx.materializer, "gallery/", "pool.jpg");
//! fx.store.insert_gallery_image(&GalleryImage { image: Some(path), ..Default::default() })?;
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::imaging::ImageBackend;
use crate::imaging::backend::tests::MockBackend;
use crate::materialize::Materializer;
use crate::storage::MediaStorage;
use crate::store::Store;

pub const CACHE_DIR: &str = "CACHE/images";

// =========================================================================
// Synthetic images
// =========================================================================

/// Write a gradient JPEG so resizes have something to resample.
pub fn write_jpeg(path: &Path, width: u32, height: u32) {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    img.save_with_format(path, image::ImageFormat::Jpeg).unwrap();
}

/// Write an RGBA PNG whose left quarter is fully transparent.
pub fn write_rgba_png(path: &Path, width: u32, height: u32) {
    let img = image::RgbaImage::from_fn(width, height, |x, _| {
        if x < width / 4 {
            image::Rgba([0, 0, 0, 0])
        } else {
            image::Rgba([200, 30, 30, 255])
        }
    });
    img.save_with_format(path, image::ImageFormat::Png).unwrap();
}

/// Encode a JPEG in memory, for uploads through [`MediaStorage::save`].
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 64])
    });
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Jpeg).unwrap();
    buf.into_inner()
}

// =========================================================================
// Fixtures
// =========================================================================

/// Temp media root, in-memory store, mock-backed materializer.
pub struct MockFixture {
    pub tmp: TempDir,
    pub store: Store,
    pub materializer: Materializer<MockBackend>,
}

impl MockFixture {
    pub fn new() -> Self {
        Self::with_backend(MockBackend::new())
    }

    pub fn with_backend(backend: MockBackend) -> Self {
        let tmp = TempDir::new().unwrap();
        let storage = MediaStorage::new(tmp.path(), "/media/");
        let materializer = Materializer::with_backend(backend, storage, CACHE_DIR);
        Self {
            tmp,
            store: Store::open_in_memory().unwrap(),
            materializer,
        }
    }
}

/// Store placeholder bytes under `dir` and return the storage-relative path.
/// Only meaningful with [`MockBackend`], which never decodes.
pub fn upload<B: ImageBackend>(m: &Materializer<B>, dir: &str, name: &str) -> String {
    m.storage().save(dir, name, b"not-really-an-image").unwrap()
}
