//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations every backend must
//! support: identify, render, and placeholder.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend): pure Rust decoding and
//! resampling via the `image` crate, lossy WebP encoding via libwebp.

use super::params::{Quality, RenderParams};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {path}: {reason}")]
    Decode { path: String, reason: String },
    #[error("Failed to encode: {0}")]
    Encode(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// Every backend must implement all three operations so the materializer and
/// the placeholder encoder are backend-agnostic.
pub trait ImageBackend: Sync {
    /// Get image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Decode the source, apply the variant's fit, encode, and write the
    /// result to `params.output`. The output directory must already exist.
    fn render(&self, params: &RenderParams) -> Result<(), BackendError>;

    /// Re-encode the source at original resolution, flattened onto white,
    /// and return the encoded bytes without touching disk.
    fn placeholder(&self, source: &Path, quality: Quality) -> Result<Vec<u8>, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::params::VariantSpec;
    use std::sync::Mutex;

    /// Bytes the mock writes for every rendered variant.
    pub const MOCK_OUTPUT: &[u8] = b"RIFF\x08\x00\x00\x00WEBPmock";

    /// Mock backend that records operations instead of executing them.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    ///
    /// `render` writes [`MOCK_OUTPUT`] to the output path so cache checks see a
    /// real file. Sources whose path contains one of `failing` are rejected
    /// with a decode error.
    #[derive(Default)]
    pub struct MockBackend {
        pub identify_results: Mutex<Vec<Dimensions>>,
        pub operations: Mutex<Vec<RecordedOp>>,
        pub failing: Vec<String>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify(String),
        Render {
            source: String,
            output: String,
            variant: String,
            width: u32,
            height: u32,
            quality: u32,
        },
        Placeholder {
            source: String,
            quality: u32,
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_dimensions(dims: Vec<Dimensions>) -> Self {
            Self {
                identify_results: Mutex::new(dims),
                ..Self::default()
            }
        }

        pub fn failing_on(fragment: &str) -> Self {
            Self {
                failing: vec![fragment.to_string()],
                ..Self::default()
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        pub fn render_count(&self) -> usize {
            self.get_operations()
                .iter()
                .filter(|op| matches!(op, RecordedOp::Render { .. }))
                .count()
        }

        fn check_source(&self, path: &Path) -> Result<(), BackendError> {
            let shown = path.to_string_lossy();
            if self.failing.iter().any(|f| shown.contains(f.as_str())) {
                return Err(BackendError::Decode {
                    path: shown.to_string(),
                    reason: "mock decode failure".to_string(),
                });
            }
            Ok(())
        }
    }

    impl ImageBackend for MockBackend {
        fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Identify(path.to_string_lossy().to_string()));

            self.identify_results.lock().unwrap().pop().ok_or_else(|| {
                BackendError::Decode {
                    path: path.to_string_lossy().to_string(),
                    reason: "No mock dimensions".to_string(),
                }
            })
        }

        fn render(&self, params: &RenderParams) -> Result<(), BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Render {
                source: params.source.to_string_lossy().to_string(),
                output: params.output.to_string_lossy().to_string(),
                variant: params.spec.name.to_string(),
                width: params.spec.width,
                height: params.spec.height,
                quality: params.spec.quality.value(),
            });
            self.check_source(&params.source)?;
            std::fs::write(&params.output, MOCK_OUTPUT)?;
            Ok(())
        }

        fn placeholder(&self, source: &Path, quality: Quality) -> Result<Vec<u8>, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Placeholder {
                source: source.to_string_lossy().to_string(),
                quality: quality.value(),
            });
            self.check_source(source)?;
            Ok(MOCK_OUTPUT.to_vec())
        }
    }

    #[test]
    fn mock_records_identify() {
        let backend = MockBackend::with_dimensions(vec![Dimensions {
            width: 800,
            height: 600,
        }]);

        let result = backend.identify(Path::new("/test/image.jpg")).unwrap();
        assert_eq!(result.width, 800);
        assert_eq!(result.height, 600);

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RecordedOp::Identify(p) if p == "/test/image.jpg"));
    }

    #[test]
    fn mock_render_writes_output() {
        let tmp = tempfile::TempDir::new().unwrap();
        let output = tmp.path().join("card.webp");
        let backend = MockBackend::new();

        backend
            .render(&RenderParams {
                source: "/source.jpg".into(),
                output: output.clone(),
                spec: VariantSpec::fill("card", 600, 400, 80),
            })
            .unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), MOCK_OUTPUT);
        let ops = backend.get_operations();
        assert!(matches!(
            &ops[0],
            RecordedOp::Render {
                width: 600,
                height: 400,
                quality: 80,
                ..
            }
        ));
    }

    #[test]
    fn mock_failing_source_returns_decode_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = MockBackend::failing_on("broken");

        let result = backend.render(&RenderParams {
            source: "/uploads/broken.jpg".into(),
            output: tmp.path().join("x.webp"),
            spec: VariantSpec::fill("webp", 10, 10, 80),
        });

        assert!(matches!(result, Err(BackendError::Decode { .. })));
        assert!(!tmp.path().join("x.webp").exists());
    }

    #[test]
    fn mock_records_placeholder_quality() {
        let backend = MockBackend::new();
        backend
            .placeholder(Path::new("/a.png"), Quality::new(50))
            .unwrap();
        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Placeholder {
                source: "/a.png".to_string(),
                quality: 50
            }]
        );
    }
}
