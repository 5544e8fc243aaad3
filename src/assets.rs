//! Image providers resolving a durable reference to decoded pixels.
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use image::RgbaImage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("decode error: {0}")]
    Decode(#[from] image::ImageError),
    #[error("no image registered for `{0}`")]
    Missing(String),
    #[error("source window {width}x{height}+{x}+{y} lies outside the raster")]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
}

pub trait ImageProvider {
    fn load(&self, reference: &str) -> Result<RgbaImage, ImageLoadError>;
}

/// Resolves references as paths relative to a root directory.
#[derive(Debug, Clone)]
pub struct FileImageProvider {
    root: PathBuf,
}

impl FileImageProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ImageProvider for FileImageProvider {
    fn load(&self, reference: &str) -> Result<RgbaImage, ImageLoadError> {
        let path = self.root.join(reference);
        if !path.is_file() {
            return Err(ImageLoadError::Missing(reference.to_string()));
        }
        Ok(image::open(&path)?.to_rgba8())
    }
}

/// In-process provider; clones share one registry.
#[derive(Debug, Clone, Default)]
pub struct MemoryImageProvider {
    images: Rc<RefCell<HashMap<String, RgbaImage>>>,
}

impl MemoryImageProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, reference: impl Into<String>, image: RgbaImage) {
        self.images.borrow_mut().insert(reference.into(), image);
    }

    pub fn remove(&self, reference: &str) -> bool {
        self.images.borrow_mut().remove(reference).is_some()
    }
}

impl ImageProvider for MemoryImageProvider {
    fn load(&self, reference: &str) -> Result<RgbaImage, ImageLoadError> {
        self.images
            .borrow()
            .get(reference)
            .cloned()
            .ok_or_else(|| ImageLoadError::Missing(reference.to_string()))
    }
}
