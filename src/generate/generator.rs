use std::{fmt, sync::Arc};

use serde::Serialize;

use crate::{assets::encoded::EncodedImage, foundation::error::GenerationError};

/// Aspect ratio hint understood by the image model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    pub const SUPPORTED: [AspectRatio; 10] = [
        AspectRatio::new(1, 1),
        AspectRatio::new(2, 3),
        AspectRatio::new(3, 2),
        AspectRatio::new(3, 4),
        AspectRatio::new(4, 3),
        AspectRatio::new(4, 5),
        AspectRatio::new(5, 4),
        AspectRatio::new(9, 16),
        AspectRatio::new(16, 9),
        AspectRatio::new(21, 9),
    ];

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Supported ratio nearest to `width:height` (compared on a log scale).
    pub fn closest_to(width: u32, height: u32) -> Self {
        if width == 0 || height == 0 {
            return Self::default();
        }
        let target = (f64::from(width) / f64::from(height)).ln();
        Self::SUPPORTED
            .into_iter()
            .min_by(|a, b| {
                let da = (a.ln_ratio() - target).abs();
                let db = (b.ln_ratio() - target).abs();
                da.total_cmp(&db)
            })
            .unwrap_or_default()
    }

    fn ln_ratio(self) -> f64 {
        (f64::from(self.width) / f64::from(self.height)).ln()
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::new(16, 9)
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

/// One frame to redraw.
#[derive(Clone, Copy, Debug)]
pub struct SketchRequest<'a> {
    pub image: &'a EncodedImage,
    pub aspect_ratio: AspectRatio,
}

/// Remote service that redraws a still as a sketch.
///
/// One call returns one finished image or fails; callers never see partial output.
pub trait SketchGenerator: Send + Sync {
    fn generate(&self, request: &SketchRequest<'_>) -> Result<EncodedImage, GenerationError>;
}

impl<T: SketchGenerator + ?Sized> SketchGenerator for Arc<T> {
    fn generate(&self, request: &SketchRequest<'_>) -> Result<EncodedImage, GenerationError> {
        (**self).generate(request)
    }
}

impl<T: SketchGenerator + ?Sized> SketchGenerator for &T {
    fn generate(&self, request: &SketchRequest<'_>) -> Result<EncodedImage, GenerationError> {
        (**self).generate(request)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/generate/generator.rs"]
mod tests;
