use std::{fmt, io::Cursor};

use anyhow::Context as _;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::{ExtendedColorType, ImageEncoder as _, codecs::jpeg::JpegEncoder};

use crate::foundation::error::{SketchResult, VideoLoadError};

pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_PNG: &str = "image/png";

/// Compressed image bytes tagged with their MIME type.
///
/// Sampled frames and generated sketches share this type so presentation can treat them
/// uniformly (`to_data_url` yields the displayable form of either).
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DataUrlError {
    #[error("not a base64 image data URL")]
    NotImageDataUrl,
    #[error("invalid base64 payload: {0}")]
    Payload(String),
    #[error("empty image payload")]
    Empty,
}

impl EncodedImage {
    pub fn new(mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            bytes,
        }
    }

    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self::new(MIME_JPEG, bytes)
    }

    pub fn png(bytes: Vec<u8>) -> Self {
        Self::new(MIME_PNG, bytes)
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }

    /// `data:<mime>;base64,<payload>`
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.to_base64())
    }

    /// Split a `data:image/...;base64,` URL into MIME tag and raw bytes.
    ///
    /// `image/jpg` is normalized to `image/jpeg`.
    pub fn from_data_url(url: &str) -> Result<Self, DataUrlError> {
        let rest = url
            .trim()
            .strip_prefix("data:")
            .ok_or(DataUrlError::NotImageDataUrl)?;
        let (header, payload) = rest.split_once(',').ok_or(DataUrlError::NotImageDataUrl)?;
        let mime = header
            .strip_suffix(";base64")
            .ok_or(DataUrlError::NotImageDataUrl)?;
        if !mime.starts_with("image/") || mime.len() == "image/".len() {
            return Err(DataUrlError::NotImageDataUrl);
        }
        let mime = if mime == "image/jpg" { MIME_JPEG } else { mime };

        Self::from_base64(mime, payload)
    }

    pub fn from_base64(mime: impl Into<String>, payload: &str) -> Result<Self, DataUrlError> {
        let bytes = BASE64
            .decode(payload.trim())
            .map_err(|e| DataUrlError::Payload(e.to_string()))?;
        if bytes.is_empty() {
            return Err(DataUrlError::Empty);
        }
        Ok(Self::new(mime, bytes))
    }

    /// PNG bytes of this image, transcoding when it is stored in another format.
    pub fn to_png_bytes(&self) -> SketchResult<Vec<u8>> {
        if self.mime == MIME_PNG {
            return Ok(self.bytes.clone());
        }
        let img = image::load_from_memory(&self.bytes)
            .with_context(|| format!("decode {} image for png export", self.mime))?;
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .context("encode png")?;
        Ok(out)
    }
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Encode a straight-alpha RGBA8 surface as JPEG. Alpha is dropped.
pub fn encode_rgba8_jpeg(
    rgba: &[u8],
    width: u32,
    height: u32,
    quality: u8,
) -> Result<EncodedImage, VideoLoadError> {
    let expected = width as usize * height as usize * 4;
    if expected == 0 || rgba.len() != expected {
        return Err(VideoLoadError::Encode(format!(
            "surface is {} bytes, expected {expected} for {width}x{height} rgba",
            rgba.len()
        )));
    }

    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
    for px in rgba.chunks_exact(4) {
        rgb.extend_from_slice(&px[..3]);
    }

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
        .write_image(&rgb, width, height, ExtendedColorType::Rgb8)
        .map_err(|e| VideoLoadError::Encode(e.to_string()))?;
    Ok(EncodedImage::jpeg(out))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/encoded.rs"]
mod tests;
