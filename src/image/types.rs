//! Image formats and the embedded (data URI) representation.

use crate::error::{MultiGenError, Result};
use base64::Engine;
use std::path::Path;

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format (modern, efficient).
    WebP,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Attempts to detect format from a MIME type.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }
}

/// Decodes a base64 string that may be imperfectly formatted.
///
/// Accepts a data URI prefix (`data:image/png;base64,...`), embedded
/// whitespace, and missing `=` padding, all of which strict decoders
/// reject.
fn decode_base64_lenient(input: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    // Strip data URI prefix if present (e.g. "data:image/png;base64,")
    let b64 = match input.find(";base64,") {
        Some(pos) => &input[pos + 8..],
        None => input,
    };

    // Strip whitespace (newlines, spaces, tabs)
    let cleaned: String = b64.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    // Try standard decoding first (fast path)
    if let Ok(data) = base64::engine::general_purpose::STANDARD.decode(&cleaned) {
        return Ok(data);
    }

    // Fall back to no-pad decoding (handles missing `=`)
    base64::engine::general_purpose::STANDARD_NO_PAD.decode(&cleaned)
}

/// A self-describing text encoding of binary image data plus its media type.
///
/// This is the form images take everywhere in the crate: the uploaded
/// reference image, the payload sent to the generation API (media type and
/// base64 data transmitted separately), and each generated result.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "embedded image should be displayed, transmitted, or saved"]
pub struct EmbeddedImage {
    media_type: String,
    data: String,
}

impl EmbeddedImage {
    /// Encodes raw image bytes, detecting the media type from magic bytes.
    ///
    /// Unknown content is not rejected; it is encoded as `image/png`, the
    /// same default the generation API assumes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let media_type = ImageFormat::from_magic_bytes(bytes)
            .map(|f| f.mime_type())
            .unwrap_or("image/png");
        Self::with_media_type(media_type, bytes)
    }

    /// Encodes raw image bytes under an explicit media type.
    pub fn with_media_type(media_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            media_type: media_type.into(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    /// Reads an image file and encodes it.
    ///
    /// Falls back to the file extension when the content has no recognized
    /// magic bytes. Fails with [`MultiGenError::Io`] when the file cannot
    /// be read.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;

        if ImageFormat::from_magic_bytes(&bytes).is_none() {
            if let Some(format) = path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(ImageFormat::from_extension)
            {
                return Ok(Self::with_media_type(format.mime_type(), &bytes));
            }
        }

        Ok(Self::from_bytes(&bytes))
    }

    /// Parses a `data:<media-type>;base64,<payload>` string.
    ///
    /// The payload is decoded leniently (whitespace and missing padding
    /// tolerated) and re-encoded canonically.
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| MultiGenError::Decode("not a data URI".into()))?;
        let (media_type, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| MultiGenError::Decode("missing ';base64,' separator".into()))?;
        let bytes =
            decode_base64_lenient(payload).map_err(|e| MultiGenError::Decode(e.to_string()))?;
        Ok(Self::with_media_type(media_type, &bytes))
    }

    /// Recombines a media type and a base64 payload, as returned by the
    /// generation API, into the self-describing form.
    pub fn from_raw_parts(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            data: data.into(),
        }
    }

    /// Returns the MIME type (e.g. `image/png`).
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Returns the bare base64 payload, with no data-URI prefix.
    ///
    /// This is the form transmitted to the generation API, which takes the
    /// media type as a separate field.
    pub fn base64_data(&self) -> &str {
        &self.data
    }

    /// Returns the image as a data URI, suitable for direct display.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }

    /// Decodes the payload back to raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        decode_base64_lenient(&self.data).map_err(|e| MultiGenError::Decode(e.to_string()))
    }

    /// Returns the file extension matching the media type.
    pub fn extension(&self) -> &'static str {
        ImageFormat::from_mime_type(&self.media_type)
            .unwrap_or_default()
            .extension()
    }

    /// Returns the size of the decoded image data in bytes.
    pub fn size(&self) -> usize {
        // base64 expands 3 bytes to 4 characters
        self.data.trim_end_matches('=').len() * 3 / 4
    }

    /// Decodes the image and writes it to the specified path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.decode()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_MAGIC: [u8; 12] = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0, 0, 0, 0, 0];
    const WEBP_MAGIC: [u8; 12] = *b"RIFF\x00\x00\x00\x00WEBP";

    #[test]
    fn test_format_from_magic_bytes() {
        assert_eq!(
            ImageFormat::from_magic_bytes(&PNG_MAGIC),
            Some(ImageFormat::Png)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&JPEG_MAGIC),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&WEBP_MAGIC),
            Some(ImageFormat::WebP)
        );
        assert_eq!(ImageFormat::from_magic_bytes(b"not an image"), None);
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ImageFormat::from_extension("png"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_extension("JPG"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension("webp"), Some(ImageFormat::WebP));
        assert_eq!(ImageFormat::from_extension("gif"), None);
    }

    #[test]
    fn test_format_from_mime_type() {
        assert_eq!(
            ImageFormat::from_mime_type("image/jpeg"),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(ImageFormat::from_mime_type("text/plain"), None);
    }

    #[test]
    fn test_from_bytes_detects_media_type() {
        let image = EmbeddedImage::from_bytes(&JPEG_MAGIC);
        assert_eq!(image.media_type(), "image/jpeg");
        assert_eq!(image.extension(), "jpg");
    }

    #[test]
    fn test_from_bytes_defaults_to_png() {
        let image = EmbeddedImage::from_bytes(b"mystery content!");
        assert_eq!(image.media_type(), "image/png");
    }

    #[test]
    fn test_data_uri_round_trip() {
        let image = EmbeddedImage::from_bytes(&PNG_MAGIC);
        let uri = image.to_data_uri();
        assert!(uri.starts_with("data:image/png;base64,"));

        let parsed = EmbeddedImage::from_data_uri(&uri).unwrap();
        assert_eq!(parsed, image);
        assert_eq!(parsed.decode().unwrap(), PNG_MAGIC.to_vec());
    }

    #[test]
    fn test_from_data_uri_tolerates_whitespace() {
        let image = EmbeddedImage::from_data_uri("data:image/png;base64,aGVs\nbG8=").unwrap();
        assert_eq!(image.decode().unwrap(), b"hello");
    }

    #[test]
    fn test_from_data_uri_rejects_malformed_input() {
        assert!(EmbeddedImage::from_data_uri("image/png;base64,aGVsbG8=").is_err());
        assert!(EmbeddedImage::from_data_uri("data:image/png,aGVsbG8=").is_err());
        assert!(EmbeddedImage::from_data_uri("data:image/png;base64,!!!").is_err());
    }

    #[test]
    fn test_base64_data_has_no_prefix() {
        let image = EmbeddedImage::from_bytes(&PNG_MAGIC);
        assert!(!image.base64_data().contains("base64,"));
        assert!(!image.base64_data().starts_with("data:"));
    }

    #[test]
    fn test_from_path_reads_and_detects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ref.bin");
        std::fs::write(&path, WEBP_MAGIC).unwrap();

        let image = EmbeddedImage::from_path(&path).unwrap();
        assert_eq!(image.media_type(), "image/webp");
    }

    #[test]
    fn test_from_path_falls_back_to_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        std::fs::write(&path, b"no magic here....").unwrap();

        let image = EmbeddedImage::from_path(&path).unwrap();
        assert_eq!(image.media_type(), "image/jpeg");
    }

    #[test]
    fn test_from_path_missing_file_is_io_error() {
        let err = EmbeddedImage::from_path("/nonexistent/ref.png").unwrap_err();
        assert!(matches!(err, MultiGenError::Io(_)));
    }

    #[test]
    fn test_save_writes_decoded_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");

        let image = EmbeddedImage::from_bytes(&PNG_MAGIC);
        image.save(&path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), PNG_MAGIC.to_vec());
    }

    #[test]
    fn test_size() {
        let image = EmbeddedImage::with_media_type("image/png", b"hello");
        assert_eq!(image.size(), 5);
    }
}
