//! Decoding uploads, encoding images for the model, and preview thumbnails

use base64::{engine::general_purpose, Engine as _};
use image::imageops::FilterType;
use image::{DynamicImage, ImageOutputFormat};
use serde::Serialize;
use std::fmt::Debug;
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

/// MIME type of every image sent to the model
pub const PNG_MIME: &str = "image/png";

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("unsupported file type {0:?}")]
    UnsupportedType(String),

    #[error("{0}")]
    Decode(#[from] image::ImageError),

    #[error("invalid base64 data: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// An upload that could not be turned into an image
#[derive(Debug, Error)]
#[error("Error loading image {name}: {source}")]
pub struct UploadError {
    pub name: String,
    pub source: ImageError,
}

/// A raw uploaded file
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Build an upload from base64 (or data URL) content
    pub fn from_base64(name: String, data: &str) -> Result<Self, UploadError> {
        match decode_base64(data) {
            Ok(bytes) => Ok(Upload { name, bytes }),
            Err(source) => Err(UploadError { name, source }),
        }
    }
}

impl Debug for Upload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Upload {{ name: {:?}, bytes: <{} bytes> }}",
            self.name,
            self.bytes.len()
        )
    }
}

/// An upload that decoded successfully
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub name: String,
    pub image: DynamicImage,
}

/// Image bytes ready to be sent, tagged with their MIME type
#[derive(Clone, PartialEq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
}

impl EncodedImage {
    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.bytes)
    }
}

impl Debug for EncodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "EncodedImage {{ bytes: <{} bytes>, mime_type: {:?} }}",
            self.bytes.len(),
            self.mime_type
        )
    }
}

/// A captioned preview, embedded as a data URL
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Thumbnail {
    pub caption: String,
    pub data_url: String,
}

impl Thumbnail {
    pub fn new(caption: String, image: &DynamicImage) -> Result<Self, ImageError> {
        let encoded = encode_png(image)?;
        Ok(Thumbnail {
            caption,
            data_url: format!("data:{};base64,{}", encoded.mime_type, encoded.to_base64()),
        })
    }
}

/// Whether `name` carries one of the accepted extensions (case-insensitive)
pub fn has_accepted_extension(name: &str, accepted: &[String]) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| accepted.iter().any(|a| a.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Decode a base64 string into upload bytes
pub fn decode_base64(data: &str) -> Result<Vec<u8>, ImageError> {
    // Tolerate data URLs straight from a FileReader
    let data = match data.split_once(";base64,") {
        Some((_, payload)) => payload,
        None => data,
    };
    Ok(general_purpose::STANDARD.decode(data.trim())?)
}

/// Decode an uploaded file into a bitmap
pub fn decode(upload: Upload, accepted: &[String]) -> Result<DecodedImage, ImageError> {
    if !has_accepted_extension(&upload.name, accepted) {
        return Err(ImageError::UnsupportedType(upload.name));
    }
    let image = image::load_from_memory(&upload.bytes)?;
    Ok(DecodedImage {
        name: upload.name,
        image,
    })
}

/// Encode an image as PNG in memory
pub fn encode_png(image: &DynamicImage) -> Result<EncodedImage, ImageError> {
    let mut bytes: Vec<u8> = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)?;
    Ok(EncodedImage {
        bytes,
        mime_type: PNG_MIME,
    })
}

/// Resize to exactly `size` x `size`, ignoring the aspect ratio
pub fn thumbnail(image: &DynamicImage, size: u32) -> DynamicImage {
    image.resize_exact(size, size, FilterType::Triangle)
}

#[cfg(test)]
pub(crate) mod test {
    use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
    use std::io::Cursor;

    /// An in-memory test image with a simple gradient
    pub fn gradient(width: u32, height: u32) -> DynamicImage {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        DynamicImage::ImageRgb8(img)
    }

    /// Encode a test image in the given container format
    pub fn file_bytes(width: u32, height: u32, format: ImageOutputFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        gradient(width, height)
            .write_to(&mut Cursor::new(&mut bytes), format)
            .unwrap();
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::test::*;
    use super::*;
    use image::GenericImageView;

    fn accepted() -> Vec<String> {
        vec!["png".into(), "jpg".into(), "jpeg".into()]
    }

    #[test]
    fn test_thumbnail_is_square() {
        for (w, h) in [(640, 480), (20, 900), (150, 150), (1, 1)] {
            let thumb = thumbnail(&gradient(w, h), 150);
            assert_eq!(thumb.dimensions(), (150, 150), "input {w}x{h}");
        }
    }

    #[test]
    fn test_encode_png_tags_mime() {
        let encoded = encode_png(&gradient(8, 4)).unwrap();
        assert_eq!(encoded.mime_type, "image/png");
        assert_eq!(
            image::guess_format(&encoded.bytes).unwrap(),
            image::ImageFormat::Png
        );
    }

    #[test]
    fn test_jpeg_upload_is_sent_as_png() {
        let upload = Upload {
            name: "scan.JPG".into(),
            bytes: file_bytes(32, 16, ImageOutputFormat::Jpeg(90)),
        };
        let decoded = decode(upload, &accepted()).unwrap();
        assert_eq!(decoded.image.dimensions(), (32, 16));

        let encoded = encode_png(&decoded.image).unwrap();
        assert_eq!(encoded.mime_type, PNG_MIME);
        assert_eq!(
            image::guess_format(&encoded.bytes).unwrap(),
            image::ImageFormat::Png
        );
    }

    #[test]
    fn test_rejects_unaccepted_extension() {
        let upload = Upload {
            name: "notes.gif".into(),
            bytes: file_bytes(4, 4, ImageOutputFormat::Png),
        };
        assert!(matches!(
            decode(upload, &accepted()),
            Err(ImageError::UnsupportedType(name)) if name == "notes.gif"
        ));
        assert!(!has_accepted_extension("README", &accepted()));
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let upload = Upload {
            name: "broken.png".into(),
            bytes: b"definitely not a png".to_vec(),
        };
        assert!(matches!(
            decode(upload, &accepted()),
            Err(ImageError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_base64_accepts_data_urls() {
        let plain = decode_base64("aGVsbG8=").unwrap();
        let url = decode_base64("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(plain, b"hello");
        assert_eq!(url, b"hello");
        assert!(decode_base64("@@@").is_err());
    }

    #[test]
    fn test_upload_error_message() {
        let err = Upload::from_base64("scan.png".into(), "%%%").unwrap_err();
        assert_eq!(err.name, "scan.png");
        assert!(err
            .to_string()
            .starts_with("Error loading image scan.png: invalid base64 data"));
    }

    #[test]
    fn test_thumbnail_data_url() {
        let thumb = Thumbnail::new("Image: a.png".into(), &gradient(3, 3)).unwrap();
        assert_eq!(thumb.caption, "Image: a.png");
        assert!(thumb.data_url.starts_with("data:image/png;base64,"));
    }
}
