//! Image artifacts produced by resolvers.
//!
//! Images are not decoded. An artifact keeps the raw bytes, the format
//! sniffed from the magic number and, when the header carries them, the
//! pixel dimensions.

use serde::Serialize;

/// Image format detected from magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Webp,
    Unknown,
}

/// Detect image format from the first few bytes.
pub fn detect_format(data: &[u8]) -> ImageFormat {
    if data.len() < 4 {
        return ImageFormat::Unknown;
    }

    if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        ImageFormat::Png
    } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        ImageFormat::Jpeg
    } else if data.starts_with(b"GIF8") {
        ImageFormat::Gif
    } else if data.starts_with(b"BM") {
        ImageFormat::Bmp
    } else if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        ImageFormat::Webp
    } else {
        ImageFormat::Unknown
    }
}

/// Read `(width, height)` from the image header without decoding.
pub fn sniff_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    match detect_format(data) {
        ImageFormat::Png => {
            // Signature (8) + IHDR length (4) + "IHDR" (4), then BE w/h.
            if data.len() < 24 || &data[12..16] != b"IHDR" {
                return None;
            }
            let w = u32::from_be_bytes(data[16..20].try_into().ok()?);
            let h = u32::from_be_bytes(data[20..24].try_into().ok()?);
            Some((w, h))
        },
        ImageFormat::Gif => {
            if data.len() < 10 {
                return None;
            }
            let w = u16::from_le_bytes([data[6], data[7]]);
            let h = u16::from_le_bytes([data[8], data[9]]);
            Some((u32::from(w), u32::from(h)))
        },
        ImageFormat::Bmp => {
            if data.len() < 26 {
                return None;
            }
            let w = i32::from_le_bytes(data[18..22].try_into().ok()?);
            let h = i32::from_le_bytes(data[22..26].try_into().ok()?);
            if w <= 0 || h == 0 {
                return None;
            }
            // Negative height means top-down rows.
            Some((w.unsigned_abs(), h.unsigned_abs()))
        },
        ImageFormat::Jpeg => jpeg_dimensions(data),
        ImageFormat::Webp | ImageFormat::Unknown => None,
    }
}

/// Walk JPEG segments until a start-of-frame marker.
fn jpeg_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    let mut i = 2;
    while i + 4 <= data.len() {
        if data[i] != 0xFF {
            return None;
        }
        let marker = data[i + 1];
        // Fill bytes.
        if marker == 0xFF {
            i += 1;
            continue;
        }
        let len = usize::from(u16::from_be_bytes([data[i + 2], data[i + 3]]));
        let is_sof = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_sof {
            if i + 9 > data.len() {
                return None;
            }
            let h = u16::from_be_bytes([data[i + 5], data[i + 6]]);
            let w = u16::from_be_bytes([data[i + 7], data[i + 8]]);
            return Some((u32::from(w), u32::from(h)));
        }
        if len < 2 {
            return None;
        }
        i += 2 + len;
    }
    None
}

/// Side length of the placeholder shown for images that failed to resolve.
pub const PLACEHOLDER_SIZE: u32 = 16;

/// A resolved (or substituted) image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageArtifact {
    /// The reference the image was resolved from.
    pub reference: String,
    pub format: ImageFormat,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// True when resolution failed and this stands in for the image.
    pub placeholder: bool,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl ImageArtifact {
    /// Wrap fetched bytes, sniffing format and dimensions.
    pub fn from_bytes(reference: impl Into<String>, bytes: Vec<u8>) -> Self {
        let format = detect_format(&bytes);
        let (width, height) = match sniff_dimensions(&bytes) {
            Some((w, h)) => (Some(w), Some(h)),
            None => (None, None),
        };
        Self {
            reference: reference.into(),
            format,
            width,
            height,
            placeholder: false,
            bytes,
        }
    }

    /// The broken-image stand-in for `reference`.
    pub fn placeholder(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            format: ImageFormat::Unknown,
            width: Some(PLACEHOLDER_SIZE),
            height: Some(PLACEHOLDER_SIZE),
            placeholder: true,
            bytes: Vec::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_header(w: u32, h: u32) -> Vec<u8> {
        let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        data.extend_from_slice(&13u32.to_be_bytes());
        data.extend_from_slice(b"IHDR");
        data.extend_from_slice(&w.to_be_bytes());
        data.extend_from_slice(&h.to_be_bytes());
        data.extend_from_slice(&[8, 6, 0, 0, 0]);
        data
    }

    #[test]
    fn detect_formats() {
        assert_eq!(detect_format(&png_header(1, 1)), ImageFormat::Png);
        assert_eq!(detect_format(&[0xFF, 0xD8, 0xFF, 0xE0]), ImageFormat::Jpeg);
        assert_eq!(detect_format(b"GIF89a.."), ImageFormat::Gif);
        assert_eq!(detect_format(b"BM\0\0\0\0"), ImageFormat::Bmp);
        assert_eq!(detect_format(b"RIFF\0\0\0\0WEBPVP8 "), ImageFormat::Webp);
        assert_eq!(detect_format(b"<svg"), ImageFormat::Unknown);
        assert_eq!(detect_format(b"BM"), ImageFormat::Unknown);
    }

    #[test]
    fn png_dimensions() {
        assert_eq!(sniff_dimensions(&png_header(640, 480)), Some((640, 480)));
        assert_eq!(sniff_dimensions(&png_header(1, 1)[..20]), None);
    }

    #[test]
    fn gif_dimensions() {
        let mut data = b"GIF89a".to_vec();
        data.extend_from_slice(&32u16.to_le_bytes());
        data.extend_from_slice(&24u16.to_le_bytes());
        assert_eq!(sniff_dimensions(&data), Some((32, 24)));
    }

    #[test]
    fn bmp_dimensions_top_down() {
        let mut data = vec![0u8; 54];
        data[0] = b'B';
        data[1] = b'M';
        data[18..22].copy_from_slice(&10i32.to_le_bytes());
        data[22..26].copy_from_slice(&(-5i32).to_le_bytes());
        assert_eq!(sniff_dimensions(&data), Some((10, 5)));
    }

    #[test]
    fn jpeg_dimensions_after_app0() {
        let mut data = vec![0xFF, 0xD8];
        // APP0 with a 4-byte payload.
        data.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x06, 1, 2, 3, 4]);
        // SOF0: len, precision, height, width.
        data.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 8, 0x00, 0x78, 0x00, 0xA0]);
        assert_eq!(sniff_dimensions(&data), Some((160, 120)));
    }

    #[test]
    fn jpeg_truncated() {
        assert_eq!(sniff_dimensions(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]), None);
    }

    #[test]
    fn artifact_from_bytes() {
        let art = ImageArtifact::from_bytes("logo.png", png_header(3, 4));
        assert_eq!(art.format, ImageFormat::Png);
        assert_eq!((art.width, art.height), (Some(3), Some(4)));
        assert!(!art.is_placeholder());
    }

    #[test]
    fn placeholder_artifact() {
        let art = ImageArtifact::placeholder("missing.png");
        assert!(art.is_placeholder());
        assert_eq!(art.reference, "missing.png");
        assert!(art.bytes.is_empty());
        assert_eq!(art.width, Some(PLACEHOLDER_SIZE));
    }

    #[test]
    fn bytes_not_serialized() {
        let art = ImageArtifact::from_bytes("a.gif", b"GIF89a\x01\0\x01\0".to_vec());
        let json = serde_json::to_value(&art).unwrap();
        assert!(json.get("bytes").is_none());
        assert_eq!(json["format"], "gif");
    }
}
