//! Media helpers for captured evidence.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::GenericImageView;

use crate::error::{Error, Result};
use crate::models::{EvidenceKind, FieldEvidence};

/// Bounds for derived photo previews.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailSpec {
    /// Longest output edge in pixels; smaller images are not upscaled.
    pub max_dimension: u32,
    /// JPEG quality of the derived preview.
    pub jpeg_quality: u8,
}

impl Default for ThumbnailSpec {
    fn default() -> Self {
        Self {
            max_dimension: 320,
            jpeg_quality: 75,
        }
    }
}

/// Derive a JPEG preview from photo bytes, preserving aspect ratio.
pub fn derive_photo_thumbnail(source: &[u8], spec: ThumbnailSpec) -> Result<Vec<u8>> {
    if source.is_empty() {
        return Err(Error::InvalidInput(
            "Thumbnail source bytes cannot be empty".to_string(),
        ));
    }
    if spec.max_dimension == 0 {
        return Err(Error::InvalidInput(
            "Thumbnail max dimension must be greater than zero".to_string(),
        ));
    }

    let photo = image::load_from_memory(source)
        .map_err(|error| Error::InvalidInput(format!("Failed to decode photo: {error}")))?;

    let (width, height) = photo.dimensions();
    let preview = if width <= spec.max_dimension && height <= spec.max_dimension {
        photo
    } else {
        photo.thumbnail(spec.max_dimension, spec.max_dimension)
    };

    let mut cursor = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut cursor, spec.jpeg_quality)
        .encode_image(&preview)
        .map_err(|error| Error::InvalidInput(format!("Failed to encode preview: {error}")))?;
    Ok(cursor.into_inner())
}

/// Derive and attach a preview blob to photo evidence.
///
/// Non-photo evidence is left untouched. Returns whether a thumbnail was
/// attached.
pub fn attach_thumbnail(evidence: &mut FieldEvidence, spec: ThumbnailSpec) -> Result<bool> {
    if evidence.kind != EvidenceKind::Photo {
        return Ok(false);
    }

    evidence.thumbnail = Some(derive_photo_thumbnail(&evidence.data, spec)?);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChecklistItemId;
    use image::{ImageBuffer, ImageFormat, Rgb};

    fn photo_bytes(width: u32, height: u32) -> Vec<u8> {
        let pixels =
            ImageBuffer::<Rgb<u8>, Vec<u8>>::from_fn(width, height, |_x, _y| Rgb([200, 60, 40]));
        let mut cursor = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(pixels)
            .write_to(&mut cursor, ImageFormat::Png)
            .unwrap();
        cursor.into_inner()
    }

    #[test]
    fn derive_bounds_longest_edge() {
        let preview =
            derive_photo_thumbnail(&photo_bytes(1600, 800), ThumbnailSpec::default()).unwrap();
        let decoded = image::load_from_memory(&preview).unwrap();
        assert_eq!(decoded.dimensions(), (320, 160));
    }

    #[test]
    fn derive_does_not_upscale() {
        let preview =
            derive_photo_thumbnail(&photo_bytes(100, 60), ThumbnailSpec::default()).unwrap();
        let decoded = image::load_from_memory(&preview).unwrap();
        assert_eq!(decoded.dimensions(), (100, 60));
    }

    #[test]
    fn derive_rejects_garbage_input() {
        assert!(derive_photo_thumbnail(b"not-a-photo", ThumbnailSpec::default()).is_err());
        assert!(derive_photo_thumbnail(&[], ThumbnailSpec::default()).is_err());
    }

    #[test]
    fn attach_skips_non_photo_evidence() {
        let mut voice_note = FieldEvidence::new(
            ChecklistItemId::new(),
            "rev-1",
            EvidenceKind::VoiceNote,
            "audio/wav",
            "memo.wav",
            vec![0u8; 64],
        )
        .unwrap();

        assert!(!attach_thumbnail(&mut voice_note, ThumbnailSpec::default()).unwrap());
        assert!(voice_note.thumbnail.is_none());
    }

    #[test]
    fn attach_derives_for_photos() {
        let mut photo = FieldEvidence::new(
            ChecklistItemId::new(),
            "rev-1",
            EvidenceKind::Photo,
            "image/png",
            "site.png",
            photo_bytes(640, 480),
        )
        .unwrap();

        assert!(attach_thumbnail(&mut photo, ThumbnailSpec::default()).unwrap());
        assert!(photo.thumbnail.is_some());
    }
}
