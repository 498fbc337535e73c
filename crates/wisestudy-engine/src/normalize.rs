use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use wisestudy_contracts::upload::{MediaKind, UploadedFile, MIME_JPEG};

/// Longest edge of a re-encoded image, in pixels.
pub const MAX_EDGE: u32 = 1024;
/// JPEG quality on the encoder's 1-100 scale (0.5 of full quality).
pub const JPEG_QUALITY: u8 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeOutcome {
    Reencoded,
    PassThroughDocument,
    PassThroughUndecodable,
}

impl NormalizeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reencoded => "reencoded",
            Self::PassThroughDocument => "pass_through_document",
            Self::PassThroughUndecodable => "pass_through_undecodable",
        }
    }
}

/// Size-bounded, base64-encoded payload ready to inline in a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPayload {
    pub data: String,
    pub mime_type: String,
    pub dimensions: Option<(u32, u32)>,
    pub outcome: NormalizeOutcome,
}

impl NormalizedPayload {
    fn pass_through(file: &UploadedFile, outcome: NormalizeOutcome) -> Self {
        Self {
            data: BASE64.encode(&file.bytes),
            mime_type: file.media_type.clone(),
            dimensions: None,
            outcome,
        }
    }

    /// Decoded length of `data`.
    pub fn byte_len(&self) -> usize {
        self.data.len() / 4 * 3 - self.data.bytes().rev().take_while(|b| *b == b'=').count()
    }

    pub fn decode(&self) -> anyhow::Result<Vec<u8>> {
        Ok(BASE64.decode(self.data.as_bytes())?)
    }
}

/// Downscales and recompresses images; documents pass through untouched.
///
/// Never fails: anything that cannot be decoded or re-encoded is sent as-is.
pub fn normalize_upload(file: &UploadedFile) -> NormalizedPayload {
    if file.kind() != Some(MediaKind::Image) {
        return NormalizedPayload::pass_through(file, NormalizeOutcome::PassThroughDocument);
    }

    match reencode_image(&file.bytes) {
        Ok((bytes, dimensions)) => {
            tracing::debug!(
                name = %file.name,
                original_bytes = file.bytes.len(),
                encoded_bytes = bytes.len(),
                width = dimensions.0,
                height = dimensions.1,
                "image normalized"
            );
            NormalizedPayload {
                data: BASE64.encode(bytes),
                mime_type: MIME_JPEG.to_string(),
                dimensions: Some(dimensions),
                outcome: NormalizeOutcome::Reencoded,
            }
        }
        Err(err) => {
            tracing::warn!(
                name = %file.name,
                media_type = %file.media_type,
                "image compression failed, sending original data: {err:#}"
            );
            NormalizedPayload::pass_through(file, NormalizeOutcome::PassThroughUndecodable)
        }
    }
}

/// Clamps the longer side to `max_edge`, scaling the other with rounding.
///
/// Images already within bounds keep their size.
pub fn bounded_dimensions(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let scale = |side: u32, longest: u32| -> u32 {
        let scaled = (f64::from(side) * f64::from(max_edge) / f64::from(longest)).round();
        (scaled as u32).max(1)
    };
    if width > height {
        if width > max_edge {
            return (max_edge, scale(height, width));
        }
    } else if height > max_edge {
        return (scale(width, height), max_edge);
    }
    (width, height)
}

fn reencode_image(bytes: &[u8]) -> anyhow::Result<(Vec<u8>, (u32, u32))> {
    let decoded = image::load_from_memory(bytes)?;
    let (width, height) = bounded_dimensions(decoded.width(), decoded.height(), MAX_EDGE);
    let flattened = flatten_onto_white(&decoded);
    let resized = if (width, height) == flattened.dimensions() {
        flattened
    } else {
        image::imageops::resize(&flattened, width, height, FilterType::Triangle)
    };

    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    encoder.encode_image(&resized)?;
    Ok((out, (width, height)))
}

fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    let mut flattened = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = u16::from(pixel[3]);
        let blend = |channel: u8| -> u8 {
            (((u16::from(channel) * alpha) + (255 * (255 - alpha))) / 255) as u8
        };
        flattened.put_pixel(x, y, Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
    }
    flattened
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use wisestudy_contracts::upload::UploadedFile;

    use super::{bounded_dimensions, normalize_upload, NormalizeOutcome, MAX_EDGE};

    fn encoded_image(width: u32, height: u32, format: ImageFormat) -> anyhow::Result<Vec<u8>> {
        let mut image = RgbaImage::new(width, height);
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            *pixel = Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255]);
        }
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(image).write_to(&mut bytes, format)?;
        Ok(bytes.into_inner())
    }

    fn decoded_dimensions(data: &[u8]) -> anyhow::Result<(u32, u32)> {
        let image = image::load_from_memory(data)?;
        Ok((image.width(), image.height()))
    }

    #[test]
    fn bounded_dimensions_preserve_aspect_ratio() {
        assert_eq!(bounded_dimensions(3000, 2000, 1024), (1024, 683));
        assert_eq!(bounded_dimensions(2000, 3000, 1024), (683, 1024));
        assert_eq!(bounded_dimensions(2048, 2048, 1024), (1024, 1024));
        assert_eq!(bounded_dimensions(800, 600, 1024), (800, 600));
        assert_eq!(bounded_dimensions(1024, 10, 1024), (1024, 10));
        assert_eq!(bounded_dimensions(9000, 3, 1024), (1024, 1));
    }

    #[test]
    fn bounded_dimensions_stay_within_one_pixel_of_ideal_ratio() {
        for (width, height) in [(4032, 3024), (1500, 4000), (1025, 777), (3333, 1111)] {
            let (out_w, out_h) = bounded_dimensions(width, height, MAX_EDGE);
            assert!(out_w.max(out_h) <= MAX_EDGE);
            if width > height {
                let ideal = f64::from(height) * f64::from(out_w) / f64::from(width);
                assert!((f64::from(out_h) - ideal).abs() <= 1.0);
            } else {
                let ideal = f64::from(width) * f64::from(out_h) / f64::from(height);
                assert!((f64::from(out_w) - ideal).abs() <= 1.0);
            }
        }
    }

    #[test]
    fn large_png_becomes_bounded_jpeg() -> anyhow::Result<()> {
        let file = UploadedFile::new(
            "exam.png",
            "image/png",
            encoded_image(3000, 2000, ImageFormat::Png)?,
        );
        let payload = normalize_upload(&file);
        assert_eq!(payload.outcome, NormalizeOutcome::Reencoded);
        assert_eq!(payload.mime_type, "image/jpeg");
        assert_eq!(payload.dimensions, Some((1024, 683)));

        let bytes = payload.decode()?;
        assert_eq!(bytes.len(), payload.byte_len());
        assert_eq!(image::guess_format(&bytes)?, ImageFormat::Jpeg);
        assert_eq!(decoded_dimensions(&bytes)?, (1024, 683));
        Ok(())
    }

    #[test]
    fn small_image_keeps_size_but_is_recompressed() -> anyhow::Result<()> {
        let file = UploadedFile::new(
            "card.bmp",
            "image/bmp",
            encoded_image(320, 200, ImageFormat::Bmp)?,
        );
        let payload = normalize_upload(&file);
        assert_eq!(payload.mime_type, "image/jpeg");
        assert_eq!(decoded_dimensions(&payload.decode()?)?, (320, 200));
        Ok(())
    }

    #[test]
    fn transparent_pixels_are_flattened_onto_white() -> anyhow::Result<()> {
        let image = RgbaImage::from_pixel(16, 16, Rgba([0, 0, 0, 0]));
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(image).write_to(&mut bytes, ImageFormat::Png)?;
        let file = UploadedFile::new("blank.png", "image/png", bytes.into_inner());

        let payload = normalize_upload(&file);
        let decoded = image::load_from_memory(&payload.decode()?)?.to_rgb8();
        let pixel = decoded.get_pixel(8, 8);
        assert!(pixel.0.iter().all(|channel| *channel > 240));
        Ok(())
    }

    #[test]
    fn pdf_passes_through_unchanged() -> anyhow::Result<()> {
        let raw = b"%PDF-1.7\n1 0 obj\n<<>>\nendobj\n".to_vec();
        let file = UploadedFile::new("paper.pdf", "application/pdf", raw.clone());
        let payload = normalize_upload(&file);
        assert_eq!(payload.outcome, NormalizeOutcome::PassThroughDocument);
        assert_eq!(payload.mime_type, "application/pdf");
        assert_eq!(payload.dimensions, None);
        assert_eq!(payload.decode()?, raw);
        Ok(())
    }

    #[test]
    fn corrupt_image_passes_through_unchanged() -> anyhow::Result<()> {
        let raw = vec![0x89, b'P', b'N', b'G', 0x00, 0x13, 0x37];
        let file = UploadedFile::new("broken.png", "image/png", raw.clone());
        let payload = normalize_upload(&file);
        assert_eq!(payload.outcome, NormalizeOutcome::PassThroughUndecodable);
        assert_eq!(payload.mime_type, "image/png");
        assert_eq!(payload.decode()?, raw);
        Ok(())
    }
}
