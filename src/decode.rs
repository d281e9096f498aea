use crate::error::SolverError;
use image::{DynamicImage, GrayImage};

/// Decodes an uploaded image and normalizes it to a single 8-bit channel.
///
/// The format is guessed from the content, not from the declared content
/// type.
pub fn decode_grayscale(bytes: &[u8]) -> Result<GrayImage, SolverError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| SolverError::InvalidInput(format!("Failed to decode image: {e}")))?;

    Ok(to_grayscale(img))
}

/// Converts to `Luma8` unless the image already is.
pub fn to_grayscale(img: DynamicImage) -> GrayImage {
    match img {
        DynamicImage::ImageLuma8(gray) => gray,
        other => other.to_luma8(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Luma, Rgb, RgbImage};
    use std::io::Cursor;

    fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
        buf
    }

    #[test]
    fn color_png_becomes_grayscale() {
        let rgb = RgbImage::from_pixel(5, 3, Rgb([10, 200, 30]));
        let bytes = encode(DynamicImage::ImageRgb8(rgb), ImageFormat::Png);

        let gray = decode_grayscale(&bytes).unwrap();
        assert_eq!(gray.dimensions(), (5, 3));
    }

    #[test]
    fn grayscale_input_is_kept_as_is() {
        let mut src = GrayImage::new(4, 4);
        src.put_pixel(1, 2, Luma([77]));
        let bytes = encode(DynamicImage::ImageLuma8(src.clone()), ImageFormat::Png);

        let gray = decode_grayscale(&bytes).unwrap();
        assert_eq!(gray, src);
    }

    #[test]
    fn garbage_is_invalid_input() {
        let err = decode_grayscale(b"definitely not an image").unwrap_err();
        assert!(matches!(err, SolverError::InvalidInput(_)));
        assert!(err.to_string().starts_with("Failed to decode image"));
    }
}
