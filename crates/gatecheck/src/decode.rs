//! QR decoding.
//!
//! Decoding is delegated to `rqrr` over grayscale buffers from the `image`
//! crate. There is no native shared library to locate; the decoder is pure
//! Rust and ships with the binary.

use std::path::Path;

use image::GrayImage;
use tracing::debug;

use crate::error::{Error, Result};

/// Decode every QR payload found in an image file.
///
/// # Errors
///
/// Returns [`Error::ImageLoad`] if the file cannot be read as an image and
/// [`Error::NoCodeFound`] if it holds no decodable code.
pub fn decode_image(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|err| Error::ImageLoad {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;

    let payloads = decode_frame(&img.to_luma8());
    if payloads.is_empty() {
        return Err(Error::NoCodeFound {
            path: path.to_path_buf(),
        });
    }

    debug!("Decoded {} payload(s) from {}", payloads.len(), path.display());
    Ok(payloads)
}

/// Decode every QR payload in a grayscale frame.
///
/// Returns an empty vector when nothing decodes; frame sources treat that as
/// "keep watching" rather than an error.
#[must_use]
pub fn decode_frame(frame: &GrayImage) -> Vec<String> {
    let mut prepared = rqrr::PreparedImage::prepare(frame.clone());
    prepared
        .detect_grids()
        .iter()
        .filter_map(|grid| match grid.decode() {
            Ok((_meta, content)) => Some(content),
            Err(err) => {
                debug!("Skipping undecodable grid: {}", err);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use qrcode::QrCode;

    fn qr_frame(payload: &str) -> GrayImage {
        let code = QrCode::new(payload.as_bytes()).unwrap();
        code.render::<Luma<u8>>().min_dimensions(200, 200).build()
    }

    #[test]
    fn test_decode_frame_round_trip() {
        let frame = qr_frame("ID: 42\nName: X");
        let payloads = decode_frame(&frame);
        assert_eq!(payloads, vec!["ID: 42\nName: X".to_string()]);
    }

    #[test]
    fn test_decode_frame_blank_image() {
        let blank = GrayImage::from_pixel(100, 100, Luma([255]));
        assert!(decode_frame(&blank).is_empty());
    }

    #[test]
    fn test_decode_image_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("code.png");
        qr_frame("ID: guest-7").save(&path).unwrap();

        let payloads = decode_image(&path).unwrap();
        assert_eq!(payloads, vec!["ID: guest-7".to_string()]);
    }

    #[test]
    fn test_decode_image_missing_file() {
        let err = decode_image("/nonexistent/frame.png").unwrap_err();
        assert!(matches!(err, Error::ImageLoad { .. }));
    }

    #[test]
    fn test_decode_image_not_an_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bogus.png");
        std::fs::write(&path, "this is not a PNG").unwrap();

        let err = decode_image(&path).unwrap_err();
        assert!(matches!(err, Error::ImageLoad { .. }));
    }

    #[test]
    fn test_decode_image_no_code() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.png");
        GrayImage::from_pixel(80, 80, Luma([255]))
            .save(&path)
            .unwrap();

        let err = decode_image(&path).unwrap_err();
        assert!(err.is_no_code_found());
    }
}
