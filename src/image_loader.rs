//! Image loading and saving for scene views
//!
//! All views are decoded to 8-bit RGB so selection, histograms and the
//! color transforms work on a single pixel layout. Harmonized images are
//! written back in the format of their input when the `image` crate can
//! encode it, and as PNG otherwise.

use crate::error::{HarmonizeError, Result};
use image::{ImageFormat as CodecFormat, ImageReader, RgbImage};
use std::path::{Path, PathBuf};

/// Image formats the harmonizer reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// JPEG image
    Jpeg,
    /// PNG image
    Png,
    /// TIFF image
    Tiff,
    /// BMP image
    Bmp,
    /// WebP image
    WebP,
    /// TGA image
    Tga,
    /// PNM image (PBM, PGM, PPM)
    Pnm,
    /// OpenEXR image
    Exr,
}

impl ImageFormat {
    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Option<ImageFormat> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "tiff" | "tif" => Some(ImageFormat::Tiff),
            "bmp" => Some(ImageFormat::Bmp),
            "webp" => Some(ImageFormat::WebP),
            "tga" => Some(ImageFormat::Tga),
            "pbm" | "pgm" | "ppm" | "pnm" => Some(ImageFormat::Pnm),
            "exr" => Some(ImageFormat::Exr),
            _ => None,
        }
    }

    /// Whether harmonized 8-bit output can be written in this format
    pub fn supports_rgb8_output(&self) -> bool {
        !matches!(self, ImageFormat::Exr | ImageFormat::WebP)
    }

    fn codec(&self) -> CodecFormat {
        match self {
            ImageFormat::Jpeg => CodecFormat::Jpeg,
            ImageFormat::Png => CodecFormat::Png,
            ImageFormat::Tiff => CodecFormat::Tiff,
            ImageFormat::Bmp => CodecFormat::Bmp,
            ImageFormat::WebP => CodecFormat::WebP,
            ImageFormat::Tga => CodecFormat::Tga,
            ImageFormat::Pnm => CodecFormat::Pnm,
            ImageFormat::Exr => CodecFormat::OpenExr,
        }
    }
}

/// Load an image from disk as 8-bit RGB
///
/// # Errors
///
/// Returns `HarmonizeError::ImageLoadError` if the file cannot be opened or
/// decoded.
pub fn load_image(path: &Path) -> Result<RgbImage> {
    let reader = ImageReader::open(path).map_err(|e| {
        HarmonizeError::image_load(format!("Failed to open image file: {}", path.display()), e)
    })?;

    let reader = reader.with_guessed_format().map_err(|e| {
        HarmonizeError::image_load(
            format!("Failed to read image header: {}", path.display()),
            e,
        )
    })?;

    let img = reader.decode().map_err(|e| {
        HarmonizeError::image_load(format!("Failed to decode image: {}", path.display()), e)
    })?;

    Ok(img.to_rgb8())
}

/// Output path of a harmonized view inside `output_dir`
///
/// Keeps the input file name; inputs whose format cannot hold 8-bit RGB
/// output get a `.png` extension instead.
pub fn output_path(input: &Path, output_dir: &Path) -> PathBuf {
    let file_name = input
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("view.png"));

    match ImageFormat::from_extension(&file_name) {
        Some(format) if format.supports_rgb8_output() => output_dir.join(file_name),
        _ => output_dir.join(file_name.with_extension("png")),
    }
}

/// Save an RGB image, choosing the encoder from the file extension
pub fn save_image(image: &RgbImage, path: &Path) -> Result<()> {
    let format = ImageFormat::from_extension(path)
        .filter(ImageFormat::supports_rgb8_output)
        .unwrap_or(ImageFormat::Png);

    image.save_with_format(path, format.codec()).map_err(|e| {
        HarmonizeError::image_save(format!("Failed to write image: {}", path.display()), e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(
            ImageFormat::from_extension(Path::new("IMG_0001.JPG")),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::from_extension(Path::new("view.tif")),
            Some(ImageFormat::Tiff)
        );
        assert_eq!(ImageFormat::from_extension(Path::new("view.xyz")), None);
        assert_eq!(ImageFormat::from_extension(Path::new("noext")), None);
    }

    #[test]
    fn test_output_path() {
        let out = Path::new("/out");
        assert_eq!(
            output_path(Path::new("/data/a/IMG_1.jpg"), out),
            PathBuf::from("/out/IMG_1.jpg")
        );
        assert_eq!(
            output_path(Path::new("/data/a/IMG_1.exr"), out),
            PathBuf::from("/out/IMG_1.png")
        );
        assert_eq!(
            output_path(Path::new("/data/a/IMG_1.raw"), out),
            PathBuf::from("/out/IMG_1.png")
        );
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.png");
        let img = RgbImage::from_fn(4, 3, |x, y| image::Rgb([x as u8 * 10, y as u8 * 20, 7]));

        save_image(&img, &path).unwrap();
        let loaded = load_image(&path).unwrap();

        assert_eq!(loaded.dimensions(), (4, 3));
        assert_eq!(loaded.get_pixel(3, 2), &image::Rgb([30, 40, 7]));
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_image(Path::new("does/not/exist.png"));
        assert!(matches!(result, Err(HarmonizeError::ImageLoadError { .. })));
    }
}
