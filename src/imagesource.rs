use std::path::PathBuf;

use image::imageops::{self, FilterType};

use crate::error::{PaintError, Result};

const BUILTIN_PREFIX: &str = "builtin:";

/// Decoded source image. `height` always matches the strip it was loaded for,
/// `width` is the number of columns swept across during one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RawImage {
    pub width: usize,
    pub height: usize,
    pixels: Vec<[u8; 3]>,
}

impl RawImage {
    pub fn new(width: usize, height: usize, pixels: Vec<[u8; 3]>) -> Result<RawImage> {
        if width == 0 || height == 0 || pixels.len() != width * height {
            return Err(PaintError::ImageLoad {
                identifier: format!("{width}x{height}"),
                reason: format!("{} pixels do not form the image", pixels.len()),
            });
        }

        Ok(RawImage {
            width,
            height,
            pixels,
        })
    }

    pub fn pixel(&self, column: usize, row: usize) -> [u8; 3] {
        self.pixels[row * self.width + column]
    }
}

pub trait ImageSource {
    /// Loads `identifier` scaled vertically to `pixel_count` rows. The column
    /// count of the source is kept as is.
    fn load(&self, identifier: &str, pixel_count: usize) -> Result<RawImage>;
}

/// Reads images from a directory, with a few generated test patterns under
/// the `builtin:` prefix.
pub struct FileImageSource {
    image_dir: PathBuf,
}

impl FileImageSource {
    pub fn new(image_dir: PathBuf) -> FileImageSource {
        FileImageSource { image_dir }
    }

    fn load_file(&self, identifier: &str, pixel_count: usize) -> Result<RawImage> {
        let path = self.image_dir.join(identifier);
        let decoded = image::open(&path).map_err(|err| PaintError::ImageLoad {
            identifier: identifier.to_string(),
            reason: err.to_string(),
        })?;

        let mut rgb = decoded.to_rgb8();
        let width = rgb.width();
        if rgb.height() as usize != pixel_count {
            rgb = imageops::resize(&rgb, width, pixel_count as u32, FilterType::CatmullRom);
        }

        let pixels = rgb.pixels().map(|pixel| pixel.0).collect();
        RawImage::new(width as usize, pixel_count, pixels)
    }
}

impl ImageSource for FileImageSource {
    fn load(&self, identifier: &str, pixel_count: usize) -> Result<RawImage> {
        match identifier.strip_prefix(BUILTIN_PREFIX) {
            Some(name) => builtin(name, pixel_count),
            None => self.load_file(identifier, pixel_count),
        }
    }
}

/// Generated patterns for bring-up without any image files.
pub fn builtin(name: &str, pixel_count: usize) -> Result<RawImage> {
    match name {
        // Three equally wide bands. Every LED must show red, green and blue in
        // that order, otherwise the configured color order is wrong.
        "color-order" => {
            let band = 10;
            let colors = [[255, 0, 0], [0, 255, 0], [0, 0, 255]];
            let width = band * colors.len();
            let mut pixels = Vec::with_capacity(width * pixel_count);
            for _ in 0..pixel_count {
                for color in colors {
                    pixels.extend(std::iter::repeat(color).take(band));
                }
            }
            RawImage::new(width, pixel_count, pixels)
        }
        "gradient" => {
            let width = 64;
            let mut pixels = Vec::with_capacity(width * pixel_count);
            for _ in 0..pixel_count {
                for column in 0..width {
                    let level = (column * 255 / (width - 1)) as u8;
                    pixels.push([level, level, level]);
                }
            }
            RawImage::new(width, pixel_count, pixels)
        }
        "blank" => RawImage::new(1, pixel_count, vec![[0, 0, 0]; pixel_count]),
        _ => Err(PaintError::ImageLoad {
            identifier: format!("{BUILTIN_PREFIX}{name}"),
            reason: "no such built-in pattern".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_color_order_has_three_bands() {
        let image = builtin("color-order", 8).unwrap();
        assert_eq!(image.height, 8);
        assert_eq!(image.width, 30);
        assert_eq!(image.pixel(0, 7), [255, 0, 0]);
        assert_eq!(image.pixel(15, 3), [0, 255, 0]);
        assert_eq!(image.pixel(29, 0), [0, 0, 255]);
    }

    #[test]
    fn builtin_gradient_ramps_up() {
        let image = builtin("gradient", 2).unwrap();
        assert_eq!(image.pixel(0, 0), [0, 0, 0]);
        assert_eq!(image.pixel(63, 1), [255, 255, 255]);
    }

    #[test]
    fn unknown_builtin_is_an_error() {
        let source = FileImageSource::new(PathBuf::from("."));
        assert!(matches!(
            source.load("builtin:nope", 4),
            Err(PaintError::ImageLoad { .. })
        ));
    }

    #[test]
    fn missing_file_is_an_error() {
        let source = FileImageSource::new(PathBuf::from("/nonexistent"));
        assert!(matches!(
            source.load("missing.png", 4),
            Err(PaintError::ImageLoad { .. })
        ));
    }

    #[test]
    fn loads_and_scales_files_vertically_only() {
        let dir = std::env::temp_dir().join(format!("lichtmaler-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tall.png");
        let source_image = image::RgbImage::from_fn(5, 20, |x, _| image::Rgb([x as u8 * 50, 0, 0]));
        source_image.save(&path).unwrap();

        let source = FileImageSource::new(dir.clone());
        let loaded = source.load("tall.png", 10).unwrap();
        assert_eq!(loaded.width, 5);
        assert_eq!(loaded.height, 10);
        assert_eq!(loaded.pixel(4, 5), [200, 0, 0]);

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn rejects_inconsistent_pixel_count() {
        assert!(RawImage::new(2, 2, vec![[0, 0, 0]; 3]).is_err());
    }
}
