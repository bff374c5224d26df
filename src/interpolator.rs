use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::color::{ColorCorrection, PowerBudget, Rgb};
use crate::error::{PaintError, Result};
use crate::imagesource::RawImage;

const DITHER_SEED: u64 = 0x6c69_6368_746d_616c;

/// Turns one processed image into strip frames.
///
/// Gamma and white balance are applied once when the interpolator is built.
/// Rendering only blends two neighbouring columns and rounds the 16-bit blend
/// down to 8 bits. The rounding is stochastic and seeded from the position, so
/// consecutive frames dither between the two nearest levels while the same
/// position always yields the same frame.
pub struct FrameInterpolator {
    width: usize,
    pixel_count: usize,
    /// Column major, `columns[column * pixel_count + led]`.
    columns: Vec<[u16; 3]>,
}

impl FrameInterpolator {
    pub fn new(image: &RawImage, correction: &ColorCorrection, vflip: bool) -> FrameInterpolator {
        let pixel_count = image.height;
        let mut columns = Vec::with_capacity(image.width * pixel_count);
        for column in 0..image.width {
            for led in 0..pixel_count {
                let row = if vflip { pixel_count - 1 - led } else { led };
                columns.push(correction.apply(image.pixel(column, row)));
            }
        }

        FrameInterpolator {
            width: image.width,
            pixel_count,
            columns,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Dims the whole image so that no frame, and the image on average,
    /// draws more than `budget`. Returns the applied factor.
    pub fn limit_power(&mut self, budget: PowerBudget) -> f32 {
        let currents: Vec<f32> = self
            .columns
            .chunks(self.pixel_count)
            .map(PowerBudget::frame_ma)
            .collect();
        let scale = budget.scale(&currents);
        if scale < 1.0 {
            for level in self.columns.iter_mut().flatten() {
                *level = (f32::from(*level) * scale).floor() as u16;
            }
        }
        scale
    }

    pub fn render(&self, position: f32) -> Result<Vec<Rgb>> {
        let mut frame = vec![crate::color::black(); self.pixel_count];
        self.render_into(position, &mut frame)?;
        Ok(frame)
    }

    /// Renders the frame at `position` (0 = first column, 1 = last column)
    /// into `frame`, which must be exactly one strip long.
    pub fn render_into(&self, position: f32, frame: &mut [Rgb]) -> Result<()> {
        if !(0.0..=1.0).contains(&position) {
            return Err(PaintError::InvalidPosition(position));
        }
        if frame.len() != self.pixel_count {
            return Err(PaintError::ConfigMismatch(format!(
                "frame buffer holds {} pixels, image has {} rows",
                frame.len(),
                self.pixel_count
            )));
        }

        let x = position * (self.width - 1) as f32;
        let base = (x.floor() as usize).min(self.width - 1);
        let next = (base + 1).min(self.width - 1);
        let weight = x - base as f32;

        let base_column = &self.columns[base * self.pixel_count..(base + 1) * self.pixel_count];
        let next_column = &self.columns[next * self.pixel_count..(next + 1) * self.pixel_count];

        let mut rng = StdRng::seed_from_u64(DITHER_SEED ^ u64::from(position.to_bits()));
        for ((pixel, a), b) in frame.iter_mut().zip(base_column).zip(next_column) {
            let mut quantized = [0u8; 3];
            for channel in 0..3 {
                let blended =
                    a[channel] as f32 * (1.0 - weight) + b[channel] as f32 * weight;
                quantized[channel] = quantize(blended, &mut rng);
            }
            *pixel = Rgb::new(quantized[0], quantized[1], quantized[2]);
        }

        Ok(())
    }
}

/// Rounds a 16-bit level to 8 bits, up with a probability equal to the
/// fractional remainder.
fn quantize(level: f32, rng: &mut StdRng) -> u8 {
    let scaled = (level / 257.0).clamp(0.0, 255.0);
    let lower = scaled.floor();
    let remainder = scaled - lower;
    let roll: f32 = rng.gen();
    if remainder > 0.0 && roll < remainder {
        (lower as u8).saturating_add(1)
    } else {
        lower as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_correction() -> ColorCorrection {
        ColorCorrection::new([1.0, 1.0, 1.0], [1.0, 1.0, 1.0], 255)
    }

    fn two_column_image(left: u8, right: u8, rows: usize) -> RawImage {
        let mut pixels = Vec::new();
        for _ in 0..rows {
            pixels.push([left, left, left]);
            pixels.push([right, right, right]);
        }
        RawImage::new(2, rows, pixels).unwrap()
    }

    #[test]
    fn endpoints_hit_source_columns_exactly() {
        let interpolator = FrameInterpolator::new(&two_column_image(10, 240, 4), &linear_correction(), false);
        let start = interpolator.render(0.0).unwrap();
        let end = interpolator.render(1.0).unwrap();
        assert!(start.iter().all(|p| *p == Rgb::new(10, 10, 10)));
        assert!(end.iter().all(|p| *p == Rgb::new(240, 240, 240)));
    }

    #[test]
    fn repeated_renders_are_identical() {
        let image = crate::imagesource::builtin("gradient", 16).unwrap();
        let interpolator = FrameInterpolator::new(&image, &linear_correction(), false);
        for position in [0.0, 0.37, 1.0] {
            let first = interpolator.render(position).unwrap();
            let second = interpolator.render(position).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn rejects_positions_outside_unit_range() {
        let interpolator = FrameInterpolator::new(&two_column_image(0, 255, 2), &linear_correction(), false);
        for position in [-0.001, 1.001, f32::NAN] {
            assert!(matches!(
                interpolator.render(position),
                Err(PaintError::InvalidPosition(_))
            ));
        }
    }

    #[test]
    fn frame_length_matches_strip() {
        let interpolator = FrameInterpolator::new(&two_column_image(0, 255, 7), &linear_correction(), false);
        assert_eq!(interpolator.render(0.5).unwrap().len(), 7);

        let mut short = vec![crate::color::black(); 6];
        assert!(matches!(
            interpolator.render_into(0.5, &mut short),
            Err(PaintError::ConfigMismatch(_))
        ));
    }

    #[test]
    fn dithering_averages_between_neighbouring_levels() {
        let interpolator = FrameInterpolator::new(&two_column_image(100, 101, 1), &linear_correction(), false);
        let mut sum = 0.0;
        let samples = 999;
        for i in 1..=samples {
            let position = i as f32 / (samples + 1) as f32;
            let frame = interpolator.render(position).unwrap();
            let red = frame[0].red;
            assert!(red == 100 || red == 101);
            sum += red as f32;
        }
        let mean = sum / samples as f32;
        assert!((mean - 100.5).abs() < 0.1, "mean was {mean}");
    }

    #[test]
    fn vertical_flip_reverses_leds() {
        let pixels = vec![[1, 1, 1], [2, 2, 2], [3, 3, 3]];
        let image = RawImage::new(1, 3, pixels).unwrap();
        let interpolator = FrameInterpolator::new(&image, &linear_correction(), true);
        let frame = interpolator.render(0.0).unwrap();
        assert_eq!(frame[0], Rgb::new(3, 3, 3));
        assert_eq!(frame[2], Rgb::new(1, 1, 1));
    }

    #[test]
    fn single_column_image_renders_everywhere() {
        let image = crate::imagesource::builtin("blank", 5).unwrap();
        let interpolator = FrameInterpolator::new(&image, &linear_correction(), false);
        assert_eq!(interpolator.width(), 1);
        assert_eq!(interpolator.render(0.73).unwrap(), vec![crate::color::black(); 5]);
    }

    #[test]
    fn power_limit_dims_full_white() {
        let pixels = 144;
        let image = RawImage::new(2, pixels, vec![[255, 255, 255]; 2 * pixels]).unwrap();
        let mut interpolator = FrameInterpolator::new(&image, &linear_correction(), false);
        let budget = PowerBudget {
            average_ma: 1450,
            peak_ma: 1550,
        };

        let scale = interpolator.limit_power(budget);
        assert!(scale < 0.2, "scale was {scale}");
        let frame_ma = PowerBudget::frame_ma(&interpolator.columns[..pixels]);
        assert!(frame_ma <= 1450.0 + 1e-2, "frame draws {frame_ma} mA");

        let frame = interpolator.render(0.0).unwrap();
        assert!(frame.iter().all(|p| p.red > 0 && p.red < 255 / 4));
    }

    #[test]
    fn power_limit_leaves_dim_images_alone() {
        let mut interpolator = FrameInterpolator::new(&two_column_image(10, 240, 4), &linear_correction(), false);
        let before = interpolator.render(1.0).unwrap();
        let budget = PowerBudget {
            average_ma: 1450,
            peak_ma: 1550,
        };
        assert_eq!(interpolator.limit_power(budget), 1.0);
        assert_eq!(interpolator.render(1.0).unwrap(), before);
    }
}
