use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// One display pixel as it goes to the wire, before component reordering.
pub type Rgb = palette::Srgb<u8>;

pub fn black() -> Rgb {
    Rgb::new(0, 0, 0)
}

/// Physical component order of a strip. Fixed at bring-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum ColorOrder {
    Rgb,
    Rbg,
    Grb,
    Gbr,
    Brg,
    Bgr,
}

impl ColorOrder {
    /// Components in the order the strip expects them on the wire.
    pub fn arrange(&self, color: Rgb) -> [u8; 3] {
        let (r, g, b) = (color.red, color.green, color.blue);
        match self {
            ColorOrder::Rgb => [r, g, b],
            ColorOrder::Rbg => [r, b, g],
            ColorOrder::Grb => [g, r, b],
            ColorOrder::Gbr => [g, b, r],
            ColorOrder::Brg => [b, r, g],
            ColorOrder::Bgr => [b, g, r],
        }
    }
}

impl FromStr for ColorOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rgb" => Ok(ColorOrder::Rgb),
            "rbg" => Ok(ColorOrder::Rbg),
            "grb" => Ok(ColorOrder::Grb),
            "gbr" => Ok(ColorOrder::Gbr),
            "brg" => Ok(ColorOrder::Brg),
            "bgr" => Ok(ColorOrder::Bgr),
            other => Err(format!("Unknown color order: {other}")),
        }
    }
}

impl TryFrom<String> for ColorOrder {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for ColorOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColorOrder::Rgb => "rgb",
            ColorOrder::Rbg => "rbg",
            ColorOrder::Grb => "grb",
            ColorOrder::Gbr => "gbr",
            ColorOrder::Brg => "brg",
            ColorOrder::Bgr => "bgr",
        };
        f.write_str(name)
    }
}

/// Gamma curves and white balance, baked into 16-bit lookup tables.
///
/// The balance of each channel is `brightness * factor`, so a brightness
/// change requires building a new correction (and reloading every image
/// that was processed with the old one).
pub struct ColorCorrection {
    tables: [Box<[u16; 256]>; 3],
}

impl ColorCorrection {
    pub fn new(gamma: [f32; 3], balance_factors: [f32; 3], brightness: u8) -> ColorCorrection {
        let tables = [0, 1, 2].map(|channel| {
            let balance = (brightness as f32 * balance_factors[channel])
                .round()
                .clamp(0.0, 255.0);
            let mut table = Box::new([0u16; 256]);
            for (value, entry) in table.iter_mut().enumerate() {
                let normalized = value as f32 / 255.0;
                let corrected = normalized.powf(gamma[channel]) * balance * 257.0;
                *entry = corrected.round().clamp(0.0, u16::MAX as f32) as u16;
            }
            table
        });

        ColorCorrection { tables }
    }

    /// Maps an 8-bit source pixel to 16-bit linear drive levels.
    pub fn apply(&self, pixel: [u8; 3]) -> [u16; 3] {
        [
            self.tables[0][pixel[0] as usize],
            self.tables[1][pixel[1] as usize],
            self.tables[2][pixel[2] as usize],
        ]
    }
}

/// Current drawn by one LED channel at full drive.
const CHANNEL_FULL_MA: f32 = 20.0;

/// What the power source can deliver to one strip, in mA. A limit of 0 is
/// no limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerBudget {
    pub average_ma: u32,
    pub peak_ma: u32,
}

impl PowerBudget {
    /// Estimated current of one frame of 16-bit drive levels.
    pub fn frame_ma(levels: &[[u16; 3]]) -> f32 {
        let drive: f32 = levels
            .iter()
            .flatten()
            .map(|&level| f32::from(level) / f32::from(u16::MAX))
            .sum();
        drive * CHANNEL_FULL_MA
    }

    /// Factor in (0, 1] that brings a sequence of frames within budget, both
    /// on average and in its brightest frame.
    pub fn scale(&self, frame_currents: &[f32]) -> f32 {
        if frame_currents.is_empty() {
            return 1.0;
        }
        let peak = frame_currents.iter().copied().fold(0.0, f32::max);
        let average = frame_currents.iter().sum::<f32>() / frame_currents.len() as f32;

        let mut scale: f32 = 1.0;
        if self.average_ma > 0 && average > 0.0 {
            scale = scale.min(self.average_ma as f32 / average);
        }
        if self.peak_ma > 0 && peak > 0.0 {
            scale = scale.min(self.peak_ma as f32 / peak);
        }
        scale
    }
}
