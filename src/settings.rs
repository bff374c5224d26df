use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use config_file::FromConfigFile;
use serde::Deserialize;

use crate::color::{ColorOrder, PowerBudget};
use crate::configstate::{PresentationConfig, SweepDirection};
use crate::error::{PaintError, Result};

/// Digits 0-9 select patterns, so there can be no more than ten.
pub const MAX_PATTERNS: usize = 10;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OutputSettings {
    /// No hardware. Every flush takes `latency_us`.
    DryRun {
        #[serde(default)]
        latency_us: u64,
    },
    /// APA102/DotStar strip on a spidev device, clocked at `spi_hz`.
    Apa102 {
        device: PathBuf,
        #[serde(default = "default_spi_hz")]
        spi_hz: u32,
    },
    /// One DMX universe of an OLA daemon, addressed through its OSC plugin.
    Ola { address: SocketAddr, universe: u16 },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StripSettings {
    pub pixels: usize,
    #[serde(default = "default_color_order")]
    pub color_order: ColorOrder,
    /// Set when the data input of the strip is at its bottom end.
    #[serde(default = "default_vflip")]
    pub vflip: bool,
    #[serde(default = "default_output")]
    pub output: OutputSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub strips: Vec<StripSettings>,
    pub image_dir: PathBuf,
    /// Pattern `k` lists one image per strip.
    pub patterns: Vec<Vec<String>>,
    pub default_pattern: usize,
    pub gamma: [f32; 3],
    pub color_balance: [f32; 3],
    /// Average and peak current one strip may draw, in mA. 0 disables a limit.
    pub power_limit_ma: [u32; 2],
    pub durations_ms: Vec<u32>,
    pub gaps_ms: Vec<u32>,
    pub brightness: Vec<u8>,
    pub iteration_pause_ms: u32,
    pub start_direction: SweepDirection,
    pub alternating: bool,
    pub max_duration_ms: u32,
    pub duration_step_ms: u32,
    pub loading_indicator: bool,
}

fn default_color_order() -> ColorOrder {
    ColorOrder::Bgr
}

fn default_vflip() -> bool {
    true
}

fn default_spi_hz() -> u32 {
    10_000_000
}

fn default_output() -> OutputSettings {
    OutputSettings::DryRun { latency_us: 0 }
}

impl Default for Settings {
    fn default() -> Self {
        let strip_count = 4;
        let strip = StripSettings {
            pixels: 144,
            color_order: default_color_order(),
            vflip: default_vflip(),
            output: default_output(),
        };
        let pattern = |name: &str| vec![format!("builtin:{name}"); strip_count];

        Settings {
            strips: vec![strip; strip_count],
            image_dir: PathBuf::from("stimuli"),
            patterns: vec![pattern("color-order"), pattern("gradient"), pattern("blank")],
            default_pattern: 0,
            gamma: [2.8, 2.8, 2.8],
            color_balance: [0.5, 1.0, 0.75],
            power_limit_ma: [1450, 1550],
            durations_ms: vec![25; strip_count],
            gaps_ms: vec![1; strip_count],
            brightness: vec![255; strip_count],
            iteration_pause_ms: 100,
            start_direction: SweepDirection::Forward,
            alternating: false,
            max_duration_ms: 100,
            duration_step_ms: 1,
            loading_indicator: true,
        }
    }
}

impl Settings {
    /// Reads the settings file, or returns the defaults if there is none.
    pub fn load(path: Option<&Path>) -> Result<Settings> {
        match path {
            Some(path) => Settings::from_config_file(path)
                .map_err(|err| PaintError::Settings(format!("{}: {err}", path.display()))),
            None => Ok(Settings::default()),
        }
    }

    pub fn strip_count(&self) -> usize {
        self.strips.len()
    }

    pub fn validate(&self) -> Result<()> {
        let strips = self.strip_count();
        let mismatch = |message: String| Err(PaintError::ConfigMismatch(message));

        if strips == 0 {
            return mismatch("no strips configured".to_string());
        }
        for (name, len) in [
            ("durations_ms", self.durations_ms.len()),
            ("gaps_ms", self.gaps_ms.len()),
            ("brightness", self.brightness.len()),
        ] {
            if len != strips {
                return mismatch(format!("{name} has {len} entries for {strips} strips"));
            }
        }
        if self.patterns.is_empty() || self.patterns.len() > MAX_PATTERNS {
            return mismatch(format!(
                "{} patterns configured, expected 1 to {MAX_PATTERNS}",
                self.patterns.len()
            ));
        }
        for (index, pattern) in self.patterns.iter().enumerate() {
            if pattern.len() != strips {
                return mismatch(format!(
                    "pattern {index} has {} images for {strips} strips",
                    pattern.len()
                ));
            }
        }
        if self.default_pattern >= self.patterns.len() {
            return mismatch(format!("default pattern {} does not exist", self.default_pattern));
        }
        if let Some(strip) = self.strips.iter().position(|strip| strip.pixels == 0) {
            return mismatch(format!("strip {strip} has no pixels"));
        }
        if self.max_duration_ms == 0 || self.duration_step_ms == 0 {
            return mismatch("max_duration_ms and duration_step_ms must be positive".to_string());
        }
        if let Some(duration) = self.durations_ms.iter().find(|&&d| d > self.max_duration_ms) {
            return mismatch(format!(
                "duration {duration} ms exceeds the maximum of {} ms",
                self.max_duration_ms
            ));
        }
        if self.brightness.contains(&0) {
            return mismatch("brightness must be between 1 and 255".to_string());
        }

        Ok(())
    }

    pub fn power_budget(&self) -> PowerBudget {
        PowerBudget {
            average_ma: self.power_limit_ma[0],
            peak_ma: self.power_limit_ma[1],
        }
    }

    pub fn presentation(&self) -> PresentationConfig {
        PresentationConfig {
            durations_ms: self.durations_ms.clone(),
            gaps_ms: self.gaps_ms.clone(),
            brightness: self.brightness.clone(),
            iteration_pause_ms: self.iteration_pause_ms,
            direction: self.start_direction,
            alternating: self.alternating,
        }
    }
}
