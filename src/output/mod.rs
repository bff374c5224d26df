#[cfg(target_os = "linux")]
pub mod apa102;
pub mod dryrun;
pub mod ola;

use std::time::Duration;

use crate::error::{PaintError, Result};
use crate::settings::{OutputSettings, StripSettings};
use crate::strip::StripDriver;

/// Scales a color component by a global brightness level.
pub(crate) fn dim(value: u8, brightness: u8) -> u8 {
    ((u16::from(value) * (u16::from(brightness) + 1)) >> 8) as u8
}

/// Builds the driver a strip is configured for. `dry_run` replaces every
/// backend with the hardware-free one.
pub fn open(index: usize, settings: &StripSettings, dry_run: bool) -> Result<Box<dyn StripDriver>> {
    if dry_run {
        return Ok(Box::new(dryrun::DryRunOutput::new(index, settings.pixels, Duration::ZERO)));
    }

    let driver: Box<dyn StripDriver> = match &settings.output {
        OutputSettings::DryRun { latency_us } => Box::new(dryrun::DryRunOutput::new(
            index,
            settings.pixels,
            Duration::from_micros(*latency_us),
        )),
        #[cfg(target_os = "linux")]
        OutputSettings::Apa102 { device, spi_hz } => Box::new(apa102::Apa102Output::new(
            device.clone(),
            *spi_hz,
            settings.pixels,
            settings.color_order,
        )),
        #[cfg(not(target_os = "linux"))]
        OutputSettings::Apa102 { device, .. } => {
            return Err(PaintError::ConfigMismatch(format!(
                "strip {index}: {} needs Linux spidev",
                device.display()
            )));
        }
        OutputSettings::Ola { address, universe } => {
            let output = ola::OlaOutput::new(*address, *universe, settings.pixels, settings.color_order)
                .map_err(|err| PaintError::ConfigMismatch(format!("strip {index}: {err}")))?;
            Box::new(output)
        }
    };
    Ok(driver)
}
