use std::io;
use std::thread;
use std::time::Duration;

use crate::color::Rgb;
use crate::strip::StripDriver;

/// Stands in for a strip when there is no hardware. Flushes only take time.
pub struct DryRunOutput {
    index: usize,
    pixel_count: usize,
    latency: Duration,
    flushes: u64,
}

impl DryRunOutput {
    pub fn new(index: usize, pixel_count: usize, latency: Duration) -> DryRunOutput {
        DryRunOutput {
            index,
            pixel_count,
            latency,
            flushes: 0,
        }
    }
}

impl StripDriver for DryRunOutput {
    fn begin(&mut self) -> io::Result<()> {
        log::debug!("Dry run strip {} with {} pixels", self.index, self.pixel_count);
        Ok(())
    }

    fn pixel_count(&self) -> usize {
        self.pixel_count
    }

    fn set_pixel(&mut self, _index: usize, _color: Rgb) {}

    fn set_brightness(&mut self, _level: u8) {}

    fn clear(&mut self) {}

    fn show(&mut self) -> io::Result<()> {
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        self.flushes += 1;
        Ok(())
    }
}

impl Drop for DryRunOutput {
    fn drop(&mut self) {
        log::debug!("Dry run strip {} flushed {} times", self.index, self.flushes);
    }
}
