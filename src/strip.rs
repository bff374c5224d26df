use std::io;

use crate::color::{black, Rgb};
use crate::error::{PaintError, Result};

/// One physical LED chain.
pub trait StripDriver {
    /// Brings the hardware up. Calling it again on a running strip is a no-op.
    fn begin(&mut self) -> io::Result<()>;
    fn pixel_count(&self) -> usize;
    fn set_pixel(&mut self, index: usize, color: Rgb);
    fn set_brightness(&mut self, level: u8);
    /// Zeroes the driver's pixel data without sending it.
    fn clear(&mut self);
    /// Sends the pixel data to the strip. Blocks for the duration of the transfer.
    fn show(&mut self) -> io::Result<()>;
}

/// Colors shown while an image is being (re)loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingStage {
    Decoding,
    Processing,
    Done,
}

impl LoadingStage {
    fn color(&self) -> Rgb {
        match self {
            LoadingStage::Decoding => Rgb::new(1, 0, 0),
            LoadingStage::Processing => Rgb::new(1, 1, 0),
            LoadingStage::Done => Rgb::new(0, 1, 0),
        }
    }
}

/// A strip together with the frame buffer only its pass may write to.
pub struct Strip {
    index: usize,
    driver: Box<dyn StripDriver>,
    buffer: Vec<Rgb>,
}

impl Strip {
    pub fn new(index: usize, driver: Box<dyn StripDriver>) -> Strip {
        let buffer = vec![black(); driver.pixel_count()];
        Strip {
            index,
            driver,
            buffer,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn pixel_count(&self) -> usize {
        self.buffer.len()
    }

    pub fn begin(&mut self) -> Result<()> {
        self.driver.begin().map_err(|source| PaintError::HardwareFlushFailure {
            strip: self.index,
            source,
        })
    }

    pub fn set_brightness(&mut self, level: u8) {
        self.driver.set_brightness(level);
    }

    pub fn buffer_mut(&mut self) -> &mut [Rgb] {
        &mut self.buffer
    }

    /// Pushes the frame buffer to the hardware.
    pub fn display(&mut self) -> Result<()> {
        for (index, color) in self.buffer.iter().enumerate() {
            self.driver.set_pixel(index, *color);
        }
        self.flush()
    }

    /// Turns every LED off.
    pub fn blank(&mut self) -> Result<()> {
        self.buffer.fill(black());
        self.driver.clear();
        self.flush()
    }

    /// Fills the strip LED by LED with the color of `stage`, or blanks it
    /// once loading is done.
    pub fn show_loading(&mut self, stage: LoadingStage) -> Result<()> {
        let color = stage.color();
        for index in 0..self.pixel_count() {
            self.driver.set_pixel(index, color);
            self.flush()?;
        }
        if stage == LoadingStage::Done {
            self.blank()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.driver.show().map_err(|source| PaintError::HardwareFlushFailure {
            strip: self.index,
            source,
        })
    }
}
