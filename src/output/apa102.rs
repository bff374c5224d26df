use std::io::{self, Write};
use std::path::PathBuf;

use spidev::{SpiModeFlags, Spidev, SpidevOptions};

use crate::color::{ColorOrder, Rgb};
use crate::output::dim;
use crate::strip::StripDriver;

const START_FRAME: [u8; 4] = [0; 4];
/// LED header byte: three marker bits plus full 5-bit global current.
const LED_HEADER: u8 = 0xff;

/// APA102 ("DotStar") strip on a spidev device.
///
/// The whole strip goes out as one write, which the kernel turns into a
/// single SPI transfer.
pub struct Apa102Output {
    device: PathBuf,
    spi_hz: u32,
    spi: Option<Spidev>,
    color_order: ColorOrder,
    brightness: u8,
    pixels: Vec<Rgb>,
    frame: Vec<u8>,
}

impl Apa102Output {
    pub fn new(
        device: PathBuf,
        spi_hz: u32,
        pixel_count: usize,
        color_order: ColorOrder,
    ) -> Apa102Output {
        Apa102Output {
            device,
            spi_hz,
            spi: None,
            color_order,
            brightness: 255,
            pixels: vec![crate::color::black(); pixel_count],
            frame: Vec::with_capacity(frame_len(pixel_count)),
        }
    }

    fn encode(&mut self) {
        self.frame.clear();
        self.frame.extend_from_slice(&START_FRAME);
        for pixel in &self.pixels {
            let [a, b, c] = self.color_order.arrange(*pixel);
            self.frame.extend_from_slice(&[
                LED_HEADER,
                dim(a, self.brightness),
                dim(b, self.brightness),
                dim(c, self.brightness),
            ]);
        }
        // The data line lags one clock edge per LED, so push half a bit per
        // LED of extra clocks through the end of the strip.
        let end_frame_len = (self.pixels.len() + 15) / 16;
        self.frame.extend(std::iter::repeat(0xff).take(end_frame_len));
    }
}

fn frame_len(pixel_count: usize) -> usize {
    START_FRAME.len() + 4 * pixel_count + (pixel_count + 15) / 16
}

impl StripDriver for Apa102Output {
    fn begin(&mut self) -> io::Result<()> {
        if self.spi.is_none() {
            let mut spi = Spidev::open(&self.device)?;
            let options = SpidevOptions::new()
                .bits_per_word(8)
                .max_speed_hz(self.spi_hz)
                .mode(SpiModeFlags::SPI_MODE_0)
                .build();
            spi.configure(&options)?;
            log::info!("Opened {} at {} Hz", self.device.display(), self.spi_hz);
            self.spi = Some(spi);
        }
        Ok(())
    }

    fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    fn set_pixel(&mut self, index: usize, color: Rgb) {
        self.pixels[index] = color;
    }

    fn set_brightness(&mut self, level: u8) {
        self.brightness = level;
    }

    fn clear(&mut self) {
        self.pixels.fill(crate::color::black());
    }

    fn show(&mut self) -> io::Result<()> {
        self.encode();
        match self.spi.as_mut() {
            Some(spi) => spi.write_all(&self.frame),
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                format!("{} was not opened", self.device.display()),
            )),
        }
    }
}
