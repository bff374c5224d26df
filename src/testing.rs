//! In-memory stand-ins for hardware, keyboard, form and image files.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use crate::color::{black, Rgb};
use crate::error::{PaintError, Result};
use crate::form::{ConfigForm, FormOutcome};
use crate::imagesource::{ImageSource, RawImage};
use crate::input::{Key, KeySource};
use crate::strip::StripDriver;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    Begin,
    Brightness(u8),
    Clear,
    /// A flush, with the number of LEDs that were lit.
    Show { lit: usize },
}

#[derive(Debug, Default)]
pub struct DriverLog {
    pub events: Vec<DriverEvent>,
    pub shows: usize,
    pub clears: usize,
    pub last_frame: Vec<Rgb>,
    pub fail_shows: bool,
    pub show_delay: Duration,
}

pub struct RecordingDriver {
    pixels: Vec<Rgb>,
    log: Rc<RefCell<DriverLog>>,
}

impl RecordingDriver {
    pub fn new(pixel_count: usize) -> (RecordingDriver, Rc<RefCell<DriverLog>>) {
        let log = Rc::new(RefCell::new(DriverLog::default()));
        let driver = RecordingDriver {
            pixels: vec![black(); pixel_count],
            log: Rc::clone(&log),
        };
        (driver, log)
    }
}

impl StripDriver for RecordingDriver {
    fn begin(&mut self) -> io::Result<()> {
        self.log.borrow_mut().events.push(DriverEvent::Begin);
        Ok(())
    }

    fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    fn set_pixel(&mut self, index: usize, color: Rgb) {
        self.pixels[index] = color;
    }

    fn set_brightness(&mut self, level: u8) {
        self.log.borrow_mut().events.push(DriverEvent::Brightness(level));
    }

    fn clear(&mut self) {
        self.pixels.fill(black());
        let mut log = self.log.borrow_mut();
        log.clears += 1;
        log.events.push(DriverEvent::Clear);
    }

    fn show(&mut self) -> io::Result<()> {
        let delay = self.log.borrow().show_delay;
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        let mut log = self.log.borrow_mut();
        if log.fail_shows {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "strip unplugged"));
        }
        let lit = self.pixels.iter().filter(|p| **p != black()).count();
        log.shows += 1;
        log.events.push(DriverEvent::Show { lit });
        log.last_frame = self.pixels.clone();
        Ok(())
    }
}

/// Hands out one scripted batch of key presses per poll.
pub struct ScriptedKeys {
    batches: VecDeque<Vec<Key>>,
}

impl ScriptedKeys {
    pub fn new(batches: Vec<Vec<Key>>) -> ScriptedKeys {
        ScriptedKeys {
            batches: batches.into(),
        }
    }
}

impl KeySource for ScriptedKeys {
    fn pressed(&mut self) -> Result<Vec<Key>> {
        Ok(self.batches.pop_front().unwrap_or_default())
    }
}

/// Commits a prepared outcome, or the current values once it runs out.
pub struct ScriptedForm {
    outcomes: VecDeque<FormOutcome>,
    pub opened: Rc<RefCell<usize>>,
}

impl ScriptedForm {
    pub fn new(outcomes: Vec<FormOutcome>) -> ScriptedForm {
        ScriptedForm {
            outcomes: outcomes.into(),
            opened: Rc::new(RefCell::new(0)),
        }
    }
}

impl ConfigForm for ScriptedForm {
    fn edit(&mut self, current: &FormOutcome, _: u32, _: usize) -> Result<FormOutcome> {
        *self.opened.borrow_mut() += 1;
        Ok(self.outcomes.pop_front().unwrap_or_else(|| current.clone()))
    }
}

/// Serves generated images by name and counts how often each was loaded.
pub struct MemoryImages {
    images: HashMap<String, [u8; 3]>,
    pub loads: Rc<RefCell<Vec<String>>>,
}

impl MemoryImages {
    /// Every image is four columns of a single color.
    pub fn new(images: &[(&str, [u8; 3])]) -> MemoryImages {
        MemoryImages {
            images: images
                .iter()
                .map(|(name, color)| (name.to_string(), *color))
                .collect(),
            loads: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl ImageSource for MemoryImages {
    fn load(&self, identifier: &str, pixel_count: usize) -> Result<RawImage> {
        let color = self
            .images
            .get(identifier)
            .ok_or_else(|| PaintError::ImageLoad {
                identifier: identifier.to_string(),
                reason: "not in memory".to_string(),
            })?;
        self.loads.borrow_mut().push(identifier.to_string());
        RawImage::new(4, pixel_count, vec![*color; 4 * pixel_count])
    }
}
