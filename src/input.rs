use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;

use crate::error::Result;

/// Keys the painter reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    /// Ctrl+C while the terminal is in raw mode.
    Interrupt,
    Options,
    Up,
    Down,
    Digit(u8),
}

/// Operator requests, consumed between two passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Stop,
    OpenConfigForm,
    /// Up arrow: every pass gets one step longer.
    IncreaseSpeed,
    /// Down arrow: every pass gets one step shorter.
    DecreaseSpeed,
    SelectPattern(usize),
}

pub trait KeySource {
    /// Keys pressed since the previous call. Must not block.
    fn pressed(&mut self) -> Result<Vec<Key>>;
}

pub struct InputController<K: KeySource> {
    keys: K,
    pattern_count: usize,
}

impl<K: KeySource> InputController<K> {
    pub fn new(keys: K, pattern_count: usize) -> Self {
        InputController {
            keys,
            pattern_count,
        }
    }

    pub fn poll(&mut self) -> Result<Option<Intent>> {
        let pressed = self.keys.pressed()?;
        Ok(self.resolve(&pressed))
    }

    /// Picks one intent out of everything pressed since the last poll.
    /// Stop wins over the options form, which wins over speed changes, which
    /// win over pattern selection. Whatever else was pressed is dropped.
    fn resolve(&self, pressed: &[Key]) -> Option<Intent> {
        if pressed
            .iter()
            .any(|key| matches!(key, Key::Escape | Key::Interrupt))
        {
            return Some(Intent::Stop);
        }
        if pressed.contains(&Key::Options) {
            return Some(Intent::OpenConfigForm);
        }
        if pressed.contains(&Key::Up) {
            return Some(Intent::IncreaseSpeed);
        }
        if pressed.contains(&Key::Down) {
            return Some(Intent::DecreaseSpeed);
        }

        pressed.iter().find_map(|key| match key {
            Key::Digit(digit) if (*digit as usize) < self.pattern_count => {
                Some(Intent::SelectPattern(*digit as usize))
            }
            Key::Digit(digit) => {
                log::debug!("No pattern {digit}, ignoring key");
                None
            }
            _ => None,
        })
    }
}

/// Reads the terminal keyboard. Keeps the terminal in raw mode while alive so
/// single key presses arrive without Enter.
pub struct TerminalKeys {
    _raw_mode: RawMode,
}

impl TerminalKeys {
    pub fn new() -> Result<Self> {
        Ok(TerminalKeys {
            _raw_mode: RawMode::enable()?,
        })
    }
}

impl KeySource for TerminalKeys {
    fn pressed(&mut self) -> Result<Vec<Key>> {
        let mut keys = Vec::new();
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key_event) = event::read()? {
                if let Some(key) = map_key(&key_event) {
                    keys.push(key);
                }
            }
        }
        Ok(keys)
    }
}

pub(crate) fn map_key(key_event: &KeyEvent) -> Option<Key> {
    if key_event.kind == KeyEventKind::Release {
        return None;
    }

    match key_event.code {
        KeyCode::Esc => Some(Key::Escape),
        KeyCode::Char('c') if key_event.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Key::Interrupt)
        }
        KeyCode::Char('o') | KeyCode::Char('O') => Some(Key::Options),
        KeyCode::Up => Some(Key::Up),
        KeyCode::Down => Some(Key::Down),
        KeyCode::Char(c) => c.to_digit(10).map(|digit| Key::Digit(digit as u8)),
        _ => None,
    }
}

/// Raw terminal mode for as long as the guard lives.
pub(crate) struct RawMode;

impl RawMode {
    pub(crate) fn enable() -> Result<RawMode> {
        terminal::enable_raw_mode()?;
        Ok(RawMode)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Err(err) = terminal::disable_raw_mode() {
            log::error!("Cannot restore terminal mode: {err}");
        }
    }
}
