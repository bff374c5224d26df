use std::io::{self, Write};

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::style::{Attribute, Print, SetAttribute};
use crossterm::terminal::{self, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, queue};

use crate::configstate::PresentationConfig;
use crate::error::Result;

pub const SLIDER_MIN_DURATION_MS: u32 = 1;
pub const SLIDER_MIN_GAP_MS: u32 = 1;
pub const SLIDER_MAX_GAP_MS: u32 = 100;

/// What a committed options form hands back: a complete replacement of the
/// presentation configuration plus the pattern to show.
#[derive(Debug, Clone, PartialEq)]
pub struct FormOutcome {
    pub config: PresentationConfig,
    pub pattern: usize,
}

/// Blocking request/response boundary to the operator. The strips are dark
/// while it runs.
pub trait ConfigForm {
    fn edit(&mut self, current: &FormOutcome, max_duration_ms: u32, pattern_count: usize)
        -> Result<FormOutcome>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Pattern,
    Duration(usize),
    Gap(usize),
    Brightness(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FormAction {
    Continue,
    Commit,
    Cancel,
}

/// Slider state of the options form, independent of any terminal.
pub(crate) struct FormModel {
    values: FormOutcome,
    fields: Vec<Field>,
    selected: usize,
    max_duration_ms: u32,
    pattern_count: usize,
}

impl FormModel {
    pub(crate) fn new(current: &FormOutcome, max_duration_ms: u32, pattern_count: usize) -> Self {
        let strips = current.config.strip_count();
        let mut fields = vec![Field::Pattern];
        fields.extend((0..strips).map(Field::Duration));
        fields.extend((0..strips).map(Field::Gap));
        fields.extend((0..strips).map(Field::Brightness));

        FormModel {
            values: current.clone(),
            fields,
            selected: 0,
            max_duration_ms,
            pattern_count,
        }
    }

    pub(crate) fn outcome(&self) -> &FormOutcome {
        &self.values
    }

    pub(crate) fn handle(&mut self, code: KeyCode) -> FormAction {
        match code {
            KeyCode::Enter => return FormAction::Commit,
            KeyCode::Esc => return FormAction::Cancel,
            KeyCode::Up | KeyCode::BackTab => {
                self.selected = (self.selected + self.fields.len() - 1) % self.fields.len();
            }
            KeyCode::Down | KeyCode::Tab => {
                self.selected = (self.selected + 1) % self.fields.len();
            }
            KeyCode::Left => self.adjust(-1),
            KeyCode::Right => self.adjust(1),
            KeyCode::PageDown => self.adjust(-10),
            KeyCode::PageUp => self.adjust(10),
            _ => {}
        }
        FormAction::Continue
    }

    fn adjust(&mut self, delta: i64) {
        let step = |value: u32, min: u32, max: u32| -> u32 {
            (i64::from(value) + delta).clamp(i64::from(min), i64::from(max)) as u32
        };

        let config = &mut self.values.config;
        match self.fields[self.selected] {
            Field::Pattern => {
                let last = self.pattern_count.saturating_sub(1) as u32;
                self.values.pattern = step(self.values.pattern as u32, 0, last) as usize;
            }
            Field::Duration(strip) => {
                config.durations_ms[strip] = step(
                    config.durations_ms[strip],
                    SLIDER_MIN_DURATION_MS,
                    self.max_duration_ms,
                );
            }
            Field::Gap(strip) => {
                config.gaps_ms[strip] =
                    step(config.gaps_ms[strip], SLIDER_MIN_GAP_MS, SLIDER_MAX_GAP_MS);
            }
            Field::Brightness(strip) => {
                config.brightness[strip] =
                    step(u32::from(config.brightness[strip]), 1, 255) as u8;
            }
        }
    }

    fn lines(&self) -> Vec<(bool, String)> {
        let strips = self.values.config.strip_count();
        let config = &self.values.config;
        self.fields
            .iter()
            .enumerate()
            .map(|(index, field)| {
                let text = match *field {
                    Field::Pattern => format!(
                        "Test pattern [0..{}]           {}",
                        self.pattern_count.saturating_sub(1),
                        self.values.pattern
                    ),
                    Field::Duration(strip) => format!(
                        "Pres. duration strip {} [ms]    {}",
                        strip + 1,
                        config.durations_ms[strip]
                    ),
                    Field::Gap(strip) => format!(
                        "Inter-duration strip {}->{} [ms] {}",
                        strip + 1,
                        (strip + 1) % strips + 1,
                        config.gaps_ms[strip]
                    ),
                    Field::Brightness(strip) => format!(
                        "Brightness strip {} [1..255]    {}",
                        strip + 1,
                        config.brightness[strip]
                    ),
                };
                (index == self.selected, text)
            })
            .collect()
    }
}

/// The options form drawn on the controlling terminal.
pub struct TerminalForm;

impl TerminalForm {
    fn draw(out: &mut impl Write, model: &FormModel) -> io::Result<()> {
        queue!(
            out,
            terminal::Clear(ClearType::All),
            cursor::MoveTo(0, 0),
            Print("Light painter options"),
            cursor::MoveTo(0, 1),
            Print("Up/Down: select  Left/Right: -/+1  PgDn/PgUp: -/+10  Enter: apply  Esc: cancel"),
        )?;
        for (row, (selected, text)) in model.lines().into_iter().enumerate() {
            queue!(out, cursor::MoveTo(0, row as u16 + 3))?;
            if selected {
                queue!(out, SetAttribute(Attribute::Reverse), Print(text), SetAttribute(Attribute::Reset))?;
            } else {
                queue!(out, Print(text))?;
            }
        }
        out.flush()
    }

    fn run(model: &mut FormModel) -> io::Result<FormAction> {
        let mut stdout = io::stdout();
        loop {
            Self::draw(&mut stdout, model)?;
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Release {
                    continue;
                }
                match model.handle(key.code) {
                    FormAction::Continue => {}
                    action => return Ok(action),
                }
            }
        }
    }
}

impl ConfigForm for TerminalForm {
    fn edit(
        &mut self,
        current: &FormOutcome,
        max_duration_ms: u32,
        pattern_count: usize,
    ) -> Result<FormOutcome> {
        let mut model = FormModel::new(current, max_duration_ms, pattern_count);

        let mut stdout = io::stdout();
        crossterm::execute!(stdout, EnterAlternateScreen, cursor::Hide)?;
        let action = Self::run(&mut model);
        crossterm::execute!(stdout, cursor::Show, LeaveAlternateScreen)?;

        match action? {
            FormAction::Commit => Ok(model.outcome().clone()),
            _ => {
                log::info!("Options form cancelled");
                Ok(current.clone())
            }
        }
    }
}
