use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::color::{ColorCorrection, PowerBudget};
use crate::configstate::ConfigState;
use crate::error::{PaintError, Result};
use crate::form::{ConfigForm, FormOutcome};
use crate::imagesource::ImageSource;
use crate::input::{InputController, Intent, KeySource};
use crate::interpolator::FrameInterpolator;
use crate::scheduler::{CycleStep, PresentationScheduler};
use crate::settings::Settings;
use crate::strip::{LoadingStage, Strip};
use crate::telemetry::IterationTelemetry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Runs the strips: bring-up, the endless pass cycle, operator input between
/// passes, and blanking every strip on the way out.
pub struct Painter<K: KeySource, F: ConfigForm> {
    strips: Vec<Strip>,
    interpolators: Vec<Option<FrameInterpolator>>,
    images: Box<dyn ImageSource>,
    patterns: Vec<Vec<String>>,
    gamma: [f32; 3],
    color_balance: [f32; 3],
    power: PowerBudget,
    vflip: Vec<bool>,
    loading_indicator: bool,
    state: ConfigState,
    input: InputController<K>,
    form: F,
    scheduler: PresentationScheduler,
    telemetry: IterationTelemetry,
    stop: Arc<AtomicBool>,
    shut_down: bool,
}

impl<K: KeySource, F: ConfigForm> Painter<K, F> {
    pub fn new(
        settings: &Settings,
        strips: Vec<Strip>,
        images: Box<dyn ImageSource>,
        input: InputController<K>,
        form: F,
        stop: Arc<AtomicBool>,
    ) -> Result<Self> {
        settings.validate()?;
        if strips.len() != settings.strip_count() {
            return Err(PaintError::ConfigMismatch(format!(
                "{} strips attached, {} configured",
                strips.len(),
                settings.strip_count()
            )));
        }
        for (strip, strip_settings) in strips.iter().zip(&settings.strips) {
            if strip.pixel_count() != strip_settings.pixels {
                return Err(PaintError::ConfigMismatch(format!(
                    "strip {} has {} pixels, {} configured",
                    strip.index(),
                    strip.pixel_count(),
                    strip_settings.pixels
                )));
            }
        }

        let presentation = settings.presentation();
        let direction = presentation.direction;
        Ok(Painter {
            interpolators: strips.iter().map(|_| None).collect(),
            strips,
            images,
            patterns: settings.patterns.clone(),
            gamma: settings.gamma,
            color_balance: settings.color_balance,
            power: settings.power_budget(),
            vflip: settings.strips.iter().map(|strip| strip.vflip).collect(),
            loading_indicator: settings.loading_indicator,
            state: ConfigState::new(
                presentation,
                settings.default_pattern,
                settings.max_duration_ms,
                settings.duration_step_ms,
            ),
            input,
            form,
            scheduler: PresentationScheduler::new(settings.strip_count(), direction),
            telemetry: IterationTelemetry::new(),
            stop,
            shut_down: false,
        })
    }

    /// Paints until stopped. All strips are blank when this returns, whether
    /// it returns an error or not.
    pub fn run(&mut self) -> Result<()> {
        let result = self.start().and_then(|()| self.cycle());
        self.shutdown();
        result
    }

    fn start(&mut self) -> Result<()> {
        let brightness = self.state.config().brightness.clone();
        for (strip, level) in self.strips.iter_mut().zip(brightness) {
            strip.begin()?;
            strip.set_brightness(level);
            log::info!("Brightness of strip {} set to {}", strip.index() + 1, level);
            strip.blank()?;
        }

        self.reload_stale(true)?;
        log::info!("Done preparing!");
        Ok(())
    }

    fn cycle(&mut self) -> Result<()> {
        loop {
            match self.scheduler.next_step() {
                CycleStep::Pass(strip) => {
                    let config = self.state.config();
                    let (duration, gap) = (config.duration(strip), config.gap(strip));
                    let interpolator = self.interpolators[strip].as_ref().ok_or_else(|| {
                        PaintError::ConfigMismatch(format!("no image loaded for strip {strip}"))
                    })?;

                    let sample = PresentationScheduler::run_pass(
                        &mut self.strips[strip],
                        interpolator,
                        duration,
                        gap,
                    )?;
                    self.telemetry.record(strip, &sample);

                    if self.checkpoint()? == Flow::Stop {
                        return Ok(());
                    }
                }
                CycleStep::IterationComplete => {
                    for (level, line) in self.telemetry.finish() {
                        log::log!(level, "{line}");
                    }
                    thread::sleep(self.state.config().iteration_pause());
                    if self.state.config().alternating {
                        self.state.flip_direction();
                        self.scheduler.set_direction(self.state.config().direction);
                    }
                }
            }
        }
    }

    /// The only place where operator input is looked at and the
    /// configuration may change.
    fn checkpoint(&mut self) -> Result<Flow> {
        if self.stop.load(Ordering::SeqCst) {
            log::info!("Interrupted");
            return Ok(Flow::Stop);
        }

        match self.input.poll()? {
            None => {}
            Some(Intent::Stop) => return Ok(Flow::Stop),
            Some(Intent::OpenConfigForm) => self.open_form()?,
            Some(Intent::IncreaseSpeed) => self.state.increase_speed(),
            Some(Intent::DecreaseSpeed) => self.state.decrease_speed(),
            Some(Intent::SelectPattern(pattern)) => self.state.select_pattern(pattern),
        }

        self.reload_stale(false)?;
        Ok(Flow::Continue)
    }

    fn open_form(&mut self) -> Result<()> {
        let current = FormOutcome {
            config: self.state.config().clone(),
            pattern: self.state.pattern(),
        };
        let outcome = self
            .form
            .edit(&current, self.state.max_duration_ms(), self.patterns.len())?;

        let strips = self.strips.len();
        let config = &outcome.config;
        if config.durations_ms.len() != strips
            || config.gaps_ms.len() != strips
            || config.brightness.len() != strips
            || outcome.pattern >= self.patterns.len()
        {
            return Err(PaintError::ConfigMismatch(
                "options form returned a configuration for a different setup".to_string(),
            ));
        }

        for strip in self.state.apply_form(outcome.config, outcome.pattern) {
            let level = self.state.config().brightness[strip];
            self.strips[strip].set_brightness(level);
        }
        Ok(())
    }

    /// Rebuilds the interpolators that no longer match pattern and brightness.
    ///
    /// During bring-up every failure is fatal. Later, a strip whose new image
    /// cannot be loaded keeps showing its previous one.
    fn reload_stale(&mut self, initial: bool) -> Result<()> {
        for strip in self.state.stale_strips() {
            match self.load(strip) {
                Ok(interpolator) => self.interpolators[strip] = Some(interpolator),
                Err(err @ PaintError::ImageLoad { .. })
                    if !initial && self.interpolators[strip].is_some() =>
                {
                    log::error!("{err}, strip {} keeps its previous image", strip + 1);
                }
                Err(err) => return Err(err),
            }
            self.state.mark_loaded(strip);
        }
        Ok(())
    }

    fn load(&mut self, strip: usize) -> Result<FrameInterpolator> {
        let pattern = self.state.pattern();
        let brightness = self.state.config().brightness[strip];
        let identifier = &self.patterns[pattern][strip];
        let pixel_count = self.strips[strip].pixel_count();

        if self.loading_indicator {
            self.strips[strip].show_loading(LoadingStage::Decoding)?;
        }
        let image = self.images.load(identifier, pixel_count)?;
        if self.loading_indicator {
            self.strips[strip].show_loading(LoadingStage::Processing)?;
        }

        let correction = ColorCorrection::new(self.gamma, self.color_balance, brightness);
        let mut interpolator = FrameInterpolator::new(&image, &correction, self.vflip[strip]);
        let scale = interpolator.limit_power(self.power);
        if scale < 1.0 {
            log::info!(
                "Image of strip {} dimmed to {:.0}% to stay within the power budget",
                strip + 1,
                scale * 100.0
            );
        }
        if self.loading_indicator {
            self.strips[strip].show_loading(LoadingStage::Done)?;
        }

        log::info!(
            "Loaded image of strip {}: {} ({} columns, brightness={})",
            strip + 1,
            identifier,
            interpolator.width(),
            brightness
        );
        Ok(interpolator)
    }

    fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        log::info!("Exiting...");
        for strip in &mut self.strips {
            if let Err(err) = strip.blank() {
                log::error!("{err}");
            }
        }
    }

    #[cfg(test)]
    fn telemetry(&self) -> &IterationTelemetry {
        &self.telemetry
    }
}

impl<K: KeySource, F: ConfigForm> Drop for Painter<K, F> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
