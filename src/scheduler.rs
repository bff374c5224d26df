//! Pass timing and the strip cycle.
//!
//! A pass sweeps one image across one strip within a fixed duration. Frames
//! are not paced: the loop renders and flushes as fast as the strip accepts
//! data, and the wall clock alone decides which image column is shown.

use std::thread;
use std::time::{Duration, Instant};

use crate::configstate::SweepDirection;
use crate::error::{PaintError, Result};
use crate::interpolator::FrameInterpolator;
use crate::strip::Strip;
use crate::telemetry::TimingSample;

/// One step of the endless strip cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStep {
    Pass(usize),
    IterationComplete,
}

/// Walks through all strips in sweep order, then reports the end of the
/// iteration. A direction change only takes effect with the next iteration.
pub struct PresentationScheduler {
    strip_count: usize,
    direction: SweepDirection,
    order: Vec<usize>,
    cursor: usize,
}

impl PresentationScheduler {
    pub fn new(strip_count: usize, direction: SweepDirection) -> PresentationScheduler {
        PresentationScheduler {
            strip_count,
            direction,
            order: Vec::new(),
            cursor: 0,
        }
    }

    pub fn set_direction(&mut self, direction: SweepDirection) {
        self.direction = direction;
    }

    pub fn next_step(&mut self) -> CycleStep {
        if self.cursor == 0 {
            self.order = self.direction.order(self.strip_count);
        }
        if self.cursor < self.order.len() {
            let strip = self.order[self.cursor];
            self.cursor += 1;
            return CycleStep::Pass(strip);
        }

        self.cursor = 0;
        CycleStep::IterationComplete
    }

    /// Runs one pass of `strip` and returns its frame timestamps.
    ///
    /// The strip is blank when this returns, successfully or not. The call
    /// returns no earlier than `duration + gap` after it started; if the pass
    /// itself took longer than that, the excess is recorded as overrun.
    pub fn run_pass(
        strip: &mut Strip,
        interpolator: &FrameInterpolator,
        duration: Duration,
        gap: Duration,
    ) -> Result<TimingSample> {
        let start = Instant::now();
        let mut sample = TimingSample::new();

        if duration.is_zero() {
            log::warn!(
                "{}",
                PaintError::ZeroDuration {
                    strip: strip.index(),
                    duration_ms: duration.as_millis() as u64
                }
            );
        } else if let Err(err) = Self::sweep(strip, interpolator, duration, start, &mut sample) {
            if let Err(clear_err) = strip.blank() {
                log::error!("Cannot clear strip {} after failure: {clear_err}", strip.index());
            }
            return Err(err);
        }

        strip.blank()?;
        let cleared = start.elapsed();
        sample.push(cleared);

        let target = duration + gap;
        match overrun(cleared, target) {
            Some(late) => {
                log::warn!("Strip {} pass overran by {:?}", strip.index(), late);
                sample.overrun = Some(late);
            }
            None => thread::sleep(target - cleared),
        }

        Ok(sample)
    }

    fn sweep(
        strip: &mut Strip,
        interpolator: &FrameInterpolator,
        duration: Duration,
        start: Instant,
        sample: &mut TimingSample,
    ) -> Result<()> {
        let duration_secs = duration.as_secs_f32();
        let mut elapsed = Duration::ZERO;
        while elapsed <= duration {
            elapsed = start.elapsed();
            // The last frame of a pass is measured after the deadline.
            let position = (elapsed.as_secs_f32() / duration_secs).min(1.0);
            match interpolator.render_into(position, strip.buffer_mut()) {
                Ok(()) => {}
                Err(PaintError::InvalidPosition(position)) => {
                    debug_assert!(false, "position {position} escaped clamping");
                    interpolator.render_into(position.clamp(0.0, 1.0), strip.buffer_mut())?;
                }
                Err(err) => return Err(err),
            }
            strip.display()?;
            sample.push(start.elapsed());
        }
        Ok(())
    }
}

/// How far a pass that went dark at `cleared` ran past `target`. Ending
/// exactly on target is not late.
fn overrun(cleared: Duration, target: Duration) -> Option<Duration> {
    cleared.checked_sub(target).filter(|late| !late.is_zero())
}
