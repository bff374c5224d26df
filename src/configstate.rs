use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepDirection {
    /// Strip 0 first.
    Forward,
    /// Strip N-1 first.
    Reverse,
}

impl SweepDirection {
    pub fn flipped(self) -> SweepDirection {
        match self {
            SweepDirection::Forward => SweepDirection::Reverse,
            SweepDirection::Reverse => SweepDirection::Forward,
        }
    }

    /// Strip indices in the order one cycle visits them.
    pub fn order(self, strip_count: usize) -> Vec<usize> {
        match self {
            SweepDirection::Forward => (0..strip_count).collect(),
            SweepDirection::Reverse => (0..strip_count).rev().collect(),
        }
    }
}

/// Everything the scheduler reads at the start of a pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PresentationConfig {
    pub durations_ms: Vec<u32>,
    pub gaps_ms: Vec<u32>,
    pub brightness: Vec<u8>,
    pub iteration_pause_ms: u32,
    pub direction: SweepDirection,
    pub alternating: bool,
}

impl PresentationConfig {
    pub fn strip_count(&self) -> usize {
        self.durations_ms.len()
    }

    pub fn duration(&self, strip: usize) -> Duration {
        Duration::from_millis(u64::from(self.durations_ms[strip]))
    }

    pub fn gap(&self, strip: usize) -> Duration {
        Duration::from_millis(u64::from(self.gaps_ms[strip]))
    }

    pub fn iteration_pause(&self) -> Duration {
        Duration::from_millis(u64::from(self.iteration_pause_ms))
    }
}

/// The operator-adjustable state of a running painter.
///
/// Only mutated between passes. Tracks which pattern and brightness every
/// strip's interpolator was built with, so it can tell which strips need a
/// reload.
pub struct ConfigState {
    config: PresentationConfig,
    pattern: usize,
    max_duration_ms: u32,
    step_ms: u32,
    loaded: Vec<Option<(usize, u8)>>,
}

impl ConfigState {
    pub fn new(
        config: PresentationConfig,
        pattern: usize,
        max_duration_ms: u32,
        step_ms: u32,
    ) -> ConfigState {
        let loaded = vec![None; config.strip_count()];
        ConfigState {
            config,
            pattern,
            max_duration_ms,
            step_ms,
            loaded,
        }
    }

    pub fn config(&self) -> &PresentationConfig {
        &self.config
    }

    pub fn pattern(&self) -> usize {
        self.pattern
    }

    pub fn max_duration_ms(&self) -> u32 {
        self.max_duration_ms
    }

    /// Lengthens every strip's pass by one step, up to the ceiling.
    pub fn increase_speed(&mut self) {
        let ceiling = self.max_duration_ms;
        for duration in &mut self.config.durations_ms {
            *duration = duration.saturating_add(self.step_ms).min(ceiling);
        }
        log::info!("Display durations = {:?}", self.config.durations_ms);
    }

    /// Shortens every strip's pass by one step, never below 1 ms.
    pub fn decrease_speed(&mut self) {
        for duration in &mut self.config.durations_ms {
            *duration = duration.saturating_sub(self.step_ms).max(1);
        }
        log::info!("Display durations = {:?}", self.config.durations_ms);
    }

    pub fn select_pattern(&mut self, pattern: usize) {
        if pattern != self.pattern {
            log::info!("Now displaying pattern {pattern}");
        }
        self.pattern = pattern;
    }

    pub fn flip_direction(&mut self) {
        self.config.direction = self.config.direction.flipped();
    }

    /// Replaces the configuration with a committed form result. Returns the
    /// strips whose brightness changed.
    pub fn apply_form(&mut self, config: PresentationConfig, pattern: usize) -> Vec<usize> {
        if config.durations_ms != self.config.durations_ms {
            log::info!("New display durations = {:?}", config.durations_ms);
        }
        if config.gaps_ms != self.config.gaps_ms {
            log::info!("New inter-strip durations = {:?}", config.gaps_ms);
        }
        let brightness_changed: Vec<usize> = (0..self.config.strip_count())
            .filter(|&strip| config.brightness[strip] != self.config.brightness[strip])
            .collect();
        if !brightness_changed.is_empty() {
            log::info!("New brightness configuration = {:?}", config.brightness);
        }

        self.config = config;
        self.select_pattern(pattern);
        brightness_changed
    }

    /// Strips whose interpolator does not match the current pattern and brightness.
    pub fn stale_strips(&self) -> Vec<usize> {
        (0..self.loaded.len())
            .filter(|&strip| self.loaded[strip] != Some((self.pattern, self.config.brightness[strip])))
            .collect()
    }

    pub fn mark_loaded(&mut self, strip: usize) {
        self.loaded[strip] = Some((self.pattern, self.config.brightness[strip]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PresentationConfig {
        PresentationConfig {
            durations_ms: vec![25, 99, 1, 50],
            gaps_ms: vec![1; 4],
            brightness: vec![255; 4],
            iteration_pause_ms: 100,
            direction: SweepDirection::Forward,
            alternating: false,
        }
    }

    fn loaded_state() -> ConfigState {
        let mut state = ConfigState::new(config(), 0, 100, 1);
        for strip in 0..4 {
            state.mark_loaded(strip);
        }
        state
    }

    #[test]
    fn speed_steps_stay_within_bounds() {
        let mut state = ConfigState::new(config(), 0, 100, 1);
        for _ in 0..100 {
            state.increase_speed();
        }
        assert!(state.config().durations_ms.iter().all(|&d| d == 100));
        for _ in 0..100 {
            state.decrease_speed();
        }
        assert!(state.config().durations_ms.iter().all(|&d| d == 1));
    }

    #[test]
    fn large_steps_clamp() {
        let mut state = ConfigState::new(config(), 0, 100, 30);
        state.increase_speed();
        assert_eq!(state.config().durations_ms, vec![55, 100, 31, 80]);
        state.decrease_speed();
        state.decrease_speed();
        assert_eq!(state.config().durations_ms, vec![1, 40, 1, 20]);
    }

    #[test]
    fn everything_is_stale_before_the_first_load() {
        let state = ConfigState::new(config(), 0, 100, 1);
        assert_eq!(state.stale_strips(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn reselecting_the_loaded_pattern_needs_no_reload() {
        let mut state = loaded_state();
        state.select_pattern(0);
        assert!(state.stale_strips().is_empty());

        state.select_pattern(3);
        assert_eq!(state.stale_strips().len(), 4);
        for strip in 0..4 {
            state.mark_loaded(strip);
        }
        state.select_pattern(3);
        assert!(state.stale_strips().is_empty());
    }

    #[test]
    fn brightness_change_marks_only_that_strip() {
        let mut state = loaded_state();
        let mut changed = config();
        changed.brightness[2] = 10;
        let brightness_changed = state.apply_form(changed, 0);
        assert_eq!(brightness_changed, vec![2]);
        assert_eq!(state.stale_strips(), vec![2]);
    }

    #[test]
    fn reverse_order_starts_at_last_strip() {
        assert_eq!(SweepDirection::Reverse.order(3), vec![2, 1, 0]);
        assert_eq!(SweepDirection::Forward.order(3), vec![0, 1, 2]);
        assert_eq!(SweepDirection::Forward.flipped(), SweepDirection::Reverse);
    }
}
