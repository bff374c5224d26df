use std::time::Duration;

use log::Level;

/// Timestamps of one pass, relative to its start.
///
/// Every frame is stamped after it was flushed, the last stamp belongs to
/// the clear that ends the pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimingSample {
    stamps: Vec<Duration>,
    /// How far the pass ran past `duration + gap`. Nothing compensates for
    /// it, the next pass simply starts late.
    pub overrun: Option<Duration>,
}

impl TimingSample {
    pub fn new() -> TimingSample {
        TimingSample::default()
    }

    pub fn push(&mut self, stamp: Duration) {
        self.stamps.push(stamp);
    }

    pub fn stamps(&self) -> &[Duration] {
        &self.stamps
    }

    /// Time from the start of the pass until the strip went dark.
    pub fn realized(&self) -> Duration {
        self.stamps.last().copied().unwrap_or_default()
    }

    /// Number of frames shown, not counting the clear.
    pub fn frames(&self) -> usize {
        self.stamps.len().saturating_sub(1)
    }

    /// Mean time between consecutive frames, if there were at least two.
    pub fn mean_frame_interval(&self) -> Option<Duration> {
        let frames = &self.stamps[..self.frames()];
        if frames.len() < 2 {
            return None;
        }
        let span = frames[frames.len() - 1] - frames[0];
        Some(span / (frames.len() - 1) as u32)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PassReport {
    pub strip: usize,
    pub realized_ms: f64,
    pub frames: usize,
    pub mean_interval_ms: Option<f64>,
    pub overrun_ms: Option<f64>,
}

impl PassReport {
    pub fn new(strip: usize, sample: &TimingSample) -> PassReport {
        PassReport {
            strip,
            realized_ms: millis(sample.realized()),
            frames: sample.frames(),
            mean_interval_ms: sample.mean_frame_interval().map(millis),
            overrun_ms: sample.overrun.map(millis),
        }
    }
}

/// Collects the pass reports of one cycle.
#[derive(Debug, Default)]
pub struct IterationTelemetry {
    iteration: u64,
    passes: Vec<PassReport>,
}

impl IterationTelemetry {
    pub fn new() -> IterationTelemetry {
        IterationTelemetry::default()
    }

    pub fn record(&mut self, strip: usize, sample: &TimingSample) {
        self.passes.push(PassReport::new(strip, sample));
    }

    pub fn passes(&self) -> &[PassReport] {
        &self.passes
    }

    /// Ends the iteration, returning its summary lines with the level to log
    /// them at, and starts a new one. Late passes raise a warning.
    pub fn finish(&mut self) -> Vec<(Level, String)> {
        self.iteration += 1;
        let mut lines: Vec<(Level, String)> = summary_lines(self.iteration, &self.passes)
            .into_iter()
            .map(|line| (Level::Info, line))
            .collect();
        if let Some(line) = late_line(self.iteration, &self.passes) {
            lines.push((Level::Warn, line));
        }
        self.passes.clear();
        lines
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

fn list(values: impl Iterator<Item = String>) -> String {
    let mut out = String::from("[");
    for (index, value) in values.enumerate() {
        if index > 0 {
            out.push_str(", ");
        }
        out.push_str(&value);
    }
    out.push(']');
    out
}

fn format_ms(value: Option<f64>) -> String {
    match value {
        Some(ms) => format!("{ms:.2}"),
        None => "-".to_string(),
    }
}

pub fn summary_lines(iteration: u64, passes: &[PassReport]) -> Vec<String> {
    vec![
        format!(
            "Iter={iteration} Presentation duration: {}",
            list(passes.iter().map(|p| format_ms(Some(p.realized_ms))))
        ),
        format!(
            "Iter={iteration} Number of shows:       {}",
            list(passes.iter().map(|p| p.frames.to_string()))
        ),
        format!(
            "Iter={iteration} Time between shows:    {}",
            list(passes.iter().map(|p| format_ms(p.mean_interval_ms)))
        ),
    ]
}

/// Lists how late every pass of the iteration ended, if any was.
pub fn late_line(iteration: u64, passes: &[PassReport]) -> Option<String> {
    if passes.iter().all(|p| p.overrun_ms.is_none()) {
        return None;
    }
    Some(format!(
        "Iter={iteration} Late by:               {}",
        list(passes.iter().map(|p| format_ms(p.overrun_ms)))
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(stamps_ms: &[u64]) -> TimingSample {
        let mut sample = TimingSample::new();
        for stamp in stamps_ms {
            sample.push(Duration::from_millis(*stamp));
        }
        sample
    }

    #[test]
    fn clear_stamp_is_not_a_frame() {
        let sample = sample(&[2, 4, 6, 30]);
        assert_eq!(sample.frames(), 3);
        assert_eq!(sample.realized(), Duration::from_millis(30));
        assert_eq!(sample.mean_frame_interval(), Some(Duration::from_millis(2)));
    }

    #[test]
    fn skipped_pass_has_no_interval() {
        let sample = sample(&[1]);
        assert_eq!(sample.frames(), 0);
        assert_eq!(sample.mean_frame_interval(), None);
    }

    #[test]
    fn summary_has_two_decimals_per_strip() {
        let mut telemetry = IterationTelemetry::new();
        telemetry.record(0, &sample(&[1, 2, 3, 25]));
        telemetry.record(1, &sample(&[26]));
        let lines = telemetry.finish();

        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|(level, _)| *level == Level::Info));
        assert_eq!(lines[0].1, "Iter=1 Presentation duration: [25.00, 26.00]");
        assert_eq!(lines[1].1, "Iter=1 Number of shows:       [3, 0]");
        assert_eq!(lines[2].1, "Iter=1 Time between shows:    [1.00, -]");
        assert!(telemetry.passes().is_empty());
    }

    #[test]
    fn overruns_get_their_own_line() {
        let mut late = sample(&[10, 40]);
        late.overrun = Some(Duration::from_micros(2500));
        let mut telemetry = IterationTelemetry::new();
        telemetry.record(0, &sample(&[1, 2]));
        telemetry.record(1, &late);
        telemetry.finish();
        let lines = telemetry.finish();
        assert_eq!(lines[0].1, "Iter=2 Presentation duration: []");
        assert_eq!(lines.len(), 3);

        telemetry.record(0, &sample(&[1, 2]));
        telemetry.record(1, &late);
        let lines = telemetry.finish();
        assert_eq!(
            lines[3],
            (Level::Warn, "Iter=3 Late by:               [-, 2.50]".to_string())
        );
    }
}
