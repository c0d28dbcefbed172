use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingUnit {
    Nanos,
    Micros,
    Millis,
    Secs,
}

/// Stopwatch measuring a section of code with a monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeTiming {
    start: Option<Instant>,
    stop: Option<Instant>,
}

impl CodeTiming {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.start = Some(Instant::now());
        self.stop = None;
    }

    pub fn stop(&mut self) {
        self.stop = Some(Instant::now());
    }

    /// Time between the last `start` and `stop` calls, zero if either is missing.
    pub fn elapsed(&self) -> Duration {
        match (self.start, self.stop) {
            (Some(start), Some(stop)) => stop.saturating_duration_since(start),
            _ => Duration::ZERO,
        }
    }

    /// Elapsed time as a whole number of `unit`, truncated.
    pub fn result_in(&self, unit: TimingUnit) -> String {
        format_duration(self.elapsed(), unit)
    }
}

fn format_duration(duration: Duration, unit: TimingUnit) -> String {
    match unit {
        TimingUnit::Nanos => duration.as_nanos().to_string(),
        TimingUnit::Micros => duration.as_micros().to_string(),
        TimingUnit::Millis => duration.as_millis().to_string(),
        TimingUnit::Secs => duration.as_secs().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(TimingUnit::Nanos, "1500999999")]
    #[case(TimingUnit::Micros, "1500999")]
    #[case(TimingUnit::Millis, "1500")]
    #[case(TimingUnit::Secs, "1")]
    fn truncates_to_unit(#[case] unit: TimingUnit, #[case] expected: &str) {
        assert_eq!(format_duration(Duration::new(1, 500_999_999), unit), expected);
    }

    #[test]
    fn unfinished_measure_is_zero() {
        let mut timing = CodeTiming::new();
        assert_eq!(timing.elapsed(), Duration::ZERO);

        timing.start();
        assert_eq!(timing.result_in(TimingUnit::Nanos), "0");
    }

    #[test]
    fn measures_elapsed_time() {
        let mut timing = CodeTiming::new();
        timing.start();
        std::thread::sleep(Duration::from_millis(5));
        timing.stop();

        assert!(timing.elapsed() >= Duration::from_millis(5));
        assert!(timing.result_in(TimingUnit::Millis).parse::<u64>().expect("number") >= 5);
    }
}
