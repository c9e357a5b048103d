//! Phase timings
//!
//! Phases record their wall-clock duration into a [`Timings`] owned by the
//! caller. Nothing is printed here; binaries decide whether to report.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Ordered list of named phase durations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timings {
    phases: Vec<(String, Duration)>,
}

impl Timings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f`, recording its duration under `name`
    pub fn time<T>(&mut self, name: &str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.record(name, start.elapsed());
        out
    }

    /// Record a duration; repeated names accumulate
    pub fn record(&mut self, name: &str, elapsed: Duration) {
        match self.phases.iter_mut().find(|(n, _)| n == name) {
            Some((_, total)) => *total += elapsed,
            None => self.phases.push((name.to_string(), elapsed)),
        }
    }

    pub fn get(&self, name: &str) -> Option<Duration> {
        self.phases
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| *d)
    }

    /// Sum of all recorded phases
    pub fn total(&self) -> Duration {
        self.phases.iter().map(|(_, d)| *d).sum()
    }

    pub fn phases(&self) -> impl Iterator<Item = (&str, Duration)> {
        self.phases.iter().map(|(n, d)| (n.as_str(), *d))
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }
}

impl fmt::Display for Timings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.phases.iter().map(|(n, _)| n.len()).max().unwrap_or(0);
        for (name, elapsed) in &self.phases {
            writeln!(f, "  {:<width$}  {:>10.2?}", name, elapsed, width = width)?;
        }
        write!(f, "  {:<width$}  {:>10.2?}", "total", self.total(), width = width)
    }
}
