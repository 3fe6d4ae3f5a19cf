//! Clock registry

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Name that generated code reserves for its own use
pub const RESERVED_CLOCK_NAME: &str = "clock";

/// Internal alias used in generated code for [`RESERVED_CLOCK_NAME`]
pub const RESERVED_CLOCK_ALIAS: &str = "_clock";

/// Timestep used for clocks that were never declared explicitly (100 µs)
pub const DEFAULT_DT: f64 = 1e-4;

/// A named timing source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Clock {
    pub name: String,
    /// Timestep in seconds
    pub dt: f64,
    /// Start of the current run interval (seconds)
    #[serde(default)]
    pub start: f64,
    /// End of the current run interval (seconds, exclusive)
    #[serde(default)]
    pub end: f64,
}

impl Clock {
    pub fn new(
        name: impl Into<String>,
        dt: f64,
    ) -> Self {
        Self {
            name: name.into(),
            dt,
            start: 0.0,
            end: 0.0,
        }
    }

    /// Name used for this clock in generated code
    pub fn code_name(&self) -> &str {
        if self.name == RESERVED_CLOCK_NAME {
            RESERVED_CLOCK_ALIAS
        } else {
            &self.name
        }
    }

    /// Set the interval `[start, end)` for the next run
    pub fn set_interval(
        &mut self,
        start: f64,
        end: f64,
    ) {
        self.start = start;
        self.end = end;
    }

    /// Index of the first step of the interval
    pub fn i_start(&self) -> i64 {
        (self.start / self.dt).round() as i64
    }

    /// Index one past the last step of the interval
    pub fn i_end(&self) -> i64 {
        (self.end / self.dt).round() as i64
    }

    /// Virtual time reached once the interval has been simulated
    pub fn t_end(&self) -> f64 {
        self.i_end() as f64 * self.dt
    }
}

/// Distinct clocks known to the device, deduplicated by name
#[derive(Debug, Clone, Default)]
pub struct ClockRegistry {
    clocks: IndexMap<String, Clock>,
}

impl ClockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a clock. An existing clock of the same name keeps its state
    /// but takes the new timestep.
    pub fn declare(
        &mut self,
        clock: Clock,
    ) {
        match self.clocks.get_mut(&clock.name) {
            Some(existing) => existing.dt = clock.dt,
            None => {
                self.clocks.insert(clock.name.clone(), clock);
            }
        }
    }

    /// Get a clock by name, registering it with [`DEFAULT_DT`] if unknown
    pub fn ensure(
        &mut self,
        name: &str,
    ) -> &mut Clock {
        self.clocks
            .entry(name.to_string())
            .or_insert_with(|| Clock::new(name, DEFAULT_DT))
    }

    pub fn get(
        &self,
        name: &str,
    ) -> Option<&Clock> {
        self.clocks.get(name)
    }

    pub fn contains(
        &self,
        name: &str,
    ) -> bool {
        self.clocks.contains_key(name)
    }

    /// Name used in generated code for a clock (unknown clocks map to themselves)
    pub fn code_name<'a>(
        &'a self,
        name: &'a str,
    ) -> &'a str {
        self.clocks.get(name).map(Clock::code_name).unwrap_or(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Clock> {
        self.clocks.values()
    }

    pub fn len(&self) -> usize {
        self.clocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clocks.is_empty()
    }

    pub fn clear(&mut self) {
        self.clocks.clear();
    }
}
