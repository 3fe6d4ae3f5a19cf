//! Wall-clock timings of build stages

use std::fmt;

use indexmap::IndexMap;

/// Stages timed by a build, in the order they run
pub const STAGES: [&str; 4] = ["write_sources", "compile.clean", "compile.make", "run_binary"];

/// Seconds spent per stage; `None` for stages that did not run
#[derive(Debug, Clone, PartialEq)]
pub struct Timers {
    stages: IndexMap<&'static str, Option<f64>>,
}

impl Default for Timers {
    fn default() -> Self {
        Self {
            stages: STAGES.iter().map(|s| (*s, None)).collect(),
        }
    }
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        stage: &'static str,
        seconds: f64,
    ) {
        self.stages.insert(stage, Some(seconds));
    }

    pub fn get(
        &self,
        stage: &str,
    ) -> Option<f64> {
        self.stages.get(stage).copied().flatten()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Option<f64>)> + '_ {
        self.stages.iter().map(|(k, v)| (*k, *v))
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Display for Timers {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(stage, secs)| match secs {
                Some(s) => format!("{}: {:.3}s", stage, s),
                None => format!("{}: -", stage),
            })
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}
