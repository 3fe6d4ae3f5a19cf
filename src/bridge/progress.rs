//! Human-readable progress reporting on the host side

use std::io::Write;

use crate::bridge::MessageEvent;

const DIVISORS: [(f64, char); 4] = [(24.0 * 60.0 * 60.0, 'd'), (60.0 * 60.0, 'h'), (60.0, 'm'), (1.0, 's')];

/// Greedy days/hours/minutes/seconds decomposition, e.g. `1h 0m 5s`.
///
/// Leading zero components are omitted; durations under one second
/// render as `< 1s`.
pub fn format_duration(seconds: f64) -> String {
    let mut remaining = seconds;
    let mut parts: Vec<String> = Vec::new();
    for (divisor, letter) in DIVISORS {
        let count = (remaining / divisor).trunc();
        remaining -= count * divisor;
        if count > 0.0 || !parts.is_empty() {
            parts.push(format!("{}{}", count as i64, letter));
        }
    }
    if parts.is_empty() {
        "< 1s".to_string()
    } else {
        parts.join(" ")
    }
}

/// Format a float the way a default C++ output stream does (6 significant digits)
fn stream_float(x: f64) -> String {
    if x == 0.0 || !x.is_finite() {
        return format!("{}", x);
    }
    let magnitude = x.abs().log10().floor() as i32;
    let decimals = (5 - magnitude).max(0) as usize;
    let text = format!("{:.*}", decimals, x);
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

/// Line printed for a progress report
pub fn progress_line(
    elapsed: f64,
    completed: f64,
    start: f64,
    duration: f64,
) -> String {
    if completed == 0.0 {
        return format!(
            "Starting simulation at t={} s for duration {} s",
            stream_float(start),
            stream_float(duration)
        );
    }
    let mut line = format!(
        "{} s ({}%) simulated in {} ({}s)",
        stream_float(completed * duration),
        (completed * 100.0) as i64,
        format_duration(elapsed),
        stream_float(elapsed)
    );
    if completed < 1.0 {
        let remaining = ((1.0 - completed) / completed * elapsed + 0.5) as i64;
        line.push_str(&format!(", estimated {} remaining.", format_duration(remaining as f64)));
    }
    line
}

/// Renders `progress` events as text lines; other events are ignored
#[derive(Debug)]
pub struct TextReporter<W: Write> {
    out: W,
}

impl<W: Write> TextReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Handle one event; returns whether a line was written
    pub fn handle(
        &mut self,
        event: &MessageEvent,
    ) -> std::io::Result<bool> {
        match *event {
            MessageEvent::Progress {
                elapsed,
                completed,
                start,
                duration,
            } => {
                writeln!(self.out, "{}", progress_line(elapsed, completed, start, duration))?;
                self.out.flush()?;
                Ok(true)
            }
            MessageEvent::Spike { .. } => Ok(false),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
