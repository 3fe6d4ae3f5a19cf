//! Deferred execution queue
//!
//! Every `run` call contributes one [`QueueEntry`]. When the device is built
//! the queue is unrolled, in insertion order, into the body of the generated
//! main program.

use crate::device::clock::ClockRegistry;
use crate::device::network::Network;

/// Instruction that applies command-line overrides to the simulation
pub const APPLY_RUN_ARGS: &str = "set_from_command_line(args);";

/// An entry of the main queue
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEntry {
    /// Run a network; holds the network name and the generated lines
    RunNetwork { network: String, lines: Vec<String> },
}

impl QueueEntry {
    pub fn lines(&self) -> &[String] {
        match self {
            QueueEntry::RunNetwork { lines, .. } => lines,
        }
    }

    pub fn network(&self) -> &str {
        match self {
            QueueEntry::RunNetwork { network, .. } => network,
        }
    }
}

/// Where injected code is placed relative to a network run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeSlot {
    BeforeNetworkRun,
    AfterNetworkRun,
}

/// Code blocks injected around every network run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeLines {
    pub before_network_run: Vec<String>,
    pub after_network_run: Vec<String>,
}

impl CodeLines {
    pub fn insert(
        &mut self,
        slot: CodeSlot,
        line: impl Into<String>,
    ) {
        match slot {
            CodeSlot::BeforeNetworkRun => self.before_network_run.push(line.into()),
            CodeSlot::AfterNetworkRun => self.after_network_run.push(line.into()),
        }
    }
}

/// Ordered list of deferred entries
#[derive(Debug, Clone, Default)]
pub struct MainQueue {
    entries: Vec<QueueEntry>,
}

impl MainQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        entry: QueueEntry,
    ) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flatten all entries, in order, into main program lines
    pub fn unroll(&self) -> Vec<&str> {
        self.entries
            .iter()
            .flat_map(|entry| entry.lines().iter().map(String::as_str))
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Builder for the lines of one `RunNetwork` entry
#[derive(Debug)]
pub struct RunLines<'a> {
    network: &'a Network,
    clocks: &'a ClockRegistry,
    code_lines: Option<&'a CodeLines>,
    apply_run_args: bool,
    report_call: &'a str,
    report_period: f64,
}

impl<'a> RunLines<'a> {
    pub fn new(
        network: &'a Network,
        clocks: &'a ClockRegistry,
    ) -> Self {
        Self {
            network,
            clocks,
            code_lines: None,
            apply_run_args: false,
            report_call: "NULL",
            report_period: 10.0,
        }
    }

    pub fn code_lines(
        mut self,
        code_lines: &'a CodeLines,
    ) -> Self {
        self.code_lines = Some(code_lines);
        self
    }

    pub fn apply_run_args(
        mut self,
        apply: bool,
    ) -> Self {
        self.apply_run_args = apply;
        self
    }

    pub fn report(
        mut self,
        report_call: &'a str,
        report_period: f64,
    ) -> Self {
        self.report_call = report_call;
        self.report_period = report_period;
        self
    }

    /// Generate the lines for running the network for `duration` seconds
    pub fn build(
        self,
        duration: f64,
    ) -> Vec<String> {
        let net = &self.network.name;
        let mut lines = vec![format!("{}.clear();", net)];

        let mut registered: Vec<(&str, &str)> = Vec::new();
        for (clock, codeobj) in self.network.active_code_objects() {
            let pair = (clock, codeobj.name.as_str());
            if registered.contains(&pair) {
                continue;
            }
            registered.push(pair);
            lines.push(format!(
                "{}.add(&{}, _run_{});",
                net,
                self.clocks.code_name(clock),
                codeobj.name
            ));
        }

        // Clocks without any code object still have to advance
        for clock in self.network.clock_names() {
            if !registered.iter().any(|(c, _)| *c == clock) {
                lines.push(format!("{}.add(&{}, NULL);", net, self.clocks.code_name(clock)));
            }
        }

        if let Some(code_lines) = self.code_lines {
            lines.extend(code_lines.before_network_run.iter().cloned());
        }
        if self.apply_run_args {
            lines.push(APPLY_RUN_ARGS.to_string());
        }
        lines.push(format!(
            "{}.run({:?}, {}, {:?});",
            net, duration, self.report_call, self.report_period
        ));
        if let Some(code_lines) = self.code_lines {
            lines.extend(code_lines.after_network_run.iter().cloned());
        }
        lines
    }
}
