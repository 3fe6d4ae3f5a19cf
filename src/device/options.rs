//! Build and run options

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::device::report::Report;
use crate::error::{DeviceError, DeviceResult};
use crate::template::HtmlContent;

/// Free variables visible to a run, by name
pub type Namespace = BTreeMap<String, serde_json::Value>;

/// Options controlling `build()`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BuildOptions {
    /// Build directory; a fresh temporary directory when absent
    pub directory: Option<PathBuf>,
    /// Results directory, relative to `directory`
    pub results_directory: PathBuf,
    /// Entry page to use instead of a synthesized one
    pub html_file: Option<PathBuf>,
    /// Content keys for the synthesized page
    pub html_content: Option<BTreeMap<String, String>>,
    /// Model file; a same-named `.html` beside it is used as entry page
    pub model_file: Option<PathBuf>,
    pub debug: bool,
    pub clean: bool,
    pub compile: bool,
    pub run: bool,
    /// Extra arguments for the preview command
    pub run_args: Vec<String>,
    pub profile: bool,
    /// Sources compiled in addition to the generated ones
    pub additional_source_files: Vec<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            directory: None,
            results_directory: PathBuf::from("results"),
            html_file: None,
            html_content: None,
            model_file: None,
            debug: false,
            clean: false,
            compile: true,
            run: true,
            run_args: Vec::new(),
            profile: false,
            additional_source_files: Vec::new(),
        }
    }
}

impl BuildOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn directory(
        mut self,
        directory: impl Into<PathBuf>,
    ) -> Self {
        self.directory = Some(directory.into());
        self
    }

    pub fn results_directory(
        mut self,
        results_directory: impl Into<PathBuf>,
    ) -> Self {
        self.results_directory = results_directory.into();
        self
    }

    pub fn html_file(
        mut self,
        html_file: impl Into<PathBuf>,
    ) -> Self {
        self.html_file = Some(html_file.into());
        self
    }

    pub fn html_content(
        mut self,
        content: BTreeMap<String, String>,
    ) -> Self {
        self.html_content = Some(content);
        self
    }

    pub fn model_file(
        mut self,
        model_file: impl Into<PathBuf>,
    ) -> Self {
        self.model_file = Some(model_file.into());
        self
    }

    pub fn debug(
        mut self,
        debug: bool,
    ) -> Self {
        self.debug = debug;
        self
    }

    pub fn clean(
        mut self,
        clean: bool,
    ) -> Self {
        self.clean = clean;
        self
    }

    pub fn compile(
        mut self,
        compile: bool,
    ) -> Self {
        self.compile = compile;
        self
    }

    pub fn run(
        mut self,
        run: bool,
    ) -> Self {
        self.run = run;
        self
    }

    pub fn run_args(
        mut self,
        args: Vec<String>,
    ) -> Self {
        self.run_args = args;
        self
    }

    pub fn profile(
        mut self,
        profile: bool,
    ) -> Self {
        self.profile = profile;
        self
    }

    /// Check everything that can be checked without touching the disk
    pub fn validate(&self) -> DeviceResult<()> {
        if self.results_directory.is_absolute() {
            return Err(DeviceError::AbsoluteResultsDirectory(self.results_directory.clone()));
        }
        if let Some(content) = &self.html_content {
            HtmlContent::from_map(content)?;
        }
        Ok(())
    }
}

/// Options of a single `run()` call
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub report: Report,
    /// Seconds of wall-clock time between progress reports
    pub report_period: f64,
    /// Free variables; the device's local namespace when absent
    pub namespace: Option<Namespace>,
    /// Overrides `BuildOptions::profile` for this run
    pub profile: Option<bool>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            report: Report::None,
            report_period: 10.0,
            namespace: None,
            profile: None,
        }
    }
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(
        mut self,
        report: impl Into<Report>,
    ) -> Self {
        self.report = report.into();
        self
    }

    pub fn report_period(
        mut self,
        period: f64,
    ) -> Self {
        self.report_period = period;
        self
    }

    pub fn namespace(
        mut self,
        namespace: Namespace,
    ) -> Self {
        self.namespace = Some(namespace);
        self
    }

    pub fn profile(
        mut self,
        profile: bool,
    ) -> Self {
        self.profile = Some(profile);
        self
    }
}
