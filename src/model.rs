//! Model descriptions driven from the command line
//!
//! A model file is a JSON document listing clocks, networks, static arrays
//! and the runs to schedule, as exported by the code generator:
//!
//! ```json
//! {
//!   "clocks": [{"name": "defaultclock", "dt": 0.0001}],
//!   "networks": [{"name": "network", "objects": [
//!     {"name": "neurons", "clock": "defaultclock",
//!      "code_objects": [{"name": "neurons_stateupdater", "owner": "neurons", "clock": "defaultclock"}]}
//!   ]}],
//!   "runs": [{"network": "network", "duration": 1.0, "report": "text"}],
//!   "build": {"html_content": {"title": "Brunel"}}
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::device::clock::Clock;
use crate::device::network::Network;
use crate::device::options::{BuildOptions, Namespace, RunOptions};
use crate::device::queue::CodeSlot;
use crate::device::report::Report;
use crate::device::{BuildReport, Device};
use crate::error::{DeviceError, DeviceResult};
use crate::packaging::flags::UserFlags;

fn default_report_period() -> f64 {
    10.0
}

/// One scheduled run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSpec {
    pub network: String,
    pub duration: f64,
    /// `null`, `"text"`, `"stdout"`, `"stderr"` or callback code
    #[serde(default)]
    pub report: serde_json::Value,
    #[serde(default = "default_report_period")]
    pub report_period: f64,
    #[serde(default)]
    pub namespace: Option<Namespace>,
    #[serde(default)]
    pub profile: Option<bool>,
    /// Keys this version does not understand
    #[serde(flatten, skip_serializing)]
    pub unknown: BTreeMap<String, serde_json::Value>,
}

impl RunSpec {
    pub fn run_options(&self) -> DeviceResult<RunOptions> {
        for key in self.unknown.keys() {
            warn!("Ignoring unknown key '{}' in run of '{}'", key, self.network);
        }
        Ok(RunOptions {
            report: Report::from_value(&self.report)?,
            report_period: self.report_period,
            namespace: self.namespace.clone(),
            profile: self.profile,
        })
    }
}

/// A complete model description
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelScript {
    pub clocks: Vec<Clock>,
    pub networks: Vec<Network>,
    /// Static arrays of doubles, by name
    pub static_arrays: BTreeMap<String, Vec<f64>>,
    pub before_network_run: Vec<String>,
    pub after_network_run: Vec<String>,
    pub transfer_only: Option<Vec<String>>,
    pub flags: UserFlags,
    pub namespace: Namespace,
    pub runs: Vec<RunSpec>,
    pub build: BuildOptions,
}

impl ModelScript {
    pub fn from_json(text: &str) -> DeviceResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> DeviceResult<Self> {
        let text = fs::read_to_string(path)?;
        let script = Self::from_json(&text)?;
        debug!(
            "Loaded model {} ({} networks, {} runs)",
            path.display(),
            script.networks.len(),
            script.runs.len()
        );
        Ok(script)
    }

    /// Register everything on an activated device, schedule the runs in
    /// order and build with `options`.
    ///
    /// In build-on-run mode the first run builds; otherwise `build()` is
    /// called after the last run.
    pub fn apply(
        &self,
        device: &mut Device,
        options: BuildOptions,
    ) -> DeviceResult<Option<BuildReport>> {
        // Validate every run before touching the device
        let mut networks: IndexMap<String, Network> =
            self.networks.iter().map(|n| (n.name.clone(), n.clone())).collect();
        let runs = self
            .runs
            .iter()
            .map(|run| {
                if !networks.contains_key(&run.network) {
                    return Err(DeviceError::UnknownNetwork(run.network.clone()));
                }
                Ok((run, run.run_options()?))
            })
            .collect::<DeviceResult<Vec<_>>>()?;

        for clock in &self.clocks {
            device.declare_clock(clock.clone());
        }
        for (name, values) in &self.static_arrays {
            let data = values.iter().flat_map(|v| v.to_le_bytes()).collect();
            device.add_static_array(name.clone(), data)?;
        }
        for line in &self.before_network_run {
            device.insert_code(CodeSlot::BeforeNetworkRun, line.clone());
        }
        for line in &self.after_network_run {
            device.insert_code(CodeSlot::AfterNetworkRun, line.clone());
        }
        if let Some(names) = &self.transfer_only {
            device.transfer_only(names.iter().cloned())?;
        }
        let flags = &self.flags;
        flags.define_macros.iter().for_each(|m| device.define_macro(m.clone()));
        flags.include_dirs.iter().for_each(|d| device.include_dir(d.clone()));
        flags.library_dirs.iter().for_each(|d| device.library_dir(d.clone()));
        flags.libraries.iter().for_each(|l| device.library(l.clone()));
        flags.extra_compile_args.iter().for_each(|a| device.extra_compile_arg(a.clone()));
        flags.extra_link_args.iter().for_each(|a| device.extra_link_arg(a.clone()));
        device.set_local_namespace(self.namespace.clone());

        if device.build_on_run() {
            device.set_build_options(options);
            let mut report = None;
            for (run, opts) in runs {
                let network = networks
                    .get_mut(&run.network)
                    .ok_or_else(|| DeviceError::UnknownNetwork(run.network.clone()))?;
                report = device.run(network, run.duration, opts)?.or(report);
            }
            return Ok(report);
        }

        for (run, opts) in runs {
            let network = networks
                .get_mut(&run.network)
                .ok_or_else(|| DeviceError::UnknownNetwork(run.network.clone()))?;
            device.run(network, run.duration, opts)?;
        }
        device.build(options).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = r#"{
        "clocks": [{"name": "defaultclock", "dt": 0.0001}],
        "networks": [{"name": "network", "objects": [
            {"name": "neurons", "clock": "defaultclock",
             "code_objects": [{"name": "neurons_stateupdater", "owner": "neurons", "clock": "defaultclock"}]}
        ]}],
        "static_arrays": {"_static_array_w": [0.5, 1.5]},
        "runs": [
            {"network": "network", "duration": 0.5, "report": "text"},
            {"network": "network", "duration": 0.25}
        ],
        "build": {"html_content": {"title": "Brunel"}}
    }"#;

    #[test]
    fn test_parse_model() {
        let model = ModelScript::from_json(MODEL).unwrap();
        assert_eq!(model.networks[0].objects[0].code_objects[0].name, "neurons_stateupdater");
        assert_eq!(model.runs[1].report, serde_json::Value::Null);
        assert_eq!(model.runs[1].report_period, 10.0);
        assert!(model.runs[1].unknown.is_empty());
        assert_eq!(model.build.html_content.as_ref().unwrap()["title"], "Brunel");
        assert!(model.build.compile);
    }

    #[test]
    fn test_run_options_resolve_report() {
        let model = ModelScript::from_json(MODEL).unwrap();
        assert_eq!(model.runs[0].run_options().unwrap().report, Report::Stdout);
        let bad: RunSpec =
            serde_json::from_str(r#"{"network": "n", "duration": 1.0, "report": 3, "level": 2}"#).unwrap();
        assert!(bad.unknown.contains_key("level"));
        assert!(matches!(bad.run_options(), Err(DeviceError::InvalidReportKind(_))));
    }

    #[test]
    fn test_unknown_network_fails_before_scheduling() {
        let mut model = ModelScript::from_json(MODEL).unwrap();
        model.runs.push(RunSpec {
            network: "missing".to_string(),
            duration: 1.0,
            report: serde_json::Value::Null,
            report_period: 10.0,
            namespace: None,
            profile: None,
            unknown: BTreeMap::new(),
        });
        let mut device = Device::default().with_build_on_run(false);
        device.activate();
        let err = model.apply(&mut device, BuildOptions::new().compile(false)).unwrap_err();
        assert!(matches!(err, DeviceError::UnknownNetwork(name) if name == "missing"));
        assert!(device.main_queue().is_empty());
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(ModelScript::from_json("{"), Err(DeviceError::Model(_))));
    }
}
