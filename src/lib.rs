//! Brian2WASM device
//!
//! Turns a sequence of simulation runs into a deployable browser artifact:
//! a build directory with generated sources, static data and an HTML/JS
//! harness, compiled to WebAssembly with emsdk and previewed with emrun.
//!
//! # Example
//!
//! ```no_run
//! use brian2wasm::device::network::{Network, NetworkObject};
//! use brian2wasm::util::config::load_preferences;
//! use brian2wasm::{BuildOptions, Device, RunOptions, Result};
//! use std::path::Path;
//!
//! fn main() -> Result<()> {
//!     let prefs = load_preferences(Path::new("."))?;
//!     let mut device = Device::new(prefs).with_build_on_run(false);
//!     device.activate();
//!
//!     let mut net = Network::new("network")
//!         .with_object(NetworkObject::new("neurons", "defaultclock").with_code_object("neurons_stateupdater"));
//!     device.run(&mut net, 1.0, RunOptions::new().report("text"))?;
//!     device.build(BuildOptions::new().directory("output"))?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/brian2wasm")]
#![warn(rust_2018_idioms)]

pub mod bridge;
pub mod device;
pub mod error;
pub mod launch;
pub mod model;
pub mod packaging;
pub mod template;
pub mod toolchain;

// Utility modules
pub mod util;

// Re-exports
pub use anyhow::{Context, Result};
pub use device::options::{BuildOptions, RunOptions};
pub use device::{BuildReport, Device, DeviceState};
pub use error::{DeviceError, DeviceResult};
pub use util::config::Preferences;

use std::path::Path;
use tracing::debug;

use crate::model::ModelScript;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = "brian2wasm";

/// Build a model file.
///
/// Preferences are loaded from the user config and from `brian2wasm.toml`
/// next to the model. `configure` may adjust the model's build options; the
/// model file itself is always recorded so a same-named `.html` page beside
/// it is picked up.
pub fn build_file(
    path: &Path,
    configure: impl FnOnce(&mut BuildOptions),
) -> Result<Option<BuildReport>> {
    debug!("Building model {}", path.display());
    let script = ModelScript::load(path).with_context(|| format!("Failed to load model: {}", path.display()))?;
    let project_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let prefs = util::config::load_preferences(project_dir).context("Failed to load preferences")?;

    let mut options = script.build.clone();
    configure(&mut options);
    options.model_file = Some(path.to_path_buf());

    let mut device = Device::new(prefs).with_build_on_run(false);
    device.activate();
    let report = script
        .apply(&mut device, options)
        .with_context(|| format!("Failed to build: {}", path.display()))?;
    Ok(report)
}
