//! WebAssembly toolchain (emsdk) location and invocation

use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::Instant;

use tracing::{debug, info};

use crate::error::{DeviceError, DeviceResult};
use crate::packaging::makefile::build_script_name;
use crate::util::config::Preferences;

/// Looks up an environment variable
pub type EnvLookup = fn(&str) -> Option<String>;

/// Reads the process environment
pub fn process_env(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Resolve the emsdk directory from preferences, then `EMSDK`, then
/// `CONDA_EMSDK_DIR`.
pub fn resolve_emsdk(prefs: &Preferences) -> DeviceResult<PathBuf> {
    resolve_emsdk_with(prefs, process_env)
}

/// [`resolve_emsdk`] with an injectable environment lookup
pub fn resolve_emsdk_with(
    prefs: &Preferences,
    lookup: impl Fn(&str) -> Option<String>,
) -> DeviceResult<PathBuf> {
    if let Some(dir) = &prefs.wasm_standalone.emsdk_directory {
        if !dir.as_os_str().is_empty() {
            return Ok(dir.clone());
        }
    }
    ["EMSDK", "CONDA_EMSDK_DIR"]
        .iter()
        .filter_map(|key| lookup(key))
        .find(|value| !value.is_empty())
        .map(PathBuf::from)
        .ok_or(DeviceError::ToolchainNotFound)
}

/// Elapsed seconds of the compile stages
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CompileTimes {
    pub clean: Option<f64>,
    pub make: Option<f64>,
}

fn describe(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|s| s.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run a command to completion, capturing its output. A non-zero exit is a
/// [`DeviceError::CompileFailed`] carrying stdout and stderr.
pub fn run_captured(mut cmd: Command) -> DeviceResult<Output> {
    let command = describe(&cmd);
    debug!("Running '{}'", command);
    let output = cmd
        .output()
        .map_err(|source| DeviceError::ToolchainSpawn {
            command: command.clone(),
            source,
        })?;
    if !output.status.success() {
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        return Err(DeviceError::CompileFailed {
            command,
            status: output.status.to_string(),
            output: text.trim().to_string(),
        });
    }
    Ok(output)
}

fn make_command(
    directory: &Path,
    target: Option<&str>,
) -> Command {
    let mut cmd = if cfg!(windows) {
        let mut cmd = Command::new("nmake");
        cmd.arg("/f").arg(build_script_name());
        cmd
    } else {
        Command::new("make")
    };
    if let Some(target) = target {
        cmd.arg(target);
    }
    cmd.current_dir(directory);
    cmd
}

/// Compile the build directory with its generated build script
pub fn compile(
    directory: &Path,
    clean: bool,
) -> DeviceResult<CompileTimes> {
    let mut times = CompileTimes::default();
    if clean {
        let start = Instant::now();
        // `clean` fails on a fresh directory; that is not an error
        let _ = make_command(directory, Some("clean")).output();
        times.clean = Some(start.elapsed().as_secs_f64());
    }
    let start = Instant::now();
    run_captured(make_command(directory, None))?;
    times.make = Some(start.elapsed().as_secs_f64());
    info!("Compiled {} in {:.2}s", directory.display(), times.make.unwrap_or_default());
    Ok(times)
}

/// Locate an executable on `PATH`
pub fn which(program: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    let candidates: Vec<String> = if cfg!(windows) {
        vec![format!("{}.exe", program), format!("{}.bat", program), program.to_string()]
    } else {
        vec![program.to_string()]
    };
    env::split_paths(&path)
        .flat_map(|dir| candidates.iter().map(move |c| dir.join(c)))
        .find(|p| p.is_file())
}

/// State of the local emsdk installation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolchainReport {
    pub emsdk: Option<PathBuf>,
    pub conda_emsdk_dir: Option<PathBuf>,
    pub upstream_installed: bool,
    pub emcc: Option<PathBuf>,
    pub emrun: Option<PathBuf>,
}

impl ToolchainReport {
    /// Inspect the current environment
    pub fn inspect() -> Self {
        let conda_emsdk_dir = env::var_os("CONDA_EMSDK_DIR").map(PathBuf::from);
        let emsdk_dir = conda_emsdk_dir
            .clone()
            .or_else(|| env::var_os("EMSDK").map(PathBuf::from));
        Self {
            emsdk: which("emsdk"),
            upstream_installed: emsdk_dir
                .as_deref()
                .map(|d| d.join("upstream").is_dir())
                .unwrap_or(false),
            conda_emsdk_dir,
            emcc: which("emcc"),
            emrun: which("emrun"),
        }
    }

    /// emsdk is installed at all
    pub fn installed(&self) -> bool {
        self.emsdk.is_some() || self.conda_emsdk_dir.is_some()
    }

    /// emcc and emrun are reachable
    pub fn sourced(&self) -> bool {
        self.emcc.is_some() && self.emrun.is_some()
    }

    pub fn is_ready(&self) -> bool {
        self.installed() && self.upstream_installed && self.sourced()
    }

    /// Command the user has to run to put the toolchain on `PATH`
    pub fn activation_hint(&self) -> String {
        let dir = self
            .conda_emsdk_dir
            .as_deref()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| "<emsdk>".to_string());
        if cfg!(windows) {
            format!("{}\\emsdk_env.bat", dir)
        } else {
            format!("source {}/emsdk_env.sh", dir)
        }
    }
}
