//! Brian2WASM preferences
//!
//! Supports user-level and project-level configuration with merge semantics.
//!
//! # Configuration hierarchy
//!
//! ```text
//! Priority (high → low):
//! 1. Environment variables (BRIAN2WASM_EMSDK_DIRECTORY, BRIAN2WASM_EMSDK_VERSION)
//! 2. Project-level (brian2wasm.toml)
//! 3. User-level (~/.config/brian2wasm/config.toml)
//! 4. Default values
//! ```
//!
//! # Usage
//!
//! ```rust
//! use brian2wasm::util::config::load_preferences;
//!
//! let prefs = load_preferences(std::path::Path::new(".")).unwrap();
//! assert!(!prefs.wasm_standalone.emsdk_version.is_empty());
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::device::network::Macro;

/// Project-level preferences file name
pub const PROJECT_CONFIG_FILE: &str = "brian2wasm.toml";

/// Environment variable overriding `wasm_standalone.emsdk_directory`
pub const ENV_EMSDK_DIRECTORY: &str = "BRIAN2WASM_EMSDK_DIRECTORY";

/// Environment variable overriding `wasm_standalone.emsdk_version`
pub const ENV_EMSDK_VERSION: &str = "BRIAN2WASM_EMSDK_VERSION";

/// All preferences consulted by the device
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Preferences {
    /// Preferences for the WebAssembly backend
    #[serde(default)]
    pub wasm_standalone: WasmStandalonePrefs,
    /// Generic code generation settings shared with the native backend
    #[serde(default)]
    pub codegen: CodegenPrefs,
}

/// `[wasm_standalone]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WasmStandalonePrefs {
    /// Path to the emsdk directory, containing the emsdk binary
    #[serde(default)]
    pub emsdk_directory: Option<PathBuf>,
    /// Version of the emsdk to use
    #[serde(default = "default_emsdk_version")]
    pub emsdk_version: String,
    /// Extra flags appended to every emcc compile command
    #[serde(default = "default_compile_args")]
    pub emcc_compile_args: Vec<String>,
    /// Extra flags passed at link time
    #[serde(default)]
    pub emcc_link_args: Vec<String>,
}

fn default_emsdk_version() -> String {
    "latest".to_string()
}

fn default_compile_args() -> Vec<String> {
    vec!["-w".to_string()]
}

impl Default for WasmStandalonePrefs {
    fn default() -> Self {
        Self {
            emsdk_directory: None,
            emsdk_version: default_emsdk_version(),
            emcc_compile_args: default_compile_args(),
            emcc_link_args: Vec::new(),
        }
    }
}

/// `[codegen]` section
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CodegenPrefs {
    /// Headers included by every generated source file
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub define_macros: Vec<Macro>,
    #[serde(default)]
    pub include_dirs: Vec<String>,
    #[serde(default)]
    pub library_dirs: Vec<String>,
    #[serde(default)]
    pub libraries: Vec<String>,
}

/// Partial preferences as read from a single file; absent keys keep the
/// value of the lower-priority layer.
#[derive(Debug, Clone, Deserialize, Default)]
struct PreferencesLayer {
    #[serde(default)]
    wasm_standalone: WasmStandaloneLayer,
    #[serde(default)]
    codegen: CodegenLayer,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct WasmStandaloneLayer {
    emsdk_directory: Option<PathBuf>,
    emsdk_version: Option<String>,
    emcc_compile_args: Option<Vec<String>>,
    emcc_link_args: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct CodegenLayer {
    headers: Option<Vec<String>>,
    define_macros: Option<Vec<Macro>>,
    include_dirs: Option<Vec<String>>,
    library_dirs: Option<Vec<String>>,
    libraries: Option<Vec<String>>,
}

impl Preferences {
    fn apply(
        &mut self,
        layer: PreferencesLayer,
    ) {
        let wasm = layer.wasm_standalone;
        if wasm.emsdk_directory.is_some() {
            self.wasm_standalone.emsdk_directory = wasm.emsdk_directory;
        }
        if let Some(version) = wasm.emsdk_version {
            self.wasm_standalone.emsdk_version = version;
        }
        if let Some(args) = wasm.emcc_compile_args {
            self.wasm_standalone.emcc_compile_args = args;
        }
        if let Some(args) = wasm.emcc_link_args {
            self.wasm_standalone.emcc_link_args = args;
        }

        let codegen = layer.codegen;
        if let Some(v) = codegen.headers {
            self.codegen.headers = v;
        }
        if let Some(v) = codegen.define_macros {
            self.codegen.define_macros = v;
        }
        if let Some(v) = codegen.include_dirs {
            self.codegen.include_dirs = v;
        }
        if let Some(v) = codegen.library_dirs {
            self.codegen.library_dirs = v;
        }
        if let Some(v) = codegen.libraries {
            self.codegen.libraries = v;
        }
    }

    /// Merge a TOML document on top of these preferences
    pub fn merge_toml(
        &mut self,
        content: &str,
    ) -> Result<(), ConfigError> {
        let layer: PreferencesLayer = toml::from_str(content).map_err(ConfigError::ParseError)?;
        self.apply(layer);
        Ok(())
    }

    fn merge_file(
        &mut self,
        path: &Path,
    ) -> Result<(), ConfigError> {
        if !path.exists() {
            return Ok(());
        }
        let content = fs::read_to_string(path).map_err(ConfigError::IoError)?;
        self.merge_toml(&content)
    }

    /// Apply environment variable overrides
    pub fn merge_env(&mut self) {
        if let Ok(dir) = std::env::var(ENV_EMSDK_DIRECTORY) {
            if !dir.is_empty() {
                self.wasm_standalone.emsdk_directory = Some(PathBuf::from(dir));
            }
        }
        if let Ok(version) = std::env::var(ENV_EMSDK_VERSION) {
            if !version.is_empty() {
                self.wasm_standalone.emsdk_version = version;
            }
        }
    }

    /// Add a header to `codegen.headers` unless already present
    pub fn ensure_header(
        &mut self,
        header: &str,
    ) -> bool {
        if self.codegen.headers.iter().any(|h| h == header) {
            return false;
        }
        self.codegen.headers.push(header.to_string());
        true
    }
}

/// Get the user config directory
pub fn get_config_dir() -> Option<PathBuf> {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config).join("brian2wasm"));
    }

    if let Ok(home) = std::env::var("HOME") {
        return Some(PathBuf::from(home).join(".config").join("brian2wasm"));
    }

    if let Ok(appdata) = std::env::var("APPDATA") {
        return Some(PathBuf::from(appdata).join("brian2wasm"));
    }

    None
}

/// Get the user config file path (~/.config/brian2wasm/config.toml)
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join("config.toml"))
}

/// Load preferences for a project directory.
/// Missing files fall back to defaults.
pub fn load_preferences(project_dir: &Path) -> Result<Preferences, ConfigError> {
    let mut prefs = Preferences::default();
    if let Some(user) = get_config_path() {
        prefs.merge_file(&user)?;
    }
    prefs.merge_file(&project_dir.join(PROJECT_CONFIG_FILE))?;
    prefs.merge_env();
    Ok(prefs)
}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    ParseError(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::ParseError(e) => write!(f, "Config parse error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for crate::error::DeviceError {
    fn from(e: ConfigError) -> Self {
        crate::error::DeviceError::Config(e.to_string())
    }
}
