//! Device error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while scheduling runs, packaging, compiling or
/// launching a WebAssembly simulation.
#[derive(Debug, Error)]
pub enum DeviceError {
    // ------------------------------------------------------------------
    // Validation errors
    // ------------------------------------------------------------------
    /// `run` was called with a negative or non-finite duration
    #[error("Function 'run' expected a finite, non-negative duration but got '{0}'")]
    NegativeDuration(f64),

    /// `results_directory` must be relative to the build directory
    #[error("The 'results_directory' argument needs to be a relative path but was '{0}'.")]
    AbsoluteResultsDirectory(PathBuf),

    /// Unrecognized key in the HTML content map
    #[error("Key '{key}' is not a valid key for html_content. Allowed keys: {allowed}")]
    UnknownHtmlKey { key: String, allowed: String },

    /// The report argument is neither a known kind nor callback code
    #[error(
        "report argument has to be either 'text', 'stdout', 'stderr', or the code for a \
         report function (got {0})"
    )]
    InvalidReportKind(String),

    /// Two objects across the registered networks share a name
    #[error("Duplicate object names: {}", format_names(.0))]
    DuplicateObjectNames(Vec<String>),

    /// Two static arrays were registered under the same name
    #[error("Static array '{0}' is already registered")]
    DuplicateStaticArray(String),

    // ------------------------------------------------------------------
    // State errors
    // ------------------------------------------------------------------
    /// `run`/`build` before `activate`
    #[error("The device has not been activated. Call 'activate()' before 'run()' or 'build()'.")]
    NotActivated,

    /// The device was already built in this lifetime
    #[error(
        "The network has already been built and run before. To build several simulations in \
         the same script, call 'reinit()' and 'activate()'. Note that you will have to set \
         build options (e.g. the directory) again."
    )]
    AlreadyBuilt,

    /// An explicit build call while build-on-run is enabled
    #[error(
        "The device is configured with build_on_run=true (the default), which will \
         automatically build the simulation at the first encountered run call - do not call \
         'build()' manually in this case. If you want to call it manually, e.g. because you \
         have multiple run calls, configure the device with build_on_run=false."
    )]
    BuildOnRunDirectCall,

    /// A second, different report function in the same build
    #[error(
        "The WASM standalone device does not support multiple report functions, each run has \
         to use the same (or none)."
    )]
    ReportFunctionMismatch,

    /// `transfer_only` may only be configured once per build
    #[error("The variables to transfer back to the page have already been set")]
    TransferAlreadySet,

    // ------------------------------------------------------------------
    // Toolchain errors
    // ------------------------------------------------------------------
    /// No emsdk location could be resolved
    #[error(
        "Please provide the path to the EMSDK directory in the preferences \
         (wasm_standalone.emsdk_directory) or set the EMSDK environment variable."
    )]
    ToolchainNotFound,

    /// The toolchain could not be started
    #[error("Failed to execute '{command}': {source}")]
    ToolchainSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The toolchain exited with a non-zero status
    #[error("'{command}' failed ({status}):\n{output}")]
    CompileFailed {
        command: String,
        status: String,
        output: String,
    },

    // ------------------------------------------------------------------
    // Launch errors
    // ------------------------------------------------------------------
    /// The preview command could not be run
    #[error(
        "Failed to run '{command}'. Please ensure that emrun is installed and available in \
         your PATH: {source}"
    )]
    LaunchFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model description could not be parsed
    #[error("Invalid model description: {0}")]
    Model(#[from] serde_json::Error),

    /// A run in the model description names a network that was not declared
    #[error("Run refers to unknown network '{0}'")]
    UnknownNetwork(String),
}

fn format_names(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("'{}'", n))
        .collect::<Vec<_>>()
        .join(", ")
}

impl DeviceError {
    /// Validation errors are raised before anything is written to disk.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DeviceError::NegativeDuration(_)
                | DeviceError::AbsoluteResultsDirectory(_)
                | DeviceError::UnknownHtmlKey { .. }
                | DeviceError::InvalidReportKind(_)
                | DeviceError::DuplicateObjectNames(_)
                | DeviceError::DuplicateStaticArray(_)
                | DeviceError::UnknownNetwork(_)
        )
    }

    /// State errors point at a misuse of the activate/run/build/reinit discipline.
    pub fn is_state(&self) -> bool {
        matches!(
            self,
            DeviceError::NotActivated
                | DeviceError::AlreadyBuilt
                | DeviceError::BuildOnRunDirectCall
                | DeviceError::ReportFunctionMismatch
                | DeviceError::TransferAlreadySet
        )
    }
}

/// Result type for device operations
pub type DeviceResult<T> = Result<T, DeviceError>;
