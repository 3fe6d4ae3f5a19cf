//! Launch controller: entry page resolution and local preview

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use tracing::{debug, info};

use crate::error::{DeviceError, DeviceResult};
use crate::template::assets::INDEX_HTML;
use crate::template::{HtmlContent, Templater};

/// Environment variable that suppresses the preview server
pub const NO_SERVER_ENV: &str = "BRIAN2WASM_NO_SERVER";

/// Where the entry page of a build comes from
#[derive(Debug, Clone, PartialEq)]
pub enum EntryPage {
    /// Page supplied explicitly by the caller
    UserFile(PathBuf),
    /// Page with the same stem as the model file, found next to it
    Sibling(PathBuf),
    /// Page rendered from the built-in template
    Synthesized(HtmlContent),
}

impl EntryPage {
    /// Pick the entry page.
    ///
    /// An explicit file wins, then `<model stem>.html` beside the model file,
    /// then a page synthesized from `html_content` (validated, defaults filled in).
    pub fn resolve(
        html_file: Option<&Path>,
        model_file: Option<&Path>,
        html_content: Option<&BTreeMap<String, String>>,
    ) -> DeviceResult<Self> {
        if let Some(file) = html_file {
            return Ok(EntryPage::UserFile(file.to_path_buf()));
        }
        if let Some(model) = model_file {
            let sibling = model.with_extension("html");
            if sibling.is_file() {
                return Ok(EntryPage::Sibling(sibling));
            }
        }
        let content = match html_content {
            Some(map) => HtmlContent::from_map(map)?,
            None => HtmlContent::default(),
        };
        Ok(EntryPage::Synthesized(content))
    }

    /// Put the page into the build directory as `index.html`
    pub fn install(
        &self,
        directory: &Path,
        templater: &dyn Templater,
    ) -> DeviceResult<PathBuf> {
        let target = directory.join(INDEX_HTML);
        match self {
            EntryPage::UserFile(src) | EntryPage::Sibling(src) => {
                fs::copy(src, &target)?;
                debug!("Copied entry page {} to {}", src.display(), target.display());
            }
            EntryPage::Synthesized(content) => {
                fs::write(&target, templater.html_page(content))?;
                debug!("Synthesized entry page {}", target.display());
            }
        }
        Ok(target)
    }
}

/// Result of a launch request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LaunchOutcome {
    /// Launch suppressed; the build directory is ready for external use
    Skipped,
    /// Preview ran to completion after `elapsed` seconds
    Completed { elapsed: f64 },
}

/// Whether the environment asks to skip launching
pub fn skip_launch_requested() -> bool {
    std::env::var(NO_SERVER_ENV).map(|v| v == "1").unwrap_or(false)
}

/// Single-quote `word` for `bash -c`
fn shell_quote(word: &str) -> String {
    if !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-=:,+@".contains(c))
    {
        return word.to_string();
    }
    format!("'{}'", word.replace('\'', "'\\''"))
}

/// Serves and opens a built directory with `emrun`
#[derive(Debug, Clone, Default)]
pub struct LaunchController {
    emsdk_directory: Option<PathBuf>,
    run_args: Vec<String>,
    skip: bool,
}

impl LaunchController {
    pub fn new(
        emsdk_directory: Option<PathBuf>,
        run_args: Vec<String>,
    ) -> Self {
        Self {
            emsdk_directory,
            run_args,
            skip: skip_launch_requested(),
        }
    }

    /// Force (or cancel) skipping regardless of the environment
    pub fn skip(
        mut self,
        skip: bool,
    ) -> Self {
        self.skip = skip;
        self
    }

    /// The preview command for this platform and configuration
    pub fn command(
        &self,
        directory: &Path,
    ) -> Command {
        let mut cmd = if cfg!(windows) {
            let mut cmd = Command::new("emrun");
            cmd.arg(INDEX_HTML).args(&self.run_args);
            cmd
        } else if let Some(emsdk) = &self.emsdk_directory {
            let env_script = emsdk.join("emsdk_env.sh");
            let mut line = format!(
                "source {} && emrun {}",
                shell_quote(&env_script.to_string_lossy()),
                INDEX_HTML
            );
            for arg in &self.run_args {
                line.push(' ');
                line.push_str(&shell_quote(arg));
            }
            let mut cmd = Command::new("/bin/bash");
            cmd.arg("-c").arg(line);
            cmd
        } else {
            let mut cmd = Command::new("emrun");
            cmd.arg(INDEX_HTML).args(&self.run_args);
            cmd
        };
        cmd.current_dir(directory);
        cmd
    }

    /// Launch synchronously and record the wall-clock time
    pub fn launch(
        &self,
        directory: &Path,
    ) -> DeviceResult<LaunchOutcome> {
        if self.skip {
            info!("Skipping server startup (--no-server flag set)");
            return Ok(LaunchOutcome::Skipped);
        }
        let mut cmd = self.command(directory);
        let command = format!("{:?}", cmd);
        let start = Instant::now();
        let status = cmd.status().map_err(|source| DeviceError::LaunchFailed {
            command: command.clone(),
            source,
        })?;
        // bash reports a missing emrun as 127
        if status.code() == Some(127) {
            return Err(DeviceError::LaunchFailed {
                command,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "emrun: command not found"),
            });
        }
        let elapsed = start.elapsed().as_secs_f64();
        debug!("Preview exited with {} after {:.2}s", status, elapsed);
        Ok(LaunchOutcome::Completed { elapsed })
    }
}
