//! Source and asset packaging
//!
//! [`SourceWriter`] writes generated files into the build directory and keeps
//! track of which of them have to be compiled (sources) or are only included
//! (headers). Both sets feed the build script.

pub mod flags;
pub mod makefile;
pub mod static_arrays;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::DeviceResult;
use crate::template::GeneratedSource;

/// Extension the WebAssembly toolchain compiles with the full C++ flag set
pub const WASM_SOURCE_EXT: &str = "cpp";

/// Map a native source name to the name it gets inside the build directory.
///
/// Plain C sources are relabeled as C++ so that the toolchain applies the
/// same flags to them as to the generated sources. Content is not touched.
pub fn wasm_source_name(name: &str) -> String {
    match name.strip_suffix(".c") {
        Some(stem) => format!("{}.{}", stem, WASM_SOURCE_EXT),
        None => name.to_string(),
    }
}

fn is_source(name: &str) -> bool {
    name.ends_with(".cpp") || name.ends_with(".c")
}

fn is_header(name: &str) -> bool {
    name.ends_with(".h") || name.ends_with(".hpp")
}

/// Writes generated files into a build directory
#[derive(Debug)]
pub struct SourceWriter {
    directory: PathBuf,
    source_files: BTreeSet<String>,
    header_files: BTreeSet<String>,
    skipped: usize,
}

impl SourceWriter {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            source_files: BTreeSet::new(),
            header_files: BTreeSet::new(),
            skipped: 0,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Write generated code.
    ///
    /// A name ending in `.*` writes `<stem>.cpp` and, if present, `<stem>.h`;
    /// any other name is written as given (with `.c` relabeled).
    pub fn write(
        &mut self,
        name: &str,
        source: &GeneratedSource,
    ) -> DeviceResult<()> {
        match name.strip_suffix(".*") {
            Some(stem) => {
                self.write_file(&format!("{}.{}", stem, WASM_SOURCE_EXT), &source.cpp)?;
                if let Some(h) = &source.h {
                    self.write_file(&format!("{}.h", stem), h)?;
                }
            }
            None => {
                self.write_file(&wasm_source_name(name), &source.cpp)?;
            }
        }
        Ok(())
    }

    /// Write a non-compiled file (build script, page, scripts)
    pub fn write_text(
        &mut self,
        name: &str,
        content: &str,
    ) -> DeviceResult<PathBuf> {
        let path = self.directory.join(name);
        write_if_changed(&path, content.as_bytes(), &mut self.skipped)?;
        Ok(path)
    }

    fn write_file(
        &mut self,
        name: &str,
        content: &str,
    ) -> DeviceResult<()> {
        let path = self.directory.join(name);
        write_if_changed(&path, content.as_bytes(), &mut self.skipped)?;
        self.register(name);
        Ok(())
    }

    fn register(
        &mut self,
        name: &str,
    ) {
        if is_source(name) {
            self.source_files.insert(name.to_string());
        } else if is_header(name) {
            self.header_files.insert(name.to_string());
        }
    }

    /// Copy a directory of native sources into `<build>/<dest>`, relabeling
    /// C sources and registering sources and headers.
    pub fn copy_directory(
        &mut self,
        src: &Path,
        dest: &str,
    ) -> DeviceResult<()> {
        for entry in WalkDir::new(src).sort_by_file_name() {
            let entry = entry.map_err(|e| std::io::Error::other(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(src)
                .map_err(|e| std::io::Error::other(e.to_string()))?;
            let rel = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            let name = wasm_source_name(&format!("{}/{}", dest, rel));
            let content = fs::read(entry.path())?;
            write_if_changed(&self.directory.join(&name), &content, &mut self.skipped)?;
            self.register(&name);
        }
        Ok(())
    }

    /// Add sources that are compiled but not written by this writer.
    /// They are referenced in place, so their names are kept as given.
    pub fn add_sources<I, S>(
        &mut self,
        sources: I,
    ) where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for source in sources {
            self.source_files.insert(source.as_ref().to_string());
        }
    }

    /// Sorted source files
    pub fn source_files(&self) -> impl Iterator<Item = &str> + Clone {
        self.source_files.iter().map(String::as_str)
    }

    /// Sorted header files
    pub fn header_files(&self) -> impl Iterator<Item = &str> + Clone {
        self.header_files.iter().map(String::as_str)
    }

    /// Number of writes skipped because content was unchanged
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Write a file unless it already holds exactly `content`, so the
/// toolchain does not recompile untouched sources.
fn write_if_changed(
    path: &Path,
    content: &[u8],
    skipped: &mut usize,
) -> DeviceResult<()> {
    if let Ok(existing) = fs::read(path) {
        if existing == content {
            *skipped += 1;
            return Ok(());
        }
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    debug!("Wrote {}", path.display());
    Ok(())
}
