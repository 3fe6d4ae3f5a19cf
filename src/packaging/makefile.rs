//! Build script inputs

use std::path::Path;

/// Command run by the `clean` target
pub const RM_CMD: &str = "rm $(OBJS) $(PROGRAM) $(DEPS)";

/// Name of the generated build script on this platform
pub fn build_script_name() -> &'static str {
    if cfg!(windows) {
        "win_makefile"
    } else {
        "makefile"
    }
}

/// Compiler and linker debug flags selected by the `debug` option
pub fn debug_flags(debug: bool) -> (&'static str, &'static str) {
    if debug {
        ("-g -DDEBUG", "-g")
    } else {
        ("", "")
    }
}

/// Everything the build script template receives
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MakefileSpec {
    pub source_files: String,
    pub header_files: String,
    pub compiler_flags: String,
    pub linker_flags: String,
    pub compiler_debug_flags: String,
    pub linker_debug_flags: String,
    pub preloads: String,
    pub preamble_file: String,
    pub library_file: String,
    pub rm_cmd: String,
    pub emsdk_path: String,
    pub emsdk_version: String,
}

impl MakefileSpec {
    /// Assemble the spec. Source and header lists are sorted and
    /// deduplicated so the script is byte-identical for identical inputs.
    #[allow(clippy::too_many_arguments)]
    pub fn new<'a>(
        source_files: impl IntoIterator<Item = &'a str>,
        header_files: impl IntoIterator<Item = &'a str>,
        compiler_flags: &[String],
        linker_flags: &[String],
        debug: bool,
        preloads: String,
        preamble_file: &Path,
        library_file: &Path,
        emsdk_path: &Path,
        emsdk_version: &str,
    ) -> Self {
        let (compiler_dbg, linker_dbg) = debug_flags(debug);
        Self {
            source_files: sorted_join(source_files),
            header_files: sorted_join(header_files),
            compiler_flags: compiler_flags.join(" "),
            linker_flags: linker_flags.join(" "),
            compiler_debug_flags: compiler_dbg.to_string(),
            linker_debug_flags: linker_dbg.to_string(),
            preloads,
            preamble_file: preamble_file.display().to_string(),
            library_file: library_file.display().to_string(),
            rm_cmd: RM_CMD.to_string(),
            emsdk_path: emsdk_path.display().to_string(),
            emsdk_version: emsdk_version.to_string(),
        }
    }
}

fn sorted_join<'a>(files: impl IntoIterator<Item = &'a str>) -> String {
    let mut files: Vec<&str> = files.into_iter().collect();
    files.sort_unstable();
    files.dedup();
    files.join(" ")
}
