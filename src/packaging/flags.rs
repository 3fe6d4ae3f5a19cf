//! Compiler and linker flag assembly

use serde::{Deserialize, Serialize};

use crate::device::network::{CodeObject, Macro};
use crate::util::config::Preferences;

/// Flags and directories registered directly on the device
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserFlags {
    #[serde(default)]
    pub define_macros: Vec<Macro>,
    #[serde(default)]
    pub include_dirs: Vec<String>,
    #[serde(default)]
    pub library_dirs: Vec<String>,
    #[serde(default)]
    pub libraries: Vec<String>,
    #[serde(default)]
    pub extra_compile_args: Vec<String>,
    #[serde(default)]
    pub extra_link_args: Vec<String>,
}

/// Final compiler and linker flags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildFlags {
    pub compiler: Vec<String>,
    pub linker: Vec<String>,
}

impl BuildFlags {
    /// Combine, in order: device registrations, preferences, and the
    /// requirements of every code object.
    pub fn assemble<'a>(
        user: &UserFlags,
        prefs: &Preferences,
        code_objects: impl IntoIterator<Item = &'a CodeObject> + Clone,
    ) -> Self {
        let wasm = &prefs.wasm_standalone;
        let codegen = &prefs.codegen;

        let mut compiler: Vec<String> = user
            .extra_compile_args
            .iter()
            .chain(&wasm.emcc_compile_args)
            .cloned()
            .collect();
        compiler.extend(
            user.define_macros
                .iter()
                .chain(&codegen.define_macros)
                .chain(code_objects.clone().into_iter().flat_map(|c| &c.compiler_kwds.define_macros))
                .map(Macro::to_flag),
        );
        compiler.extend(
            user.include_dirs
                .iter()
                .chain(&codegen.include_dirs)
                .chain(code_objects.clone().into_iter().flat_map(|c| &c.compiler_kwds.include_dirs))
                .map(|d| format!("-I{}", d)),
        );

        let mut linker: Vec<String> = user
            .extra_link_args
            .iter()
            .chain(&wasm.emcc_link_args)
            .cloned()
            .collect();
        linker.extend(
            user.library_dirs
                .iter()
                .chain(&codegen.library_dirs)
                .chain(code_objects.clone().into_iter().flat_map(|c| &c.compiler_kwds.library_dirs))
                .map(|d| format!("-L{}", d)),
        );
        linker.extend(
            user.libraries
                .iter()
                .chain(&codegen.libraries)
                .chain(code_objects.into_iter().flat_map(|c| &c.compiler_kwds.libraries))
                .map(|l| format!("-l{}", l)),
        );

        Self { compiler, linker }
    }
}

/// Additional source files declared by code objects
pub fn additional_sources<'a>(code_objects: impl IntoIterator<Item = &'a CodeObject>) -> Vec<String> {
    code_objects
        .into_iter()
        .flat_map(|c| c.compiler_kwds.sources.iter().cloned())
        .collect()
}
