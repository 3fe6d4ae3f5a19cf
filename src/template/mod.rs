//! Template rendering interface
//!
//! Turning device state into source text is the job of a template engine
//! supplied by the host framework. The device only talks to it through the
//! [`Templater`] trait; [`DefaultTemplater`] is a small built-in engine that
//! produces a self-contained program skeleton.

pub mod assets;
mod default;
pub mod html;

pub use default::DefaultTemplater;
pub use html::HtmlContent;

use serde::{Deserialize, Serialize};

use crate::device::clock::ClockRegistry;
use crate::device::network::{CodeObject, Network};
use crate::device::options::Namespace;
use crate::packaging::makefile::MakefileSpec;

/// A generated implementation file and its optional header
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneratedSource {
    pub cpp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h: Option<String>,
}

impl GeneratedSource {
    pub fn new(cpp: impl Into<String>) -> Self {
        Self {
            cpp: cpp.into(),
            h: None,
        }
    }

    pub fn with_header(
        mut self,
        h: impl Into<String>,
    ) -> Self {
        self.h = Some(h.into());
        self
    }
}

/// Everything the objects template may reference
#[derive(Debug)]
pub struct ObjectsContext<'a> {
    pub clocks: &'a ClockRegistry,
    pub networks: Vec<&'a Network>,
    pub synapses: &'a [String],
    pub static_arrays: Vec<&'a str>,
    pub code_objects: Vec<&'a CodeObject>,
    pub headers: &'a [String],
    pub profiled: bool,
    pub transfer_results: Option<&'a [String]>,
    pub results_dir: &'a str,
    /// Free variables resolved by the runs
    pub namespace: &'a Namespace,
}

/// Input of the main program template
#[derive(Debug)]
pub struct MainContext<'a> {
    pub main_lines: Vec<&'a str>,
    pub report_func: &'a str,
    pub headers: &'a [String],
    pub code_objects: Vec<&'a CodeObject>,
    pub networks: Vec<&'a Network>,
}

/// Template engine supplied by the host framework
pub trait Templater {
    /// Shared objects (arrays, clocks, networks)
    fn objects(
        &self,
        ctx: &ObjectsContext<'_>,
    ) -> GeneratedSource;

    /// Main program, unrolled from the deferred execution queue
    fn main(
        &self,
        ctx: &MainContext<'_>,
    ) -> GeneratedSource;

    /// Source of a single code object
    fn code_object(
        &self,
        codeobj: &CodeObject,
    ) -> GeneratedSource {
        codeobj.source.clone()
    }

    /// Network class used to drive clocks
    fn network(
        &self,
        clocks: &ClockRegistry,
    ) -> GeneratedSource;

    /// Synapse container classes
    fn synapses_classes(
        &self,
        synapses: &[String],
    ) -> GeneratedSource;

    /// Start/end routines of the simulation
    fn run(
        &self,
        code_objects: &[&CodeObject],
    ) -> GeneratedSource;

    /// Build script for POSIX `make`
    fn makefile(
        &self,
        spec: &MakefileSpec,
    ) -> String;

    /// Build script for Windows `nmake`
    fn win_makefile(
        &self,
        spec: &MakefileSpec,
    ) -> String;

    /// Entry HTML page
    fn html_page(
        &self,
        content: &HtmlContent,
    ) -> String;
}
