//! Build lifecycle controller
//!
//! A [`Device`] collects `run` requests into a deferred execution queue and,
//! when built, turns its state into a build directory: generated sources,
//! static arrays, the browser harness and a build script. It then compiles
//! the directory with the WebAssembly toolchain and launches the result.
//!
//! ```text
//! Created --activate--> Activated --run*--> --build--> Built --launch--> Running
//!                           ^                                |
//!                           +------------- reinit -----------+
//! ```

pub mod clock;
pub mod network;
pub mod options;
pub mod queue;
pub mod report;
pub mod timers;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::time::Instant;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{DeviceError, DeviceResult};
use crate::launch::{EntryPage, LaunchController, LaunchOutcome};
use crate::packaging::flags::{additional_sources, BuildFlags, UserFlags};
use crate::packaging::makefile::{build_script_name, MakefileSpec};
use crate::packaging::static_arrays::{StaticArrays, STATIC_ARRAYS_DIR};
use crate::packaging::SourceWriter;
use crate::template::assets::{self, LIBRARY_JS, PRE_JS};
use crate::template::{DefaultTemplater, MainContext, ObjectsContext, Templater};
use crate::toolchain::{self, EnvLookup};
use crate::util::config::Preferences;

use clock::{Clock, ClockRegistry};
use network::{CodeObject, Macro, Network, ObjectKind};
use options::{BuildOptions, Namespace, RunOptions};
use queue::{CodeLines, CodeSlot, MainQueue, QueueEntry, RunLines};
use report::report_call;
use timers::Timers;

/// Header every generated file needs to reach the browser runtime
pub const EMSCRIPTEN_HEADER: &str = "<emscripten.h>";

/// Directory for per-object generated code
pub const CODE_OBJECTS_DIR: &str = "code_objects";

/// Prefix of temporary build directories
pub const TEMP_DIR_PREFIX: &str = "brian_standalone_";

/// Lifecycle state of a [`Device`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    Created,
    Activated,
    Built,
    Running,
}

/// A value cached after a run, readable before the binary executes
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CachedValue {
    Int(i64),
    Float(f64),
}

/// What a completed `build()` produced
#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    pub directory: PathBuf,
    /// Absolute results path, ending in a path separator
    pub results_dir: String,
    /// Files skipped because their content did not change
    pub unchanged_files: usize,
    pub compiled: bool,
    pub launch: Option<LaunchOutcome>,
}

/// The build lifecycle controller
pub struct Device {
    state: DeviceState,
    build_on_run: bool,
    prefs: Preferences,
    templater: Box<dyn Templater>,
    build_options: BuildOptions,
    static_arrays: StaticArrays,
    clocks: ClockRegistry,
    networks: IndexMap<String, Network>,
    code_objects: IndexMap<String, CodeObject>,
    synapses: Vec<String>,
    main_queue: MainQueue,
    code_lines: CodeLines,
    array_cache: IndexMap<String, CachedValue>,
    timers: Timers,
    has_been_run: bool,
    report_func: String,
    run_args_applied: bool,
    enable_profiling: bool,
    transfer_results: Option<Vec<String>>,
    user_flags: UserFlags,
    runtime_libraries: Vec<(PathBuf, String)>,
    local_namespace: Namespace,
    namespace: Namespace,
    env: EnvLookup,
}

impl std::fmt::Debug for Device {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("state", &self.state)
            .field("build_on_run", &self.build_on_run)
            .field("networks", &self.networks.keys().collect::<Vec<_>>())
            .field("main_queue", &self.main_queue.len())
            .field("has_been_run", &self.has_been_run)
            .finish_non_exhaustive()
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::new(Preferences::default())
    }
}

impl Device {
    /// A device rendering with [`DefaultTemplater`], building on the first run
    pub fn new(prefs: Preferences) -> Self {
        Self::with_templater(prefs, Box::new(DefaultTemplater))
    }

    pub fn with_templater(
        prefs: Preferences,
        templater: Box<dyn Templater>,
    ) -> Self {
        Self {
            state: DeviceState::Created,
            build_on_run: true,
            prefs,
            templater,
            build_options: BuildOptions::default(),
            static_arrays: StaticArrays::new(),
            clocks: ClockRegistry::new(),
            networks: IndexMap::new(),
            code_objects: IndexMap::new(),
            synapses: Vec::new(),
            main_queue: MainQueue::new(),
            code_lines: CodeLines::default(),
            array_cache: IndexMap::new(),
            timers: Timers::new(),
            has_been_run: false,
            report_func: String::new(),
            run_args_applied: false,
            enable_profiling: false,
            transfer_results: None,
            user_flags: UserFlags::default(),
            runtime_libraries: Vec::new(),
            local_namespace: Namespace::new(),
            namespace: Namespace::new(),
            env: toolchain::process_env,
        }
    }

    /// Replace the environment used to locate the toolchain
    pub fn with_env_lookup(
        mut self,
        env: EnvLookup,
    ) -> Self {
        self.env = env;
        self
    }

    /// Build implicitly on the first `run` (the default) or wait for an
    /// explicit `build()`
    pub fn with_build_on_run(
        mut self,
        build_on_run: bool,
    ) -> Self {
        self.build_on_run = build_on_run;
        self
    }

    /// Options used by the implicit build of build-on-run mode
    pub fn set_build_options(
        &mut self,
        options: BuildOptions,
    ) {
        self.build_options = options;
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn build_on_run(&self) -> bool {
        self.build_on_run
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    pub fn build_options(&self) -> &BuildOptions {
        &self.build_options
    }

    pub fn main_queue(&self) -> &MainQueue {
        &self.main_queue
    }

    pub fn clocks(&self) -> &ClockRegistry {
        &self.clocks
    }

    pub fn networks(&self) -> impl Iterator<Item = &Network> {
        self.networks.values()
    }

    pub fn static_arrays(&self) -> &StaticArrays {
        &self.static_arrays
    }

    pub fn array_cache(&self) -> &IndexMap<String, CachedValue> {
        &self.array_cache
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn has_been_run(&self) -> bool {
        self.has_been_run
    }

    /// Source of the active report function, empty when none
    pub fn report_func(&self) -> &str {
        &self.report_func
    }

    pub fn synapses(&self) -> &[String] {
        &self.synapses
    }

    /// Free variables resolved so far, merged across runs
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Wire the device into the code generation configuration.
    ///
    /// Only registers the header generated code needs; idempotent.
    pub fn activate(&mut self) {
        if self.prefs.ensure_header(EMSCRIPTEN_HEADER) {
            debug!("Registered header {}", EMSCRIPTEN_HEADER);
        }
        if self.state == DeviceState::Created {
            self.state = DeviceState::Activated;
            info!("Device activated (build_on_run = {})", self.build_on_run);
        }
    }

    /// Namespace used by runs that do not supply their own
    pub fn set_local_namespace(
        &mut self,
        namespace: Namespace,
    ) {
        self.local_namespace = namespace;
    }

    /// Declare a clock with an explicit timestep
    pub fn declare_clock(
        &mut self,
        clock: Clock,
    ) {
        self.clocks.declare(clock);
    }

    /// Register a named constant array, serialized into the virtual filesystem
    pub fn add_static_array(
        &mut self,
        name: impl Into<String>,
        data: Vec<u8>,
    ) -> DeviceResult<()> {
        self.static_arrays.insert(name, data)
    }

    /// Inject an instruction before or after every subsequent network run
    pub fn insert_code(
        &mut self,
        slot: CodeSlot,
        line: impl Into<String>,
    ) {
        self.code_lines.insert(slot, line);
    }

    /// Restrict the results sent back to the page to `names`; may be set once
    pub fn transfer_only<I, S>(
        &mut self,
        names: I,
    ) -> DeviceResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.transfer_results.is_some() {
            return Err(DeviceError::TransferAlreadySet);
        }
        self.transfer_results = Some(names.into_iter().map(Into::into).collect());
        Ok(())
    }

    pub fn transfer_results(&self) -> Option<&[String]> {
        self.transfer_results.as_deref()
    }

    pub fn define_macro(
        &mut self,
        define: Macro,
    ) {
        self.user_flags.define_macros.push(define);
    }

    pub fn include_dir(
        &mut self,
        dir: impl Into<String>,
    ) {
        self.user_flags.include_dirs.push(dir.into());
    }

    pub fn library_dir(
        &mut self,
        dir: impl Into<String>,
    ) {
        self.user_flags.library_dirs.push(dir.into());
    }

    pub fn library(
        &mut self,
        name: impl Into<String>,
    ) {
        self.user_flags.libraries.push(name.into());
    }

    pub fn extra_compile_arg(
        &mut self,
        arg: impl Into<String>,
    ) {
        self.user_flags.extra_compile_args.push(arg.into());
    }

    pub fn extra_link_arg(
        &mut self,
        arg: impl Into<String>,
    ) {
        self.user_flags.extra_link_args.push(arg.into());
    }

    /// Copy a directory of native runtime sources into `<build>/<dest>`
    pub fn add_runtime_library(
        &mut self,
        src: impl Into<PathBuf>,
        dest: impl Into<String>,
    ) {
        self.runtime_libraries.push((src.into(), dest.into()));
    }

    /// Schedule `network` to run for `duration` seconds.
    ///
    /// Nothing is mutated when validation fails. In build-on-run mode the
    /// device is built right away.
    pub fn run(
        &mut self,
        network: &mut Network,
        duration: f64,
        opts: RunOptions,
    ) -> DeviceResult<Option<BuildReport>> {
        if self.state == DeviceState::Created {
            return Err(DeviceError::NotActivated);
        }
        if !duration.is_finite() || duration < 0.0 {
            return Err(DeviceError::NegativeDuration(duration));
        }
        if self.has_been_run {
            return Err(DeviceError::AlreadyBuilt);
        }
        let report_func = opts.report.function_source();
        if !report_func.is_empty() && !self.report_func.is_empty() && report_func != self.report_func {
            return Err(DeviceError::ReportFunctionMismatch);
        }

        let namespace = opts.namespace.unwrap_or_else(|| self.local_namespace.clone());
        self.namespace.extend(namespace);
        self.enable_profiling = opts.profile.unwrap_or(self.build_options.profile);
        let callback = report_call(&report_func);
        if !report_func.is_empty() {
            self.report_func = report_func;
        }

        let t_start = network.t;
        let t_end = t_start + duration;
        for name in network.clock_names() {
            self.clocks.ensure(name).set_interval(t_start, t_end);
        }
        for obj in network.sorted_objects() {
            if obj.kind == ObjectKind::Synapses && !self.synapses.contains(&obj.name) {
                self.synapses.push(obj.name.clone());
            }
        }
        for codeobj in network.all_code_objects() {
            self.code_objects.insert(codeobj.name.clone(), codeobj.clone());
        }

        let lines = RunLines::new(network, &self.clocks)
            .code_lines(&self.code_lines)
            .apply_run_args(!self.run_args_applied)
            .report(callback, opts.report_period)
            .build(duration);
        self.run_args_applied = true;
        self.main_queue.push(QueueEntry::RunNetwork {
            network: network.name.clone(),
            lines,
        });
        debug!(
            "Queued run of '{}' for {}s (entry {})",
            network.name,
            duration,
            self.main_queue.len()
        );

        network.t = t_end;
        for name in network.clock_names() {
            if let Some(clock) = self.clocks.get(name) {
                let timestep = clock.i_end();
                self.array_cache
                    .insert(format!("{}.timestep", name), CachedValue::Int(timestep));
                self.array_cache
                    .insert(format!("{}.t", name), CachedValue::Float(timestep as f64 * clock.dt));
            }
        }
        self.networks.insert(network.name.clone(), network.clone());

        if self.build_on_run {
            return self.build_internal().map(Some);
        }
        Ok(None)
    }

    /// Build explicitly. Not allowed in build-on-run mode.
    pub fn build(
        &mut self,
        options: BuildOptions,
    ) -> DeviceResult<BuildReport> {
        if self.build_on_run {
            return Err(DeviceError::BuildOnRunDirectCall);
        }
        if self.has_been_run {
            return Err(DeviceError::AlreadyBuilt);
        }
        self.build_options = options;
        self.build_internal()
    }

    /// Return to the activated state, dropping every run, array and option
    pub fn reinit(&mut self) {
        let state = self.state;
        let build_on_run = self.build_on_run;
        let prefs = std::mem::take(&mut self.prefs);
        let templater = std::mem::replace(&mut self.templater, Box::new(DefaultTemplater));
        let env = self.env;
        *self = Self::with_templater(prefs, templater)
            .with_build_on_run(build_on_run)
            .with_env_lookup(env);
        if state != DeviceState::Created {
            self.state = DeviceState::Activated;
        }
        info!("Device reinitialized");
    }

    /// Names used by more than one object, in first-seen order
    fn duplicate_names(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut duplicates = Vec::new();
        for obj in self.networks.values().flat_map(|net| net.sorted_objects()) {
            if !seen.insert(obj.name.as_str()) && !duplicates.contains(&obj.name) {
                duplicates.push(obj.name.clone());
            }
        }
        duplicates
    }

    fn prepare_directory(&self) -> DeviceResult<PathBuf> {
        let directory = match &self.build_options.directory {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                dir.clone()
            }
            None => {
                let dir = tempfile::Builder::new().prefix(TEMP_DIR_PREFIX).tempdir()?.keep();
                info!("Using temporary build directory {}", dir.display());
                dir
            }
        };
        for sub in [
            PathBuf::from(CODE_OBJECTS_DIR),
            self.build_options.results_directory.clone(),
            PathBuf::from(STATIC_ARRAYS_DIR),
        ] {
            fs::create_dir_all(directory.join(sub))?;
        }
        Ok(directory)
    }

    fn build_internal(&mut self) -> DeviceResult<BuildReport> {
        if self.state == DeviceState::Created {
            return Err(DeviceError::NotActivated);
        }
        if self.has_been_run {
            return Err(DeviceError::AlreadyBuilt);
        }
        self.timers.reset();

        // Validation happens before anything is written
        let options = self.build_options.clone();
        options.validate()?;
        let entry_page = EntryPage::resolve(
            options.html_file.as_deref(),
            options.model_file.as_deref(),
            options.html_content.as_ref(),
        )?;
        let duplicates = self.duplicate_names();
        if !duplicates.is_empty() {
            return Err(DeviceError::DuplicateObjectNames(duplicates));
        }
        let emsdk = toolchain::resolve_emsdk_with(&self.prefs, self.env)?;

        let start = Instant::now();
        let directory = self.prepare_directory()?;
        let results_dir = results_path(&directory, &options.results_directory)?;
        info!("Building in {}", directory.display());

        let flags = BuildFlags::assemble(&self.user_flags, &self.prefs, self.code_objects.values());
        let mut extra_sources = options.additional_source_files.clone();
        extra_sources.extend(additional_sources(self.code_objects.values()));

        self.static_arrays.write(&directory)?;
        let mut writer = SourceWriter::new(&directory);
        self.write_sources(&mut writer, &results_dir)?;
        self.copy_assets(&mut writer, &entry_page)?;
        writer.add_sources(&extra_sources);

        let spec = MakefileSpec::new(
            writer.source_files(),
            writer.header_files(),
            &flags.compiler,
            &flags.linker,
            options.debug,
            self.static_arrays.preload_flags(),
            Path::new(PRE_JS),
            Path::new(LIBRARY_JS),
            &emsdk,
            &self.prefs.wasm_standalone.emsdk_version,
        );
        let script = if cfg!(windows) {
            self.templater.win_makefile(&spec)
        } else {
            self.templater.makefile(&spec)
        };
        writer.write_text(build_script_name(), &script)?;

        self.has_been_run = true;
        self.state = DeviceState::Built;
        self.timers.record("write_sources", start.elapsed().as_secs_f64());
        if writer.skipped() > 0 {
            debug!("{} files unchanged", writer.skipped());
        }

        let mut report = BuildReport {
            directory: directory.clone(),
            results_dir,
            unchanged_files: writer.skipped(),
            compiled: false,
            launch: None,
        };

        if options.compile {
            let times = toolchain::compile(&directory, options.clean)?;
            if let Some(clean) = times.clean {
                self.timers.record("compile.clean", clean);
            }
            if let Some(make) = times.make {
                self.timers.record("compile.make", make);
            }
            report.compiled = true;
            if options.run {
                self.state = DeviceState::Running;
                let controller =
                    LaunchController::new(self.prefs.wasm_standalone.emsdk_directory.clone(), options.run_args.clone());
                let outcome = controller.launch(&directory)?;
                if let LaunchOutcome::Completed { elapsed } = outcome {
                    self.timers.record("run_binary", elapsed);
                }
                report.launch = Some(outcome);
            }
        } else if options.run {
            warn!("Compilation skipped, not launching {}", directory.display());
        }

        debug!("Time measurements: {}", self.timers);
        Ok(report)
    }

    fn write_sources(
        &self,
        writer: &mut SourceWriter,
        results_dir: &str,
    ) -> DeviceResult<()> {
        let networks: Vec<&Network> = self.networks.values().collect();
        let code_objects: Vec<&CodeObject> = self.code_objects.values().collect();
        let headers = &self.prefs.codegen.headers;

        let objects = self.templater.objects(&ObjectsContext {
            clocks: &self.clocks,
            networks: networks.clone(),
            synapses: &self.synapses,
            static_arrays: self.static_arrays.names().collect(),
            code_objects: code_objects.clone(),
            headers,
            profiled: self.enable_profiling,
            transfer_results: self.transfer_results.as_deref(),
            results_dir,
            namespace: &self.namespace,
        });
        writer.write("objects.*", &objects)?;

        let main = self.templater.main(&MainContext {
            main_lines: self.main_queue.unroll(),
            report_func: &self.report_func,
            headers,
            code_objects: code_objects.clone(),
            networks,
        });
        writer.write("main.cpp", &main)?;

        for codeobj in &code_objects {
            let source = self.templater.code_object(codeobj);
            writer.write(&format!("{}/{}.*", CODE_OBJECTS_DIR, codeobj.name), &source)?;
        }

        writer.write("network.*", &self.templater.network(&self.clocks))?;
        writer.write("synapses_classes.*", &self.templater.synapses_classes(&self.synapses))?;
        writer.write("run.*", &self.templater.run(&code_objects))?;
        debug!("Wrote {} code objects", code_objects.len());
        Ok(())
    }

    fn copy_assets(
        &self,
        writer: &mut SourceWriter,
        entry_page: &EntryPage,
    ) -> DeviceResult<()> {
        for (src, dest) in &self.runtime_libraries {
            writer.copy_directory(src, dest)?;
        }
        for (name, content) in assets::harness_files() {
            writer.write_text(name, content)?;
        }
        writer.write_text(PRE_JS, assets::pre_js())?;
        writer.write_text(LIBRARY_JS, assets::brian_library_js())?;
        entry_page.install(writer.directory(), self.templater.as_ref())?;
        Ok(())
    }
}

/// Absolute results path with a trailing separator
fn results_path(
    directory: &Path,
    results_directory: &Path,
) -> DeviceResult<String> {
    let mut path = std::path::absolute(directory.join(results_directory))?
        .display()
        .to_string();
    if !path.ends_with(MAIN_SEPARATOR) {
        path.push(MAIN_SEPARATOR);
    }
    Ok(path)
}
