use crate::common::{device, two_clock_network};
use brian2wasm::device::network::{CodeObject, CompilerRequirements, Macro, Network, NetworkObject};
use brian2wasm::device::queue::CodeSlot;
use brian2wasm::template::GeneratedSource;
use brian2wasm::{BuildOptions, Device, DeviceError, Preferences, RunOptions};
use std::collections::BTreeMap;
use std::fs;
use std::path::MAIN_SEPARATOR;
use tempfile::TempDir;

#[test]
fn test_build_directory_layout() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("out");
    let mut device = device();
    device.add_static_array("_static_array_b", vec![2u8; 8]).unwrap();
    device.add_static_array("_static_array_a", vec![1u8; 8]).unwrap();
    device.run(&mut two_clock_network(), 1.0, RunOptions::default()).unwrap();
    let report = device
        .build(BuildOptions::new().directory(&out).compile(false))
        .unwrap();

    for dir in ["code_objects", "results", "static_arrays"] {
        assert!(out.join(dir).is_dir(), "missing {dir}");
    }
    for file in [
        "makefile",
        "main.cpp",
        "objects.cpp",
        "objects.h",
        "network.cpp",
        "network.h",
        "synapses_classes.cpp",
        "run.cpp",
        "run.h",
        "worker.js",
        "brian.js",
        "pre.js",
        "brian_library.js",
        "index.html",
        "code_objects/neurongroup_stateupdater.cpp",
        "code_objects/statemonitor_codeobject.cpp",
        "static_arrays/_static_array_a",
    ] {
        assert!(out.join(file).is_file(), "missing {file}");
    }

    assert!(report.results_dir.ends_with(MAIN_SEPARATOR));
    assert!(report.results_dir.contains("results"));
    assert_eq!(fs::read(out.join("static_arrays/_static_array_b")).unwrap(), vec![2u8; 8]);

    let makefile = fs::read_to_string(out.join("makefile")).unwrap();
    assert!(makefile.contains(
        "--preload-file static_arrays/_static_array_a --preload-file static_arrays/_static_array_b"
    ));
    assert!(makefile.contains("EMSDK = /opt/emsdk"));
    assert!(makefile.contains("rm $(OBJS) $(PROGRAM) $(DEPS)"));
    assert!(makefile.contains("--pre-js pre.js"));

    let main = fs::read_to_string(out.join("main.cpp")).unwrap();
    assert!(main.contains("network.run(1.0, NULL, 10.0);"));
    assert!(main.contains("#include <emscripten.h>"));

    let objects = fs::read_to_string(out.join("objects.cpp")).unwrap();
    assert!(objects.contains(&report.results_dir));

    // main calls it on the first run, run.cpp defines it
    assert!(main.contains("set_from_command_line(args);"));
    let run = fs::read_to_string(out.join("run.cpp")).unwrap();
    assert!(run.contains("void set_from_command_line(const std::vector<std::string>& args)"));
}

#[test]
fn test_missing_toolchain_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("out");
    let mut device = Device::new(Preferences::default())
        .with_build_on_run(false)
        .with_env_lookup(|_| None);
    device.activate();
    device.run(&mut two_clock_network(), 1.0, RunOptions::default()).unwrap();
    let err = device
        .build(BuildOptions::new().directory(&out).compile(false))
        .unwrap_err();
    assert!(matches!(err, DeviceError::ToolchainNotFound));
    assert!(!out.exists());
    assert!(!device.has_been_run());
}

#[test]
fn test_rebuild_skips_unchanged_files() {
    let tmp = TempDir::new().unwrap();
    let options = BuildOptions::new().directory(tmp.path()).compile(false);
    let mut device = device();
    device.run(&mut two_clock_network(), 1.0, RunOptions::default()).unwrap();
    let first = device.build(options.clone()).unwrap();
    assert_eq!(first.unchanged_files, 0);

    device.reinit();
    device.run(&mut two_clock_network(), 1.0, RunOptions::default()).unwrap();
    let second = device.build(options).unwrap();
    assert!(second.unchanged_files > 0);
}

#[test]
fn test_flags_and_additional_sources() {
    let tmp = TempDir::new().unwrap();
    let requirements = CompilerRequirements {
        define_macros: vec![Macro::with_value("N", "1000")],
        include_dirs: vec!["brianlib/randomkit".to_string()],
        libraries: vec!["m".to_string()],
        sources: vec!["brianlib/randomkit/randomkit.c".to_string()],
        ..Default::default()
    };
    let codeobj = CodeObject::new("neurongroup_stateupdater", "neurongroup", "defaultclock")
        .with_requirements(requirements)
        .with_source(GeneratedSource::new("void _run_neurongroup_stateupdater() {}").with_header("// h"));
    let mut object = NetworkObject::new("neurongroup", "defaultclock");
    object.push_code_object(codeobj);
    let mut net = Network::new("network").with_object(object);

    let mut device = device();
    device.define_macro(Macro::new("WASM"));
    device.extra_compile_arg("-O2");
    device.insert_code(CodeSlot::AfterNetworkRun, "_write_arrays();");
    device.run(&mut net, 0.2, RunOptions::default()).unwrap();
    device
        .build(BuildOptions::new().directory(tmp.path()).compile(false).debug(true))
        .unwrap();

    let makefile = fs::read_to_string(tmp.path().join("makefile")).unwrap();
    assert!(makefile.contains("-O2 -w -DWASM -DN=1000 -Ibrianlib/randomkit"));
    assert!(makefile.contains("-lm"));
    assert!(makefile.contains("brianlib/randomkit/randomkit.c"));
    assert!(makefile.contains("-g -DDEBUG"));

    let code = fs::read_to_string(tmp.path().join("code_objects/neurongroup_stateupdater.cpp")).unwrap();
    assert_eq!(code, "void _run_neurongroup_stateupdater() {}");
    assert!(tmp.path().join("code_objects/neurongroup_stateupdater.h").is_file());

    let main = fs::read_to_string(tmp.path().join("main.cpp")).unwrap();
    let run = main.find("network.run(0.2").unwrap();
    assert!(main[run..].contains("_write_arrays();"));
}

#[test]
fn test_unknown_html_key_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("out");
    let mut content = BTreeMap::new();
    content.insert("title".to_string(), "Brunel".to_string());
    content.insert("footer".to_string(), "nope".to_string());

    let mut device = device();
    device.run(&mut two_clock_network(), 1.0, RunOptions::default()).unwrap();
    let err = device
        .build(BuildOptions::new().directory(&out).compile(false).html_content(content))
        .unwrap_err();
    assert!(matches!(err, DeviceError::UnknownHtmlKey { ref key, .. } if key == "footer"));
    assert!(!out.exists());
    assert!(!device.has_been_run());
}

#[test]
fn test_absolute_results_directory_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("out");
    let mut device = device();
    device.run(&mut two_clock_network(), 1.0, RunOptions::default()).unwrap();
    let err = device
        .build(
            BuildOptions::new()
                .directory(&out)
                .compile(false)
                .results_directory(tmp.path().join("results")),
        )
        .unwrap_err();
    assert!(matches!(err, DeviceError::AbsoluteResultsDirectory(_)));
    assert!(!out.exists());
}

#[test]
fn test_partial_html_content_uses_defaults() {
    let tmp = TempDir::new().unwrap();
    let mut content = BTreeMap::new();
    content.insert("h1".to_string(), "Balanced network".to_string());

    let mut device = device();
    device.run(&mut two_clock_network(), 1.0, RunOptions::default()).unwrap();
    device
        .build(BuildOptions::new().directory(tmp.path()).compile(false).html_content(content))
        .unwrap();
    let page = fs::read_to_string(tmp.path().join("index.html")).unwrap();
    assert!(page.contains("Brian simulation"));
    assert!(page.contains("Balanced network"));
    assert!(page.contains("95%"));
    assert!(page.contains("500px"));
}

#[test]
fn test_user_html_file_copied() {
    let tmp = TempDir::new().unwrap();
    let page = tmp.path().join("custom.html");
    fs::write(&page, "<html>custom</html>").unwrap();
    let out = tmp.path().join("out");

    let mut device = device();
    device.run(&mut two_clock_network(), 1.0, RunOptions::default()).unwrap();
    device
        .build(BuildOptions::new().directory(&out).compile(false).html_file(&page))
        .unwrap();
    assert_eq!(fs::read_to_string(out.join("index.html")).unwrap(), "<html>custom</html>");
}

#[test]
fn test_temporary_directory_when_unset() {
    let mut device = device();
    device.run(&mut two_clock_network(), 1.0, RunOptions::default()).unwrap();
    let report = device.build(BuildOptions::new().compile(false)).unwrap();
    let name = report.directory.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("brian_standalone_"));
    assert!(report.directory.join("makefile").is_file());
    fs::remove_dir_all(&report.directory).unwrap();
}

#[test]
fn test_duplicate_static_array_rejected() {
    let mut device = device();
    device.add_static_array("_static_array_w", vec![0u8]).unwrap();
    let err = device.add_static_array("_static_array_w", vec![1u8]).unwrap_err();
    assert!(matches!(err, DeviceError::DuplicateStaticArray(_)));
    assert_eq!(device.static_arrays().get("_static_array_w"), Some(&[0u8][..]));
}
