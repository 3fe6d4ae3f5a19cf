use brian2wasm::build_file;
use brian2wasm::model::ModelScript;
use brian2wasm::{BuildOptions, Device, DeviceError};
use std::fs;
use tempfile::TempDir;

const MODEL: &str = r#"{
    "clocks": [{"name": "defaultclock", "dt": 0.0001}],
    "networks": [{"name": "magicnetwork", "objects": [
        {"name": "neurongroup", "clock": "defaultclock",
         "code_objects": [{"name": "neurongroup_stateupdater", "owner": "neurongroup", "clock": "defaultclock",
                           "source": {"cpp": "void _run_neurongroup_stateupdater() {}"}}]},
        {"name": "spikemonitor", "clock": "defaultclock", "kind": "monitor"}
    ]}],
    "static_arrays": {"_static_array_v": [0.0, -0.07]},
    "namespace": {"tau": 0.01},
    "runs": [
        {"network": "magicnetwork", "duration": 0.5, "report": "text"},
        {"network": "magicnetwork", "duration": 0.5}
    ],
    "build": {"compile": false, "html_content": {"title": "Brunel"}}
}"#;

fn write_project(tmp: &TempDir) -> std::path::PathBuf {
    let model = tmp.path().join("brunel.json");
    fs::write(&model, MODEL).unwrap();
    fs::write(
        tmp.path().join("brian2wasm.toml"),
        "[wasm_standalone]\nemsdk_directory = \"/opt/emsdk\"\n",
    )
    .unwrap();
    model
}

#[test]
fn test_build_file_generates_directory() {
    let tmp = TempDir::new().unwrap();
    let model = write_project(&tmp);
    let out = tmp.path().join("out");

    let report = build_file(&model, |options| {
        options.directory = Some(out.clone());
    })
    .unwrap()
    .expect("explicit build produces a report");
    assert_eq!(report.directory, out);
    assert!(!report.compiled);

    let main = fs::read_to_string(out.join("main.cpp")).unwrap();
    assert!(main.contains("magicnetwork.run(0.5, report_progress, 10.0);"));
    assert_eq!(main.matches("set_from_command_line(args);").count(), 1);

    let objects = fs::read_to_string(out.join("objects.cpp")).unwrap();
    assert!(objects.contains("const double tau = 0.01;"));

    let page = fs::read_to_string(out.join("index.html")).unwrap();
    assert!(page.contains("<title>Brunel</title>"));
    assert_eq!(fs::read(out.join("static_arrays/_static_array_v")).unwrap().len(), 16);
}

#[test]
fn test_sibling_html_page_wins() {
    let tmp = TempDir::new().unwrap();
    let model = write_project(&tmp);
    fs::write(tmp.path().join("brunel.html"), "<html>brunel</html>").unwrap();
    let out = tmp.path().join("out");

    build_file(&model, |options| {
        options.directory = Some(out.clone());
    })
    .unwrap();
    assert_eq!(fs::read_to_string(out.join("index.html")).unwrap(), "<html>brunel</html>");
}

#[test]
fn test_apply_in_build_on_run_mode_builds_once() {
    let tmp = TempDir::new().unwrap();
    let mut script = ModelScript::from_json(MODEL).unwrap();
    script.runs.truncate(1);

    let mut prefs = brian2wasm::Preferences::default();
    prefs.wasm_standalone.emsdk_directory = Some("/opt/emsdk".into());
    let mut device = Device::new(prefs);
    device.activate();
    let report = script
        .apply(&mut device, BuildOptions::new().directory(tmp.path()).compile(false))
        .unwrap();
    assert!(report.is_some());
    assert!(device.has_been_run());
}

#[test]
fn test_second_run_after_implicit_build_fails() {
    let tmp = TempDir::new().unwrap();
    let script = ModelScript::from_json(MODEL).unwrap();
    let mut prefs = brian2wasm::Preferences::default();
    prefs.wasm_standalone.emsdk_directory = Some("/opt/emsdk".into());
    let mut device = Device::new(prefs);
    device.activate();
    let err = script
        .apply(&mut device, BuildOptions::new().directory(tmp.path()).compile(false))
        .unwrap_err();
    assert!(matches!(err, DeviceError::AlreadyBuilt));
}
