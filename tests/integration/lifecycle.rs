use crate::common::{device, prefs, two_clock_network};
use brian2wasm::device::network::{Network, NetworkObject};
use brian2wasm::device::queue::APPLY_RUN_ARGS;
use brian2wasm::{BuildOptions, Device, DeviceError, DeviceState, RunOptions};
use proptest::prelude::*;
use tempfile::TempDir;

fn build_only(tmp: &TempDir) -> BuildOptions {
    BuildOptions::new().directory(tmp.path().join("out")).compile(false)
}

#[test]
fn test_two_clocks_one_second() {
    let mut device = device();
    let mut net = two_clock_network();
    device.run(&mut net, 1.0, RunOptions::default()).unwrap();

    let entries = device.main_queue().entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(
        entries[0].lines(),
        &[
            "network.clear();",
            "network.add(&defaultclock, _run_neurongroup_stateupdater);",
            "network.add(&monitorclock, _run_statemonitor_codeobject);",
            APPLY_RUN_ARGS,
            "network.run(1.0, NULL, 10.0);",
        ]
    );
    assert_eq!(device.clocks().len(), 2);
    assert_eq!(device.clocks().get("monitorclock").unwrap().end, 1.0);
}

#[test]
fn test_idle_clock_still_registered() {
    let mut device = device();
    let mut net = Network::new("net")
        .with_object(NetworkObject::new("neurons", "clock").with_code_object("neurons_stateupdater"))
        .with_object(NetworkObject::new("poisson", "slowclock"));
    device.run(&mut net, 0.5, RunOptions::default()).unwrap();
    let lines = device.main_queue().unroll();
    assert!(lines.contains(&"net.add(&_clock, _run_neurons_stateupdater);"));
    assert!(lines.contains(&"net.add(&slowclock, NULL);"));
}

#[test]
fn test_negative_duration_leaves_state_untouched() {
    let mut device = device();
    let mut net = two_clock_network();
    let err = device.run(&mut net, -1.0, RunOptions::default()).unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("-1"));
    assert!(device.main_queue().is_empty());
    assert!(device.clocks().is_empty());
    assert_eq!(net.t, 0.0);
}

#[test]
fn test_build_twice_fails_until_reinit() {
    let tmp = TempDir::new().unwrap();
    let mut device = device();
    device.run(&mut two_clock_network(), 0.1, RunOptions::default()).unwrap();
    device.build(build_only(&tmp)).unwrap();
    assert_eq!(device.state(), DeviceState::Built);

    let err = device.build(build_only(&tmp)).unwrap_err();
    assert!(matches!(err, DeviceError::AlreadyBuilt));
    assert!(err.is_state());
    assert!(err.to_string().contains("reinit()"));

    device.reinit();
    assert_eq!(device.state(), DeviceState::Activated);
    device.run(&mut two_clock_network(), 0.1, RunOptions::default()).unwrap();
    device.build(build_only(&tmp)).unwrap();
}

#[test]
fn test_run_after_build_fails() {
    let tmp = TempDir::new().unwrap();
    let mut device = device();
    let mut net = two_clock_network();
    device.run(&mut net, 0.1, RunOptions::default()).unwrap();
    device.build(build_only(&tmp)).unwrap();
    let err = device.run(&mut net, 0.1, RunOptions::default()).unwrap_err();
    assert!(matches!(err, DeviceError::AlreadyBuilt));
}

#[test]
fn test_build_on_run_builds_at_first_run() {
    let tmp = TempDir::new().unwrap();
    let mut device = Device::new(prefs());
    device.activate();
    device.set_build_options(build_only(&tmp));

    let mut net = two_clock_network();
    let report = device.run(&mut net, 0.1, RunOptions::default()).unwrap();
    let report = report.expect("first run builds");
    assert!(report.directory.join("main.cpp").is_file());
    assert!(!report.compiled);
    assert!(device.has_been_run());

    let err = device.run(&mut net, 0.1, RunOptions::default()).unwrap_err();
    assert!(matches!(err, DeviceError::AlreadyBuilt));
}

#[test]
fn test_direct_build_in_build_on_run_mode_fails() {
    let tmp = TempDir::new().unwrap();
    let mut device = Device::new(prefs());
    device.activate();
    let err = device.build(build_only(&tmp)).unwrap_err();
    assert!(matches!(err, DeviceError::BuildOnRunDirectCall));
    assert!(!tmp.path().join("out").exists());
}

#[test]
fn test_report_function_consistency() {
    let mut device = device();
    let mut net = two_clock_network();
    device.run(&mut net, 0.1, RunOptions::new().report("text")).unwrap();
    device.run(&mut net, 0.1, RunOptions::new().report("stdout")).unwrap();
    device.run(&mut net, 0.2, RunOptions::default()).unwrap();
    let err = device.run(&mut net, 0.1, RunOptions::new().report("stderr")).unwrap_err();
    assert!(matches!(err, DeviceError::ReportFunctionMismatch));
    assert_eq!(device.main_queue().len(), 3);
    assert!(!device.report_func().is_empty());

    let entries = device.main_queue().entries();
    assert_eq!(entries[1].lines().last(), Some(&"network.run(0.1, report_progress, 10.0);".to_string()));
    // a run without a report gets no callback
    assert_eq!(entries[2].lines().last(), Some(&"network.run(0.2, NULL, 10.0);".to_string()));
}

#[test]
fn test_reinit_applies_run_args_again() {
    let tmp = TempDir::new().unwrap();
    let mut device = device();
    device.run(&mut two_clock_network(), 0.1, RunOptions::default()).unwrap();
    device.build(build_only(&tmp)).unwrap();
    device.reinit();
    device.run(&mut two_clock_network(), 0.1, RunOptions::default()).unwrap();
    assert!(device.main_queue().unroll().contains(&APPLY_RUN_ARGS));
}

proptest! {
    #[test]
    fn prop_sequential_runs_accumulate(d1 in 0.0f64..10.0, d2 in 0.0f64..10.0) {
        let mut device = device();
        let mut net = two_clock_network();
        let t0 = net.t;
        device.run(&mut net, d1, RunOptions::default()).unwrap();
        device.run(&mut net, d2, RunOptions::default()).unwrap();

        let entries = device.main_queue().entries();
        prop_assert_eq!(entries.len(), 2);
        let d1_dbg = format!("{:?}", d1);
        let d2_dbg = format!("{:?}", d2);
        prop_assert!(entries[0].lines().last().unwrap().contains(&d1_dbg));
        prop_assert!(entries[1].lines().last().unwrap().contains(&d2_dbg));
        prop_assert_eq!(net.t, t0 + d1 + d2);
    }

    #[test]
    fn prop_negative_duration_never_queues(d in -1e6f64..-1e-12) {
        let mut device = device();
        let mut net = two_clock_network();
        prop_assert!(device.run(&mut net, d, RunOptions::default()).is_err());
        prop_assert!(device.main_queue().is_empty());
        prop_assert_eq!(net.t, 0.0);
    }
}
