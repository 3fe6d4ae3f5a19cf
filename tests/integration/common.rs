use brian2wasm::device::network::{Network, NetworkObject};
use brian2wasm::{Device, Preferences};
use std::path::PathBuf;

/// Preferences with a fixed emsdk location, independent of the environment
pub fn prefs() -> Preferences {
    let mut prefs = Preferences::default();
    prefs.wasm_standalone.emsdk_directory = Some(PathBuf::from("/opt/emsdk"));
    prefs
}

/// An activated device that waits for an explicit build
pub fn device() -> Device {
    let mut device = Device::new(prefs()).with_build_on_run(false);
    device.activate();
    device
}

/// One neuron group on `defaultclock`, one monitor on `monitorclock`
pub fn two_clock_network() -> Network {
    Network::new("network")
        .with_object(NetworkObject::new("neurongroup", "defaultclock").with_code_object("neurongroup_stateupdater"))
        .with_object(NetworkObject::new("statemonitor", "monitorclock").with_code_object("statemonitor_codeobject"))
}
