//! Native functions that post bridge messages from generated code

use serde::{Deserialize, Serialize};

/// A function implementation injected into generated sources
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NativeFunction {
    pub name: String,
    pub code: String,
}

/// `send_spike(i, t)`: posts a `spike` message and returns `0.0`
pub fn send_spike() -> NativeFunction {
    NativeFunction {
        name: "send_spike".to_string(),
        code: r#"
double send_spike(int i, double t) {
    EM_ASM({
        postMessage({ type: 'spike', index: $0, time: $1});
    }, i, t);
    return 0.0;
}
"#
        .to_string(),
    }
}

/// All bridge functions, in the order they are emitted
pub fn bridge_functions() -> Vec<NativeFunction> {
    vec![send_spike()]
}
