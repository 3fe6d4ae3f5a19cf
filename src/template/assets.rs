//! Fixed runtime harness copied into every build directory

/// File name of the worker script
pub const WORKER_JS: &str = "worker.js";
/// File name of the page-side UI script
pub const BRIAN_JS: &str = "brian.js";
/// File name of the preamble prepended to the compiled module
pub const PRE_JS: &str = "pre.js";
/// File name of the JavaScript library linked into the module
pub const LIBRARY_JS: &str = "brian_library.js";
/// Canonical entry page inside the build directory
pub const INDEX_HTML: &str = "index.html";

/// Harness files copied verbatim, as `(file name, content)`
pub fn harness_files() -> [(&'static str, &'static str); 2] {
    [(WORKER_JS, worker_js()), (BRIAN_JS, brian_js())]
}

/// Worker script: loads the module, forwards page parameters as command-line
/// arguments, runs `main` and posts the collected results back.
pub fn worker_js() -> &'static str {
    r#"importScripts('./wasm_module.js');

self.onmessage = e => {
    let _arguments = [];
    if (e.data) {
        const args = e.data;
        for (let key in args) {
            _arguments.push(`${key}=${args[key]}`);
        }
    }

    Module().then(function (module) {
        module.callMain(_arguments);
        postMessage({ type: 'results', results: module['brian_results'] });
    });
};
"#
}

/// Page-side controller: owns the worker, dispatches bridge messages to the
/// progress display and result plots.
pub fn brian_js() -> &'static str {
    r#"class BrianSimulation {
    constructor(result_plots, progress, run_button) {
        this.worker = new Worker('worker.js');
        this.result_plots = (typeof result_plots !== "undefined") ? result_plots : [];
        this.plot_funcs = [];
        this.spike_funcs = [];
        this.progress = (typeof progress !== "undefined") ? progress : {type: 'bar', bar_id: 'brian_progress_bar', text_id: 'brian_progress_text'};
        this.run_button = (typeof run_button !== "undefined") ? run_button : "brian_run_button";
    }

    init() {
        this.run_button = document.getElementById(this.run_button);
        this.progress_bar = document.getElementById(this.progress.bar_id);
        this.progress_text = document.getElementById(this.progress.text_id);
        if (this.progress.type === 'bar') {
            this.report = (event) => {
                this.progress_bar.value = event.data.completed;
                this.progress_text.innerHTML = `${Math.round(event.data.completed * event.data.duration * 1000, 0)}ms (<b>${Math.round(event.data.completed * 100., 0)} %</b>).`
            }
        } else {
            console.warn('Unknown progress type ' + this.progress.type);
        }

        this.result_plots.forEach(result_plot => {
            if (result_plot.type === 'raster') {
                let plot = (event) => {
                    let layout = {
                        title: { text: 'Spiking activity' },
                        xaxis: { title: { text: 'Time (s)' } },
                        yaxis: { title: { text: 'Neuron index' } }
                    };
                    var brian_results = event.data.results;
                    var spikes = {
                        x: brian_results['spikemonitor'].t,
                        y: brian_results['spikemonitor'].i,
                        mode: 'markers',
                        marker: { size: 2 },
                        type: 'scatter'
                    };
                    let canvas = (typeof result_plot.canvas !== "undefined") ? result_plot.canvas : "brian_canvas";
                    Plotly.react(canvas, [spikes], layout);
                };
                this.plot_funcs.push(plot);
            } else if (result_plot.type === 'custom') {
                this.plot_funcs.push(result_plot.func);
            } else if (result_plot.type === 'spikes') {
                this.spike_funcs.push(result_plot.func);
            } else {
                console.warn('Unsupported plot type ' + result_plot.type);
            }
        });

        this.worker.onmessage = (e) => {
            if (e.data.type === 'results') {
                this.plot_funcs.forEach(plot => {
                    plot(e);
                });
                if (this.run_button)
                    this.run_button.disabled = false;
            } else if (e.data.type === 'progress') {
                if (this.report)
                    this.report(e);
            } else if (e.data.type === 'spike') {
                this.spike_funcs.forEach(func => {
                    func(e.data.index, e.data.time);
                });
            } else {
                console.log('Received unknown message type');
                console.log(e);
            }
        }
    }

    run(data) {
        if (this.run_button)
            this.run_button.disabled = true;
        if (this.progress.type == 'bar')
            document.getElementById(this.progress.bar_id).removeAttribute('value');
        if (data === undefined)
            data = {};
        this.worker.postMessage(data);
    }
}
"#
}

/// Preamble: collects result arrays from the virtual filesystem
pub fn pre_js() -> &'static str {
    r#"var brian_results = {};

function add_results(owner, varname, dtype, array_filename) {
    let data = null;
    if (dtype == 'double') {
        data = new Float64Array(FS.readFile(array_filename).buffer);
    } else if (dtype == 'float') {
        data = new Float32Array(FS.readFile(array_filename).buffer);
    } else if (dtype == 'int32_t') {
        data = new Int32Array(FS.readFile(array_filename).buffer);
    } else if (dtype == 'int64_t') {
        data = new BigInt64Array(FS.readFile(array_filename).buffer);
    } else {
        console.log('Unknown dtype: ' + dtype);
    }
    if (!(owner in brian_results)) {
        brian_results[owner] = {};
    }
    brian_results[owner][varname] = data;
}
"#
}

/// JavaScript library exposing the progress bridge to native code
pub fn brian_library_js() -> &'static str {
    r#"mergeInto(LibraryManager.library, {
  brian_report_progress: function (elapsed, completed, start, duration) {
    postMessage({
      type: 'progress',
      elapsed: elapsed, completed: completed, start: start, duration: duration
    });
  }
});
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_loads_module() {
        assert!(worker_js().contains("importScripts('./wasm_module.js')"));
        assert!(worker_js().contains("callMain"));
    }

    #[test]
    fn test_ui_handles_bridge_messages() {
        let js = brian_js();
        assert!(js.contains("e.data.type === 'progress'"));
        assert!(js.contains("e.data.type === 'spike'"));
        assert!(js.contains("new Worker('worker.js')"));
    }

    #[test]
    fn test_harness_files() {
        let names: Vec<_> = harness_files().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec![WORKER_JS, BRIAN_JS]);
    }

    #[test]
    fn test_preamble_and_library() {
        assert!(pre_js().contains("function add_results"));
        assert!(brian_library_js().contains("type: 'progress'"));
    }
}
