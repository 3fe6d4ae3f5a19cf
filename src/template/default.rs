//! Built-in template engine

use std::fmt::Write as _;

use crate::bridge::functions::bridge_functions;
use crate::device::clock::ClockRegistry;
use crate::device::network::CodeObject;
use crate::packaging::makefile::MakefileSpec;
use crate::packaging::static_arrays::STATIC_ARRAYS_DIR;
use crate::template::{GeneratedSource, HtmlContent, MainContext, ObjectsContext, Templater};

/// Renders a minimal but complete program skeleton around the generated
/// code objects
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTemplater;

/// `name=value` pairs forwarded by the worker as program arguments
const SET_FROM_COMMAND_LINE: &str = r#"
namespace brian {
std::map<std::string, std::string> command_line_values;
}

void set_from_command_line(const std::vector<std::string>& args)
{
    for (const std::string &arg : args)
    {
        const size_t eq = arg.find('=');
        if (eq == std::string::npos || eq == 0)
        {
            std::cerr << "Ignoring malformed argument '" << arg << "'" << std::endl;
            continue;
        }
        brian::command_line_values[arg.substr(0, eq)] = arg.substr(eq + 1);
    }
}
"#;

fn includes(headers: &[String]) -> String {
    headers
        .iter()
        .map(|h| format!("#include {}\n", h))
        .collect()
}

impl Templater for DefaultTemplater {
    fn objects(
        &self,
        ctx: &ObjectsContext<'_>,
    ) -> GeneratedSource {
        let mut cpp = String::new();
        let mut h = String::new();
        cpp.push_str("#include \"objects.h\"\n#include <fstream>\n#include <string>\n");
        cpp.push_str(&includes(ctx.headers));
        h.push_str("#ifndef _BRIAN_OBJECTS_H\n#define _BRIAN_OBJECTS_H\n\n#include \"network.h\"\n#include <vector>\n\n");

        let _ = writeln!(cpp, "\nnamespace brian {{\n\nstd::string results_dir = \"{}\";", ctx.results_dir);
        h.push_str("namespace brian {\n\nextern std::string results_dir;\n");

        for clock in ctx.clocks.iter() {
            let _ = writeln!(cpp, "Clock {}({:?});", clock.code_name(), clock.dt);
            let _ = writeln!(h, "extern Clock {};", clock.code_name());
        }
        for net in &ctx.networks {
            let _ = writeln!(cpp, "Network {};", net.name);
            let _ = writeln!(h, "extern Network {};", net.name);
        }
        for name in ctx.static_arrays.iter() {
            let _ = writeln!(cpp, "std::vector<char> {};", name);
            let _ = writeln!(h, "extern std::vector<char> {};", name);
        }
        for syn in ctx.synapses {
            let _ = writeln!(h, "// synapses: {}", syn);
        }
        let _ = writeln!(cpp, "const bool profiling_enabled = {};", ctx.profiled);
        for (name, value) in ctx.namespace {
            match value {
                serde_json::Value::Number(n) => {
                    let _ = writeln!(cpp, "const double {} = {};", name, n);
                }
                serde_json::Value::Bool(b) => {
                    let _ = writeln!(cpp, "const bool {} = {};", name, b);
                }
                // only scalars become constants
                _ => {}
            }
        }

        cpp.push_str("\nvoid _init_arrays()\n{\n");
        for name in ctx.static_arrays.iter() {
            let _ = writeln!(
                cpp,
                "    {{\n        std::ifstream f(\"{dir}/{name}\", std::ios::binary);\n        {name}.assign(std::istreambuf_iterator<char>(f), std::istreambuf_iterator<char>());\n    }}",
                dir = STATIC_ARRAYS_DIR,
                name = name
            );
        }
        cpp.push_str("}\n\nvoid _write_arrays()\n{\n");
        if let Some(names) = ctx.transfer_results {
            for name in names {
                let _ = writeln!(cpp, "    // transfer: {}", name);
            }
        }
        cpp.push_str("}\n\n}\n");
        h.push_str("\nvoid _init_arrays();\nvoid _write_arrays();\n\n}\n\n#endif\n");

        GeneratedSource::new(cpp).with_header(h)
    }

    fn main(
        &self,
        ctx: &MainContext<'_>,
    ) -> GeneratedSource {
        let mut cpp = String::new();
        cpp.push_str("#include <stdlib.h>\n#include <iostream>\n#include <string>\n#include <vector>\n");
        cpp.push_str("#include \"objects.h\"\n#include \"run.h\"\n");
        cpp.push_str(&includes(ctx.headers));
        for codeobj in ctx.code_objects.iter().filter(|c| c.source.h.is_some()) {
            let _ = writeln!(cpp, "#include \"code_objects/{}.h\"", codeobj.name);
        }
        for function in bridge_functions() {
            cpp.push_str(&function.code);
        }
        cpp.push_str(ctx.report_func);
        cpp.push_str("\nint main(int argc, char **argv)\n{\n");
        cpp.push_str("    std::vector<std::string> args(argv + 1, argv + argc);\n");
        cpp.push_str("    brian_start();\n    {\n        using namespace brian;\n");
        for line in &ctx.main_lines {
            let _ = writeln!(cpp, "        {}", line);
        }
        cpp.push_str("    }\n    brian_end();\n    return 0;\n}\n");
        GeneratedSource::new(cpp)
    }

    fn network(
        &self,
        _clocks: &ClockRegistry,
    ) -> GeneratedSource {
        let h = r#"#ifndef _BRIAN_NETWORK_H
#define _BRIAN_NETWORK_H

#include <utility>
#include <vector>

typedef void (*codeobj_func)();

class Clock
{
public:
    double dt;
    double t;
    long timestep;
    Clock(double _dt) : dt(_dt), t(0.0), timestep(0) {}
    void tick() { timestep++; t = timestep * dt; }
};

class Network
{
    std::vector< std::pair< Clock*, codeobj_func > > objects;
    std::vector< Clock* > clocks;
public:
    double t;
    Network() : t(0.0) {}
    void clear();
    void add(Clock *clock, codeobj_func func);
    void run(const double duration, void (*report_func)(const double, const double, const double, const double), const double report_period);
};

#endif
"#;
        let cpp = r#"#include "network.h"
#include <algorithm>
#include <ctime>

void Network::clear()
{
    objects.clear();
    clocks.clear();
}

void Network::add(Clock *clock, codeobj_func func)
{
    if (std::find(clocks.begin(), clocks.end(), clock) == clocks.end())
        clocks.push_back(clock);
    if (func)
        objects.push_back(std::make_pair(clock, func));
}

void Network::run(const double duration, void (*report_func)(const double, const double, const double, const double), const double report_period)
{
    const double t_start = t;
    const double t_end = t + duration;
    std::clock_t start = std::clock();
    double next_report = report_period;
    if (report_func)
        report_func(0.0, 0.0, t_start, duration);
    while (!clocks.empty())
    {
        Clock *next = *std::min_element(clocks.begin(), clocks.end(),
            [](Clock *a, Clock *b) { return a->t < b->t; });
        if (next->t >= t_end)
            break;
        t = next->t;
        for (auto &obj : objects)
            if (obj.first->t == t)
                obj.second();
        for (auto clock : clocks)
            if (clock->t == t)
                clock->tick();
        const double elapsed = double(std::clock() - start) / CLOCKS_PER_SEC;
        if (report_func && elapsed > next_report)
        {
            report_func(elapsed, (t - t_start) / duration, t_start, duration);
            next_report += report_period;
        }
    }
    t = t_end;
    if (report_func)
        report_func(double(std::clock() - start) / CLOCKS_PER_SEC, 1.0, t_start, duration);
}
"#;
        GeneratedSource::new(cpp).with_header(h)
    }

    fn synapses_classes(
        &self,
        synapses: &[String],
    ) -> GeneratedSource {
        let mut h = String::from("#ifndef _BRIAN_SYNAPSES_CLASSES_H\n#define _BRIAN_SYNAPSES_CLASSES_H\n\n#include <vector>\n\n");
        for name in synapses {
            let _ = writeln!(
                h,
                "struct {name}_pathway\n{{\n    std::vector<int> sources;\n    std::vector<int> targets;\n    std::vector<double> delays;\n}};\n",
                name = name
            );
        }
        h.push_str("#endif\n");
        GeneratedSource::new("#include \"synapses_classes.h\"\n").with_header(h)
    }

    fn run(
        &self,
        code_objects: &[&CodeObject],
    ) -> GeneratedSource {
        let mut cpp = String::from("#include \"run.h\"\n#include \"objects.h\"\n#include <iostream>\n");
        for codeobj in code_objects.iter().filter(|c| c.source.h.is_some()) {
            let _ = writeln!(cpp, "#include \"code_objects/{}.h\"", codeobj.name);
        }
        cpp.push_str("\nvoid brian_start()\n{\n    brian::_init_arrays();\n}\n\nvoid brian_end()\n{\n    brian::_write_arrays();\n}\n");
        cpp.push_str(SET_FROM_COMMAND_LINE);
        let h = "#ifndef _BRIAN_RUN_H\n#define _BRIAN_RUN_H\n\n#include <map>\n#include <string>\n#include <vector>\n\nnamespace brian {\nextern std::map<std::string, std::string> command_line_values;\n}\n\nvoid brian_start();\nvoid brian_end();\nvoid set_from_command_line(const std::vector<std::string>& args);\n\n#endif\n";
        GeneratedSource::new(cpp).with_header(h)
    }

    fn makefile(
        &self,
        spec: &MakefileSpec,
    ) -> String {
        format!(
            r#"PROGRAM = wasm_module.js
SRCS = {sources}
H_SRCS = {headers}
OBJS = ${{SRCS:.cpp=.o}}
DEPS = make.deps
EMSDK = {emsdk}
EMSDK_VERSION = {version}
ACTIVATE = . $(EMSDK)/emsdk_env.sh > /dev/null 2>&1 &&

all: $(PROGRAM)

.PHONY: all clean activate

activate:
	cd $(EMSDK) && ./emsdk activate $(EMSDK_VERSION)

$(DEPS): $(SRCS) $(H_SRCS)
	$(ACTIVATE) em++ {cflags} -MM $(SRCS) > $(DEPS)

-include $(DEPS)

$(PROGRAM): $(OBJS) $(DEPS) makefile {preamble} {library}
	$(ACTIVATE) em++ $(OBJS) -o $(PROGRAM) {lflags} {ldebug} -sMODULARIZE=1 -sEXPORT_NAME=Module -sENVIRONMENT=worker -sINVOKE_RUN=0 -sALLOW_MEMORY_GROWTH=1 -sEXPORTED_RUNTIME_METHODS=callMain,FS --pre-js {preamble} --js-library {library} {preloads}

%.o : %.cpp makefile
	$(ACTIVATE) em++ {cflags} {cdebug} -c $< -o $@

clean:
	{rm}
"#,
            sources = spec.source_files,
            headers = spec.header_files,
            emsdk = spec.emsdk_path,
            version = spec.emsdk_version,
            cflags = spec.compiler_flags,
            cdebug = spec.compiler_debug_flags,
            lflags = spec.linker_flags,
            ldebug = spec.linker_debug_flags,
            preamble = spec.preamble_file,
            library = spec.library_file,
            preloads = spec.preloads,
            rm = spec.rm_cmd,
        )
    }

    fn win_makefile(
        &self,
        spec: &MakefileSpec,
    ) -> String {
        format!(
            r#"PROGRAM = wasm_module.js
SRCS = {sources}
H_SRCS = {headers}
OBJS = $(SRCS:.cpp=.o)
EMSDK = {emsdk}
EMSDK_VERSION = {version}
ACTIVATE = call "$(EMSDK)\emsdk_env.bat" > NUL &&

all: $(PROGRAM)

$(PROGRAM): $(OBJS)
	$(ACTIVATE) em++ $(OBJS) -o $(PROGRAM) {lflags} {ldebug} -sMODULARIZE=1 -sEXPORT_NAME=Module -sENVIRONMENT=worker -sINVOKE_RUN=0 -sALLOW_MEMORY_GROWTH=1 -sEXPORTED_RUNTIME_METHODS=callMain,FS --pre-js {preamble} --js-library {library} {preloads}

.cpp.o:
	$(ACTIVATE) em++ {cflags} {cdebug} -c $< -o $@

clean:
	del /Q $(OBJS) $(PROGRAM)
"#,
            sources = spec.source_files,
            headers = spec.header_files,
            emsdk = spec.emsdk_path,
            version = spec.emsdk_version,
            cflags = spec.compiler_flags,
            cdebug = spec.compiler_debug_flags,
            lflags = spec.linker_flags,
            ldebug = spec.linker_debug_flags,
            preamble = spec.preamble_file,
            library = spec.library_file,
            preloads = spec.preloads,
        )
    }

    fn html_page(
        &self,
        content: &HtmlContent,
    ) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>{title}</title>
    <script src="https://cdn.plot.ly/plotly-2.27.0.min.js" charset="utf-8"></script>
    <script src="brian.js"></script>
</head>
<body>
    <h1>{h1}</h1>
    <h2>{h2}</h2>
    <p>{description}</p>
    <button id="brian_run_button" onclick="brian_simulation.run()">Run simulation</button>
    <progress id="brian_progress_bar" value="0" max="1"></progress>
    <span id="brian_progress_text"></span>
    <div id="brian_canvas" style="width: {width}; height: {height};"></div>
    <script>
        let brian_simulation = new BrianSimulation([{{type: 'raster', canvas: 'brian_canvas'}}]);
        brian_simulation.init();
    </script>
</body>
</html>
"#,
            title = content.title,
            h1 = content.h1,
            h2 = content.h2,
            description = content.description,
            width = content.canvas_width,
            height = content.canvas_height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::network::{Network, NetworkObject};
    use std::path::PathBuf;

    #[test]
    fn test_main_embeds_lines_and_bridge() {
        let lines = vec!["network.clear();", "network.run(1.0, NULL, 10.0);"];
        let ctx = MainContext {
            main_lines: lines,
            report_func: "",
            headers: &["<emscripten.h>".to_string()],
            code_objects: Vec::new(),
            networks: Vec::new(),
        };
        let main = DefaultTemplater.main(&ctx);
        assert!(main.cpp.contains("        network.run(1.0, NULL, 10.0);"));
        assert!(main.cpp.contains("#include <emscripten.h>"));
        assert!(main.cpp.contains("double send_spike(int i, double t)"));
        assert!(main.h.is_none());
    }

    #[test]
    fn test_run_defines_command_line_parser() {
        let run = DefaultTemplater.run(&[]);
        assert!(run.cpp.contains("#include <iostream>"));
        assert!(run
            .cpp
            .contains("void set_from_command_line(const std::vector<std::string>& args)\n{"));
        assert!(run.cpp.contains("arg.find('=')"));
        let h = run.h.unwrap();
        assert!(h.contains("void set_from_command_line(const std::vector<std::string>& args);"));
        assert!(h.contains("#include <vector>"));
    }

    #[test]
    fn test_objects_declares_clocks_and_networks() {
        let mut clocks = ClockRegistry::new();
        clocks.ensure("clock");
        let net = Network::new("magicnetwork").with_object(NetworkObject::new("n", "clock"));
        let mut namespace = crate::device::options::Namespace::new();
        namespace.insert("tau".to_string(), serde_json::json!(0.01));
        namespace.insert("label".to_string(), serde_json::json!("skipped"));
        let ctx = ObjectsContext {
            clocks: &clocks,
            networks: vec![&net],
            synapses: &[],
            static_arrays: vec!["_static_array_w"],
            code_objects: Vec::new(),
            headers: &[],
            profiled: false,
            transfer_results: None,
            results_dir: "/tmp/out/results/",
            namespace: &namespace,
        };
        let objects = DefaultTemplater.objects(&ctx);
        assert!(objects.cpp.contains("const double tau = 0.01;"));
        assert!(objects.cpp.contains("Clock _clock(0.0001);"));
        assert!(objects.cpp.contains("Network magicnetwork;"));
        assert!(objects.cpp.contains("static_arrays/_static_array_w"));
        assert!(objects.h.unwrap().contains("extern Clock _clock;"));
    }

    #[test]
    fn test_makefile_substitutions() {
        let spec = MakefileSpec::new(
            ["main.cpp"],
            ["objects.h"],
            &["-w".to_string()],
            &[],
            true,
            "--preload-file static_arrays/a".to_string(),
            &PathBuf::from("/b/pre.js"),
            &PathBuf::from("/b/brian_library.js"),
            &PathBuf::from("/opt/emsdk"),
            "latest",
        );
        let text = DefaultTemplater.makefile(&spec);
        assert!(text.contains("SRCS = main.cpp\n"));
        assert!(text.contains("EMSDK = /opt/emsdk\n"));
        assert!(text.contains("--pre-js /b/pre.js"));
        assert!(text.contains("--preload-file static_arrays/a"));
        assert!(text.contains("em++ -w -g -DDEBUG -c"));
        assert!(text.contains("rm $(OBJS) $(PROGRAM) $(DEPS)"));
    }

    #[test]
    fn test_html_page_uses_content() {
        let page = DefaultTemplater.html_page(&HtmlContent::default());
        assert!(page.contains("<title>Brian simulation</title>"));
        assert!(page.contains("width: 95%; height: 500px;"));
    }
}
