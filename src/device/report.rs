//! Progress report function resolution
//!
//! A run may request progress reporting. The requested kind is turned into
//! native source text for a `report_progress` function that is compiled into
//! the module; it both posts `progress` messages over the bridge and, for the
//! built-in kinds, prints human-readable lines.

use serde_json::Value;

use crate::error::{DeviceError, DeviceResult};

/// Requested progress reporting for a run
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Report {
    /// No reporting
    #[default]
    None,
    /// Human-readable lines on standard output (`"text"` or `"stdout"`)
    Stdout,
    /// Human-readable lines on standard error
    Stderr,
    /// Verbatim body of a `report_progress` callback
    Custom(String),
}

impl Report {
    /// Resolve a report argument given as a dynamic value.
    ///
    /// `null` means no reporting, strings are resolved with [`Report::from`],
    /// anything else is rejected.
    pub fn from_value(value: &Value) -> DeviceResult<Self> {
        match value {
            Value::Null => Ok(Report::None),
            Value::String(s) => Ok(Report::from(s.as_str())),
            other => Err(DeviceError::InvalidReportKind(other.to_string())),
        }
    }

    /// Native source of the report function, empty when no reporting is requested
    pub fn function_source(&self) -> String {
        match self {
            Report::None => String::new(),
            Report::Stdout => STANDARD_REPORT.replace("%STREAMNAME%", "std::cout"),
            Report::Stderr => STANDARD_REPORT.replace("%STREAMNAME%", "std::cerr"),
            Report::Custom(body) => CUSTOM_REPORT.replace("%REPORT%", body),
        }
    }
}

impl From<&str> for Report {
    fn from(s: &str) -> Self {
        match s {
            "text" | "stdout" => Report::Stdout,
            "stderr" => Report::Stderr,
            code => Report::Custom(code.to_string()),
        }
    }
}

impl From<Option<&str>> for Report {
    fn from(s: Option<&str>) -> Self {
        s.map(Report::from).unwrap_or_default()
    }
}

/// Name of the callback passed to the network's run call
pub fn report_call(report_func: &str) -> &'static str {
    if report_func.is_empty() {
        "NULL"
    } else {
        "report_progress"
    }
}

const STANDARD_REPORT: &str = r#"
std::string _format_time(float time_in_s)
{
    float divisors[] = {24*60*60, 60*60, 60, 1};
    char letters[] = {'d', 'h', 'm', 's'};
    float remaining = time_in_s;
    std::string text = "";
    int time_to_represent;
    for (int i =0; i < sizeof(divisors)/sizeof(float); i++)
    {
        time_to_represent = int(remaining / divisors[i]);
        remaining -= time_to_represent * divisors[i];
        if (time_to_represent > 0 || text.length())
        {
            if(text.length() > 0)
            {
                text += " ";
            }
            text += (std::to_string(time_to_represent)+letters[i]);
        }
    }
    //less than one second
    if(text.length() == 0)
    {
        text = "< 1s";
    }
    return text;
}
void report_progress(const double elapsed, const double completed, const double start, const double duration)
{
    // Send progress to javascript
    EM_ASM({
    (postMessage({ type: 'progress', elapsed: $0, completed: $1, start: $2, duration: $3}));
    }, elapsed, completed, start, duration);
    if (completed == 0.0)
    {
        %STREAMNAME% << "Starting simulation at t=" << start << " s for duration " << duration << " s";
    } else
    {
        %STREAMNAME% << completed*duration << " s (" << (int)(completed*100.) << "%) simulated in " << _format_time(elapsed) << " (" << elapsed << "s)";
        if (completed < 1.0)
        {
            const int remaining = (int)((1-completed)/completed*elapsed+0.5);
            %STREAMNAME% << ", estimated " << _format_time(remaining) << " remaining.";
        }
    }

    %STREAMNAME% << std::endl << std::flush;
}
"#;

const CUSTOM_REPORT: &str = r#"
void report_progress(const double elapsed, const double completed, const double start, const double duration)
{
%REPORT%
}
"#;
