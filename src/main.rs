//! Brian2WASM - CLI

use anyhow::{bail, Result};
use brian2wasm::launch::NO_SERVER_ENV;
use brian2wasm::toolchain::ToolchainReport;
use brian2wasm::util::logger;
use brian2wasm::{build_file, NAME, VERSION};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::path::PathBuf;

/// Build and run generated spiking network simulations in the browser
#[derive(Parser, Debug)]
#[command(name = "brian2wasm")]
#[command(author = "Brian2WASM Team")]
#[command(version = VERSION)]
#[command(about = NAME, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a model description and open it in the browser
    Build {
        /// Model description (JSON)
        #[arg(value_name = "MODEL")]
        model: PathBuf,

        /// Build directory (defaults to the model's settings or a temporary directory)
        #[arg(short, long)]
        directory: Option<PathBuf>,

        /// Generate and compile without starting the preview server
        #[arg(long)]
        no_server: bool,

        /// Only generate the build directory
        #[arg(long)]
        no_compile: bool,

        /// Compile with debug flags
        #[arg(long)]
        debug: bool,

        /// Run `make clean` before compiling
        #[arg(long)]
        clean: bool,
    },

    /// Check the emsdk installation
    Doctor,

    /// Print version information
    Version,
}

fn doctor() -> Result<()> {
    let report = ToolchainReport::inspect();
    let check = |ok: bool, what: &str| {
        if ok {
            println!("{} {}", "✓".green(), what);
        } else {
            println!("{} {}", "✗".red(), what);
        }
    };
    check(report.installed(), "emsdk installed");
    check(report.upstream_installed, "emsdk upstream toolchain present");
    check(report.sourced(), "emcc and emrun on PATH");

    if !report.installed() {
        println!("{}", "Install emsdk with: conda install emsdk -c conda-forge".yellow());
        bail!("emsdk not found");
    }
    if !report.upstream_installed {
        println!("{}", "Install the toolchain with: emsdk install latest && emsdk activate latest".yellow());
        bail!("emsdk toolchain not installed");
    }
    if !report.sourced() {
        println!("{} {}", "Activate emsdk with:".yellow(), report.activation_hint());
        bail!("emsdk not activated");
    }
    println!("{}", "Toolchain ready".bold());
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    logger::init_cli(args.verbose);

    if args.verbose {
        eprintln!("{} version: {}", NAME, VERSION);
        eprintln!("Host: {}", std::env::consts::OS);
    }

    match args.command {
        Commands::Build {
            model,
            directory,
            no_server,
            no_compile,
            debug,
            clean,
        } => {
            if !model.is_file() {
                bail!("Model file not found: {}", model.display());
            }
            if no_server {
                std::env::set_var(NO_SERVER_ENV, "1");
            }
            let report = build_file(&model, |options| {
                if let Some(directory) = directory {
                    options.directory = Some(directory);
                }
                options.debug |= debug;
                options.clean |= clean;
                options.compile &= !no_compile;
            })?;
            if let Some(report) = report {
                println!("{} {}", "Built".green().bold(), report.directory.display());
            }
        }
        Commands::Doctor => {
            doctor()?;
        }
        Commands::Version => {
            println!("{} {}", NAME, VERSION);
        }
    }

    Ok(())
}
