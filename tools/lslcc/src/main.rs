// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! # Usage
//!
//! ```bash
//! lslcc --trace-entry --indent-width 4 script.lsl other.lsl > out.lsl
//! ```

use std::path::PathBuf;

use clap::Parser;
use clap_derive::Parser;
use eyre::bail;
use figment::{
    Figment,
    providers::{Format, Serialized, Yaml},
};
use lsl_compiler::{CompileError, Node, UnparseOptions, parse_program, trace_entry, unparse_with};
use serde_derive::{Deserialize, Serialize};
use tracing::{debug, error, info};
use tracing_subscriber::fmt::format::FmtSpan;

/// Parse LSL scripts and print them back out in canonical form
#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(name = "lslcc")]
#[command(version)]
struct Args {
    /// Scripts to process, in order
    files: Vec<PathBuf>,

    /// Insert a diagnostic call at the start of every function body
    #[arg(long, default_value = "false")]
    trace_entry: bool,

    /// Function the inserted diagnostic calls invoke
    #[arg(long, default_value = "llOwnerSay")]
    diagnostic_function: String,

    /// Spaces per indentation level in the output
    #[arg(long, default_value_t = 2)]
    indent_width: usize,

    /// Enable debug logging (logs go to stderr; rendered scripts go to stdout)
    #[arg(long, default_value = "false")]
    debug: bool,

    /// YAML config file to use (overrides CLI args)
    #[arg(long)]
    config_file: Option<String>,
}

fn render(source: &str, args: &Args) -> Result<String, CompileError> {
    let mut script = parse_program(source)?;
    if args.trace_entry {
        let count = trace_entry(&mut script, &args.diagnostic_function)?;
        debug!(count, "instrumented functions");
    }
    let options = UnparseOptions {
        indent_width: args.indent_width,
    };
    Ok(unparse_with(&Node::Script(script), &options))
}

fn setup_logging(debug: bool) {
    let main_subscriber = tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_thread_names(false)
        .with_span_events(FmtSpan::NONE)
        .with_max_level(if debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .finish();
    tracing::subscriber::set_global_default(main_subscriber).unwrap_or_else(|e| {
        eprintln!("Unable to set configure logging: {e}");
        std::process::exit(1);
    });
}

fn main() -> Result<(), eyre::Report> {
    color_eyre::install()?;

    let cli_args = Args::parse();
    let config_file = cli_args.config_file.clone();
    let mut args_figment = Figment::new().merge(Serialized::defaults(cli_args));
    if let Some(config_file) = config_file {
        args_figment = args_figment.merge(Yaml::file(config_file));
    }
    let args: Args = args_figment.extract()?;

    setup_logging(args.debug);

    if args.files.is_empty() {
        bail!("No input files given");
    }

    let mut failed = 0;
    for path in &args.files {
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                error!("Unable to read {}: {e}", path.display());
                failed += 1;
                continue;
            }
        };
        match render(&source, &args) {
            Ok(rendered) => {
                info!("Rendered {}", path.display());
                println!("{rendered}");
            }
            Err(e) => {
                error!("Failed to compile {}: {e}", path.display());
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} files failed", args.files.len());
    }
    Ok(())
}
