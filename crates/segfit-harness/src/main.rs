//! CLI entrypoint for segfit trace tooling.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use segfit_core::HeapConfig;
use segfit_harness::{synthesize, TraceFileV1, TraceRunner, Workload};

/// CLI for synthesizing and replaying allocation traces.
#[derive(Debug, Parser)]
#[command(name = "segfit-harness")]
#[command(about = "Trace tooling for the segfit allocator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Supported CLI subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a deterministic synthetic trace.
    Synth {
        /// Workload family to generate.
        #[arg(long, value_enum)]
        workload: Workload,
        /// Approximate operation count.
        #[arg(long, default_value_t = 10_000)]
        ops: usize,
        /// PRNG seed.
        #[arg(long, default_value_t = 0xDEAD_BEEF)]
        seed: u64,
        /// Output trace path.
        #[arg(long)]
        output: PathBuf,
    },
    /// Replay a trace and emit a report.
    Run {
        /// Input trace path.
        #[arg(long)]
        trace: PathBuf,
        /// Optional report output path; the report always goes to stdout.
        #[arg(long)]
        report_json: Option<PathBuf>,
        /// Run the checker every N operations (0 disables periodic checks).
        #[arg(long, default_value_t = 64)]
        check_every: usize,
    },
}

fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Synth {
            workload,
            ops,
            seed,
            output,
        } => {
            let trace = synthesize(workload, ops, seed);
            fs::write(output, serde_json::to_string_pretty(&trace)?)?;
        }
        Command::Run {
            trace,
            report_json,
            check_every,
        } => {
            let body = fs::read_to_string(trace)?;
            let trace: TraceFileV1 = serde_json::from_str(&body).map_err(std::io::Error::other)?;
            let report = TraceRunner::new(check_every)
                .replay(&trace, HeapConfig::from_env())
                .map_err(std::io::Error::other)?;
            println!("{}", report.to_json());
            if let Some(path) = report_json {
                fs::write(path, report.to_json())?;
            }
            if !report.passed() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
