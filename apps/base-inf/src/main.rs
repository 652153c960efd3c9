mod cli;

use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use baseinf_core::StopReason;
use clap::CommandFactory;
use llama_rs::{LlamaBackend, LlamaModel};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::cli::Args;

fn main() -> ExitCode {
    let args = match Args::try_parse_args(std::env::args_os()) {
        Ok(args) => args,
        Err(err) if !err.use_stderr() => {
            // --help / --version
            let _ = err.print();
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            eprintln!("{err}");
            eprintln!("{}", Args::command().render_help());
            return ExitCode::from(1);
        }
    };

    init_tracing(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run(args: &Args) -> Result<()> {
    let config = args.run_config();
    debug!("[main] {config:?}");

    let _backend = LlamaBackend::init();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let report = baseinf_core::run::<LlamaModel, _>(&config, &mut out)
        .with_context(|| format!("inference with {} failed", config.model_path.display()))?;

    debug!(
        "[main] n_decode={} n_past={} n_pending={} stopped_at_eog={}",
        report.n_decode,
        report.n_past,
        report.n_pending,
        report.stop == StopReason::EndOfGeneration
    );
    Ok(())
}
