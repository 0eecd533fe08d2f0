//! codegrep - parallel source-code search
//!
//! Entry point for the CLI application: argument assembly (rc files plus
//! command line), configuration, signal handling, and exit-code mapping.

use clap::error::ErrorKind;
use clap::Parser;
use codegrep::config::{self, CliArgs, SearchConfig};
use codegrep::coordinator::SearchCoordinator;
use codegrep::error::SearchError;
use codegrep::output::{self, stdout_printer};
use codegrep::types::TypeManager;
use std::process::ExitCode;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Exit status for usage and configuration errors
const STATUS_USAGE: u8 = 255;

fn main() -> ExitCode {
    match run() {
        Ok(found_match) => {
            if found_match {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn run() -> Result<bool, SearchError> {
    let cli: Vec<String> = std::env::args().collect();

    // Fold rc files into the argv, then let the type-shaping options run
    // before clap: its option table is static, type names are not.
    let mut combined = config::assemble_argv(&cli)?;

    let mut types = TypeManager::with_default_types();
    config::apply_type_arguments(&mut combined, &mut types)?;

    let args = match CliArgs::try_parse_from(&combined) {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            // clap renders these itself; they are not errors.
            print!("{}", e);
            return Ok(true);
        }
        Err(e) => {
            eprint!("{}", e);
            std::process::exit(STATUS_USAGE as i32);
        }
    };

    setup_logging(args.verbose);

    if args.help_types {
        output::print_help_types(&types);
        return Ok(true);
    }

    let (search_config, types) = SearchConfig::build(args, types)?;

    run_search(search_config, types)
}

fn run_search(config: SearchConfig, types: TypeManager) -> Result<bool, SearchError> {
    let mut printer = stdout_printer(&config);

    let coordinator = SearchCoordinator::new(config, types);

    // First interrupt: close the queues and let the pipeline drain.
    // Second interrupt: force exit.
    let shutdown = coordinator.shutdown_handle();
    let interrupts = Arc::new(AtomicU32::new(0));
    let interrupts_handler = Arc::clone(&interrupts);
    ctrlc::set_handler(move || {
        let count = interrupts_handler.fetch_add(1, Ordering::SeqCst);
        if count == 0 {
            eprintln!("\nInterrupt received, finishing in-flight work...");
            shutdown.shutdown();
        } else {
            eprintln!("\nForced exit!");
            std::process::exit(130);
        }
    })
    .map_err(|e| SearchError::Io(std::io::Error::other(e)))?;

    let summary = coordinator.run(|file_matches| {
        if let Err(e) = printer.print_file(&file_matches) {
            // stdout is gone (broken pipe); nothing sensible left to print.
            error!(error = %e, "Failed to write match output");
        }
    })?;

    printer
        .finish()
        .map_err(SearchError::Io)?;

    Ok(summary.lines_matched > 0)
}

fn setup_logging(verbose: bool) {
    let default_filter = if verbose {
        "codegrep=debug"
    } else {
        "codegrep=warn"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
