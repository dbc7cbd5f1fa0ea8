//! Network Diagnostics - Main CLI Application
//!
//! Runs repeated passes of bufferbloat, jitter, route, MTU, DNS and NAT
//! checks against a public iperf3 server and summarizes the results.

use clap::Parser;
use link_diagnostics::{
    app::{install_panic_hook, App},
    cli::Cli,
    error::AppError,
};
use std::process;

#[tokio::main]
async fn main() {
    install_panic_hook();

    let cli = Cli::parse();
    let use_color = cli.use_colors();

    let result = match App::new(cli) {
        Ok(app) => app.run().await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("{}", e.format_for_console(use_color));
        print_error_suggestions(&e);
        process::exit(e.exit_code());
    }
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) | AppError::Validation(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Check your .env file format");
            eprintln!("  - Resolver addresses must be IP literals (e.g. 1.1.1.1,8.8.8.8)");
            eprintln!("  - --runs and --parallel must be at least 1");
        }
        AppError::StartupDependencyMissing(_) => {
            eprintln!();
            eprintln!("Required tools: ping, iperf3 (mtr is needed for route tracing)");
            eprintln!("  - Debian/Ubuntu: sudo apt install iputils-ping iperf3 mtr-tiny");
            eprintln!("  - macOS: brew install iperf3 mtr");
        }
        AppError::Io(_) => {
            eprintln!();
            eprintln!("Report file help:");
            eprintln!("  - Choose a writable location with --output");
            eprintln!("  - Or skip the report with --no-output");
        }
        _ => {}
    }
}
