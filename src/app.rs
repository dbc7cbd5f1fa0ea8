//! Main application orchestration and execution

use crate::{
    cli::Cli,
    config::{display_config_summary, load_config, validate_config},
    error::Result,
    executor::{PassOutcome, PassRunner, PassSettings, RunScheduler},
    logging::{Logger, LoggerFactory},
    models::{Config, ServerCatalog},
    output::{OutputFormatter, OutputFormatterFactory, ReportSink},
    probe::{check_dependencies, ProbeAdapter, SystemProbes},
    selector::{EndpointSelector, Selection},
    stats::{AggregateReport, Aggregator},
};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Install a panic hook that reports the panic without ending the process
///
/// Passes run on spawned tasks; the scheduler turns a panicking pass into a
/// failed run, so the hook must leave the process alive.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        eprintln!("Please report this issue together with the command line you used.");
    }));
}

/// Main application struct that coordinates all components
pub struct App {
    cli: Cli,
}

impl App {
    /// Create a new application instance with CLI configuration
    pub fn new(cli: Cli) -> Result<Self> {
        Ok(Self { cli })
    }

    /// Run the application
    pub async fn run(self) -> Result<()> {
        if self.cli.list_servers {
            println!("Available iperf3 servers:");
            for line in ServerCatalog::builtin().listing() {
                println!("  {}", line);
            }
            return Ok(());
        }

        check_dependencies()?;

        let config = load_config(self.cli.clone())?;
        let formatter = OutputFormatterFactory::create_formatter(config.enable_color);
        let factory = LoggerFactory::new(config.clone());
        let logger = factory.create_logger("APP").await;

        println!("{}", formatter.format_header(&format!("Network Diagnostics v{}", crate::VERSION))?);

        for warning in validate_config(&config)? {
            println!("  {}", warning.format(config.enable_color));
        }

        if config.debug {
            println!(
                "{} v{} (built {}, commit {}, {})",
                crate::PKG_NAME,
                crate::VERSION,
                crate::BUILD_TIME,
                crate::GIT_COMMIT,
                crate::TARGET_TRIPLE
            );
            println!("\nConfiguration Summary:");
            println!("{}", display_config_summary(&config));
        }

        let probes: Arc<dyn ProbeAdapter> = Arc::new(SystemProbes::new(&config)?);
        let selection = select_endpoint(&config, Arc::clone(&probes), &factory).await?;
        println!("{}", formatter.format_selection(&selection)?);

        let (lanes, _) = config.effective_parallel();
        logger
            .info("Starting diagnostic runs")
            .field("runs", config.runs)
            .field("parallel", lanes)
            .field("server", selection.to_string())
            .log()
            .await;

        let settings = PassSettings::from_config(&config)?;
        let runner = Arc::new(PassRunner::new(probes, selection, settings, &config));

        let report = match &config.output_path {
            Some(path) => Some(Arc::new(ReportSink::create(path).await?)),
            None => None,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let mut scheduler = RunScheduler::new(runner, &config).with_progress(tx);
        if let Some(report) = &report {
            scheduler = scheduler.with_report(Arc::clone(report));
        }

        let printer = tokio::spawn(print_progress(rx, OutputFormatterFactory::create_formatter(config.enable_color)));
        let outcomes = scheduler.run(config.runs, lanes).await;
        drop(scheduler);
        if let Err(e) = printer.await {
            logger.warn(&format!("Progress printer stopped: {}", e)).log().await;
        }

        let aggregate = Aggregator::aggregate(&outcomes);

        match outcomes.as_slice() {
            [Ok(pass)] if config.runs == 1 => println!("{}", formatter.format_final_summary(pass)?),
            _ => println!("{}", formatter.format_statistical_summary(&aggregate)?),
        }

        if let Some(report) = &report {
            finish_report(report, &aggregate, formatter.as_ref(), &logger).await;
        }

        logger
            .info("Diagnostics complete")
            .field("successful_runs", aggregate.successful_runs)
            .field("failed_runs", aggregate.failed.len())
            .log()
            .await;

        Ok(())
    }
}

/// Write the report footer; a failure here only costs the footer, the
/// measurements are already printed.
async fn finish_report(report: &ReportSink, aggregate: &AggregateReport, formatter: &dyn OutputFormatter, logger: &Logger) -> bool {
    match report.finish(aggregate).await {
        Ok(()) => {
            println!("{}", formatter.format_success(&format!("Results saved to {}", report.path().display())));
            true
        }
        Err(e) => {
            println!(
                "{}",
                formatter.format_warning(&format!("Could not finish report {}: {}", report.path().display(), e))
            );
            logger.warn("Report footer not written").error_info(&e).log().await;
            false
        }
    }
}

async fn select_endpoint(config: &Config, probes: Arc<dyn ProbeAdapter>, factory: &LoggerFactory) -> Result<Selection> {
    let selector = EndpointSelector::new(ServerCatalog::builtin(), probes)
        .with_logger(factory.create_logger("SELECT").await);

    match &config.iperf3_server {
        Some(host) => selector.select_named(host).await,
        None => selector.select().await,
    }
}

/// Print each pass as soon as it finishes
async fn print_progress(mut rx: mpsc::UnboundedReceiver<PassOutcome>, formatter: Box<dyn OutputFormatter>) {
    while let Some(outcome) = rx.recv().await {
        let rendered = match &outcome {
            Ok(pass) => formatter.format_pass(pass),
            Err(failure) => formatter.format_pass_failure(failure),
        };
        match rendered {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("{}", formatter.format_error(&e.to_string())),
        }
    }
}
