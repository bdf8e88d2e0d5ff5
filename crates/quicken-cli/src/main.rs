//! `quicken` - rewrite a test file until it runs faster
//!
//! Exit codes: 0 on success, 1 for search failures, 2 for usage errors,
//! 3 for configuration errors.

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use quicken_core::{
    MutationCatalog, MutationSearch, ProcessRunner, QuickenError, SearchConfig, SearchReport,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("quicken")
        .version(quicken_core::VERSION)
        .about("Mutate a test file until its tests still pass and run faster")
        .arg(
            Arg::new("path")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Path to the test file to optimize (rewritten in place)"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_parser(value_parser!(PathBuf))
                .help("TOML file with search settings and extra rules"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_parser(value_parser!(u64))
                .help("Random seed for reproducible rule selection"),
        )
        .arg(
            Arg::new("max-generations")
                .long("max-generations")
                .value_parser(value_parser!(u32))
                .help("Stop once the generation counter exceeds this"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_parser(value_parser!(f64))
                .help("Kill a test run after this many seconds"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Print the search report as JSON"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help("Raise log level (-v debug, -vv trace)"),
        )
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Build the configuration from the optional file and flag overrides
fn load_config(matches: &ArgMatches) -> anyhow::Result<SearchConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => SearchConfig::from_file(path)
            .map_err(QuickenError::from)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SearchConfig::new(),
    };

    if let Some(seed) = matches.get_one::<u64>("seed") {
        config = config.with_seed(*seed);
    }
    if let Some(max) = matches.get_one::<u32>("max-generations") {
        config = config.with_max_generations(*max);
    }
    if let Some(secs) = matches.get_one::<f64>("timeout") {
        config.evaluation_timeout_secs = Some(*secs);
    }
    config.validate().map_err(QuickenError::from)?;
    Ok(config)
}

async fn run(matches: &ArgMatches) -> anyhow::Result<SearchReport> {
    let path = matches
        .get_one::<PathBuf>("path")
        .cloned()
        .expect("`path` is a required argument");

    let config = load_config(matches)?;
    let catalog = MutationCatalog::from_config(&config).map_err(QuickenError::from)?;
    let runner =
        ProcessRunner::new(config.command.clone()).with_timeout(config.evaluation_timeout());

    tracing::info!(
        rules = catalog.len(),
        "Running tests first to compute original test execution time. This may take a minute."
    );
    let report = MutationSearch::new(path, config, catalog, Arc::new(runner))
        .run()
        .await?;
    Ok(report)
}

fn print_report(report: &SearchReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!(
        "Improved test execution time from {:.3} s to {:.3} s",
        report.original_secs(),
        report.final_secs
    );
    if report.modified() {
        println!(
            "New source code has been written to {}; see git diff for changes.",
            report.target.display()
        );
    } else {
        println!(
            "No faster variant found; {} is unchanged.",
            report.target.display()
        );
    }
    Ok(())
}

fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<QuickenError>()
        .map_or(1, |e| i32::from(e.exit_code()))
}

#[tokio::main]
async fn main() {
    let matches = match cli().try_get_matches() {
        Ok(matches) => matches,
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => {
            let _ = err.print();
            let usage = QuickenError::Usage(err.to_string());
            std::process::exit(i32::from(usage.exit_code()));
        }
    };

    init_tracing(matches.get_count("verbose"));

    let outcome = match run(&matches).await {
        Ok(report) => print_report(&report, matches.get_flag("json")),
        Err(err) => Err(err),
    };

    if let Err(err) = outcome {
        eprintln!("error: {err:#}");
        if err
            .downcast_ref::<QuickenError>()
            .is_some_and(QuickenError::target_untouched)
        {
            eprintln!("The test file was not modified.");
        }
        std::process::exit(exit_code(&err));
    }
}
