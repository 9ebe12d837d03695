// src/main.rs

use anyhow::{Context, Result};
use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use punchsync::odoo_client::{OdooClient, OdooConfig};
use punchsync::punches::read_punch_file;
use punchsync::reconcile::{AutoCreate, DeclineAll, ResolutionPrompt, TerminalPrompt};
use punchsync::report::{build_report, print_report, write_summary_csv, DEFAULT_REPORT_DIR};
use punchsync::sessions::aggregate_sessions;
use punchsync::workflow::run_import;

#[derive(Parser, Debug)]
#[command(
    name = "punchsync",
    version,
    about = "Turns time-clock punches into Odoo attendance records"
)]
struct Cli {
    /// Punch log exported from the time clock (CSV with AC-No., Time, State)
    input: PathBuf,

    #[arg(long, default_value = DEFAULT_REPORT_DIR, help = "Where to write attendance_summary.csv")]
    report_dir: PathBuf,

    #[arg(long, default_value_t = false, help = "Print the analysis and stop before contacting Odoo")]
    analyze_only: bool,

    #[arg(long, conflicts_with = "no_create", help = "Create unknown employees without asking")]
    create_missing: bool,

    #[arg(long, help = "Never create employees; stop if any badge id is unknown")]
    no_create: bool,

    #[arg(short, long, help = "Enable debug logging")]
    verbose: bool,
}

fn init_tracing(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Setting tracing subscriber failed")
}

fn choose_prompt(cli: &Cli) -> Box<dyn ResolutionPrompt> {
    if cli.create_missing {
        Box::new(AutoCreate)
    } else if cli.no_create {
        Box::new(DeclineAll)
    } else {
        Box::new(TerminalPrompt::stdio())
    }
}

async fn run(cli: Cli) -> Result<()> {
    let punches = read_punch_file(&cli.input)
        .with_context(|| format!("Failed to read punch log {}", cli.input.display()))?;
    let sessions = aggregate_sessions(&punches);
    info!(
        "Read {} punches, {} attendance sessions",
        punches.len(),
        sessions.len()
    );

    let mut stdout = io::stdout();
    let Some(report) = build_report(&sessions) else {
        println!("No attendance records to analyze");
        return Ok(());
    };
    let summary_path = write_summary_csv(&report, &cli.report_dir).with_context(|| {
        format!(
            "Failed to write attendance summary to {}",
            cli.report_dir.display()
        )
    })?;
    print_report(&mut stdout, &report, &sessions, Some(&summary_path))?;

    if cli.analyze_only {
        return Ok(());
    }

    let config = OdooConfig::from_env().context("Failed to load Odoo configuration")?;
    let client = OdooClient::connect(config)
        .await
        .context("Failed to connect to Odoo")?;
    info!("Connected to Odoo as uid {}", client.uid());

    let mut prompt = choose_prompt(&cli);
    run_import(&client, prompt.as_mut(), &sessions, &mut stdout).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("Error: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
