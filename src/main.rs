use std::path::PathBuf;

use anyhow::Context;
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use clap::{ArgGroup, Args, Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod alerts;
mod config;
mod error;
mod models;
mod reader;
mod report;

use config::AlertConfig;
use models::AlertReport;
use report::ReportFormat;

#[derive(Parser)]
#[command(name = "agreement-alert")]
#[command(about = "Deadline alerts for framework agreement renewals", long_about = None)]
struct Cli {
    /// TOML file overriding the column layout and department
    #[arg(long, global = true, env = "AGREEMENT_ALERT_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
#[command(group(
    ArgGroup::new("scope")
        .args(["department", "all_departments"])
        .multiple(false)
))]
struct AnalysisArgs {
    /// CSV export of the tracking sheet
    #[arg(long)]
    input: PathBuf,
    /// Only analyse records owned by this department
    #[arg(long)]
    department: Option<String>,
    /// Analyse every department
    #[arg(long)]
    all_departments: bool,
    /// Judge deadlines as of this moment instead of the current time
    #[arg(long, value_parser = parse_as_of)]
    as_of: Option<NaiveDateTime>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the alert summary
    Analyze {
        #[command(flatten)]
        args: AnalysisArgs,
    },
    /// Write the alert report to a file
    Report {
        #[command(flatten)]
        args: AnalysisArgs,
        #[arg(long, value_enum, default_value_t = ReportFormat::Html)]
        format: ReportFormat,
        /// Defaults to a timestamped file in the working directory
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Show the first rows of the input and where the key columns were found
    Inspect {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value_t = 5)]
        rows: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = AlertConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Commands::Analyze { args } => {
            let (report, _) = run_analysis(&args, &config)?;
            print!("{}", report::build_summary(&report));
        }
        Commands::Report { args, format, out } => {
            let (report, department) = run_analysis(&args, &config)?;
            let content = match format {
                ReportFormat::Html => report::build_html(&report, department.as_deref()),
                ReportFormat::Json => report::build_json(&report)?,
            };
            let out = out.unwrap_or_else(|| {
                PathBuf::from(report::output_file_name(report.generated_at, format))
            });

            std::fs::write(&out, content)
                .with_context(|| format!("failed to write {}", out.display()))?;
            tracing::info!(
                path = %out.display(),
                subject = %report::subject(report.generated_at),
                "report written"
            );
            println!("Report written to {}.", out.display());
            print!("{}", report::build_summary(&report));
        }
        Commands::Inspect { input, rows } => {
            let survey = reader::survey_columns(&input, &config, rows)?;

            for (index, row) in survey.preview.iter().enumerate() {
                println!("--- row {} ---", index + 1);
                for (column, value) in row.iter().enumerate() {
                    if !value.is_empty() {
                        println!("  {column} ({}): {value}", reader::column_letter(column));
                    }
                }
            }

            println!();
            println!("Key columns:");
            for location in &survey.headers {
                match location.found {
                    Some((row, column)) => println!(
                        "- {} [{}]: row {}, column {} ({}){}",
                        location.header,
                        location.field,
                        row + 1,
                        column,
                        reader::column_letter(column),
                        if location.matches_config() {
                            String::new()
                        } else {
                            format!(", configured as {}", location.configured)
                        }
                    ),
                    None => println!(
                        "- {} [{}]: not found (configured as {})",
                        location.header, location.field, location.configured
                    ),
                }
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "agreement_alert=debug"
    } else {
        "agreement_alert=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let json = std::env::var("AGREEMENT_ALERT_LOG_FORMAT").is_ok_and(|format| format == "json");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

/// Reads, filters and analyses the input. "Now" is fixed here, once per run.
fn run_analysis(
    args: &AnalysisArgs,
    config: &AlertConfig,
) -> anyhow::Result<(AlertReport, Option<String>)> {
    let now = args.as_of.unwrap_or_else(|| Local::now().naive_local());
    let department = if args.all_departments {
        None
    } else {
        args.department.as_deref().or(config.department_filter())
    };

    let outcome = reader::read_agreements(&args.input, config)?;
    if outcome.records.is_empty() {
        anyhow::bail!(
            "no records read from {}; check the layout with `inspect`",
            args.input.display()
        );
    }
    if !outcome.warnings.is_empty() {
        eprintln!(
            "{} row warning(s) while reading {}; rerun with --verbose for details.",
            outcome.warnings.len(),
            args.input.display()
        );
    }

    let records = reader::filter_department(outcome.records, department);
    let report = alerts::analyze(&records, now);
    Ok((report, department.map(str::to_string)))
}

fn parse_as_of(value: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d").map(|date| date.and_time(NaiveTime::MIN))
        })
        .map_err(|_| format!("expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS, got {value:?}"))
}
