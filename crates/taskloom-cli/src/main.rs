//! taskloom CLI — the thinnest outer surface over the scheduling core.
//!
//! The HTTP request surface named out of scope by `spec.md` §1 is never
//! built here; this binary exists so the pipeline can be exercised end to
//! end from a file on disk, the way `utf8proj-cli` exists alongside
//! `utf8proj-solver`.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use taskloom_core::{ErrorResponse, Notification, ScheduleResponse};
use taskloom_parser::parse_payload;
use taskloom_solver::{schedule_project, solver_budget_from_env};

#[derive(Parser)]
#[command(name = "taskloom")]
#[command(author, version, about = "Constraint-programming project scheduler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and verify a project file without scheduling it.
    Check {
        /// Input file path (CSV, TSV, or JSON task list).
        file: PathBuf,

        /// Output format.
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Schedule a project: parse, verify, expand, solve, merge, decorate.
    Schedule {
        /// Input file path (CSV, TSV, or JSON task list).
        file: PathBuf,

        /// Output format.
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Scheduling anchor ("today"), as YYYY-MM-DD. Defaults to the
        /// real current date.
        #[arg(long)]
        today: Option<String>,

        /// Solver wall-clock budget in seconds. Defaults to
        /// `SOLVER_TIME_BUDGET_SECONDS`, or 10 if that is unset.
        #[arg(long)]
        budget_seconds: Option<u64>,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Check { file, format } => run_check(&file, format),
        Commands::Schedule {
            file,
            format,
            today,
            budget_seconds,
        } => run_schedule(&file, format, today, budget_seconds),
    }
}

fn resolve_today(today: Option<String>) -> Result<chrono::NaiveDate> {
    match today {
        Some(raw) => taskloom_core::calendar::parse_date(&raw)
            .with_context(|| format!("invalid --today date {raw:?}, expected YYYY-MM-DD")),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

fn run_check(file: &PathBuf, format: OutputFormat) -> Result<()> {
    let payload = fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    match parse_payload(&payload).and_then(|parsed| {
        taskloom_parser::verify_inputs(&parsed.tasks, &parsed.metadata)?;
        Ok(parsed)
    }) {
        Ok(parsed) => {
            let notifications = vec![Notification::info(format!(
                "{} task(s) parsed and verified",
                parsed.tasks.len()
            ))];
            print_success(&notifications, format);
            Ok(())
        }
        Err(err) => {
            print_failure(&err, format);
            std::process::exit(1);
        }
    }
}

fn run_schedule(
    file: &PathBuf,
    format: OutputFormat,
    today: Option<String>,
    budget_seconds: Option<u64>,
) -> Result<()> {
    let payload = fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let today = resolve_today(today)?;
    let budget = budget_seconds
        .map(Duration::from_secs)
        .unwrap_or_else(solver_budget_from_env);

    let outcome = parse_payload(&payload)
        .and_then(|parsed| schedule_project(parsed.tasks, &parsed.metadata, today, budget));

    match outcome {
        Ok(schedule) => {
            let mut notifications = schedule.notifications.clone();
            notifications.insert(
                0,
                Notification::info(format!(
                    "makespan {} business day(s){}, {} rollback day(s)",
                    schedule.makespan,
                    if schedule.optimal { " (optimal)" } else { " (time-limited)" },
                    schedule.rollback_offset,
                )),
            );
            match format {
                OutputFormat::Text => {
                    for idx in schedule.graph.graph.node_indices() {
                        let task = &schedule.graph.graph[idx];
                        let critical = schedule
                            .decorations
                            .get(&task.name)
                            .is_some_and(|d| d.critical);
                        println!(
                            "{:<24} {:>12} .. {:<12} {:<24} {}",
                            task.name,
                            task.start_date.map(|d| d.to_string()).unwrap_or_default(),
                            task.end_date.map(|d| d.to_string()).unwrap_or_default(),
                            task.assignees.join(", "),
                            if critical { "CRITICAL" } else { "" },
                        );
                    }
                    for (person, pct) in &schedule.utilization {
                        println!("utilization: {person} {pct:.1}%");
                    }
                    for n in &notifications {
                        println!("{n}");
                    }
                }
                OutputFormat::Json => {
                    let response = ScheduleResponse {
                        image: None,
                        notifications,
                    };
                    println!("{}", serde_json::to_string_pretty(&response)?);
                }
            }
            Ok(())
        }
        Err(err) => {
            print_failure(&err, format);
            std::process::exit(1);
        }
    }
}

fn print_success(notifications: &[Notification], format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            for n in notifications {
                println!("{n}");
            }
        }
        OutputFormat::Json => {
            let response = ScheduleResponse {
                image: None,
                notifications: notifications.to_vec(),
            };
            println!("{}", serde_json::to_string_pretty(&response).unwrap());
        }
    }
}

fn print_failure(err: &taskloom_core::TaskloomError, format: OutputFormat) {
    let message = err.to_string();
    match format {
        OutputFormat::Text => {
            eprintln!("error: {message}");
        }
        OutputFormat::Json => {
            let response = ErrorResponse {
                message,
                notifications: vec![Notification::error(err.to_string())],
            };
            eprintln!("{}", serde_json::to_string_pretty(&response).unwrap());
        }
    }
}
