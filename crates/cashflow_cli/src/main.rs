//! `cashflow` command-line front end.
//!
//! # Responsibility
//! - Expose the core service operations over a SQLite file.
//! - Read inputs and patches as JSON, print results as JSON.
//!
//! # Invariants
//! - Every command opens a fresh, migrated connection.
//! - Output goes to stdout; diagnostics go to the log files only.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use cashflow_core::{
    init_logging_from_config, open_db, CashflowService, CommitmentPatch, CommitmentStatus,
    EngineConfig, NewCommitment, NewRecurrenceRule, NewRecurringEntry, RulePatch,
    SqliteRepository,
};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use log::info;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// cashflow - recurring commitment projection and reconciliation
#[derive(Parser, Debug)]
#[command(name = "cashflow")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the SQLite database file
    #[arg(long, env = "CASHFLOW_DB", default_value = "cashflow.db")]
    db: PathBuf,

    /// Path to an engine configuration TOML file
    #[arg(short, long, env = "CASHFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Absolute directory for rolling log files (overrides config)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error; overrides config)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    // === Commitments ===
    /// List commitments; with both bounds the view includes projections
    #[command(alias = "ls")]
    List {
        /// First due date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last due date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// Add a commitment from JSON (`-` reads stdin)
    Add {
        /// JSON object with title, amount, dueDate and optional fields
        input: String,
    },

    /// Patch a commitment or promote a projection
    Update {
        /// Commitment or projection id
        id: String,

        /// JSON patch (`-` reads stdin)
        patch: String,
    },

    /// Mark a commitment or projection as paid
    Pay {
        /// Commitment or projection id
        id: String,

        /// Payment date, defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Delete a stored commitment
    Delete {
        /// Commitment id
        id: String,
    },

    // === Recurrence rules ===
    /// List every recurrence rule
    Rules,

    /// Add a recurrence rule from JSON (`-` reads stdin)
    AddRule {
        /// JSON object with title, amount, frequency and startDate
        input: String,
    },

    /// Patch a recurrence rule
    UpdateRule {
        /// Rule id
        id: String,

        /// JSON patch (`-` reads stdin)
        patch: String,
    },

    /// Delete a recurrence rule; its commitments are kept
    DeleteRule {
        /// Rule id
        id: String,
    },

    /// Create a commitment together with its rule and upcoming occurrences
    AddRecurring {
        /// JSON entry (`-` reads stdin)
        input: String,

        /// Reference date for the materialization horizon, defaults to today
        #[arg(long)]
        today: Option<NaiveDate>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging_from_config(&config.logging).context("failed to initialize logging")?;

    let conn = open_db(&cli.db)
        .with_context(|| format!("failed to open database {}", cli.db.display()))?;
    let repo = SqliteRepository::try_new(&conn)?;
    let service = CashflowService::with_config(repo, config);

    run(&service, cli.command)
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = &cli.log_dir {
        config.logging.dir = Some(dir.clone());
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    Ok(config)
}

fn run(service: &CashflowService<SqliteRepository<'_>>, command: Commands) -> Result<()> {
    match command {
        Commands::List { from, to } => print_json(&service.get_commitments(from, to)?),
        Commands::Add { input } => {
            let input: NewCommitment = parse_json(&input, "commitment")?;
            print_id(&service.add_commitment(input)?)
        }
        Commands::Update { id, patch } => {
            let patch: CommitmentPatch = parse_json(&patch, "commitment patch")?;
            print_json(&service.update_commitment(&id, &patch)?)
        }
        Commands::Pay { id, date } => {
            let paid_on = date.unwrap_or_else(|| Local::now().date_naive());
            let patch = CommitmentPatch {
                status: Some(CommitmentStatus::Paid),
                paid_date: Some(Some(paid_on)),
                ..CommitmentPatch::default()
            };
            print_json(&service.update_commitment(&id, &patch)?)
        }
        Commands::Delete { id } => {
            service.delete_commitment(&id)?;
            print_id(&id)
        }
        Commands::Rules => print_json(&service.get_recurrence_rules()?),
        Commands::AddRule { input } => {
            let input: NewRecurrenceRule = parse_json(&input, "recurrence rule")?;
            print_id(&service.add_recurrence_rule(input)?)
        }
        Commands::UpdateRule { id, patch } => {
            let patch: RulePatch = parse_json(&patch, "rule patch")?;
            print_json(&service.update_recurrence_rule(&id, &patch)?)
        }
        Commands::DeleteRule { id } => {
            service.delete_recurrence_rule(&id)?;
            print_id(&id)
        }
        Commands::AddRecurring { input, today } => {
            let entry: NewRecurringEntry = parse_json(&input, "recurring entry")?;
            let series = match today {
                Some(today) => service.create_entry_with_recurrence_on(entry, today)?,
                None => service.create_entry_with_recurrence(entry)?,
            };
            info!(
                "event=cli_add_recurring module=cli status=ok rule_id={} commitments={}",
                series.rule.id,
                series.commitments.len()
            );
            print_json(&series)
        }
    }
}

fn parse_json<T: DeserializeOwned>(arg: &str, what: &str) -> Result<T> {
    let text = if arg == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read stdin")?;
        buffer
    } else {
        arg.to_string()
    };
    serde_json::from_str(&text).with_context(|| format!("invalid {what} JSON"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_id(id: &str) -> Result<()> {
    print_json(&serde_json::json!({ "id": id }))
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands};
    use clap::{CommandFactory, Parser};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn list_parses_iso_bounds() {
        let cli = Cli::parse_from([
            "cashflow",
            "--db",
            "/tmp/cash.db",
            "list",
            "--from",
            "2025-01-01",
            "--to",
            "2025-01-31",
        ]);
        match cli.command {
            Commands::List { from, to } => {
                assert_eq!(from.unwrap().to_string(), "2025-01-01");
                assert_eq!(to.unwrap().to_string(), "2025-01-31");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn commitment_patch_json_distinguishes_null_from_absent() {
        let patch: cashflow_core::CommitmentPatch =
            super::parse_json(r#"{"status":"paid","paidDate":null}"#, "patch").unwrap();
        assert_eq!(patch.paid_date, Some(None));
        assert_eq!(patch.recurrence_rule_id, None);
    }
}
