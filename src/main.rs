//! factdrill - Adaptive multiplication-fact scheduler
//!
//! CLI entry point with global panic handler.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

use factdrill::config::{attempts_dir, crash_log_path, factdrill_home, Config};
use factdrill::core::Tier;
use factdrill::error::{exit_codes, DrillError};
use factdrill::storage::FileLedgerStore;

// =============================================================================
// CLI Definition
// =============================================================================

/// factdrill - Adaptive multiplication-fact scheduler
#[derive(Parser)]
#[command(name = "factdrill")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a learner's answer and update their ledger
    Answer {
        /// Learner ID
        learner: String,
        /// Table (first factor)
        table: u32,
        /// Multiplier (second factor)
        multiplier: u32,
        /// The learner's response
        response: u32,
        /// Time taken to answer, in milliseconds
        #[arg(long)]
        time_ms: i64,
        /// Learner tier (default: from config)
        #[arg(long, value_enum)]
        tier: Option<TierArg>,
        /// The question was asked as "table × ? = product"
        #[arg(long)]
        missing_factor: bool,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Compose the next practice session
    Session {
        /// Learner ID
        learner: String,
        /// Learner tier (default: from config)
        #[arg(long, value_enum)]
        tier: Option<TierArg>,
        /// Number of questions
        #[arg(long)]
        length: Option<usize>,
        /// RNG seed for a reproducible session
        #[arg(long)]
        seed: Option<u64>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Show a learner's stage, table stats and daily progress
    Status {
        /// Learner ID
        learner: String,
        /// Learner tier (default: from config)
        #[arg(long, value_enum)]
        tier: Option<TierArg>,
        /// Day to report progress for, YYYY-MM-DD (default: today, UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Rebuild a learner's ledger from their attempt log
    Rehydrate {
        /// Learner ID
        learner: String,
        /// Tier for log lines written without one (default: from config)
        #[arg(long, value_enum)]
        tier: Option<TierArg>,
        /// Compare only, don't overwrite the stored ledger
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// List stored learners
    Learners {
        /// Maximum number of learners
        #[arg(long)]
        limit: Option<usize>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TierArg {
    Basic,
    Advanced,
}

impl From<TierArg> for Tier {
    fn from(arg: TierArg) -> Self {
        match arg {
            TierArg::Basic => Tier::Basic,
            TierArg::Advanced => Tier::Advanced,
        }
    }
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    setup_panic_handler();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("factdrill error: {}", e);
            ExitCode::from(exit_codes::FAILURE as u8)
        }
    }
}

/// Set up the global panic handler.
///
/// On panic, appends to `<home>/crash.log` and exits with code 3.
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("factdrill panic: {}", info);

        if let Some(crash_log) = crash_log_path() {
            if let Some(parent) = crash_log.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::CRASH);
    }));
}

/// Run the CLI and return the exit code.
fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Answer {
            learner,
            table,
            multiplier,
            response,
            time_ms,
            tier,
            missing_factor,
            json,
            quiet,
        } => run_answer(
            &learner,
            table,
            multiplier,
            response,
            time_ms,
            tier,
            missing_factor,
            json,
            quiet,
        ),
        Commands::Session {
            learner,
            tier,
            length,
            seed,
            json,
            quiet,
        } => run_session(&learner, tier, length, seed, json, quiet),
        Commands::Status {
            learner,
            tier,
            date,
            json,
            quiet,
        } => run_status(&learner, tier, date, json, quiet),
        Commands::Rehydrate {
            learner,
            tier,
            dry_run,
            json,
            quiet,
        } => run_rehydrate(&learner, tier, dry_run, json, quiet),
        Commands::Learners { limit, json, quiet } => run_learners(limit, json, quiet),
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

/// Convert a success boolean to an exit code.
fn success_to_exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::from(exit_codes::SUCCESS as u8)
    } else {
        ExitCode::from(exit_codes::FAILURE as u8)
    }
}

fn print_formatted(formatted: String) {
    if !formatted.is_empty() {
        println!("{}", formatted.trim_end());
    }
}

fn require_attempts_dir() -> Result<PathBuf, DrillError> {
    attempts_dir().ok_or_else(|| {
        DrillError::config(format!(
            "Could not determine attempts directory (home: {:?})",
            factdrill_home()
        ))
    })
}

#[allow(clippy::too_many_arguments)]
fn run_answer(
    learner: &str,
    table: u32,
    multiplier: u32,
    response: u32,
    time_ms: i64,
    tier: Option<TierArg>,
    missing_factor: bool,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use factdrill::cli::answer::{AnswerCommand, AnswerOptions};

    let config = Config::load_fail_open();
    let store = FileLedgerStore::new()?;
    let cmd = AnswerCommand::new(store, config, require_attempts_dir()?);
    let options = AnswerOptions {
        json,
        quiet,
        tier: tier.map(Tier::from),
        missing_factor,
        time_ms,
        timestamp: None,
    };

    let output = cmd.run(learner, table, multiplier, response, &options);
    print_formatted(cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_session(
    learner: &str,
    tier: Option<TierArg>,
    length: Option<usize>,
    seed: Option<u64>,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use factdrill::cli::session::{SessionCommand, SessionOptions};

    let config = Config::load_fail_open();
    let store = FileLedgerStore::new()?;
    let cmd = SessionCommand::new(store, config);
    let options = SessionOptions {
        json,
        quiet,
        tier: tier.map(Tier::from),
        length,
        seed,
    };

    let output = cmd.run(learner, &options);
    print_formatted(cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_status(
    learner: &str,
    tier: Option<TierArg>,
    date: Option<NaiveDate>,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use factdrill::cli::status::{StatusCommand, StatusOptions};

    let config = Config::load_fail_open();
    let store = FileLedgerStore::new()?;
    let cmd = StatusCommand::new(store, config, require_attempts_dir()?);
    let options = StatusOptions {
        json,
        quiet,
        tier: tier.map(Tier::from),
        date,
    };

    let output = cmd.run(learner, &options);
    print_formatted(cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_rehydrate(
    learner: &str,
    tier: Option<TierArg>,
    dry_run: bool,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use factdrill::cli::rehydrate::{RehydrateCommand, RehydrateOptions};

    let config = Config::load_fail_open();
    let store = FileLedgerStore::new()?;
    let cmd = RehydrateCommand::new(store, config, require_attempts_dir()?);
    let options = RehydrateOptions {
        json,
        quiet,
        tier: tier.map(Tier::from),
        dry_run,
    };

    let output = cmd.run(learner, &options);
    print_formatted(cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_learners(
    limit: Option<usize>,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use factdrill::cli::learners::{LearnersCommand, LearnersOptions};

    let store = FileLedgerStore::new()?;
    let cmd = LearnersCommand::new(store);
    let options = LearnersOptions { json, quiet, limit };

    let output = cmd.run(&options);
    print_formatted(cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

// =============================================================================
// Tests
// =============================================================================
