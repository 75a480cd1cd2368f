// provjera CLI - reconcile MasterTeam roster, Jantar timeclock and travel orders

mod exit_codes;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use provjera_recon::{Period, ReconError};
use tracing_subscriber::EnvFilter;

use exit_codes::{recon_exit_code, EXIT_IO, EXIT_PARSE, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "provjera")]
#[command(about = "Attendance reconciliation: roster vs. timeclock vs. travel orders")]
#[command(version)]
struct Cli {
    /// Engine config (TOML); defaults apply when omitted
    #[arg(long, global = true, env = "PROVJERA_CONFIG")]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Unpivot a MasterTeam roster into one row per employee-day
    #[command(after_help = "\
Examples:
  provjera roster masterteam.xlsx
  provjera roster masterteam.xlsx -o roster.csv")]
    Roster(SingleArgs),

    /// Flatten a Jantar timeclock export into one row per detail line
    #[command(after_help = "\
Examples:
  provjera timeclock jantar.xlsx
  provjera timeclock jantar.xls --sheet Izvještaj -o jantar.xlsx")]
    Timeclock(SingleArgs),

    /// Expand a travel-order register into one row per day away
    #[command(after_help = "\
Examples:
  provjera travel putni_nalozi.xlsx -o pn.csv")]
    Travel(SingleArgs),

    /// Reconcile all three sources and emit the discrepancy reports
    #[command(after_help = "\
Examples:
  provjera reconcile --roster mt.xlsx --timeclock jantar.xlsx --travel pn.xlsx --out-dir reports
  provjera reconcile --roster mt.xlsx --timeclock jantar.xlsx --travel pn.xlsx --output all.xlsx --tidy
  provjera reconcile --roster mt.csv --timeclock jantar.csv --travel pn.csv --json --strict")]
    Reconcile(ReconcileArgs),

    /// Inspect or check engine config
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(clap::Args)]
struct SingleArgs {
    /// Input spreadsheet (xlsx, xls, xlsb, ods) or CSV export
    input: PathBuf,

    /// Worksheet name (first sheet when omitted)
    #[arg(long)]
    sheet: Option<String>,

    /// Output file (.xlsx or .csv); defaults to the standard export name
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
struct ReconcileArgs {
    /// MasterTeam roster
    #[arg(long)]
    roster: PathBuf,

    /// Jantar timeclock export
    #[arg(long)]
    timeclock: PathBuf,

    /// Travel-order register
    #[arg(long)]
    travel: PathBuf,

    #[arg(long)]
    roster_sheet: Option<String>,

    #[arg(long)]
    timeclock_sheet: Option<String>,

    #[arg(long)]
    travel_sheet: Option<String>,

    /// Reporting month (YYYY-MM) instead of the timeclock's first date
    #[arg(long, value_parser = parse_period)]
    period: Option<Period>,

    /// Write one file per report (standard names) into this directory
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// File format for --out-dir
    #[arg(long, value_enum, default_value_t = OutputFormat::Xlsx)]
    format: OutputFormat,

    /// Write every report as a sheet of one workbook
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Also emit the three tidy per-source exports
    #[arg(long)]
    tidy: bool,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Exit with code 6 when any discrepancy is found
    #[arg(long)]
    strict: bool,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective config (defaults merged with --config) as TOML
    Show,

    /// Check a config file without running anything
    Validate {
        /// Config file to check
        file: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Xlsx,
    Csv,
}

fn parse_period(s: &str) -> Result<Period, String> {
    s.parse()
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A second init (tests, embedding) is harmless; keep the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .with_ansi(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Roster(args) => run::cmd_single(run::Single::Roster, args, cli.config),
        Commands::Timeclock(args) => run::cmd_single(run::Single::Timeclock, args, cli.config),
        Commands::Travel(args) => run::cmd_single(run::Single::Travel, args, cli.config),
        Commands::Reconcile(args) => run::cmd_reconcile(args, cli.config),
        Commands::Config(ConfigCommands::Show) => run::cmd_config_show(cli.config),
        Commands::Config(ConfigCommands::Validate { file }) => run::cmd_config_validate(file),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PARSE, message: msg.into(), hint: None }
    }

    /// Engine error with its registered exit code and, where one helps, a hint.
    pub fn recon(err: &ReconError) -> Self {
        let hint = match err {
            ReconError::PeriodUnresolved(_) => Some("pass --period YYYY-MM or set [period] in the config"),
            ReconError::InvalidRosterDay { .. } => Some("check that the roster and the timeclock cover the same month"),
            ReconError::MissingColumn { .. } => Some("check the header_row and column names in the config"),
            _ => None,
        };
        Self {
            code: recon_exit_code(err),
            message: err.to_string(),
            hint: hint.map(String::from),
        }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
