//! Command implementations: load inputs, run the pipeline, write outputs.

use std::fs;
use std::path::{Path, PathBuf};

use provjera_core::{RawSheet, Table};
use provjera_io::{IoError, SourceFormat};
use provjera_recon::{Artifact, OutputRequest, Pipeline, PipelineOutput, ReconConfig, SourceKind, Sources};

use crate::exit_codes::{io_exit_code, EXIT_DISCREPANCIES};
use crate::{CliError, OutputFormat, ReconcileArgs, SingleArgs};

/// Which single-source export a command produces.
#[derive(Debug, Clone, Copy)]
pub enum Single {
    Roster,
    Timeclock,
    Travel,
}

impl Single {
    fn artifact(self) -> Artifact {
        match self {
            Single::Roster => Artifact::Roster,
            Single::Timeclock => Artifact::Timeclock,
            Single::Travel => Artifact::Travel,
        }
    }

    fn source(self) -> SourceKind {
        match self {
            Single::Roster => SourceKind::Roster,
            Single::Timeclock => SourceKind::Timeclock,
            Single::Travel => SourceKind::Travel,
        }
    }
}

// ============================================================================
// Inputs
// ============================================================================

fn load_config(path: Option<PathBuf>) -> Result<ReconConfig, CliError> {
    let Some(path) = path else {
        return Ok(ReconConfig::default());
    };
    let text = fs::read_to_string(&path)
        .map_err(|e| CliError::io(format!("cannot read config {}: {e}", path.display())))?;
    ReconConfig::from_toml(&text).map_err(|e| {
        let mut err = CliError::recon(&e);
        err.message = format!("{}: {}", path.display(), err.message);
        err
    })
}

struct Input {
    sheet: RawSheet,
    fingerprint: String,
}

fn read_input(path: &Path, sheet: Option<&str>) -> Result<Input, CliError> {
    let bytes = fs::read(path).map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;
    let raw = provjera_io::read_sheet(&bytes, SourceFormat::from_path(path), sheet).map_err(|e| {
        let err = CliError {
            code: io_exit_code(&e),
            message: format!("{}: {e}", path.display()),
            hint: None,
        };
        match e {
            IoError::SheetNotFound(_) => err.with_hint("pass the worksheet name with --sheet"),
            _ => err,
        }
    })?;
    tracing::debug!(path = %path.display(), rows = raw.height(), "input loaded");
    Ok(Input {
        sheet: raw,
        fingerprint: provjera_io::fingerprint(&bytes),
    })
}

// ============================================================================
// Outputs
// ============================================================================

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), CliError> {
    fs::write(path, bytes).map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))
}

fn encode_error(path: &Path, e: IoError) -> CliError {
    CliError::io(format!("cannot encode {}: {e}", path.display()))
}

/// One table to one file; CSV when the extension says so, xlsx otherwise.
fn write_table_file(path: &Path, table: &Table) -> Result<(), CliError> {
    let bytes = match SourceFormat::from_path(path) {
        SourceFormat::Csv => provjera_io::csv::write_table(table),
        SourceFormat::Spreadsheet => provjera_io::xlsx::write_workbook([table]),
    }
    .map_err(|e| encode_error(path, e))?;
    write_file(path, &bytes)
}

fn file_name_for(artifact: Artifact, format: OutputFormat) -> PathBuf {
    let name = PathBuf::from(artifact.file_name());
    match format {
        OutputFormat::Xlsx => name,
        OutputFormat::Csv => name.with_extension("csv"),
    }
}

/// First failed artifact as a CLI error; every failure is logged.
fn first_failure(output: &PipelineOutput) -> Option<CliError> {
    let mut first = None;
    for (artifact, err) in output.failures() {
        eprintln!("{}: {err}", artifact.sheet_name());
        first.get_or_insert_with(|| CliError::recon(err));
    }
    first
}

// ============================================================================
// roster / timeclock / travel
// ============================================================================

pub fn cmd_single(which: Single, args: SingleArgs, config: Option<PathBuf>) -> Result<(), CliError> {
    let config = load_config(config)?;
    let input = read_input(&args.input, args.sheet.as_deref())?;

    let mut sources = Sources::default();
    let slot = match which.source() {
        SourceKind::Roster => &mut sources.roster,
        SourceKind::Timeclock => &mut sources.timeclock,
        SourceKind::Travel => &mut sources.travel,
    };
    *slot = Some(input.sheet);

    let artifact = which.artifact();
    let output = Pipeline::new(config).run(&sources, &OutputRequest::only([artifact]));
    if let Some(err) = first_failure(&output) {
        return Err(err);
    }
    let table = output
        .table(artifact)
        .ok_or_else(|| CliError::parse(format!("{} produced no table", artifact.sheet_name())))?;

    let path = args.output.unwrap_or_else(|| PathBuf::from(artifact.file_name()));
    write_table_file(&path, table)?;
    eprintln!("wrote {} ({} rows)", path.display(), table.len());
    Ok(())
}

// ============================================================================
// reconcile
// ============================================================================

pub fn cmd_reconcile(args: ReconcileArgs, config: Option<PathBuf>) -> Result<(), CliError> {
    let mut config = load_config(config)?;
    if let Some(period) = args.period {
        config.period = Some(period);
    }
    if args.format == OutputFormat::Csv && args.out_dir.is_none() {
        return Err(CliError::args("--format csv only applies to --out-dir")
            .with_hint("use --out-dir DIR --format csv, or --output FILE.xlsx"));
    }
    if let Some(path) = &args.output {
        if SourceFormat::from_path(path) == SourceFormat::Csv {
            return Err(CliError::args("--output writes a multi-sheet workbook and cannot be CSV")
                .with_hint("use --out-dir DIR --format csv for one CSV per report"));
        }
    }

    let roster = read_input(&args.roster, args.roster_sheet.as_deref())?;
    let timeclock = read_input(&args.timeclock, args.timeclock_sheet.as_deref())?;
    let travel = read_input(&args.travel, args.travel_sheet.as_deref())?;
    let fingerprints = [
        (SourceKind::Roster, roster.fingerprint),
        (SourceKind::Timeclock, timeclock.fingerprint),
        (SourceKind::Travel, travel.fingerprint),
    ];
    let sources = Sources {
        roster: Some(roster.sheet),
        timeclock: Some(timeclock.sheet),
        travel: Some(travel.sheet),
    };

    let request = if args.tidy {
        OutputRequest::all()
    } else {
        OutputRequest::reconciliation()
    };
    let mut output = Pipeline::new(config).run(&sources, &request);
    for (kind, fingerprint) in fingerprints {
        output.summary.set_fingerprint(kind, fingerprint);
    }

    if let Some(dir) = &args.out_dir {
        fs::create_dir_all(dir)
            .map_err(|e| CliError::io(format!("cannot create {}: {e}", dir.display())))?;
        for artifact in &output.artifacts {
            let Ok(table) = &artifact.result else { continue };
            let path = dir.join(file_name_for(artifact.artifact, args.format));
            write_table_file(&path, table)?;
            eprintln!("wrote {} ({} rows)", path.display(), table.len());
        }
    }
    if let Some(path) = &args.output {
        let bytes = provjera_io::xlsx::write_workbook(output.tables()).map_err(|e| encode_error(path, e))?;
        write_file(path, &bytes)?;
        eprintln!("wrote {} ({} sheets)", path.display(), output.tables().count());
    }

    if args.json {
        let json = serde_json::to_string_pretty(&output.summary)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        println!("{json}");
    }

    print_human_summary(&output);

    if let Some(err) = first_failure(&output) {
        return Err(err);
    }
    if args.strict && output.summary.discrepancies > 0 {
        return Err(CliError {
            code: EXIT_DISCREPANCIES,
            message: format!("{} discrepancies found", output.summary.discrepancies),
            hint: None,
        });
    }
    Ok(())
}

fn print_human_summary(output: &PipelineOutput) {
    let meta = &output.summary.meta;
    if let Some(period) = &meta.period {
        let last = meta
            .max_timeclock_date
            .map(|d| d.format("%d.%m.%Y").to_string())
            .unwrap_or_else(|| "none".into());
        eprintln!("period {period}, timeclock data up to {last}");
    }
    for artifact in &output.artifacts {
        let Ok(table) = &artifact.result else { continue };
        if artifact.artifact.is_report() && table.is_empty() {
            eprintln!("notice: '{}' is empty, nothing to flag", table.name);
        } else {
            eprintln!("{}: {} rows", table.name, table.len());
        }
    }
}

// ============================================================================
// config
// ============================================================================

pub fn cmd_config_show(config: Option<PathBuf>) -> Result<(), CliError> {
    let config = load_config(config)?;
    let text = config.to_toml().map_err(|e| CliError::recon(&e))?;
    print!("{text}");
    Ok(())
}

pub fn cmd_config_validate(file: PathBuf) -> Result<(), CliError> {
    let config = load_config(Some(file.clone()))?;
    let period = config
        .period
        .map(|p| format!(", period fixed to {p}"))
        .unwrap_or_default();
    eprintln!(
        "valid: {} (roster header row {}, travel header row {}{period})",
        file.display(),
        config.roster.header_row,
        config.travel.header_row,
    );
    Ok(())
}
