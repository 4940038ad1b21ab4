//! `conciliar run` / `conciliar validate` — run-file driven reconciliation.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use log::debug;

use conciliar_recon::classify::format_cents;
use conciliar_recon::config::InputFiles;
use conciliar_recon::load::{load_aliases, load_ledger, load_transactions};
use conciliar_recon::model::{ReconInput, ReconResult};
use conciliar_recon::{Pipeline, ReconConfig, ReconError};

use crate::exit_codes::{
    recon_exit_code, EXIT_RECON_EXCEPTIONS, EXIT_RECON_INVALID_CONFIG, EXIT_RECON_RUNTIME,
};
use crate::export::write_exports;
use crate::CliError;

#[derive(Subcommand)]
pub enum ReconCommands {
    /// Reconcile a bank statement against the ledger from a TOML run file
    #[command(after_help = "\
Examples:
  conciliar run march.toml
  conciliar run march.toml --json
  conciliar run march.toml --output result.json
  conciliar run march.toml --export-dir out/")]
    Run {
        /// Path to the run file
        config: PathBuf,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write accepted_collections.csv, accepted_payments.csv and exceptions.csv here
        #[arg(long)]
        export_dir: Option<PathBuf>,
    },

    /// Validate a run file and check that its inputs exist, without running
    #[command(after_help = "\
Examples:
  conciliar validate march.toml")]
    Validate {
        /// Path to the run file
        config: PathBuf,
    },
}

pub fn cmd_recon(cmd: ReconCommands) -> Result<(), CliError> {
    match cmd {
        ReconCommands::Run { config, json, output, export_dir } => {
            cmd_recon_run(config, json, output, export_dir)
        }
        ReconCommands::Validate { config } => cmd_recon_validate(config),
    }
}

fn recon_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

fn engine_err(err: ReconError) -> CliError {
    recon_err(recon_exit_code(&err), err.to_string())
}

fn load_config(config_path: &Path) -> Result<ReconConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path)
        .map_err(|e| recon_err(EXIT_RECON_RUNTIME, format!("cannot read config: {e}")))?;
    ReconConfig::from_toml(&config_str).map_err(engine_err)
}

/// Input paths resolved against the run file's directory.
struct ResolvedInputs {
    transactions: PathBuf,
    ledger: PathBuf,
    aliases: Option<PathBuf>,
}

fn resolve_inputs(config_path: &Path, inputs: &InputFiles) -> Result<ResolvedInputs, CliError> {
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let required = |field: &Option<String>, name: &str| {
        field.as_ref().map(|f| base_dir.join(f)).ok_or_else(|| CliError {
            code: EXIT_RECON_INVALID_CONFIG,
            message: format!("[inputs] {name} is required"),
            hint: Some(format!("add `{name} = \"{name}.csv\"` under [inputs]")),
        })
    };
    Ok(ResolvedInputs {
        transactions: required(&inputs.transactions, "transactions")?,
        ledger: required(&inputs.ledger, "ledger")?,
        aliases: inputs.aliases.as_ref().map(|f| base_dir.join(f)),
    })
}

fn read_input(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path)
        .map_err(|e| recon_err(EXIT_RECON_RUNTIME, format!("cannot read {}: {e}", path.display())))
}

fn load_input(paths: &ResolvedInputs) -> Result<ReconInput, CliError> {
    debug!("transactions: {}", paths.transactions.display());
    let transactions = load_transactions(&read_input(&paths.transactions)?).map_err(engine_err)?;
    debug!("ledger: {}", paths.ledger.display());
    let ledger = load_ledger(&read_input(&paths.ledger)?).map_err(engine_err)?;
    let aliases = match &paths.aliases {
        Some(path) => load_aliases(&read_input(path)?).map_err(engine_err)?,
        None => Vec::new(),
    };
    Ok(ReconInput { transactions, ledger, aliases })
}

fn cmd_recon_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
    export_dir: Option<PathBuf>,
) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let paths = resolve_inputs(&config_path, &config.inputs)?;
    let input = load_input(&paths)?;

    if config.pipeline == Pipeline::Alias && input.aliases.is_empty() {
        log::warn!("alias pipeline without an alias table: every movement will be unmatched");
    }

    let result = conciliar_recon::run(&config, &input).map_err(engine_err)?;

    let json_str = serde_json::to_string_pretty(&result)
        .map_err(|e| recon_err(EXIT_RECON_RUNTIME, format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| recon_err(EXIT_RECON_RUNTIME, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if let Some(ref dir) = export_dir {
        for path in write_exports(dir, &result.derived)? {
            eprintln!("wrote {}", path.display());
        }
    }

    if json_output {
        println!("{json_str}");
    }

    print_summary(&result);

    let exceptions = result.derived.exceptions.len();
    if exceptions > 0 {
        return Err(recon_err(
            EXIT_RECON_EXCEPTIONS,
            format!("{exceptions} movement(s) need review"),
        ));
    }
    Ok(())
}

/// Human summary to stderr.
fn print_summary(result: &ReconResult) {
    let s = &result.summary;
    eprintln!(
        "{} ({} pipeline): {} movements, {} exact, {} probable, {} no match, {} bank fees",
        result.meta.config_name,
        result.meta.pipeline,
        s.total_movements,
        s.match_exact,
        s.probable_duda_id + s.probable_dif_cambio,
        s.no_match,
        s.bank_fees,
    );
    eprintln!(
        "rates: {:.1}% exact, {:.1}% reconciled, {:.1}% unmatched",
        s.exact_rate, s.reconciled_rate, s.no_match_rate,
    );
    for (label, side) in [("collections", &s.collections), ("payments", &s.payments)] {
        if side.total == 0 {
            continue;
        }
        eprintln!(
            "{label}: {}/{} reconciled ({:.1}%), bank {} vs ledger {} (gap {})",
            side.reconciled,
            side.total,
            side.reconciliation_rate,
            format_cents(side.amount_cents),
            format_cents(side.ledger_amount_cents),
            format_cents(side.gap_cents),
        );
    }
    if !s.status_counts.is_empty() {
        let statuses: Vec<String> =
            s.status_counts.iter().map(|(status, n)| format!("{n} {status}")).collect();
        eprintln!("tax id: {}", statuses.join(", "));
    }
    eprintln!(
        "unreconciled: {} across {} exception(s)",
        format_cents(s.unreconciled_amount_cents),
        result.derived.exceptions.len(),
    );
}

fn cmd_recon_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let paths = resolve_inputs(&config_path, &config.inputs)?;

    let mut files = vec![&paths.transactions, &paths.ledger];
    files.extend(paths.aliases.as_ref());
    for path in files {
        if !path.is_file() {
            return Err(CliError {
                code: EXIT_RECON_RUNTIME,
                message: format!("input not found: {}", path.display()),
                hint: Some("[inputs] paths are relative to the run file".to_string()),
            });
        }
    }

    eprintln!(
        "valid: '{}' ({} pipeline, {:?} preset, fuzzy {:.2} / exact {:.2})",
        config.name,
        config.pipeline,
        config.preset,
        config.identity.fuzzy_threshold,
        config.identity.exact_threshold,
    );
    Ok(())
}
