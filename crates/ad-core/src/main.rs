//! abc-diag: ABC posterior diagnostics
//!
//! Thin CLI over the ad-core library:
//! - Prior versus posterior parameter bands
//! - Raw prior-predictive draws
//! - Forecast versus observed census counts
//! - Calibration statistic traces
//! - Prior document validation
//!
//! Payloads go to stdout as JSON (or one-line summaries); logs go to stderr.

use ad_config::{load_prior, validate_prior_spec, ClinicalState, LoadedPrior, RunConfig};
use ad_core::aggregate::{MissingParameterPolicy, PosteriorAggregator};
use ad_core::bands::{
    attach_truth, compare_parameters, ParameterBands, ParameterComparison, PercentileBandComputer,
    DEFAULT_HIGH_PERCENTILE, DEFAULT_LOW_PERCENTILE,
};
use ad_core::exit_codes::ExitCode;
use ad_core::forecast::{compare_forecasts, ForecastSummaries, DEFAULT_COLUMNS};
use ad_core::logging::{generate_run_id, init_logging, LogConfig, LogLevel};
use ad_core::output::OutputFormat;
use ad_core::sampler::{PriorDraws, PriorPredictiveSampler};
use ad_core::samples::SampleCollection;
use ad_core::table::Table;
use ad_core::trace::stat_trace;
use ad_core::{Error, Result};
use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;

/// ABC posterior diagnostics - prior/posterior bands and forecast checks
#[derive(Parser)]
#[command(name = "abc-diag")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare posterior parameter samples against prior-predictive draws
    Params(ParamsArgs),

    /// Draw parameters from the prior only
    PriorSample(PriorSampleArgs),

    /// Compare forecast summaries against observed daily counts
    Forecast(ForecastArgs),

    /// Extract one statistic from a calibration statistics table
    Trace(TraceArgs),

    /// Validate a prior document
    Check(CheckArgs),
}

#[derive(Args, Debug)]
struct PriorSource {
    /// Prior document (falls back to AD_PRIOR_CONFIG, then the config dir)
    #[arg(long)]
    prior: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ParamsArgs {
    /// Posterior samples (one object or a list of objects)
    #[arg(long)]
    samples: PathBuf,

    #[command(flatten)]
    prior: PriorSource,

    /// Skip prior-predictive sampling and report posterior bands only
    #[arg(long, conflicts_with = "prior")]
    no_prior: bool,

    /// Number of prior-predictive draws per parameter
    #[arg(long, default_value_t = 1000)]
    prior_draws: usize,

    /// Random seed (a fresh seed is drawn and reported when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Skip values missing from later runs instead of failing
    #[arg(long)]
    lenient: bool,

    /// Lower percentile of the band
    #[arg(long, default_value_t = DEFAULT_LOW_PERCENTILE)]
    low: f64,

    /// Upper percentile of the band
    #[arg(long, default_value_t = DEFAULT_HIGH_PERCENTILE)]
    high: f64,

    /// Known parameter values to report alongside the bands
    #[arg(long)]
    truth_params: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PriorSampleArgs {
    #[command(flatten)]
    prior: PriorSource,

    /// Number of draws per parameter
    #[arg(long, default_value_t = 1000)]
    draws: usize,

    /// Random seed (a fresh seed is drawn and reported when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Clinical states to sample (default: all)
    #[arg(long, value_delimiter = ',')]
    states: Vec<String>,
}

#[derive(Args, Debug)]
struct ForecastArgs {
    /// Forecast summary path template (without `_mean.csv` etc.)
    #[arg(long)]
    summaries: PathBuf,

    /// Run config holding `num_training_timesteps`
    #[arg(long)]
    config: PathBuf,

    /// Observed daily counts CSV
    #[arg(long)]
    truth: PathBuf,

    /// Use raw terminal counts even when a smoothed series exists
    #[arg(long)]
    raw_terminal: bool,

    /// Columns to compare (comma-separated)
    #[arg(long, value_delimiter = ',')]
    columns: Vec<String>,
}

#[derive(Args, Debug)]
struct TraceArgs {
    /// Calibration statistics CSV
    #[arg(long)]
    stats: PathBuf,

    /// Statistic (column) name
    #[arg(long)]
    stat: String,

    /// Keep only the last N non-NaN values
    #[arg(long)]
    last_n: Option<usize>,
}

#[derive(Args, Debug)]
struct CheckArgs {
    #[command(flatten)]
    prior: PriorSource,
}

/// Command payload in both output shapes.
struct Report {
    json: serde_json::Value,
    summary: Vec<String>,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() {
                ExitCode::ArgsError
            } else {
                ExitCode::Clean
            };
            let _ = e.print();
            std::process::exit(code.as_i32());
        }
    };

    let level = LogLevel::from_verbosity(cli.global.verbose, cli.global.quiet);
    let cli_level = (cli.global.verbose > 0 || cli.global.quiet).then_some(level);
    init_logging(&LogConfig::from_env(cli_level, None));

    let run_id = generate_run_id();
    tracing::debug!(run_id = %run_id, "starting");

    let result = match &cli.command {
        Commands::Params(args) => run_params(args),
        Commands::PriorSample(args) => run_prior_sample(args),
        Commands::Forecast(args) => run_forecast(args),
        Commands::Trace(args) => run_trace(args),
        Commands::Check(args) => run_check(args),
    };

    let exit_code = match result {
        Ok((report, code)) => {
            emit(&cli.global, &run_id, report);
            code
        }
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            emit_error(&cli.global, &run_id, &err);
            err.exit_code()
        }
    };

    std::process::exit(exit_code.as_i32());
}

fn emit(global: &GlobalOpts, run_id: &str, report: Report) {
    match global.format {
        OutputFormat::Json => {
            let mut json = report.json;
            if let Some(obj) = json.as_object_mut() {
                obj.insert("run_id".into(), run_id.into());
                obj.insert(
                    "generated_at".into(),
                    chrono::Utc::now().to_rfc3339().into(),
                );
            }
            print_json(&json);
        }
        OutputFormat::Summary => {
            for line in report.summary {
                println!("{}", line);
            }
        }
    }
}

fn emit_error(global: &GlobalOpts, run_id: &str, err: &Error) {
    match global.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "run_id": run_id,
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "status": "error",
            "error": err.to_json(),
        })),
        OutputFormat::Summary => eprintln!("error: {}", err),
    }
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("error: failed to serialize output: {}", e),
    }
}

// ============================================================================
// Command implementations
// ============================================================================

fn prior_json(prior: &LoadedPrior) -> serde_json::Value {
    serde_json::json!({
        "path": prior.path.display().to_string(),
        "source": prior.source.to_string(),
        "hash": prior.hash,
    })
}

fn rng_for(seed: Option<u64>) -> (StdRng, u64) {
    let seed = seed.unwrap_or_else(|| rand::rng().random());
    (StdRng::seed_from_u64(seed), seed)
}

fn parse_states(names: &[String]) -> Result<Vec<ClinicalState>> {
    if names.is_empty() {
        return Ok(ClinicalState::ALL.to_vec());
    }
    names
        .iter()
        .map(|n| n.parse::<ClinicalState>().map_err(Error::InvalidArgument))
        .collect()
}

fn run_params(args: &ParamsArgs) -> Result<(Report, ExitCode)> {
    let computer = PercentileBandComputer::new(args.low, args.high)?;
    let policy = if args.lenient {
        MissingParameterPolicy::Lenient
    } else {
        MissingParameterPolicy::Strict
    };

    let collection = SampleCollection::from_file(&args.samples)?;
    let posterior = PosteriorAggregator::new(policy).aggregate(&collection)?;

    let (prior, seed, prior_set) = if args.no_prior {
        (None, None, None)
    } else {
        let prior = load_prior(args.prior.prior.as_deref())?;
        let (mut rng, seed) = rng_for(args.seed);
        let set = PriorPredictiveSampler::new(&prior.spec).sample(
            &ClinicalState::ALL,
            args.prior_draws,
            &mut rng,
        )?;
        (Some(prior), Some(seed), Some(set))
    };

    let mut comparisons = compare_parameters(prior_set.as_ref(), &posterior, &computer);
    if let Some(path) = &args.truth_params {
        let truth = SampleCollection::from_file(path)?;
        match truth.samples() {
            [single] => attach_truth(&mut comparisons, single),
            other => {
                return Err(Error::InvalidArgument(format!(
                    "--truth-params must hold exactly one parameter object, found {}",
                    other.len()
                )))
            }
        }
    }

    let json = serde_json::json!({
        "command": "params",
        "status": "ok",
        "prior": prior.as_ref().map(prior_json),
        "seed": seed,
        "prior_draws": prior_set.as_ref().map(|_| args.prior_draws),
        "runs": posterior.num_runs(),
        "policy": policy,
        "percentiles": { "low": computer.low(), "high": computer.high() },
        "parameters": serde_json::to_value(&comparisons)?,
    });
    let summary = comparisons.iter().map(summary_line).collect();
    Ok((Report { json, summary }, ExitCode::Clean))
}

fn summary_line(c: &ParameterComparison) -> String {
    fn describe(bands: &ParameterBands) -> String {
        match bands {
            ParameterBands::Scalar { band, count } => format!(
                "mean={:.4} [{:.4}, {:.4}] n={}",
                band.mean, band.lower, band.upper, count
            ),
            ParameterBands::Vector { band, .. } => {
                let mode = band
                    .mean
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.total_cmp(b.1))
                    .map(|(i, _)| band.support[i].as_str())
                    .unwrap_or("-");
                format!("support={} mode={}", band.len(), mode)
            }
        }
    }
    let prior = c
        .prior
        .as_ref()
        .map(describe)
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{}: posterior {} | prior {}",
        c.name,
        describe(&c.posterior),
        prior
    )
}

fn run_prior_sample(args: &PriorSampleArgs) -> Result<(Report, ExitCode)> {
    let states = parse_states(&args.states)?;
    let prior = load_prior(args.prior.prior.as_deref())?;
    let (mut rng, seed) = rng_for(args.seed);
    let set = PriorPredictiveSampler::new(&prior.spec).sample(&states, args.draws, &mut rng)?;

    let summary = set
        .iter()
        .map(|(name, draws)| match draws {
            PriorDraws::Scalar(v) => format!("{}: {} draws", name, v.len()),
            PriorDraws::Matrix(m) => format!("{}: {} x {} pmf draws", name, m.rows(), m.cols()),
        })
        .collect();
    let json = serde_json::json!({
        "command": "prior-sample",
        "status": "ok",
        "prior": prior_json(&prior),
        "seed": seed,
        "draws": args.draws,
        "parameters": serde_json::to_value(&set)?,
    });
    Ok((Report { json, summary }, ExitCode::Clean))
}

fn run_forecast(args: &ForecastArgs) -> Result<(Report, ExitCode)> {
    let config = RunConfig::from_file(&args.config)?;
    let observed = Table::from_path(&args.truth)?;
    let summaries = ForecastSummaries::load(&args.summaries)?;
    let columns: Vec<String> = if args.columns.is_empty() {
        DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect()
    } else {
        args.columns.clone()
    };

    let comparisons = compare_forecasts(
        &observed,
        &summaries,
        config.num_training_timesteps,
        &columns,
        !args.raw_terminal,
    )?;

    let summary = comparisons
        .iter()
        .map(|c| {
            let coverage = c
                .coverage
                .map(|v| format!("{:.1}%", v * 100.0))
                .unwrap_or_else(|| "-".to_string());
            format!("{}: {} timesteps, post-cutoff coverage {}", c.column, c.timesteps.len(), coverage)
        })
        .collect();
    let json = serde_json::json!({
        "command": "forecast",
        "status": "ok",
        "num_training_timesteps": config.num_training_timesteps,
        "smooth_terminal": !args.raw_terminal,
        "columns": serde_json::to_value(&comparisons)?,
    });
    Ok((Report { json, summary }, ExitCode::Clean))
}

fn run_trace(args: &TraceArgs) -> Result<(Report, ExitCode)> {
    let table = Table::from_path(&args.stats)?;
    let trace = stat_trace(&table, &args.stat, args.last_n)?;

    let summary = vec![format!(
        "{}: {} values, last {}",
        trace.stat,
        trace.values.len(),
        trace
            .values
            .last()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string())
    )];
    let json = serde_json::json!({
        "command": "trace",
        "status": "ok",
        "trace": serde_json::to_value(&trace)?,
    });
    Ok((Report { json, summary }, ExitCode::Clean))
}

fn run_check(args: &CheckArgs) -> Result<(Report, ExitCode)> {
    let prior = load_prior(args.prior.prior.as_deref())?;

    let mut checks = Vec::new();
    let mut all_ok = true;
    for state in ClinicalState::ALL {
        match validate_prior_spec(&prior.spec, &[state]) {
            Ok(()) => checks.push(serde_json::json!({
                "state": state,
                "status": "ok",
            })),
            Err(e) => {
                all_ok = false;
                checks.push(serde_json::json!({
                    "state": state,
                    "status": "error",
                    "error": e.to_string(),
                    "code": e.code(),
                }));
            }
        }
    }

    let summary = checks
        .iter()
        .map(|c| {
            let state = c["state"].as_str().unwrap_or("?");
            match c["error"].as_str() {
                Some(err) => format!("✗ {}: {}", state, err),
                None => format!("✓ {}", state),
            }
        })
        .collect();
    let json = serde_json::json!({
        "command": "check",
        "status": if all_ok { "ok" } else { "error" },
        "prior": prior_json(&prior),
        "checks": checks,
    });
    let code = if all_ok {
        ExitCode::Clean
    } else {
        ExitCode::ConfigError
    };
    Ok((Report { json, summary }, code))
}
