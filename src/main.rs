use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use linesmith::config::AppConfig;
use linesmith::edge::{EdgeResult, ExposureLedger, PredictionArchive, Recommendation, Staker};
use linesmith::inputs::SlateInputs;
use linesmith::logging::init_logging;
use linesmith::ratings::PowerRatingStore;
use linesmith::tracker::BetLedger;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "linesmith")]
#[command(version)]
#[command(about = "NFL point-spread model, edge detection and closing-line tracking", long_about = None)]
struct Cli {
    /// Configuration directory (default.toml plus $LINESMITH_ENV overrides)
    #[arg(short, long, default_value = "config", env = "LINESMITH_CONFIG_DIR")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a slate and print edges and recommendations as JSON lines
    Evaluate {
        /// Directory holding games.jsonl, markets.jsonl and optional ratings,
        /// weather and injury files
        #[arg(short, long)]
        input: PathBuf,
        /// Evaluation time in RFC 3339 (defaults to now)
        #[arg(long)]
        as_of: Option<DateTime<Utc>>,
        /// Open a bet record in the ledger for every recommendation
        #[arg(long)]
        record: bool,
    },
}

/// One line of output
#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum OutputLine<'a> {
    Edge(&'a EdgeResult),
    Recommendation(&'a Recommendation),
    Failure { game_id: &'a str, error: String },
}

fn emit(line: &OutputLine<'_>) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(line)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    let _guard = init_logging(&config.logging);
    config.validate()?;

    match cli.command {
        Commands::Evaluate { input, as_of, record } => {
            run_evaluate(&config, &input, as_of.unwrap_or_else(Utc::now), record)
        }
    }
}

fn load_store(config: &AppConfig, slate: &SlateInputs) -> anyhow::Result<PowerRatingStore> {
    let store = match &config.ratings.store_path {
        Some(path) => PowerRatingStore::load(config.ratings.clone(), path)
            .with_context(|| format!("loading ratings from {}", path.display()))?,
        None => PowerRatingStore::new(config.ratings.clone()),
    };

    // Seeds only introduce teams the store has not seen
    let snapshot = store.snapshot();
    let seeds: Vec<_> = slate
        .ratings
        .iter()
        .filter(|seed| snapshot.get(&seed.team).is_err())
        .cloned()
        .collect();
    if !seeds.is_empty() {
        store.seed(seeds)?;
        if let Some(path) = &config.ratings.store_path {
            store.save(path)?;
        }
    }
    Ok(store)
}

fn run_evaluate(config: &AppConfig, input: &Path, as_of: DateTime<Utc>, record: bool) -> anyhow::Result<()> {
    let evaluator = config.evaluator()?;
    let slate = SlateInputs::load(input).with_context(|| format!("reading inputs from {}", input.display()))?;
    let store = load_store(config, &slate)?;

    let mut games = Vec::new();
    for (game_id, inputs) in slate.assemble(as_of) {
        match inputs {
            Ok(inputs) => games.push(inputs),
            Err(e) => {
                warn!(%game_id, error = %e, "Skipping game");
                emit(&OutputLine::Failure {
                    game_id: &game_id,
                    error: e.to_string(),
                })?;
            }
        }
    }

    let slate_eval = evaluator.evaluate_slate(&store, &games, as_of);
    for (game_id, outcome) in &slate_eval.games {
        match outcome {
            Ok(evaluation) => emit(&OutputLine::Edge(&evaluation.edge))?,
            Err(e) => emit(&OutputLine::Failure {
                game_id,
                error: e.to_string(),
            })?,
        }
    }

    if let Some(path) = &config.tracker.prediction_archive {
        let archive = PredictionArchive::new(path);
        for evaluation in slate_eval.evaluations() {
            archive.append(&evaluation.edge.predicted)?;
        }
    }

    let ledger = if record {
        Some(BetLedger::from_config(&config.tracker)?)
    } else {
        None
    };

    // Stakes already on the books count against the exposure window
    let mut exposure = ExposureLedger::default();
    if let Some(ledger) = &ledger {
        for bet in ledger.records() {
            exposure.record(bet.created_at, bet.stake_fraction);
        }
    }
    let mut staker = Staker::with_exposure(config.staking.clone(), exposure);

    let recommendations = evaluator.recommend_slate(&mut staker, slate_eval.evaluations(), as_of);
    for rec in &recommendations {
        emit(&OutputLine::Recommendation(rec))?;
        if let Some(ledger) = &ledger {
            ledger.open(rec)?;
        }
    }

    info!(
        games = slate_eval.games.len(),
        recommendations = recommendations.len(),
        exposure = %staker.exposure(as_of),
        "Slate complete"
    );
    Ok(())
}
