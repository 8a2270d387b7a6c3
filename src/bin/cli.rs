//! Gridcast CLI - train race-outcome models and serve grid predictions

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

use gridcast::data::load_race_records;
use gridcast::training::{train_pipeline, BoostingConfig, ForestConfig, TrainingConfig};
use gridcast::{GridEntry, RacePredictor, RaceSetting, RandomContext, Weather, DEFAULT_SEED};

/// Default artifact directory (relative to project root)
const DEFAULT_MODEL_DIR: &str = "models";

#[derive(Parser)]
#[command(name = "gridcast")]
#[command(author, version, about = "Race outcome prediction CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the artifact directory
    #[arg(long, default_value = DEFAULT_MODEL_DIR)]
    model_dir: PathBuf,

    /// Seed for every sampling step in the run
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Train models from a race results CSV
    Train {
        /// Path to the input CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Trees per forest ensemble
        #[arg(long, default_value = "200")]
        trees: usize,

        /// Maximum tree depth for the forests
        #[arg(long, default_value = "15")]
        depth: usize,

        /// Boosting stages for the gradient-boosted candidate
        #[arg(long, default_value = "200")]
        stages: usize,

        /// Learning rate for the gradient-boosted candidate
        #[arg(long, default_value = "0.1")]
        learning_rate: f64,

        /// Held-out fraction for model selection
        #[arg(long, default_value = "0.2")]
        test_fraction: f64,
    },

    /// Predict a race from a starting grid
    Predict {
        /// Circuit name
        #[arg(short, long)]
        circuit: String,

        /// Weather: dry, wet, or mixed
        #[arg(short, long, default_value = "dry")]
        weather: String,

        /// Grid entry as "driver,constructor,grid"; repeat per car
        #[arg(short, long = "entry")]
        entries: Vec<String>,
    },

    /// Show feature importances of the trained position model
    Importance {
        /// Number of features to show
        #[arg(long, default_value = "20")]
        top: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    println!("{}", "Gridcast CLI".cyan().bold());
    println!();

    match cli.command {
        Commands::Train {
            data,
            trees,
            depth,
            stages,
            learning_rate,
            test_fraction,
        } => {
            let config = TrainingConfig {
                seed: cli.seed,
                test_fraction,
                forest: ForestConfig {
                    n_trees: trees,
                    max_depth: depth,
                    ..Default::default()
                },
                boosting: BoostingConfig {
                    n_estimators: stages,
                    learning_rate,
                    ..Default::default()
                },
                ..Default::default()
            };
            run_train(&data, &cli.model_dir, cli.seed, &config)?;
        }
        Commands::Predict {
            circuit,
            weather,
            entries,
        } => {
            run_predict(&cli.model_dir, &circuit, &weather, &entries, cli.seed)?;
        }
        Commands::Importance { top } => {
            run_importance(&cli.model_dir, top)?;
        }
    }

    Ok(())
}

fn run_train(data: &Path, model_dir: &Path, seed: u64, config: &TrainingConfig) -> Result<()> {
    println!(
        "{}: {} (seed {})",
        "Training".green(),
        data.display(),
        seed
    );
    println!();

    let mut ctx = RandomContext::from_seed(seed);
    let (records, report) = load_race_records(data, &mut ctx)
        .with_context(|| format!("Failed to load race records from {:?}", data))?;

    println!("Loaded {} rows, kept {}", report.total_rows, report.kept_rows);
    if report.weather_synthesized {
        println!("{}", "(no weather column; default conditions assigned)".dimmed());
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message("Training candidate models...");

    let outcome = train_pipeline(&records, config, &mut ctx).context("Training failed")?;

    pb.finish_and_clear();

    let summary = &outcome.summary;
    println!("{}", "Training Summary:".yellow().bold());
    println!("{:<22} {}", "Dataset size", summary.dataset_size);
    println!("{:<22} {}", "Features", summary.feature_count);
    println!(
        "{:<22} {}",
        "Position model",
        summary.position_model.cyan()
    );
    println!("{:<22} {:.4}", "Position RMSE", summary.position_rmse);
    println!("{:<22} {:.4}", "Position MAE", summary.position_mae);
    println!(
        "{:<22} {:.1}%",
        "Podium accuracy",
        summary.podium_accuracy * 100.0
    );
    println!(
        "{:<22} {:.1}%",
        "Points accuracy",
        summary.points_accuracy * 100.0
    );
    match summary.winner_accuracy {
        Some(acc) => println!("{:<22} {:.1}%", "Winner accuracy", acc * 100.0),
        None => println!(
            "{:<22} {}",
            "Winner model",
            format!(
                "skipped ({} winners, needs more than {})",
                summary.winner_positives,
                gridcast::training::MIN_WINNER_POSITIVES
            )
            .yellow()
        ),
    }
    println!();

    outcome
        .bundle
        .save(model_dir)
        .with_context(|| format!("Failed to save artifacts to {:?}", model_dir))?;
    println!("{}: {:?}", "Saved".green(), model_dir);

    Ok(())
}

fn run_predict(
    model_dir: &Path,
    circuit: &str,
    weather: &str,
    raw_entries: &[String],
    seed: u64,
) -> Result<()> {
    if raw_entries.is_empty() {
        bail!("No grid entries given. Pass at least one --entry \"driver,constructor,grid\"");
    }

    let weather = parse_weather(weather)?;
    let entries: Vec<GridEntry> = raw_entries
        .iter()
        .map(|raw| parse_entry(raw))
        .collect::<Result<_>>()?;

    println!(
        "{}: {} / {} / {} cars",
        "Predicting".green(),
        circuit,
        weather,
        entries.len()
    );
    println!();

    let predictor = RacePredictor::load(model_dir)
        .with_context(|| format!("Failed to load artifacts from {:?}", model_dir))?;
    let setting = RaceSetting {
        circuit: circuit.to_string(),
        weather,
    };
    let mut ctx = RandomContext::from_seed(seed);
    let mut predictions = predictor
        .predict_grid(&setting, &entries, &mut ctx)
        .context("Prediction failed")?;
    predictions.sort_by_key(|p| p.finish);

    let has_winner = predictions.iter().any(|p| p.win_probability.is_some());

    println!("{}", "Predicted Finishing Order:".yellow().bold());
    if has_winner {
        println!(
            "{:>4} {:<22} {:<14} {:>4} {:>7} {:>7} {:>6}",
            "Pos", "Driver", "Constructor", "Grid", "Podium", "Points", "Win"
        );
    } else {
        println!(
            "{:>4} {:<22} {:<14} {:>4} {:>7} {:>7}",
            "Pos", "Driver", "Constructor", "Grid", "Podium", "Points"
        );
    }
    println!("{}", "-".repeat(if has_winner { 72 } else { 65 }));

    for p in &predictions {
        let podium = if p.podium { "yes".green() } else { "-".normal() };
        let points = if p.points { "yes".green() } else { "-".normal() };
        if let Some(win) = p.win_probability {
            println!(
                "{:>4} {:<22} {:<14} {:>4} {:>7} {:>7} {:>5.1}%",
                p.finish,
                p.driver,
                p.constructor,
                p.grid,
                podium,
                points,
                win * 100.0
            );
        } else {
            println!(
                "{:>4} {:<22} {:<14} {:>4} {:>7} {:>7}",
                p.finish, p.driver, p.constructor, p.grid, podium, points
            );
        }
    }

    if !has_winner {
        println!();
        println!(
            "{}",
            "(no winner model in this bundle; win probabilities unavailable)".dimmed()
        );
    }

    Ok(())
}

fn run_importance(model_dir: &Path, top: usize) -> Result<()> {
    let predictor = RacePredictor::load(model_dir)
        .with_context(|| format!("Failed to load artifacts from {:?}", model_dir))?;

    println!("{}", "Position Model Feature Importance:".yellow().bold());
    println!("{:>4} {:<26} {:>10}", "#", "Feature", "Weight");
    println!("{}", "-".repeat(44));

    for (rank, (name, weight)) in predictor.feature_importance().iter().take(top).enumerate() {
        println!("{:>4} {:<26} {:>9.4}%", rank + 1, name, weight * 100.0);
    }

    Ok(())
}

/// Parse one "driver,constructor,grid" argument
fn parse_entry(raw: &str) -> Result<GridEntry> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        bail!("Invalid entry {:?}: expected \"driver,constructor,grid\"", raw);
    }
    let grid: u32 = parts[2]
        .parse()
        .with_context(|| format!("Invalid grid slot {:?} in entry {:?}", parts[2], raw))?;
    if grid == 0 {
        bail!("Grid slot must be 1 or greater in entry {:?}", raw);
    }
    Ok(GridEntry {
        driver: parts[0].to_string(),
        constructor: parts[1].to_string(),
        grid,
    })
}

fn parse_weather(value: &str) -> Result<Weather> {
    match value.to_ascii_lowercase().as_str() {
        "dry" => Ok(Weather::Dry),
        "wet" => Ok(Weather::Wet),
        "mixed" => Ok(Weather::Mixed),
        other => bail!("Unknown weather {:?}. Use dry, wet, or mixed", other),
    }
}
