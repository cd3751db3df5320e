//! abstat CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

mod analysis_spec;
mod analyze;
mod report;

use ab_inference::{DEFAULT_ALPHA, DEFAULT_TARGET_POWER, power_analysis};
use ab_ingest::{SyntheticConfig, generate, load_countries, load_interactions, page_group_consistency};

#[derive(Parser)]
#[command(name = "abstat")]
#[command(about = "abstat - A/B test conversion analysis")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, clean, summarise, chart and test an experiment
    Analyze(analyze::AnalyzeArgs),

    /// Data-quality diagnostics and page/group consistency only
    Inspect {
        /// Interaction log (CSV or TSV)
        #[arg(long, default_value = analyze::DEFAULT_INTERACTIONS)]
        interactions: PathBuf,

        /// User to country mapping (CSV or TSV)
        #[arg(long, default_value = analyze::DEFAULT_COUNTRIES)]
        countries: PathBuf,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Power of a two-sample t-test from observed rates
    Power {
        /// Control conversion rate
        #[arg(long)]
        control_rate: f64,

        /// Treatment conversion rate
        #[arg(long)]
        treatment_rate: f64,

        /// Total observations across both arms
        #[arg(long)]
        total_sample: u64,

        /// Significance level
        #[arg(long, default_value_t = DEFAULT_ALPHA)]
        alpha: f64,

        /// Desired power
        #[arg(long, default_value_t = DEFAULT_TARGET_POWER)]
        target_power: f64,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Write a seeded synthetic interaction log and country mapping
    GenerateData {
        /// Output directory (created if missing)
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        /// Distinct users
        #[arg(long, default_value_t = 5000)]
        users: usize,

        /// Random seed
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Conversion probability under control
        #[arg(long, default_value_t = 0.120)]
        control_rate: f64,

        /// Conversion probability under treatment
        #[arg(long, default_value_t = 0.119)]
        treatment_rate: f64,

        /// Probability that a row shows the other arm's page
        #[arg(long, default_value_t = 0.013)]
        mismatch_rate: f64,

        /// Probability that a user returns under the other arm
        #[arg(long, default_value_t = 0.004)]
        repeat_rate: f64,

        /// Probability that a user has no country row
        #[arg(long, default_value_t = 0.0)]
        missing_country_rate: f64,
    },

    /// Print version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Analyze(args) => analyze::cmd_analyze(&args),
        Commands::Inspect { interactions, countries, json } => {
            cmd_inspect(&interactions, &countries, json)
        }
        Commands::Power { control_rate, treatment_rate, total_sample, alpha, target_power, json } => {
            cmd_power(control_rate, treatment_rate, total_sample, alpha, target_power, json)
        }
        Commands::GenerateData {
            out_dir,
            users,
            seed,
            control_rate,
            treatment_rate,
            mismatch_rate,
            repeat_rate,
            missing_country_rate,
        } => {
            let config = SyntheticConfig {
                n_users: users,
                seed,
                control_rate,
                treatment_rate,
                mismatch_rate,
                repeat_rate,
                missing_country_rate,
                ..Default::default()
            };
            cmd_generate_data(&out_dir, &config)
        }
        Commands::Version => {
            println!("abstat {}", ab_core::VERSION);
            Ok(())
        }
    }
}

fn cmd_inspect(interactions: &Path, countries: &Path, json: bool) -> Result<()> {
    let inter = load_interactions(interactions)
        .with_context(|| format!("failed to load interaction log {}", interactions.display()))?;
    let ctry = load_countries(countries)
        .with_context(|| format!("failed to load country mapping {}", countries.display()))?;
    let consistency = page_group_consistency(&inter.records);

    if json {
        let value = serde_json::json!({
            "interactions": inter.diagnostics,
            "countries": ctry.diagnostics,
            "consistency": consistency,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print!("{}", report::format_inspection(&inter.diagnostics, &ctry.diagnostics, &consistency)?);
    }
    Ok(())
}

fn cmd_power(
    control_rate: f64,
    treatment_rate: f64,
    total_sample: u64,
    alpha: f64,
    target_power: f64,
    json: bool,
) -> Result<()> {
    let pa = power_analysis(control_rate, treatment_rate, total_sample, alpha, target_power)?;
    tracing::info!(power = pa.power, effect_size = pa.effect_size, "power analysis complete");
    if json {
        println!("{}", serde_json::to_string_pretty(&pa)?);
    } else {
        print!("{}", report::format_power(&pa)?);
    }
    Ok(())
}

fn cmd_generate_data(out_dir: &Path, config: &SyntheticConfig) -> Result<()> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    let data = generate(config)?;
    let interactions = out_dir.join(analyze::DEFAULT_INTERACTIONS);
    let countries = out_dir.join(analyze::DEFAULT_COUNTRIES);
    data.write_csv(&interactions, &countries)
        .with_context(|| format!("failed to write synthetic data to {}", out_dir.display()))?;
    tracing::info!(
        interactions = data.interactions.len(),
        countries = data.countries.len(),
        "synthetic data written"
    );
    println!("{}", interactions.display());
    println!("{}", countries.display());
    Ok(())
}
