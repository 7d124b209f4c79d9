use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use serde_json::{json, Map, Value};
use tracing::info;

use housing_predictor::api::{
    format_house_value, HousingInputs, PredictionApiServer, PredictionClient, RetryConfiguration,
    FORM_FIELDS,
};
use housing_predictor::config::load_config;
use housing_predictor::core::ServiceConfig;
use housing_predictor::ml::{train_linear, ModelArtifact, TrainingConfig, TrainingDataset};
use housing_predictor::monitoring::init_telemetry;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the model and serve predictions over HTTP
    Serve {
        /// Model artifact to load
        #[arg(long)]
        model_path: Option<PathBuf>,
        /// Address to bind
        #[arg(long)]
        host: Option<String>,
        /// Port to bind
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Fit a linear model on a JSON dataset and write the artifact
    Train {
        /// Dataset with feature_names, target_name, records and targets
        #[arg(long)]
        data: PathBuf,
        /// Where to write the model artifact
        #[arg(short, long)]
        output: PathBuf,
        /// Fraction of rows held out for scoring
        #[arg(long, default_value_t = 0.2)]
        test_fraction: f64,
        /// Shuffle seed
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Describe a model artifact
    Inspect {
        /// Model artifact
        artifact: PathBuf,
    },
    /// Ask a running service for a price estimate
    Predict {
        /// Base URL of the prediction API
        #[arg(long, env = "HOUSING_API_URL", default_value = "http://localhost:8000")]
        url: String,
        #[command(flatten)]
        inputs: InputArgs,
    },
    /// Configuration helpers
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Write the default configuration as TOML
    Init {
        /// Destination file
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Neighbourhood values in human units.
#[derive(clap::Args)]
struct InputArgs {
    /// Median household income in dollars
    #[arg(long, default_value_t = 38_700.0)]
    income: f64,
    /// Median house age in years
    #[arg(long, default_value_t = 28.6)]
    house_age: f64,
    /// Average rooms per household
    #[arg(long, default_value_t = 5.43)]
    rooms: f64,
    /// Average bedrooms per household
    #[arg(long, default_value_t = 1.07)]
    bedrooms: f64,
    /// Block population
    #[arg(long, default_value_t = 1425.0)]
    population: f64,
    /// Average household size
    #[arg(long, default_value_t = 3.07)]
    occupancy: f64,
    #[arg(long, default_value_t = 35.6, allow_negative_numbers = true)]
    latitude: f64,
    #[arg(long, default_value_t = -119.6, allow_negative_numbers = true)]
    longitude: f64,
}

impl From<InputArgs> for HousingInputs {
    fn from(args: InputArgs) -> Self {
        Self {
            median_income: args.income,
            house_age: args.house_age,
            avg_rooms: args.rooms,
            avg_bedrooms: args.bedrooms,
            population: args.population,
            avg_occupancy: args.occupancy,
            latitude: args.latitude,
            longitude: args.longitude,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenv().ok();

    let cli = Cli::parse();

    let overrides = match &cli.command {
        Commands::Serve {
            model_path,
            host,
            port,
        } => serve_overrides(model_path.as_deref(), host.as_deref(), *port),
        _ => Value::Null,
    };
    let config = load_config(cli.config.as_deref(), overrides)?;

    init_telemetry(&config.logging)?;

    match cli.command {
        Commands::Serve { .. } => serve(config).await,
        Commands::Train {
            data,
            output,
            test_fraction,
            seed,
        } => train(&data, &output, TrainingConfig {
            test_fraction,
            seed,
        }),
        Commands::Inspect { artifact } => inspect(&artifact),
        Commands::Predict { url, inputs } => predict(&url, inputs.into()).await,
        Commands::Config {
            command: ConfigCommand::Init { path, force },
        } => init_config(&path, force),
    }
}

fn serve_overrides(model_path: Option<&Path>, host: Option<&str>, port: Option<u16>) -> Value {
    let mut server = Map::new();
    if let Some(host) = host {
        server.insert("host".into(), json!(host));
    }
    if let Some(port) = port {
        server.insert("port".into(), json!(port));
    }

    let mut root = Map::new();
    if !server.is_empty() {
        root.insert("server".into(), Value::Object(server));
    }
    if let Some(path) = model_path {
        root.insert("model".into(), json!({ "path": path.to_string_lossy() }));
    }
    Value::Object(root)
}

async fn serve(config: ServiceConfig) -> Result<()> {
    // The model must be in memory before anything binds.
    let server = PredictionApiServer::bootstrap(&config)
        .with_context(|| format!("Failed to load model from {}", config.model.path.display()))?;

    info!(address = %config.bind_address(), "Model ready, starting server");

    server
        .run(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
            }
        })
        .await
}

fn train(data: &Path, output: &Path, training: TrainingConfig) -> Result<()> {
    let dataset = TrainingDataset::load(data)
        .with_context(|| format!("Failed to read dataset {}", data.display()))?;
    let report = train_linear(&dataset, &training).context("Training failed")?;

    report
        .artifact
        .save(output)
        .with_context(|| format!("Failed to write artifact {}", output.display()))?;

    println!("Trained on {} rows, scored on {}", report.train_rows, report.test_rows);
    println!("Test MSE: {:.4}", report.mse);
    println!("Test R2:  {:.4}", report.r2);
    println!("Artifact written to {}", output.display());
    Ok(())
}

fn inspect(path: &Path) -> Result<()> {
    let artifact = ModelArtifact::load(path)
        .with_context(|| format!("Failed to load artifact {}", path.display()))?;
    let info = artifact.info();

    println!("Model:    {}", info.model_kind);
    println!("Target:   {}", info.target_name);
    println!("Features: {}", info.n_features);
    for (idx, name) in info.feature_names.iter().enumerate() {
        match info.feature_ranges.as_ref().and_then(|r| r.get(idx)) {
            Some(range) => println!("  {idx:>2}. {name} [{}, {}]", range.min, range.max),
            None => println!("  {idx:>2}. {name}"),
        }
    }
    Ok(())
}

async fn predict(url: &str, inputs: HousingInputs) -> Result<()> {
    let client = PredictionClient::new(url, RetryConfiguration::default())?;

    let model = client
        .model_info()
        .await
        .with_context(|| format!("Failed to reach prediction API at {url}"))?;
    inputs.validate_for(&model)?;

    let prediction = client.predict(&inputs.to_features()).await?;

    for (field, value) in FORM_FIELDS.iter().zip(inputs.as_entered()) {
        println!("{:<34} {}", field.label, value);
    }
    println!();
    println!("Estimated median house value: {}", format_house_value(prediction));
    Ok(())
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists, pass --force to overwrite", path.display());
    }
    ServiceConfig::default()
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
