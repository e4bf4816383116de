use movie_pipeline::{Config, Credentials, Pipeline, Result, RunOptions, DEFAULT_CONFIG};

use clap::Parser;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Fetch TMDB movie listings, enrich them with keywords and cast, and upsert
/// them into Supabase.
#[derive(Debug, Parser)]
#[command(name = "movie-pipeline", version)]
struct Cli {
    /// Listing to walk: `top_rated` or `popular`.
    #[arg(long = "type")]
    kind: Option<String>,

    /// Number of pages to fetch.
    #[arg(long)]
    pages: Option<u32>,

    #[arg(long, default_value = DEFAULT_CONFIG)]
    config: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(fatal = err.is_fatal(), "Could not run pipeline: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::from_file(&cli.config)?;
    let credentials = Credentials::from_env()?;

    let pipeline = Pipeline::new(&config, &credentials);
    let options = RunOptions {
        kind: cli.kind,
        pages: cli.pages,
    };
    pipeline.run_with(Some(options)).await?;

    Ok(())
}
