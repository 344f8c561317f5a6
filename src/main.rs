use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{fmt, EnvFilter};

mod crossing;
mod db;
mod error;
mod models;
mod observe;
mod report;
mod server;

#[derive(Parser)]
#[command(name = "artist-metric-crossings")]
#[command(about = "Reports the days each artist's metric crossed a threshold", long_about = None)]
struct Cli {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    database_url: Option<String>,

    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 5, global = true)]
    max_connections: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a small sample dataset
    Seed,
    /// Import metrics from a CSV file (artist_id,date,value)
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Run the HTTP service
    Serve {
        #[arg(long, env = "LISTEN_ADDR", default_value = "127.0.0.1:5000")]
        listen: SocketAddr,
    },
    /// Compute crossings once and print them as JSON
    Crossings {
        #[arg(long, value_parser = clap::value_parser!(i64).range(0..))]
        metric_value: i64,
        /// Write a markdown report here instead of printing JSON
        #[arg(long)]
        out: Option<PathBuf>,
        /// Repeat the detection this many times and log the average run time
        #[arg(long, default_value_t = 1)]
        bench: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let database_url = cli
        .database_url
        .context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(cli.max_connections)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            tracing::info!("schema ready");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            tracing::info!("seed data inserted");
        }
        Commands::Import { csv } => {
            let written = db::import_csv(&pool, &csv).await?;
            tracing::info!(written, path = %csv.display(), "import finished");
        }
        Commands::Serve { listen } => {
            let repo = Arc::new(db::PgMetricRepository::new(pool));
            server::serve(listen, server::AppState::new(repo)).await?;
        }
        Commands::Crossings {
            metric_value,
            out,
            bench,
        } => {
            let snapshot = db::fetch_snapshot(&pool).await?;
            let results = observe::timed_average("detect_crossings", bench, || {
                crossing::detect_snapshot(&snapshot, metric_value)
            });

            match out {
                Some(path) => {
                    std::fs::write(&path, report::build_report(metric_value, &results))
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    tracing::info!(path = %path.display(), "report written");
                }
                None => println!("{}", serde_json::to_string_pretty(&results)?),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossings_rejects_negative_threshold() {
        let result = Cli::try_parse_from([
            "artist-metric-crossings",
            "--database-url",
            "postgres://localhost/metrics",
            "crossings",
            "--metric-value",
            "-1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn serve_defaults_to_local_listener() {
        let cli = Cli::try_parse_from([
            "artist-metric-crossings",
            "serve",
            "--database-url",
            "postgres://localhost/metrics",
        ])
        .unwrap();

        assert_eq!(cli.max_connections, 5);
        match cli.command {
            Commands::Serve { listen } => assert_eq!(listen.to_string(), "127.0.0.1:5000"),
            _ => panic!("expected serve"),
        }
    }
}
