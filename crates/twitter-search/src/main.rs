//! Twitter search CLI - serve the search API or run one-off harvests.

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use twitter_search::config::{Config, ConfigArgs, DEFAULT_PORT};
use twitter_search::export::{process_harvest, write_harvest};
use twitter_search::server::run_server;
use twitter_search::{build_search_client, SearchMode, SearchRequest, SessionSource, XScraper};

/// Twitter search - authenticated Twitter/X search behind a JSON API.
#[derive(Parser)]
#[command(name = "twitter-search")]
#[command(about = "Twitter/X search API and harvest tool")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP search API
    Serve {
        /// Port to listen on
        #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Address to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
    },

    /// Establish a session (reuse cached cookies or log in) and exit
    Auth,

    /// Run one search and write the results to a timestamped JSON file
    Harvest {
        /// Search query
        query: String,

        /// Maximum number of tweets
        #[arg(long, default_value = "500")]
        limit: usize,

        /// Ranking mode (Latest or Top)
        #[arg(long, default_value = "Latest")]
        mode: SearchMode,

        /// Directory for the harvest file
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Reduce a harvest file to text and engagement counts
    Process {
        /// Harvest file to read
        input: PathBuf,

        /// Output file
        #[arg(long, default_value = "processed_tweets.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("twitter_search=debug,tower_http=debug,info")
        } else {
            EnvFilter::new("twitter_search=info,tower_http=info,warn")
        }
    });

    if cli.log_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }

    let config = Config::from(cli.config);

    match cli.command {
        Commands::Serve { port, host } => {
            tracing::info!(
                port,
                cookies_file = %config.cookies_file.display(),
                has_credentials = config.credentials.is_some(),
                "Starting search API"
            );
            run_serve(&config, &format!("{host}:{port}")).await
        }
        Commands::Auth => run_auth(&config).await,
        Commands::Harvest {
            query,
            limit,
            mode,
            output_dir,
        } => run_harvest(&config, query, limit, mode, output_dir).await,
        Commands::Process { input, output } => {
            run_process(&input, &output);
            Ok(())
        }
    }
}

async fn run_serve(config: &Config, addr: &str) -> Result<()> {
    let scraper = Arc::new(XScraper::new(&config.api_base)?);
    let client = build_search_client(config, scraper);
    run_server(client, addr).await
}

async fn run_auth(config: &Config) -> Result<()> {
    println!("{}", "🔐 Twitter session setup\n".bold());

    let scraper = Arc::new(XScraper::new(&config.api_base)?);
    let client = build_search_client(config, scraper);

    match client.authenticator().authenticate().await? {
        SessionSource::Cached => {
            println!("{} Cached session is valid", "✅".green());
        }
        SessionSource::FreshLogin => {
            println!(
                "{} Logged in, session saved to: {}",
                "✅".green(),
                client.authenticator().store().path().display()
            );
        }
    }

    Ok(())
}

async fn run_harvest(
    config: &Config,
    query: String,
    limit: usize,
    mode: SearchMode,
    output_dir: PathBuf,
) -> Result<()> {
    anyhow::ensure!(limit > 0, "--limit must be at least 1");

    let scraper = Arc::new(XScraper::new(&config.api_base)?);
    let client = build_search_client(config, scraper);

    println!("🔍 Harvesting: {query}\n");
    let request = SearchRequest::new(query).with_limit(limit).with_mode(mode);
    let tweets = client.search(&request).await?;

    let path = write_harvest(&output_dir, &tweets)?;
    println!(
        "{} {} tweets saved to {}",
        "✅".green(),
        tweets.len(),
        path.display()
    );

    Ok(())
}

fn run_process(input: &std::path::Path, output: &std::path::Path) {
    let summaries = process_harvest(input, output);
    if summaries.is_empty() {
        println!("{} No tweets processed", "⚠️".yellow());
    } else {
        println!(
            "{} Processed {} tweets into {}",
            "✅".green(),
            summaries.len(),
            output.display()
        );
    }
}
