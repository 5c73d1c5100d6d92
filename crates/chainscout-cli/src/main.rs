use anyhow::Context;
use chainscout_api::{FixedDelay, LlamaClient};
use chainscout_core::{
    protocols::{self, DEFAULT_CHAIN},
    providers::GitHubProvider,
    Config, ReportWriter, SearchAggregator, SearchFilters, SearchRequest, SearchVariant,
};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "chainscout_cli=info,chainscout_core=info,chainscout_api=warn";

#[derive(Parser)]
#[command(name = "chainscout")]
#[command(version, about = "Collect blockchain repositories from GitHub and DeFi protocol data", long_about = None)]
struct Cli {
    /// Config file (defaults to <config dir>/chainscout/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Root directory for reports (overrides the config file)
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Popular repositories around a blockchain
    Repos {
        /// Name of the blockchain (e.g. solana, ethereum)
        blockchain: String,

        #[command(flatten)]
        search: SearchArgs,
    },
    /// Blockchain-related repositories written in a language
    Language {
        /// Programming language (e.g. rust, solidity)
        language: String,

        #[command(flatten)]
        search: SearchArgs,
    },
    /// DeFi Llama protocols deployed on a chain
    Protocols {
        /// Chain name exactly as DeFi Llama spells it
        #[arg(long, default_value = DEFAULT_CHAIN)]
        chain: String,
    },
}

#[derive(Args)]
struct SearchArgs {
    /// Minimum number of stars
    #[arg(long, default_value_t = 0)]
    min_stars: u32,

    /// Minimum number of forks
    #[arg(long, default_value_t = 0)]
    min_forks: u32,

    /// Fetch every contributor of every repository found (slow)
    #[arg(long)]
    contributors: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; a missing file is fine
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;
    config.apply_env_token(std::env::var("GITHUB_TOKEN").ok());
    if let Some(dir) = cli.output {
        config.output.dir = dir;
    }

    let writer = ReportWriter::new(config.output.dir.clone(), chrono::Local::now().naive_local());

    match cli.command {
        Commands::Repos { blockchain, search } => {
            run_search(&config, &writer, SearchVariant::Blockchain, &blockchain, search).await
        }
        Commands::Language { language, search } => {
            run_search(&config, &writer, SearchVariant::Language, &language, search).await
        }
        Commands::Protocols { chain } => run_protocols(&config, &writer, &chain).await,
    }
}

async fn run_search(
    config: &Config,
    writer: &ReportWriter,
    variant: SearchVariant,
    keyword: &str,
    args: SearchArgs,
) -> anyhow::Result<()> {
    let token = config.github_token().map(str::to_string);
    if token.is_none() {
        warn!("No GitHub token configured, continuing unauthenticated");
        println!("Warning: No GitHub token found. Rate limits will be restricted.");
        println!("Set your token with: export GITHUB_TOKEN=your_token_here");
    }

    let request = SearchRequest::new(variant, keyword)
        .with_filters(SearchFilters {
            min_stars: args.min_stars,
            min_forks: args.min_forks,
        })
        .with_contributors(args.contributors);

    match variant {
        SearchVariant::Blockchain => {
            println!("Searching for popular {} repositories...", request.keyword)
        }
        SearchVariant::Language => {
            println!("Searching for {} blockchain repositories...", request.keyword)
        }
    }
    println!("Minimum stars: {}", request.filters.min_stars);
    println!("Minimum forks: {}", request.filters.min_forks);
    println!("Fetching contributors: {}", request.fetch_contributors);

    let provider = GitHubProvider::new(token, &config.github.api_url)
        .context("Failed to set up GitHub client")?;
    let aggregator = SearchAggregator::new(
        Box::new(provider),
        Box::new(FixedDelay::from_millis(config.rate_limit.page_delay_ms)),
        Box::new(FixedDelay::from_millis(config.rate_limit.query_delay_ms)),
    );

    let report = aggregator.run(&request).await;

    println!("\nFound {} unique repositories", report.repositories.len());
    if !report.repositories.is_empty() {
        println!("\nTop 10 repositories by stars:");
        for repo in report.repositories.iter().take(10) {
            println!("- {}: ⭐ {}", repo.full_name, repo.stars);
        }
    }

    let failed = report.failed_queries();
    if !failed.is_empty() {
        println!("\n{} of {} queries failed:", failed.len(), report.outcomes.len());
        for outcome in failed {
            if let Err(reason) = &outcome.result {
                println!("- '{}': {}", outcome.query, reason);
            }
        }
    }

    let incomplete = report.incomplete_contributor_lists();
    if !incomplete.is_empty() {
        println!("\nContributor lists cut short for {} repositories:", incomplete.len());
        for repo in incomplete {
            println!("- {}", repo.full_name);
        }
    }

    let mut written = writer
        .write_repositories(
            &request.keyword,
            &variant.report_title(&request.keyword),
            &report.repositories,
        )
        .context("Failed to write repository reports")?;

    if request.fetch_contributors && variant.tags_source_repo() {
        written.extend(
            writer
                .write_contributors(&request.keyword, &report.all_contributors())
                .context("Failed to write contributor export")?,
        );
    }

    println!("\nResults have been saved to:");
    for path in written {
        println!("- {}", path.display());
    }

    Ok(())
}

async fn run_protocols(config: &Config, writer: &ReportWriter, chain: &str) -> anyhow::Result<()> {
    println!("Fetching DeFi Llama protocols on {}...", chain);

    let client = LlamaClient::with_base_url(config.llama.api_url.clone())
        .context("Failed to set up DeFi Llama client")?;
    let table = match protocols::fetch_chain_protocols(&client, chain).await {
        Ok(table) => table,
        Err(e) if e.is_transport() => {
            warn!("Error fetching protocol listing: {}", e);
            println!("Could not fetch protocols for {}: {}", chain, e);
            println!("No protocol reports were written.");
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to fetch protocol listing"),
    };

    println!(
        "Found {} protocols on {} with {} distinct fields",
        table.len(),
        chain,
        table.columns.len()
    );

    let written = writer
        .write_protocols(chain, &table)
        .context("Failed to write protocol reports")?;

    println!("\nResults have been saved to:");
    for path in written {
        println!("- {}", path.display());
    }

    Ok(())
}
