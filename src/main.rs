use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tracing::{error, info};

use whymoves::fetch::{router, FetchContext};
use whymoves::logging::configure_logging;
use whymoves::pipeline::Pipeline;
use whymoves::portfolio::PortfolioStore;
use whymoves::store::Store;
use whymoves::summarize::SummaryEngine;
use whymoves::types::MoverSummary;
use whymoves::TARGET_PIPELINE;

#[derive(Parser, Debug)]
#[command(
    name = "whymoves",
    about = "Explains why a stock's price moved from its recent news"
)]
struct Cli {
    /// Stock symbol to analyze
    #[arg(long)]
    symbol: Option<String>,

    /// Exchange code for the symbol
    #[arg(long, default_value = "US")]
    exchange: String,

    /// Daily change percentage for the symbol
    #[arg(long, default_value_t = 0.01)]
    change: f64,

    /// Process every symbol with cached news
    #[arg(long)]
    all: bool,

    /// Fetch news before analysis (for --symbol, or the whole portfolio)
    #[arg(long)]
    fetch_news: bool,

    /// Add a symbol to the default portfolio and exit
    #[arg(long)]
    add_symbol: Option<String>,

    /// Remove a symbol from the default portfolio and exit
    #[arg(long)]
    remove_symbol: Option<String>,
}

#[tokio::main]
async fn main() {
    configure_logging();
    let cli = Cli::parse();

    let exit_code = tokio::select! {
        result = run(cli) => match result {
            Ok(()) => 0,
            Err(err) => {
                error!(target: TARGET_PIPELINE, "Fatal error: {:#}", err);
                eprintln!("An error occurred: {err:#}");
                1
            }
        },
        _ = signal::ctrl_c() => {
            info!(target: TARGET_PIPELINE, "Interrupted by user");
            println!("\nOperation cancelled by user");
            0
        }
    };
    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> Result<()> {
    let store = Store::from_environment();
    let portfolio = PortfolioStore::new(store.root().join("portfolios"));

    if let Some(symbol) = &cli.add_symbol {
        let added = portfolio.add_symbol(symbol, None)?;
        println!(
            "{}",
            if added {
                format!("Added {symbol} to portfolio")
            } else {
                format!("{symbol} already in portfolio")
            }
        );
        return Ok(());
    }
    if let Some(symbol) = &cli.remove_symbol {
        let removed = portfolio.remove_symbol(symbol, None)?;
        println!(
            "{}",
            if removed {
                format!("Removed {symbol} from portfolio")
            } else {
                format!("{symbol} not in portfolio")
            }
        );
        return Ok(());
    }

    if cli.fetch_news {
        let mut ctx = FetchContext::new();
        match &cli.symbol {
            Some(symbol) => {
                info!(target: TARGET_PIPELINE, "Fetching news for {} on {}", symbol, cli.exchange);
                router::fetch_and_cache(&mut ctx, &store, symbol, &cli.exchange).await;
            }
            None => {
                for symbol in portfolio.get_symbols(None) {
                    info!(target: TARGET_PIPELINE, "Fetching news for {} on {}", symbol, cli.exchange);
                    router::fetch_and_cache(&mut ctx, &store, &symbol, &cli.exchange).await;
                }
            }
        }
    }

    let engine = SummaryEngine::from_environment();
    let mut pipeline = Pipeline::new(store, engine);

    if cli.all {
        info!(target: TARGET_PIPELINE, "Processing all stocks with news data");
        for summary in pipeline.run_all().await {
            print_summary(&summary, true);
        }
    } else if let Some(symbol) = &cli.symbol {
        let summary = pipeline
            .why_it_moves(symbol, &cli.exchange, cli.change)
            .await;
        print_summary(&summary, false);
    } else if !cli.fetch_news {
        println!("Nothing to do: pass --symbol, --all, or --fetch-news (see --help)");
    }

    Ok(())
}

fn print_summary(summary: &MoverSummary, brief: bool) {
    println!(
        "\n{} ({}) - Change: {:.2}%",
        summary.symbol, summary.exchange, summary.daily_change_percentage
    );
    println!("Classification: {}", summary.movement);
    if brief && summary.summary.len() > 200 {
        let preview: String = summary.summary.chars().take(200).collect();
        println!("Summary: {preview}...\n");
    } else {
        println!("Summary: {}\n", summary.summary);
    }
}
