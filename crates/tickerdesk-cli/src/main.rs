//! Command-line interface for tickerdesk
//!
//! Wires the market data, export, and chat services together. All state
//! lives under one data directory: `settings.json` (credentials and
//! conversation history) and `spreadsheets/` (exported CSV files plus
//! their manifest).

use anyhow::{Context, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tickerdesk_chat::{ChatSession, Conversation, GeminiClient, GeminiConfig};
use tickerdesk_export::SpreadsheetStore;
use tickerdesk_market::{
    AggregatesUseCase, Granularity, MarketConfig, MarketDataRepository, PolygonClient,
    PolygonRepository, SyntheticRepository,
};
use tickerdesk_utils::{KvStore, keys};
use tracing::info;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "tickerdesk")]
#[command(about = "Fetch stock OHLCV data, export CSV spreadsheets, and chat about them", long_about = None)]
struct Cli {
    /// Directory holding settings and exported spreadsheets
    #[arg(long, global = true, default_value = "tickerdesk-data", env = "TICKERDESK_DATA_DIR")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store an API key
    SetKey {
        /// Which service the key belongs to
        service: KeyService,
        /// The key itself
        key: String,
    },

    /// Fetch OHLCV bars and print them
    Fetch {
        /// Ticker symbol
        ticker: String,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
        /// End date, inclusive (defaults to the start date)
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Bar width in minutes (1, 5, 15, 30, 60)
        #[arg(long, default_value_t = 5)]
        granularity: u32,
        /// Use the deterministic synthetic data source instead of the live API
        #[arg(long)]
        synthetic: bool,
    },

    /// Fetch reference details (market cap, shares outstanding)
    Details {
        /// Ticker symbol
        ticker: String,
        /// As-of date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Use the deterministic synthetic data source instead of the live API
        #[arg(long)]
        synthetic: bool,
    },

    /// Fetch OHLCV bars and export them as a CSV spreadsheet
    Export {
        /// Ticker symbol
        ticker: String,
        /// Start date (YYYY-MM-DD); also the spreadsheet's reference date
        #[arg(long)]
        start: NaiveDate,
        /// End date, inclusive (defaults to the start date)
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Bar width in minutes (1, 5, 15, 30, 60)
        #[arg(long, default_value_t = 5)]
        granularity: u32,
        /// Use the deterministic synthetic data source instead of the live API
        #[arg(long)]
        synthetic: bool,
    },

    /// List exported spreadsheets, newest first
    List,

    /// Include a spreadsheet in the chat context
    Select {
        /// Spreadsheet id (from `list`)
        id: Uuid,
    },

    /// Exclude a spreadsheet from the chat context
    Deselect {
        /// Spreadsheet id (from `list`)
        id: Uuid,
    },

    /// Delete a spreadsheet and its metadata
    Delete {
        /// Spreadsheet id (from `list`)
        id: Uuid,
    },

    /// Ask the assistant one question about the selected spreadsheets
    Chat {
        /// The question to ask
        message: String,
        /// Conversation name (history is kept per conversation)
        #[arg(long, default_value = "default")]
        conversation: String,
        /// Override the chat model
        #[arg(long)]
        model: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KeyService {
    /// Market data vendor key
    Polygon,
    /// Chat completion vendor key
    Gemini,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tickerdesk_utils::init_tracing();

    let cli = Cli::parse();
    let mut kv = KvStore::open(cli.data_dir.join("settings.json"))?;

    match cli.command {
        Command::SetKey { service, key } => {
            let store_key = match service {
                KeyService::Polygon => keys::MARKET_API_KEY,
                KeyService::Gemini => keys::CHAT_API_KEY,
            };
            kv.set_string(store_key, key)?;
            println!("Key stored in {}", kv.path().display());
        }

        Command::Fetch {
            ticker,
            start,
            end,
            granularity,
            synthetic,
        } => {
            let granularity = Granularity::from_minutes(granularity)?;
            let use_case = AggregatesUseCase::new(repository(&kv, synthetic)?);
            let bars = use_case
                .fetch_range(&ticker, start, end.unwrap_or(start), granularity)
                .await?;

            info!(count = bars.len(), source = use_case.source(), "Fetch complete");
            println!("Timestamp            Open      High      Low       Close     Volume");
            for bar in &bars {
                println!(
                    "{}  {:<9.4} {:<9.4} {:<9.4} {:<9.4} {}",
                    bar.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume,
                );
            }
            println!("{} bars", bars.len());
        }

        Command::Details {
            ticker,
            date,
            synthetic,
        } => {
            let use_case = AggregatesUseCase::new(repository(&kv, synthetic)?);
            let details = use_case.ticker_details(&ticker, date).await?;

            println!("Ticker:     {}", details.ticker);
            if let Some(name) = &details.name {
                println!("Name:       {name}");
            }
            if let Some(cap) = details.market_cap {
                println!("Market cap: {cap:.0}");
            }
            if let Some(shares) = details.share_class_shares_outstanding {
                println!("Shares:     {shares}");
            }
            if let Some(weighted) = details.weighted_shares_outstanding {
                println!("Weighted:   {weighted}");
            }
        }

        Command::Export {
            ticker,
            start,
            end,
            granularity,
            synthetic,
        } => {
            let granularity = Granularity::from_minutes(granularity)?;
            let use_case = AggregatesUseCase::new(repository(&kv, synthetic)?);
            let bars = use_case
                .fetch_range(&ticker, start, end.unwrap_or(start), granularity)
                .await?;

            let mut store = spreadsheet_store(&cli.data_dir)?;
            let saved = store.export(&bars, &ticker, start, granularity)?;
            println!(
                "Exported {} rows to {} (id {})",
                saved.row_count,
                saved.path.display(),
                saved.id
            );
        }

        Command::List => {
            let store = spreadsheet_store(&cli.data_dir)?;
            let sheets = store.list()?;
            if sheets.is_empty() {
                println!("No spreadsheets exported yet");
            }
            for sheet in sheets {
                println!(
                    "{}  {}  {} {} ({}, {} rows){}",
                    sheet.id,
                    sheet.created_at.format("%Y-%m-%d %H:%M:%S"),
                    sheet.ticker,
                    sheet.date,
                    sheet.granularity.label(),
                    sheet.row_count,
                    if sheet.selected { "  [selected]" } else { "" },
                );
            }
        }

        Command::Select { id } => {
            spreadsheet_store(&cli.data_dir)?.set_selected(id, true)?;
            println!("Selected {id}");
        }

        Command::Deselect { id } => {
            spreadsheet_store(&cli.data_dir)?.set_selected(id, false)?;
            println!("Deselected {id}");
        }

        Command::Delete { id } => {
            spreadsheet_store(&cli.data_dir)?.delete(id)?;
            println!("Deleted {id}");
        }

        Command::Chat {
            message,
            conversation,
            model,
        } => {
            let api_key = kv
                .get_string(keys::CHAT_API_KEY)
                .or_else(|| std::env::var("GEMINI_API_KEY").ok())
                .context("No chat API key; run `tickerdesk set-key gemini <KEY>`")?;

            let mut config = GeminiConfig::new(api_key);
            if let Some(model) = model {
                config = config.with_model(model);
            }
            let provider = Arc::new(GeminiClient::with_config(config)?);

            let store = spreadsheet_store(&cli.data_dir)?;
            let loaded = Conversation::load(&kv, conversation)?;
            let mut session = ChatSession::new(provider, loaded);

            let reply = session.send(&mut kv, &store, &message).await?;
            println!("{reply}");
        }
    }

    Ok(())
}

/// Pick the data source: live client (needs a key) or synthetic generator
fn repository(kv: &KvStore, synthetic: bool) -> anyhow::Result<Arc<dyn MarketDataRepository>> {
    if synthetic {
        return Ok(Arc::new(SyntheticRepository::new()));
    }

    let Some(api_key) = kv
        .get_string(keys::MARKET_API_KEY)
        .or_else(|| std::env::var("POLYGON_API_KEY").ok())
    else {
        bail!("No market data API key; run `tickerdesk set-key polygon <KEY>` or pass --synthetic");
    };

    let client = PolygonClient::new(MarketConfig::new(api_key))?;
    Ok(Arc::new(PolygonRepository::new(client)))
}

fn spreadsheet_store(data_dir: &Path) -> anyhow::Result<SpreadsheetStore> {
    Ok(SpreadsheetStore::new(data_dir.join("spreadsheets"))?)
}
