//! Crash Analytics CLI.
//!
//! Entry point. Loads configuration, initialises structured logging, and
//! dispatches one of: analyze a saved history, download history from the
//! Stake API, manage the stored request headers, or run the API server.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crash_analytics::analytics::{run_analytics, AnalyticsParams, ParamOverrides};
use crash_analytics::config::AppConfig;
use crash_analytics::credentials::cipher::HeaderCipher;
use crash_analytics::credentials::curl::extract_headers_from_curl;
use crash_analytics::credentials::{CredentialStore, FileCredentialStore};
use crash_analytics::history::fetch_history;
use crash_analytics::history::stake::StakeClient;
use crash_analytics::server::{self, ServerState};
use crash_analytics::storage;
use crash_analytics::types::{into_chronological, AnalyticsResult};

#[derive(Parser, Debug)]
#[command(name = "crash-analytics", version, about = "Crash game history analytics")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "config.toml", global = true)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a saved crash history JSON file.
    Analyze(AnalyzeArgs),
    /// Download crash history with the stored headers.
    Fetch {
        /// Output file (defaults to stake_crash_bets_<date>.json).
        #[arg(long)]
        output: Option<PathBuf>,
        /// Number of records to download.
        #[arg(long)]
        count: Option<usize>,
        /// Save oldest round first instead of the API's newest-first order.
        #[arg(long)]
        chronological: bool,
    },
    /// Manage the stored request headers.
    #[command(subcommand)]
    Headers(HeadersCommand),
    /// Run the HTTP API.
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand, Debug)]
enum HeadersCommand {
    /// Extract headers from a "Copy as cURL" command and store them.
    Import {
        /// The full curl command, quoted.
        curl: String,
    },
    /// Show the names of the stored headers.
    Show,
    /// Print a fresh encryption key.
    GenerateKey,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// History JSON file (Stake crashGameList shape).
    input: PathBuf,
    #[arg(long)]
    threshold: Option<f64>,
    #[arg(long)]
    start_bet: Option<f64>,
    /// Percentage added to the bet after each round.
    #[arg(long)]
    escalation: Option<f64>,
    #[arg(long)]
    win_multiplier: Option<f64>,
    /// Bets per cycle (defaults to the longest historical gap).
    #[arg(long)]
    bets: Option<usize>,
    /// Available capital; 0 means unconstrained.
    #[arg(long)]
    bankroll: Option<f64>,
    /// Reverse the file before analysis (for newest-first exports).
    #[arg(long)]
    reverse: bool,
    /// Print the full result as JSON.
    #[arg(long)]
    json: bool,
    /// Print the bet ledger.
    #[arg(long)]
    ledger: bool,
}

impl AnalyzeArgs {
    fn params(&self, defaults: &AnalyticsParams) -> AnalyticsParams {
        ParamOverrides {
            threshold: self.threshold,
            start_bet: self.start_bet,
            escalation_pct: self.escalation,
            win_multiplier: self.win_multiplier,
            bet_count_cap: self.bets,
            default_bet_count: None,
            bankroll: self.bankroll,
        }
        .apply(defaults)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    init_logging();

    let cfg = AppConfig::load_or_default(&cli.config)?;

    match cli.command {
        Command::Analyze(args) => analyze(&cfg, &args),
        Command::Fetch {
            output,
            count,
            chronological,
        } => fetch(&cfg, output, count, chronological).await,
        Command::Headers(cmd) => headers(&cfg, cmd),
        Command::Serve { port } => serve(&cfg, port).await,
    }
}

fn analyze(cfg: &AppConfig, args: &AnalyzeArgs) -> Result<()> {
    let mut records = storage::load_records(&args.input)?;
    if args.reverse {
        records = into_chronological(records);
    }

    let params = args.params(&cfg.analytics.params());
    let result = run_analytics(&records, &params);
    log_result(&result);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("{result}");
    if args.ledger {
        for row in &result.simulation.ledger {
            println!("{row}");
        }
    }
    Ok(())
}

async fn fetch(
    cfg: &AppConfig,
    output: Option<PathBuf>,
    count: Option<usize>,
    chronological: bool,
) -> Result<()> {
    let store = credential_store(cfg)?;
    let headers = store.get().context("No stored headers; run `headers import` first")?;
    let client = StakeClient::new(&cfg.stake.base_url, cfg.stake.timeout_secs)?;

    let target = count.unwrap_or(cfg.stake.target_count);
    info!(target, page_size = cfg.stake.page_size, "Downloading crash history");
    let mut records = fetch_history(&client, &headers, target, cfg.stake.page_size).await?;
    if chronological {
        records = into_chronological(records);
    }

    let path = output.unwrap_or_else(|| {
        PathBuf::from(storage::export_file_name(chrono::Utc::now().date_naive()))
    });
    storage::save_records(&records, &path)?;
    info!(count = records.len(), path = %path.display(), "Crash history saved");
    Ok(())
}

fn headers(cfg: &AppConfig, cmd: HeadersCommand) -> Result<()> {
    match cmd {
        HeadersCommand::Import { curl } => {
            let headers = extract_headers_from_curl(&curl);
            if headers.is_empty() {
                anyhow::bail!("No headers found in curl command");
            }
            credential_store(cfg)?.put(&headers)?;
            info!(count = headers.len(), "Headers imported");
        }
        HeadersCommand::Show => {
            let headers = credential_store(cfg)?.get()?;
            for name in headers.keys() {
                println!("{name}");
            }
        }
        HeadersCommand::GenerateKey => {
            println!("{}", HeaderCipher::generate_key_hex());
        }
    }
    Ok(())
}

async fn serve(cfg: &AppConfig, port: Option<u16>) -> Result<()> {
    let api_key = AppConfig::resolve_secret(&cfg.server.api_key_env)?;
    let state = Arc::new(ServerState {
        store: Arc::new(credential_store(cfg)?),
        fetcher: Arc::new(StakeClient::new(&cfg.stake.base_url, cfg.stake.timeout_secs)?),
        api_key,
        defaults: cfg.analytics.params(),
    });

    server::serve(state, port.unwrap_or(cfg.server.port)).await
}

fn credential_store(cfg: &AppConfig) -> Result<FileCredentialStore> {
    let key = AppConfig::resolve_secret(&cfg.credentials.encryption_key_env)?;
    let cipher = HeaderCipher::from_hex(&key).context("Invalid encryption key")?;
    Ok(FileCredentialStore::new(&cfg.credentials.path, cipher))
}

/// Log a one-line summary of an analytics run.
fn log_result(result: &AnalyticsResult) {
    if result.simulation.iteration_capped {
        warn!(cap = result.bet_count_cap, "Bet count above the simulation limit; ledger truncated");
    }
    info!(
        records = result.analysis.total_records,
        wins = result.analysis.total_wins,
        max_gap = result.analysis.max_gap,
        bets = result.bet_count_cap,
        affordable = result.simulation.effective_length,
        needed = format!("{:.2}", result.simulation.bankroll_needed),
        pnl = format!("{:.2}", result.projected_profit_loss),
        "Analysis complete"
    );
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("crash_analytics=info"));

    let json_logging = std::env::var("CRASH_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}
