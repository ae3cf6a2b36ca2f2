use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use leetnote::commands::{self, Session};
use leetnote::config::AppConfig;
use leetnote::logging::init_logging;
use leetnote::models::{ExtractOptions, ReviewFlags, SaveRequest};
use leetnote::services::extractor::PageSnapshot;
use leetnote::services::{format_duration, parse_manual_time, spawn_keep_alive};
use log::info;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "leetnote")]
#[command(about = "Save LeetCode problems to a Notion database without duplicates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Data directory for the local store and log file
    #[arg(long, env = "LEETNOTE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "LEETNOTE_LOG")]
    log_level: Option<String>,
}

/// 保存的页面快照
#[derive(clap::Args)]
struct PageArgs {
    /// Problem page URL
    #[arg(long)]
    url: String,

    /// Saved HTML of the problem page
    #[arg(long)]
    html: PathBuf,

    /// JSON object dump of the page's localStorage
    #[arg(long)]
    storage: Option<PathBuf>,

    /// Also extract the solution code
    #[arg(long)]
    include_code: bool,

    /// Language of the code to extract
    #[arg(long, default_value = "")]
    language: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Store Notion credentials
    Configure {
        #[arg(long, env = "NOTION_TOKEN")]
        token: String,
        #[arg(long)]
        database: String,
        /// original, com or cn
        #[arg(long, default_value = "original")]
        save_host: String,
    },
    /// Extract problem fields from a saved page
    Extract {
        #[command(flatten)]
        page: PageArgs,
    },
    /// Check whether a problem number is already saved
    Check {
        #[arg(long)]
        number: u32,
    },
    /// Extract a page and save it as a new record
    Save {
        #[command(flatten)]
        page: PageArgs,
        #[arg(long)]
        status: Option<String>,
        /// Time spent (H:MM:SS, MM:SS or seconds); defaults to the timer
        #[arg(long)]
        time: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        hint_needed: bool,
        #[arg(long)]
        can_redo: bool,
    },
    /// Update the review flags of an existing record
    Flags {
        #[arg(long)]
        page_id: String,
        #[arg(long)]
        hint_needed: bool,
        #[arg(long)]
        can_redo: bool,
    },
    /// Control the solving timer
    Timer {
        #[arg(value_enum)]
        action: TimerAction,
        /// Active problem URL
        #[arg(long)]
        url: Option<String>,
        /// Manual time for `set`
        #[arg(long)]
        time: Option<String>,
    },
    /// Parse a manual time entry
    ParseTime { text: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum TimerAction {
    Show,
    Start,
    Pause,
    Reset,
    Set,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_env();
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level
            .parse()
            .map_err(|_| anyhow!("invalid log level '{}'", level))?;
    }
    init_logging(config.log_level, config.log_path().as_deref()).context("failed to initialize logging")?;
    info!("leetnote v{} (data dir {})", env!("CARGO_PKG_VERSION"), config.data_dir.display());

    if let Commands::ParseTime { text } = &cli.command {
        let ms = parse_manual_time(text).map_err(|e| anyhow!(e.user_message()))?;
        println!("{} ms ({})", ms, format_duration(ms));
        return Ok(());
    }

    let session = Session::open(config).context("failed to open local store")?;
    let keep_alive = spawn_keep_alive(session.store().clone());
    let result = run(&session, cli.command).await;
    keep_alive.abort();
    result
}

async fn run(session: &Session, command: Commands) -> Result<()> {
    match command {
        Commands::Configure {
            token,
            database,
            save_host,
        } => print_json(&commands::configure(session, &token, &database, &save_host).map_err(|e| anyhow!(e))?),
        Commands::Extract { page } => {
            let (snapshot, options) = load_page(&page)?;
            let response = commands::extract_problem(session, &snapshot, &options);
            print_json(&response)?;
            if !response.success {
                return Err(anyhow!("extraction failed"));
            }
            Ok(())
        }
        Commands::Check { number } => {
            let check = commands::check_duplicate(session, Some(number)).await;
            print_json(&check.status)?;
            if check.verification.is_some() {
                let settled = check.resolve().await;
                info!("Verified: {:?}", settled);
                print_json(&settled)?;
            }
            Ok(())
        }
        Commands::Save {
            page,
            status,
            time,
            notes,
            hint_needed,
            can_redo,
        } => {
            let (snapshot, options) = load_page(&page)?;
            let response = commands::extract_problem(session, &snapshot, &options);
            let problem = response
                .data
                .ok_or_else(|| anyhow!(response.error.unwrap_or_else(|| "extraction failed".to_string())))?;

            let time_spent_ms = match time {
                Some(text) => parse_manual_time(&text).map_err(|e| anyhow!(e.user_message()))?,
                None => commands::restore_timer(session, &snapshot.url)
                    .map_err(|e| anyhow!(e))?
                    .elapsed_ms,
            };

            let mut request = SaveRequest::new(problem);
            request.status = status;
            request.notes = notes;
            request.time_spent_ms = time_spent_ms;
            request.flags = ReviewFlags {
                hint_needed,
                can_redo,
            };

            let outcome = commands::save_problem(session, request).await.map_err(|e| anyhow!(e))?;
            print_json(&outcome)
        }
        Commands::Flags {
            page_id,
            hint_needed,
            can_redo,
        } => {
            let flags = ReviewFlags {
                hint_needed,
                can_redo,
            };
            commands::update_flags(session, &page_id, flags)
                .await
                .map_err(|e| anyhow!(e))?;
            println!("updated {}", page_id);
            Ok(())
        }
        Commands::Timer { action, url, time } => {
            let view = match action {
                TimerAction::Show => commands::restore_timer(session, &require(url, "--url")?),
                TimerAction::Start => commands::start_timer(session, &require(url, "--url")?),
                TimerAction::Pause => commands::pause_timer(session),
                TimerAction::Reset => commands::reset_timer(session),
                TimerAction::Set => commands::set_manual_time(session, &require(time, "--time")?),
            }
            .map_err(|e| anyhow!(e))?;
            print_json(&view)
        }
        Commands::ParseTime { .. } => Ok(()),
    }
}

fn require(value: Option<String>, flag: &str) -> Result<String> {
    value.ok_or_else(|| anyhow!("{} is required for this action", flag))
}

fn load_page(args: &PageArgs) -> Result<(PageSnapshot, ExtractOptions)> {
    let html = std::fs::read_to_string(&args.html)
        .with_context(|| format!("failed to read {}", args.html.display()))?;
    let mut snapshot = PageSnapshot::new(args.url.clone(), html);
    if let Some(path) = &args.storage {
        snapshot = snapshot.with_storage(load_storage(path)?);
    }
    let options = ExtractOptions {
        include_code: args.include_code,
        language: args.language.clone(),
    };
    Ok((snapshot, options))
}

/// localStorage 导出：键到值的对象，非字符串值按 JSON 文本处理
fn load_storage(path: &Path) -> Result<Vec<(String, String)>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw).context("storage dump is not valid JSON")?;
    let object = value
        .as_object()
        .ok_or_else(|| anyhow!("storage dump must be a JSON object"))?;

    Ok(object
        .iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), text)
        })
        .collect())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
