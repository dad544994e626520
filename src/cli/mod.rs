//! # CLI Module
//!
//! Command-line interface for the photo search client.
//!
//! ## Usage
//! ```bash
//! # Search, fetching the first page
//! photo-search search "red panda"
//!
//! # Three pages, JSON output
//! photo-search search fruits --pages 3 --output json
//!
//! # A cached photo
//! photo-search show 195893
//!
//! # Cache maintenance
//! photo-search stats
//! photo-search clear
//! ```

use chrono::{DateTime, Local};
use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use photo_search::config::SearchConfig;
use photo_search::core::cache::{CacheStats, PhotoStore, SqlitePhotoStore};
use photo_search::core::model::PhotoView;
use photo_search::core::remote::{InMemorySource, PixabayClient};
use photo_search::core::repository::PhotoRepository;
use photo_search::core::session::{
    DetailSession, SearchSession, SearchState, UiEvent, SEARCH_NOT_STARTED,
};
use photo_search::core::usecase::{normalize_query, DetailUseCase, SearchUseCase};
use photo_search::error::{DetailError, Result};
use photo_search::events::{Event, EventChannel, EventReceiver, PagingEvent, SearchEvent};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Photo Search - Browse PixaBay photos with an offline cache
#[derive(Parser, Debug)]
#[command(name = "photo-search")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search photos by free text
    Search {
        /// Search terms
        #[arg(required = true)]
        query: Vec<String>,

        /// Number of pages to load
        #[arg(short, long, default_value = "1")]
        pages: u32,

        /// Photos per page
        #[arg(long)]
        page_size: Option<u32>,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// Show cached results before going to the network
        #[arg(long)]
        offline_first: bool,

        /// PixaBay API key (defaults to $PIXABAY_API_KEY)
        #[arg(long)]
        api_key: Option<String>,

        /// API base URL (defaults to $PIXABAY_BASE_URL or https://pixabay.com/)
        #[arg(long)]
        base_url: Option<String>,

        /// Cache database path
        #[arg(long)]
        cache: Option<PathBuf>,
    },

    /// Show a cached photo
    Show {
        /// Photo id
        id: u64,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// Cache database path
        #[arg(long)]
        cache: Option<PathBuf>,
    },

    /// Show cache statistics
    Stats {
        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// Cache database path
        #[arg(long)]
        cache: Option<PathBuf>,
    },

    /// Delete every cached photo and page key
    Clear {
        /// Cache database path
        #[arg(long)]
        cache: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Minimal output (ids and URLs only)
    Minimal,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Search {
            query,
            pages,
            page_size,
            output,
            offline_first,
            api_key,
            base_url,
            cache,
        } => {
            let mut config = SearchConfig::from_env()
                .initial_query(query.join(" "))
                .launch_initial_refresh(!offline_first)
                // Nothing is typed here, so there is nothing to debounce
                .debounce(Duration::ZERO);
            if let Some(key) = api_key {
                config = config.api_key(key);
            }
            if let Some(url) = base_url {
                config = config.base_url(url);
            }
            if let Some(size) = page_size {
                config = config.page_size(size);
            }
            if let Some(path) = cache {
                config = config.cache_path(path);
            }
            run_search(config, pages.max(1), output)
        }
        Commands::Show { id, output, cache } => run_show(id, output, &cache_config(cache)),
        Commands::Stats { output, cache } => run_stats(output, &cache_config(cache)),
        Commands::Clear { cache } => run_clear(&cache_config(cache)),
    }
}

fn cache_config(cache: Option<PathBuf>) -> SearchConfig {
    match cache {
        Some(path) => SearchConfig::from_env().cache_path(path),
        None => SearchConfig::from_env(),
    }
}

fn run_search(config: SearchConfig, pages: u32, output: OutputFormat) -> Result<()> {
    config.validate()?;
    let term = Term::stderr();

    if normalize_query(&config.initial_query).is_empty() {
        term.write_line(SEARCH_NOT_STARTED).ok();
        return Ok(());
    }

    if matches!(output, OutputFormat::Pretty) {
        term.write_line(&format!(
            "{} {}",
            style("Photo Search").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    let source = Arc::new(PixabayClient::new(&config)?);
    let store = Arc::new(SqlitePhotoStore::open(&config.cache_path)?);
    let (sender, receiver) = EventChannel::new();
    let repository = PhotoRepository::from_config(source, store, &config).with_events(sender.clone());
    let session = SearchSession::start(SearchUseCase::new(Arc::new(repository)), &config, sender);

    let spinner = if matches!(output, OutputFormat::Pretty) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(format!("Searching \"{}\"", config.initial_query.trim()));
        Some(pb)
    } else {
        None
    };

    // Every load ends in either an update or a failure for the session
    let wait = config.request_timeout * 2;
    // The session keeps a bounded window, so gather every page seen by position
    let mut collected = BTreeMap::new();
    let mut outcome = await_outcome(&receiver, spinner.as_ref(), wait);
    collect_window(&mut collected, &session.state());
    for _ in 1..pages {
        if !matches!(outcome, Outcome::Updated) {
            break;
        }
        session.on_event(UiEvent::LoadMore);
        outcome = await_outcome(&receiver, spinner.as_ref(), wait);
        collect_window(&mut collected, &session.state());
    }

    if let Some(pb) = &spinner {
        pb.finish_and_clear();
    }

    let mut state = session.state();
    state.photos = collected.into_values().collect();
    match output {
        OutputFormat::Pretty => print_pretty_results(&term, &state, &outcome),
        OutputFormat::Json => print_json_results(&state, &outcome),
        OutputFormat::Minimal => print_minimal_results(&state),
    }

    Ok(())
}

fn collect_window(collected: &mut BTreeMap<usize, PhotoView>, state: &SearchState) {
    for (index, photo) in state.photos.iter().enumerate() {
        collected.insert(state.first_position + index, photo.clone());
    }
}

enum Outcome {
    Updated,
    Failed(String),
    TimedOut,
}

/// Pump events into the spinner until the session publishes a result
fn await_outcome(
    receiver: &EventReceiver,
    spinner: Option<&ProgressBar>,
    timeout: Duration,
) -> Outcome {
    while let Some(event) = receiver.recv_timeout(timeout) {
        match event {
            Event::Paging(PagingEvent::LoadStarted { load_type, .. }) => {
                if let Some(pb) = spinner {
                    pb.set_message(format!("Loading ({})", load_type));
                }
            }
            Event::Paging(PagingEvent::PagesDropped { items_dropped, .. }) => {
                tracing::debug!(items_dropped, "Window trimmed");
            }
            Event::Search(SearchEvent::ResultsUpdated { .. }) => return Outcome::Updated,
            Event::Search(SearchEvent::Failed { error, .. }) => {
                return Outcome::Failed(error.to_string())
            }
            _ => {}
        }
    }
    Outcome::TimedOut
}

fn print_pretty_results(term: &Term, state: &SearchState, outcome: &Outcome) {
    match outcome {
        Outcome::Failed(reason) => {
            let message = state
                .error
                .as_ref()
                .and_then(|error| error.take())
                .map(|error| error.message().to_string())
                .unwrap_or_else(|| reason.clone());
            term.write_line(&format!("{} {}", style("✗").red().bold(), message))
                .ok();
            term.write_line(&format!("  {}", style(reason).dim())).ok();
        }
        Outcome::TimedOut => {
            term.write_line(&format!(
                "{} Timed out waiting for results",
                style("!").yellow().bold()
            ))
            .ok();
        }
        Outcome::Updated => {}
    }

    if state.photos.is_empty() {
        let hint = if state.info_text.is_empty() {
            "No photos found"
        } else {
            state.info_text.as_str()
        };
        term.write_line(&format!("  {}", style(hint).dim())).ok();
        return;
    }

    term.write_line(&format!(
        "{} {} photos for {}",
        style("✓").green().bold(),
        style(state.photos.len()).cyan(),
        style(&state.query).bold()
    ))
    .ok();
    term.write_line("").ok();

    for photo in &state.photos {
        print_photo_line(term, photo);
    }
}

fn print_photo_line(term: &Term, photo: &PhotoView) {
    term.write_line(&format!(
        "  {} {} {}",
        style(format!("#{}", photo.id)).bold(),
        style(&photo.user_name).yellow(),
        style(photo.tags.join(", ")).dim()
    ))
    .ok();
    term.write_line(&format!(
        "      {} likes  {} comments  {} downloads",
        style(photo.likes).cyan(),
        style(photo.comments).cyan(),
        style(photo.downloads).cyan()
    ))
    .ok();
    term.write_line(&format!("      {}", style(&photo.preview_url).underlined()))
        .ok();
}

fn print_json_results(state: &SearchState, outcome: &Outcome) {
    let error = match outcome {
        Outcome::Failed(reason) => Some(reason.clone()),
        Outcome::TimedOut => Some("timed out".to_string()),
        Outcome::Updated => None,
    };
    let output = serde_json::json!({
        "query": state.query,
        "info": state.info_text,
        "error": error,
        "message": state.error.as_ref().map(|event| event.peek().message()),
        "photo_count": state.photos.len(),
        "photos": state.photos,
    });

    match serde_json::to_string_pretty(&output) {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::error!("Failed to serialize results: {}", e),
    }
}

fn print_minimal_results(state: &SearchState) {
    for photo in &state.photos {
        println!("{}\t{}", photo.id, photo.large_image_url);
    }
}

fn run_show(id: u64, output: OutputFormat, config: &SearchConfig) -> Result<()> {
    let store = Arc::new(SqlitePhotoStore::open(&config.cache_path)?);
    // Point lookups never reach the remote
    let repository = PhotoRepository::new(Arc::new(InMemorySource::new()), store);
    let mut detail = DetailSession::new(
        DetailUseCase::new(Arc::new(repository)),
        photo_search::events::null_sender(),
    );

    let Some(photo) = detail.load(id).photo.clone() else {
        return Err(DetailError::PhotoNotFound { id }.into());
    };

    match output {
        OutputFormat::Pretty => {
            let term = Term::stdout();
            print_photo_line(&term, &photo);
            term.write_line(&format!(
                "      {}",
                style(&photo.large_image_url).underlined()
            ))
            .ok();
        }
        OutputFormat::Json => match serde_json::to_string_pretty(&photo) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::error!("Failed to serialize photo: {}", e),
        },
        OutputFormat::Minimal => println!("{}", photo.large_image_url),
    }
    Ok(())
}

fn run_stats(output: OutputFormat, config: &SearchConfig) -> Result<()> {
    let store = SqlitePhotoStore::open(&config.cache_path)?;
    let stats = store.stats()?;

    match output {
        OutputFormat::Pretty => print_pretty_stats(&Term::stdout(), &stats, config),
        OutputFormat::Json => match serde_json::to_string_pretty(&stats) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::error!("Failed to serialize stats: {}", e),
        },
        OutputFormat::Minimal => println!("{} {}", stats.total_photos, stats.total_keys),
    }
    Ok(())
}

fn print_pretty_stats(term: &Term, stats: &CacheStats, config: &SearchConfig) {
    term.write_line(&format!(
        "{} {}",
        style("Cache").bold().underlined(),
        style(config.cache_path.display()).dim()
    ))
    .ok();
    term.write_line(&format!("  {} photos", style(stats.total_photos).cyan()))
        .ok();
    term.write_line(&format!("  {} page keys", style(stats.total_keys).cyan()))
        .ok();
    if !stats.search_terms.is_empty() {
        term.write_line(&format!(
            "  {} {}",
            style("terms:").dim(),
            stats.search_terms.join(", ")
        ))
        .ok();
    }
    if let Some(oldest) = stats.oldest_entry {
        term.write_line(&format!("  {} {}", style("oldest:").dim(), format_time(oldest)))
            .ok();
    }
    if let Some(newest) = stats.newest_entry {
        term.write_line(&format!("  {} {}", style("newest:").dim(), format_time(newest)))
            .ok();
    }
}

fn run_clear(config: &SearchConfig) -> Result<()> {
    let store = SqlitePhotoStore::open(&config.cache_path)?;
    let before = store.stats()?.total_photos;
    store.clear()?;

    Term::stderr()
        .write_line(&format!(
            "{} Removed {} cached photos",
            style("✓").green().bold(),
            style(before).cyan()
        ))
        .ok();
    Ok(())
}

fn format_time(time: SystemTime) -> String {
    DateTime::<Local>::from(time)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
