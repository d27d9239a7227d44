use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

use reelfork::cache::ContentCache;
use reelfork::config::Config;
use reelfork::narrative::{NarrativeEvent, Story};
use reelfork::playback::SimulatedPlayer;
use reelfork::resolver::ContentResolver;
use reelfork::status::cache_summary;
use reelfork::{MediaSession, SourceReference};

/// Reelfork - prefix media cache and branching narrative player
#[derive(Parser, Debug)]
#[command(name = "reelfork")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file; built-in defaults when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the playable reference for a source, scheduling a prefix fetch on a miss
    Resolve { source: String },

    /// Download the prefix for a URL and wait for it to land in the cache
    Prefetch { url: String },

    /// Show cache directory usage and fetch counters
    Stats,

    /// Delete every file in the cache directory
    Clear,

    /// Play the story with a simulated player
    Play {
        /// Story YAML; overrides narrative.story_file
        #[arg(long)]
        story: Option<PathBuf>,

        /// Pick this label at every decision instead of reading stdin
        #[arg(long)]
        auto: Option<String>,

        /// Simulated length of every media segment
        #[arg(long, default_value_t = 30)]
        duration_secs: u64,
    },

    /// Validate configuration (and story file, if any) and exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    reelfork::logging::init_subscriber(&config.logging)
        .context("Failed to initialize logging subsystem")?;

    tracing::debug!(
        config_file = ?args.config,
        cache_dir = %config.cache.cache_dir().display(),
        "Configuration loaded"
    );

    match args.command {
        Command::Resolve { source } => resolve(&config, &source),
        Command::Prefetch { url } => prefetch(&config, &url).await,
        Command::Stats => stats(&config),
        Command::Clear => clear(&config),
        Command::Play {
            story,
            auto,
            duration_secs,
        } => {
            if story.is_some() {
                config.narrative.story_file = story;
            }
            play(&config, auto, Duration::from_secs(duration_secs)).await
        }
        Command::CheckConfig => check_config(&config),
    }
}

fn open_cache(config: &Config) -> Result<Arc<ContentCache>> {
    let cache = ContentCache::new(&config.cache, &config.fetch).context("Failed to open cache")?;
    Ok(Arc::new(cache))
}

fn resolve(config: &Config, source: &str) -> Result<()> {
    let source: SourceReference = source.parse()?;
    let resolver = ContentResolver::new(open_cache(config)?);
    println!("{}", resolver.resolve(&source));
    Ok(())
}

async fn prefetch(config: &Config, url: &str) -> Result<()> {
    let source = SourceReference::remote(url);
    let resolver = ContentResolver::new(open_cache(config)?);
    let resolved = resolver.resolve_and_wait(&source).await;
    if resolved == source {
        bail!("prefix fetch for {} failed; see logs", url);
    }
    println!("{}", resolved);
    Ok(())
}

fn stats(config: &Config) -> Result<()> {
    let cache = open_cache(config)?;
    let stats = cache.stats();
    println!("{}", cache.dir().display());
    println!("{}", cache_summary(&stats));
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn clear(config: &Config) -> Result<()> {
    let removed = open_cache(config)?.clear_all();
    println!("Removed {} file(s)", removed);
    Ok(())
}

fn check_config(config: &Config) -> Result<()> {
    if let Some(path) = &config.narrative.story_file {
        let story = Story::from_file(path)
            .with_context(|| format!("Invalid story file {}", path.display()))?;
        println!("Story OK: {} node(s)", story.len());
    }
    println!("Configuration OK");
    Ok(())
}

async fn play(config: &Config, auto: Option<String>, duration: Duration) -> Result<()> {
    let player = SimulatedPlayer::new(duration);
    let session = MediaSession::from_config(config, Arc::new(player))?;
    let mut events = session.subscribe_narrative();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    session.start_narrative();

    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = tokio::signal::ctrl_c() => {
                session.cancel_narrative();
                return Ok(());
            }
        };

        let event = match event {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => return Ok(()),
        };
        println!("{}", serde_json::to_string(&event)?);

        match event {
            NarrativeEvent::DecisionRequested { choices, .. } => loop {
                let label = match &auto {
                    Some(label) => label.clone(),
                    None => {
                        let labels: Vec<_> = choices.iter().map(|c| c.label.as_str()).collect();
                        eprint!("choose [{}]: ", labels.join("/"));
                        match stdin.next_line().await? {
                            Some(line) => line.trim().to_string(),
                            None => {
                                session.cancel_narrative();
                                return Ok(());
                            }
                        }
                    }
                };
                if session.choose_narrative(&label) {
                    break;
                }
                if auto.is_some() {
                    bail!("label '{}' is not offered here", label);
                }
            },
            NarrativeEvent::Ended { .. } | NarrativeEvent::Cancelled => return Ok(()),
            NarrativeEvent::NodeEntered { .. } | NarrativeEvent::DecisionSuppressed { .. } => {}
        }
    }
}
