//! DIAD (diad) - interval ear-training from the command line
//!
//! Loads the level catalog and samples from the data folder, opens the audio
//! output and runs a quiz driven by line commands on stdin.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use diad_common::channel::{LocalChannel, MessageChannel};
use diad_common::models::{InstrumentType, PlaybackType};
use diad_common::navigation::RouteCell;
use diad_common::{IntervalId, NotationConverter, PitchNumber};
use diad_player::audio::AudioOutput;
use diad_player::config::TomlConfig;
use diad_player::{selector, AudioContext, AudioPlayer, DataLoader, LevelSelector, PlayerState};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for diad
#[derive(Parser, Debug)]
#[command(name = "diad")]
#[command(about = "Interval ear-training")]
#[command(version)]
struct Args {
    /// Folder holding levels.json and samples/
    #[arg(short, long)]
    data_folder: Option<PathBuf>,

    /// Level id from the catalog
    #[arg(short, long, default_value_t = 1)]
    level: u32,

    /// piano, harpsichord, organ, mixed or sine
    #[arg(short, long, default_value = "mixed")]
    instrument: InstrumentType,

    /// harmonic (simultaneous) or melodic (sequential)
    #[arg(short, long, default_value = "harmonic")]
    playback: PlaybackType,

    /// TET or perfect
    #[arg(short, long, default_value = "perfect")]
    tuning: String,

    /// Root range id: 1 Octaves 3 & 4, 2 Octave 3, 3 Octave 4, 4 Custom
    #[arg(short, long, default_value = "1")]
    root_range: String,

    /// Comma-separated root keys for the custom range (implies range 4)
    #[arg(long, value_delimiter = ',')]
    custom_roots: Vec<PitchNumber>,

    /// Audio output device name
    #[arg(long, env = "DIAD_DEVICE")]
    device: Option<String>,

    /// Configuration file (default: ~/.config/diad/config.toml)
    #[arg(short, long, env = "DIAD_CONFIG")]
    config: Option<PathBuf>,

    /// List audio output devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = TomlConfig::discover(args.config.as_deref())
        .context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if args.list_devices {
        for name in AudioOutput::list_devices().context("Failed to list audio devices")? {
            println!("{}", name);
        }
        return Ok(());
    }

    let data_folder =
        diad_common::config::resolve_data_folder(args.data_folder.as_deref(), args.config.as_deref());
    info!("Starting DIAD, data folder: {}", data_folder.display());

    let channel: Arc<dyn MessageChannel> = Arc::new(LocalChannel::default());
    let loader = Arc::new(DataLoader::new(data_folder)).serve(Arc::clone(&channel));

    let player_config = config.player.clone();
    let device = args.device.as_deref().or(player_config.device_name.as_deref());
    let mut output = AudioOutput::new(device, player_config.sample_rate, player_config.buffer_size)
        .context("Failed to open audio output")?;
    info!(
        "Audio output: {} at {} Hz",
        output.device_name(),
        output.sample_rate()
    );

    let context = AudioContext::new(output.sample_rate());
    let render_context = context.clone();
    output
        .start(move |frames| render_context.render(frames))
        .context("Failed to start audio stream")?;

    let player = AudioPlayer::new(context, channel.as_ref(), &player_config);
    let navigator = Arc::new(RouteCell::new());
    let levels = LevelSelector::new(channel.as_ref(), navigator.clone());

    levels.select_instrument_type(args.instrument);
    levels.select_playback_type(args.playback);
    levels.select_perfect(selector::parse_tuning(&args.tuning)?);
    if args.custom_roots.is_empty() {
        levels.select_root_range(&args.root_range)?;
    } else {
        levels.select_custom_roots(args.custom_roots.clone());
    }
    levels.start_level(args.level);

    let state = PlayerState::new(
        levels.subscribe_current(),
        Arc::new(player.clone()),
        navigator.clone(),
    );
    tokio::spawn(log_events(player.clone()));

    print_help();
    tokio::select! {
        result = command_loop(&state) => result?,
        _ = shutdown_signal() => {}
    }

    state.exit();
    state.destroy();
    levels.destroy();
    player.destroy().await;
    loader.abort();
    if let Err(e) = output.stop() {
        warn!("Failed to stop audio stream: {}", e);
    }
    info!("DIAD shutdown complete");
    Ok(())
}

async fn command_loop(state: &PlayerState) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (None, _) => {}
            (Some("n"), _) => {
                state.open_player();
                state.next().await;
            }
            (Some("r"), _) => {
                state.open_player();
                state.repeat().await;
            }
            (Some("p"), Some(id)) => match id.parse::<IntervalId>() {
                Ok(id) => {
                    state.open_player();
                    state.play_from_root(id).await;
                }
                Err(_) => println!("Not an interval id: {}", id),
            },
            (Some("s"), _) => print_stats(state).await,
            (Some("l"), _) => print_intervals(state),
            (Some("q"), _) => break,
            (Some("h"), _) => print_help(),
            (Some(word), _) => match word.parse::<IntervalId>() {
                Ok(id) => {
                    state.make_choice(id).await;
                    print_result(state);
                }
                Err(_) => println!("Unknown command '{}', h for help", word),
            },
        }
    }
    Ok(())
}

fn print_help() {
    println!("n: next interval   r: repeat   <id>: answer   p <id>: play <id> from root");
    println!("l: list intervals  s: statistics   q: quit");
}

fn print_result(state: &PlayerState) {
    let snapshot = state.snapshot();
    let Some(interval) = snapshot.current_interval else {
        println!("No interval played yet, n to start");
        return;
    };
    let verdict = if state.is_matching_choice() {
        "Correct"
    } else {
        "Wrong"
    };
    println!(
        "{}: {} ({})",
        verdict,
        interval.name,
        PlayerState::interval_note_names(&interval)
    );
}

fn print_intervals(state: &PlayerState) {
    let allowed = state
        .snapshot()
        .level
        .map(|level| level.level.intervals)
        .unwrap_or_default();
    for descriptor in NotationConverter::intervals() {
        if allowed.contains(&descriptor.id) {
            println!("{:>3}  {}", descriptor.id, descriptor.name);
        }
    }
}

async fn print_stats(state: &PlayerState) {
    let data = state.open_stats().await;
    for item in &data.items {
        println!("{:<28} {:>4} {:>5.0}%", item.name, item.count, item.ratio * 100.0);
    }
    println!(
        "{:<28} {:>4} {:>5.0}%",
        "Total",
        data.total_count,
        data.total_ratio * 100.0
    );
}

async fn log_events(player: AudioPlayer) {
    let mut events = BroadcastStream::new(player.subscribe_events());
    while let Some(event) = events.next().await {
        match event {
            Ok(event) => debug!(?event, "player event"),
            Err(e) => warn!("Player event stream: {}", e),
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
