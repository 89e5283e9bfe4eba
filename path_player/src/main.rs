// main.rs - Event path player: headless replay of one event, or the playback control server

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use event_path_player::animation::{FrameClock, ManualClock, Phase, SurfaceKind, ViewerSession};
use event_path_player::config::PlayerConfig;
use event_path_player::types::EventLocationRecord;
use event_path_player::{frame_driver, http_server, record_store};

/// CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// JSON file of event-location records (array or paginated listing)
    #[arg(short, long)]
    pub records: PathBuf,

    /// Event to replay; defaults to the first event with a playable path
    #[arg(short, long)]
    pub event: Option<String>,

    /// Rendering surface: 2d or 3d
    #[arg(short, long, default_value = "3d")]
    pub surface: SurfaceKind,

    /// Playback speed multiplier
    #[arg(long)]
    pub speed: Option<f64>,

    /// JSON config file overriding the built-in defaults
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Use recorded event times for segment durations
    #[arg(long)]
    pub time_based: bool,

    /// Run the HTTP control server instead of a one-off replay
    #[arg(long)]
    pub server: bool,
}

fn load_config(args: &Args) -> Result<PlayerConfig> {
    let mut config = match &args.config {
        Some(path) => PlayerConfig::load_file(path).with_context(|| format!("loading config {}", path.display()))?,
        None => PlayerConfig::default(),
    };
    config.apply_env();
    if args.time_based {
        config.set_time_based(true);
    }
    if let Some(speed) = args.speed {
        config.default_speed_multiplier = speed;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Play one event to completion on a manual clock and print the final scene
fn replay(args: &Args, config: PlayerConfig, records: Vec<EventLocationRecord>) -> Result<()> {
    let clock = Arc::new(ManualClock::new(0.0));
    let step_ms = config.frame_interval_ms as f64;
    let mut session = ViewerSession::builder(config)
        .clock(clock.clone())
        .records(records)
        .surface(args.surface)
        .on_waypoint_reached(|surface, index| info!("[{}] waypoint {} reached", surface, index))
        .on_completed(|surface, event_id| info!("[{}] playback of {} completed", surface, event_id))
        .build();

    let event_id = match &args.event {
        Some(id) => id.clone(),
        None => session
            .events()
            .into_iter()
            .find(|e| e.location_count >= 2)
            .map(|e| e.event_id)
            .ok_or_else(|| anyhow!("no event in the snapshot has two or more locations"))?,
    };

    session
        .start_playback(&event_id)
        .map_err(|e| anyhow!(e.user_notice()))
        .with_context(|| format!("starting playback of {event_id}"))?;

    // a segment end always costs at least one frame
    let (total_ms, segments) = session
        .active_player()
        .clock()
        .timeline()
        .map(|t| (t.total_duration_ms(), t.segments().len() as u64))
        .unwrap_or((0.0, 0));
    let max_frames = ((total_ms / session.speed_multiplier()) / step_ms).ceil() as u64 * 2 + segments + 100;

    let mut frames = 0u64;
    while session.phase() == Phase::Running {
        if frames >= max_frames {
            bail!("playback of {event_id} did not complete within {max_frames} frames");
        }
        clock.advance(step_ms);
        session.frame();
        frames += 1;
    }
    info!("Replayed {} in {} frames ({:.0}ms of playback time)", event_id, frames, clock.now_ms());

    let snapshot = serde_json::to_string_pretty(&session.snapshot()).context("serializing final scene")?;
    println!("{snapshot}");
    Ok(())
}

async fn serve(args: &Args, config: PlayerConfig, records: Vec<EventLocationRecord>) -> Result<()> {
    let port = config.port;
    let frame_interval = Duration::from_millis(config.frame_interval_ms);
    let refresh_interval = Duration::from_secs(config.refresh_interval_secs.max(1));

    let mut session = ViewerSession::builder(config).records(records).surface(args.surface).build();
    if let Some(event_id) = &args.event {
        session.select_event(Some(event_id));
    }
    let session = frame_driver::shared(session);

    let driver = frame_driver::spawn_frame_driver(session.clone(), frame_interval);
    let refresh = record_store::spawn_refresh(session.clone(), args.records.clone(), refresh_interval);

    let result = http_server::start_server(session, port).await;
    driver.abort();
    refresh.abort();
    result
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    info!("Starting with {args:?}");

    let config = load_config(&args)?;
    let records = record_store::load_records(&args.records)
        .await
        .with_context(|| format!("loading records from {}", args.records.display()))?;
    if records.is_empty() {
        warn!("No usable records in {}", args.records.display());
    }

    if args.server {
        info!("HTTP server mode on :{}", config.port);
        return serve(&args, config, records).await;
    }

    replay(&args, config, records)
}
