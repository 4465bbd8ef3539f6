mod pilot;

use clap::Parser;
use hdrhistogram::Histogram;
use log::{debug, error, info, warn};
use penguin_config::{load_config, Config, ConfigError, SerializerType};
use penguin_core::{Color, Position, Viewport};
use penguin_sync::{Backend, SessionOptions, SyncError, SyncSession};
use penguin_transport::{CodecKind, LocalHub};
use pilot::{PatrolPilot, Pilot, WanderPilot};
use rand::Rng;
use thiserror::Error;

use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const BOT_COLORS: [&str; 6] = ["red", "green", "orange", "purple", "yellow", "pink"];

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the session configuration file (JSON, or TOML by extension)
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Stop after this many ticks instead of running until Ctrl+C
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Override the number of simulated participants
    #[arg(short, long)]
    bots: Option<u32>,
}

#[derive(Error, Debug)]
enum RunnerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Could not start session for '{username}': {source}")]
    Session {
        username: String,
        #[source]
        source: SyncError,
    },

    #[error("Could not install Ctrl+C handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("Could not create tick histogram: {0}")]
    Histogram(#[from] hdrhistogram::CreationError),
}

struct Participant {
    session: SyncSession,
    pilot: Box<dyn Pilot>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), RunnerError> {
    let mut config = load_config(&args.config)?;
    if let Some(bots) = args.bots {
        config.demo.bots = bots;
    }
    info!("Using configuration from {}", args.config.display());

    let codec = codec_kind(&config);
    let hub = LocalHub::new(&config.transport.table, codec);
    let start = Instant::now();

    let mut participants = Vec::with_capacity(config.demo.bots as usize + 1);
    let local = start_session(session_options(&config), &hub, start)?;
    participants.push(Participant {
        session: local,
        pilot: Box::new(PatrolPilot::new(config.demo.wander_ticks * 2)),
    });

    let mut rng = rand::thread_rng();
    for n in 0..config.demo.bots {
        let mut options = session_options(&config);
        options.username = format!("{}-bot-{}", config.session.username, n + 1);
        options.color = Color::new(BOT_COLORS[rng.gen_range(0..BOT_COLORS.len())]);
        options.spawn = Position::new(
            rng.gen_range(0.0..config.viewport.width),
            rng.gen_range(0.0..config.viewport.height),
        );
        let session = start_session(options, &hub, start)?;
        participants.push(Participant {
            session,
            pilot: Box::new(WanderPilot::new(config.demo.wander_ticks, rng.gen())),
        });
    }

    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))?;

    let tick_interval = config.tick_interval();
    info!(
        "Running {} sessions at {} Hz (send window {:?})",
        participants.len(),
        config.motion.tick_rate,
        config.send_interval()
    );

    let mut tick_times = Histogram::<u64>::new(3)?;
    let mut tick: u64 = 0;
    let mut sent: u64 = 0;
    let mut dropped: u64 = 0;

    while running.load(Ordering::SeqCst) && args.ticks.map_or(true, |limit| tick < limit) {
        let frame_start = Instant::now();

        for participant in participants.iter_mut() {
            let held = participant.pilot.next();
            let report = participant.session.tick(held, frame_start);
            sent += report.sent as u64;
            dropped += report.events_dropped as u64;
        }
        tick += 1;

        let elapsed = frame_start.elapsed();
        tick_times.saturating_record(elapsed.as_micros() as u64);

        let report_every = config.demo.report_every as u64;
        if report_every > 0 && tick % report_every == 0 {
            log_status(&participants, tick, sent, dropped);
        }

        if elapsed < tick_interval {
            spin_sleep::sleep(tick_interval - elapsed);
        } else if config.motion.tick_rate > 10 {
            warn!("Tick time exceeded budget: {:?} > {:?}", elapsed, tick_interval);
        }
    }

    info!("Stopping after {} ticks ({} updates sent)", tick, sent);
    for participant in participants {
        participant.session.end();
    }
    print_tick_stats(&tick_times, start.elapsed());
    Ok(())
}

fn codec_kind(config: &Config) -> CodecKind {
    match config.transport.serializer {
        SerializerType::Json => CodecKind::Json,
        SerializerType::Binary => CodecKind::Binary,
    }
}

fn session_options(config: &Config) -> SessionOptions {
    let (x, y) = config.session.spawn;
    let mut options = SessionOptions::new(config.session.username.clone());
    options.color = Color::new(config.session.color.clone());
    options.spawn = Position::new(x, y);
    options.viewport = Viewport::new(config.viewport.width, config.viewport.height);
    options.step = config.motion.step;
    options.send_interval = config.send_interval();
    options.prime_throttle = config.throttle.prime_on_start;
    options.channel = config.transport.channel.clone();
    options.move_event = config.transport.move_event.clone();
    options.table = config.transport.table.clone();
    options.codec = codec_kind(config);
    options
}

fn start_session(options: SessionOptions, hub: &LocalHub, now: Instant) -> Result<SyncSession, RunnerError> {
    let username = options.username.clone();
    SyncSession::start_at(options, Backend::shared(hub.clone()), now)
        .map_err(|source| RunnerError::Session { username, source })
}

fn log_status(participants: &[Participant], tick: u64, sent: u64, dropped: u64) {
    if let Some(local) = participants.first() {
        let position = local.session.local().position;
        info!(
            "tick {}: '{}' at ({:.1}, {:.1}), {} remotes visible, {} sent, {} dropped",
            tick,
            local.session.local().username(),
            position.x,
            position.y,
            local.session.remotes().len(),
            sent,
            dropped
        );
        let visible: Vec<&str> = local.session.remotes().ids().into_iter().map(|id| id.as_str()).collect();
        debug!("visible to '{}': {:?}", local.session.local().username(), visible);
    }
}

fn print_tick_stats(tick_times: &Histogram<u64>, total: Duration) {
    if tick_times.is_empty() {
        return;
    }
    println!("Ran {} ticks in {:.2?}", tick_times.len(), total);
    println!("Tick time (us):");
    println!("  p50  {}", tick_times.value_at_quantile(0.50));
    println!("  p90  {}", tick_times.value_at_quantile(0.90));
    println!("  p99  {}", tick_times.value_at_quantile(0.99));
    println!("  max  {}", tick_times.max());
}
