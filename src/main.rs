use anyhow::Context;
use clap::Parser;
use emote_overlay::assets::resources::{ResourceSet, PLACEHOLDER};
use emote_overlay::config::{load_settings, load_settings_from, OverlaySettings, StreamParams};
use emote_overlay::networking::chat::{ChatTransport, TransportSettings};
use emote_overlay::networking::{EmoteSource, HttpEmoteClient};
use emote_overlay::rendering::SceneGraph;
use emote_overlay::utils::logging::{init_logging, log_system_info, LogOptions};
use emote_overlay::EmoteOverlay;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "emote-overlay", version, about = "Chat-driven animated emote overlay")]
struct Args {
    /// Channel to follow
    #[arg(long, env = "EMOTE_OVERLAY_CHANNEL")]
    channel: Option<String>,

    /// Scene brightness, clamped to [0.5, 20]
    #[arg(long)]
    brightness: Option<f32>,

    /// Page URL carrying `?channel=...&brightness=...`
    #[arg(long)]
    page_url: Option<String>,

    /// Settings file (defaults to the per-user overlay.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding Placeholder.webp
    #[arg(long, default_value = "resources")]
    resources: PathBuf,

    /// Session log file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Stop after this many seconds instead of running until Ctrl-C
    #[arg(long)]
    run_for_secs: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(LogOptions { file: args.log_file.clone(), ..LogOptions::default() })?;
    log_system_info();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    runtime.block_on(run(args))
}

fn load_overlay_settings(path: Option<&PathBuf>) -> anyhow::Result<OverlaySettings> {
    match path {
        Some(path) => load_settings_from(path).with_context(|| format!("loading settings from {}", path.display())),
        None => Ok(load_settings().unwrap_or_default()),
    }
}

fn stream_params(args: &Args) -> anyhow::Result<StreamParams> {
    let from_page = match &args.page_url {
        Some(raw) => StreamParams::from_url(&Url::parse(raw).with_context(|| format!("parsing page url {}", raw))?),
        None => StreamParams::default(),
    };
    let from_flags = StreamParams::new(args.channel.clone(), args.brightness);
    Ok(from_page.merge(from_flags, args.brightness.is_some()))
}

async fn run(args: Args) -> anyhow::Result<()> {
    let settings = load_overlay_settings(args.config.as_ref())?;
    let params = stream_params(&args)?;

    let mut resources = ResourceSet::new(ResourceSet::default_sources(&args.resources));
    resources.ready().on_ready(|| info!("✅ All declared resources settled"));
    resources.load_all().await;
    let placeholder = resources.placeholder(
        settings.animation.placeholder_width,
        settings.animation.placeholder_height,
    );
    debug!("Fallback sprite: {} ({:?})", PLACEHOLDER, placeholder.dimensions());

    let client: Arc<dyn EmoteSource> =
        Arc::new(HttpEmoteClient::new(settings.hosts.clone()).context("building HTTP client")?);
    let mut overlay = EmoteOverlay::new(&settings, client, placeholder, params.clone());

    let mut chat = None;
    match params.channel.as_deref() {
        Some(channel) => {
            if overlay.bootstrap_channel(channel).await {
                let transport = ChatTransport::new(TransportSettings {
                    host: settings.chat.irc_host.clone(),
                    port: settings.chat.irc_port,
                    channel: channel.to_string(),
                    reconnect_delay: Duration::from_secs(settings.chat.reconnect_secs),
                });
                chat = Some(transport.spawn(256));
            }
        }
        None => warn!("No channel given, live overlay not started"),
    }
    let (mut messages, chat_task) = match chat {
        Some((rx, handle)) => (Some(rx), Some(handle)),
        None => (None, None),
    };

    let mut interval = tokio::time::interval(settings.tick_interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let deadline = args.run_for_secs.map(|secs| tokio::time::Instant::now() + Duration::from_secs(secs));
    let mut scene = SceneGraph::new();

    info!("▶️ Tick loop running at {} Hz", settings.tick_rate_hz);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let report = overlay.tick_wall(Instant::now());
                if !report.released.is_empty() {
                    debug!("Released {} slot(s)", report.released.len());
                }
                let diff = scene.sync(&overlay.visuals());
                if !diff.is_empty() {
                    debug!(
                        "Scene: +{} ~{} -{} ({} visible)",
                        diff.added.len(), diff.updated.len(), diff.removed.len(), scene.len()
                    );
                }
            }
            Some(message) = next_message(&mut messages) => {
                let report = overlay.on_chat(&message);
                if report.requested > 0 {
                    debug!(
                        "{}: {} emote(s), {} spawned, {} dropped",
                        message.sender, report.requested, report.spawned.len(), report.dropped
                    );
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            _ = sleep_until(deadline) => {
                info!("Run time elapsed");
                break;
            }
        }
    }

    if let Some(handle) = chat_task {
        handle.abort();
    }
    let cache = overlay.cache().stats();
    let pool = overlay.pool().stats();
    info!(
        "📊 Cache: {} entries, {:.1}% hit ratio, {} ok / {} failed fetches; pool: {} spawned, {:.1}% dropped",
        cache.cache_entries,
        cache.hit_ratio(),
        cache.fetches_succeeded,
        cache.fetches_failed,
        pool.spawned,
        pool.drop_ratio()
    );
    Ok(())
}

async fn next_message(
    messages: &mut Option<tokio::sync::mpsc::Receiver<emote_overlay::networking::ChatMessage>>,
) -> Option<emote_overlay::networking::ChatMessage> {
    match messages {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
