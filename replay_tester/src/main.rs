use anyhow::{Context, bail};
use futures::future::join_all;
use lifeguard_vision::{
    AlertEvent, DetectionRecord, Frame, FramePoll, FrameSource, ManualClock, Monitor, MonitorConfig,
    RunSummary, VisionError,
};
use serde_json::json;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, watch};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "Usage: replay_tester [--config <file.json>] [--fps <n>] <frame_dir> [<frame_dir> ...]";

struct Args {
    config: Option<PathBuf>,
    frame_interval: Duration,
    feeds: Vec<PathBuf>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = env::args().skip(1);
    let mut parsed = Args {
        config: None,
        frame_interval: Duration::from_millis(200),
        feeds: Vec::new(),
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().context("--config needs a path")?;
                parsed.config = Some(PathBuf::from(path));
            }
            "--fps" => {
                let raw = args.next().context("--fps needs a number")?;
                let fps: f64 = raw.parse().with_context(|| format!("invalid --fps value {raw}"))?;
                parsed.frame_interval = frame_interval(fps)?;
            }
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            _ => parsed.feeds.push(PathBuf::from(arg)),
        }
    }
    if parsed.feeds.is_empty() {
        bail!("{USAGE}");
    }
    Ok(parsed)
}

/// Time between two replayed frames at `fps` frames per second.
fn frame_interval(fps: f64) -> anyhow::Result<Duration> {
    if !(fps.is_finite() && fps > 0.0) {
        bail!("--fps must be a positive number");
    }
    Duration::try_from_secs_f64(1.0 / fps).with_context(|| format!("--fps {fps} is too small"))
}

fn init_tracing(default_level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // stdout carries the JSON lines, so logs go to stderr.
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);
    if let Err(e) = tracing_subscriber::registry().with(env_filter).with(fmt_layer).try_init() {
        eprintln!("tracing already initialised: {e}");
    }
}

/// A directory of still images replayed in name order as one camera feed.
///
/// Session time is synthetic: every frame advances the shared clock by one frame
/// interval, so a replay behaves the same however fast the machine is.
struct DirectoryFrameSource {
    files: Vec<PathBuf>,
    next: usize,
    width: u32,
    height: u32,
    clock: ManualClock,
    frame_interval: Duration,
}

impl DirectoryFrameSource {
    fn open(
        dir: &Path,
        width: u32,
        height: u32,
        frame_interval: Duration,
        clock: ManualClock,
    ) -> anyhow::Result<Self> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
            let path = entry?.path();
            if path.is_file() && image::ImageFormat::from_path(&path).is_ok() {
                files.push(path);
            }
        }
        files.sort();
        Ok(Self {
            files,
            next: 0,
            width,
            height,
            clock,
            frame_interval,
        })
    }
}

impl FrameSource for DirectoryFrameSource {
    fn poll_frame(&mut self) -> FramePoll {
        let Some(path) = self.files.get(self.next) else {
            return FramePoll::Exhausted;
        };
        if self.next > 0 {
            self.clock.advance(self.frame_interval);
        }
        self.next += 1;

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                return FramePoll::Unavailable(VisionError::input_unavailable(format!(
                    "{}: {e}",
                    path.display()
                )));
            }
        };
        match Frame::decode(&bytes, self.width, self.height) {
            Ok(frame) => FramePoll::Ready(frame),
            Err(e) => FramePoll::Unavailable(e),
        }
    }
}

fn feed_name(dir: &Path) -> String {
    dir.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string())
}

fn print_line(value: serde_json::Value) {
    match serde_json::to_string(&value) {
        Ok(line) => println!("{line}"),
        Err(e) => warn!(error = %e, "could not serialise output line"),
    }
}

async fn replay_feed(
    dir: PathBuf,
    config: MonitorConfig,
    frame_interval: Duration,
    permits: Arc<Semaphore>,
    stop: watch::Receiver<bool>,
) -> anyhow::Result<(String, RunSummary)> {
    let _permit = permits.acquire_owned().await.context("replay semaphore closed")?;
    let camera = feed_name(&dir);
    let clock = ManualClock::new();
    let source = DirectoryFrameSource::open(
        &dir,
        config.frame.working_width,
        config.frame.working_height,
        frame_interval,
        clock.clone(),
    )?;
    info!(camera = %camera, frames = source.files.len(), "replaying feed");

    let detection_camera = camera.clone();
    let alert_camera = camera.clone();
    let mut monitor = Monitor::new(camera.clone(), config, source, clock)?
        .with_detection_sink(move |record: &DetectionRecord| {
            print_line(json!({ "camera": detection_camera, "detection": record }));
        })
        .with_alert_sink(move |event: &AlertEvent| {
            print_line(json!({ "camera": alert_camera, "alert": event }));
        });

    let summary = monitor.run(stop).await?;
    Ok((camera, summary))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = parse_args()?;

    let config = match &args.config {
        Some(path) => MonitorConfig::from_json_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => MonitorConfig::from_env().context("reading configuration from the environment")?,
    };
    init_tracing(config.log_level());

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping feeds");
            let _ = stop_tx.send(true);
        }
    });

    let permits = Arc::new(Semaphore::new(num_cpus::get().max(1)));
    let tasks: Vec<_> = args
        .feeds
        .into_iter()
        .map(|dir| {
            tokio::spawn(replay_feed(
                dir,
                config.clone(),
                args.frame_interval,
                Arc::clone(&permits),
                stop_rx.clone(),
            ))
        })
        .collect();

    let mut failures = 0;
    for joined in join_all(tasks).await {
        match joined {
            Ok(Ok((camera, summary))) => print_line(json!({ "camera": camera, "summary": summary })),
            Ok(Err(e)) => {
                failures += 1;
                error!(error = %format!("{e:#}"), "feed failed");
            }
            Err(e) => {
                failures += 1;
                error!(error = %e, "feed task panicked");
            }
        }
    }

    if failures > 0 {
        bail!("{failures} feed(s) failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_interval_follows_fps() {
        assert_eq!(frame_interval(5.0).unwrap(), Duration::from_millis(200));
        assert_eq!(frame_interval(0.5).unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn unusable_fps_is_rejected() {
        assert!(frame_interval(0.0).is_err());
        assert!(frame_interval(-2.0).is_err());
        assert!(frame_interval(f64::NAN).is_err());
        // 1 / 1e-320 overflows to infinity.
        assert!(frame_interval(1e-320).is_err());
    }
}
