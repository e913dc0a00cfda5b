use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use squat_tracker::broadcast::UdpPublisher;
use squat_tracker::capture::{CaptureSession, PoseEstimator, ReplayEstimator, SyntheticEstimator};
use squat_tracker::config::Config;

/// 姿勢を推定してスクワットを数え、表示側へ配信する
#[derive(Parser, Debug)]
#[command(name = "pose_publisher", version = env!("GIT_VERSION"))]
struct Args {
    /// 設定ファイル
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// 姿勢の入力元を上書き（"synthetic" または録画ファイル）
    #[arg(long)]
    source: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let mut config = Config::load_or_default(&args.config);
    if let Some(source) = args.source {
        config.capture.source = source;
    }

    tracing::info!("Pose Publisher {}", env!("GIT_VERSION"));
    tracing::info!("Broadcast: channel={} addr={}", config.broadcast.channel, config.broadcast.addr);
    tracing::info!("Target FPS: {}", config.capture.target_fps);
    tracing::info!(
        "Squat thresholds: down < {}°, up > {}°",
        config.squat.down_threshold,
        config.squat.up_threshold
    );

    if config.capture.source == "synthetic" {
        tracing::info!("Source: synthetic ({} people)", config.capture.people);
        run(SyntheticEstimator::new(config.capture.people), &config).await
    } else {
        tracing::info!("Source: {}", config.capture.source);
        run(ReplayEstimator::load(&config.capture.source)?, &config).await
    }
}

async fn run<E: PoseEstimator>(estimator: E, config: &Config) -> Result<()> {
    let publisher = UdpPublisher::new(&config.broadcast.addr, &config.broadcast.channel)?;
    tracing::info!("Publishing to {}", publisher.target());
    let mut session = CaptureSession::new(estimator, publisher, &config.squat);
    tracing::info!("Ctrl-C で終了");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl-C: {}", e);
        }
    };

    let mut last_total = 0;
    session
        .run(config.capture.frame_interval(), shutdown, |report| {
            if report.total != last_total {
                last_total = report.total;
                let counts: Vec<String> = report
                    .persons
                    .iter()
                    .map(|p| format!("P{}={}({})", p.identity, p.count, p.phase.label()))
                    .collect();
                tracing::info!("Total: {} ({})", report.total, counts.join(" "));
            }
        })
        .await?;

    for identity in 1..=squat_tracker::tracker::MAX_BODIES as u8 {
        if let Some(counter) = session.reps().counter(identity) {
            tracing::info!("P{}: {} reps", identity, counter.count());
        }
    }
    tracing::info!("stopped");
    Ok(())
}
