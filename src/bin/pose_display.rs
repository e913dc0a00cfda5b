use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use squat_tracker::broadcast::UdpSubscriber;
use squat_tracker::config::Config;
use squat_tracker::display::{DisplayEvent, DisplayLoop};
use squat_tracker::render::{character_color, visible_bones, Viewport};

/// 配信された姿勢を受け取り、接続状態と人物ごとの骨格を表示する
#[derive(Parser, Debug)]
#[command(name = "pose_display", version = env!("GIT_VERSION"))]
struct Args {
    /// 設定ファイル
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = Config::load_or_default(&args.config);

    tracing::info!("Pose Display {}", env!("GIT_VERSION"));
    let subscriber = UdpSubscriber::bind(&config.broadcast.addr, &config.broadcast.channel).await?;
    tracing::info!("Listening on {} (channel {})", subscriber.local_addr(), config.broadcast.channel);
    tracing::info!("Timeout: {} ms", config.liveness.timeout_ms);

    let mut display = DisplayLoop::new(subscriber, &config.liveness);
    let mut last_summary = String::new();

    loop {
        let event = tokio::select! {
            event = display.next_event() => event,
            _ = tokio::signal::ctrl_c() => break,
        };
        let Some(event) = event else { break };

        let state = display.state();
        if event == DisplayEvent::Disconnected {
            tracing::warn!("Disconnected: waiting for publisher");
            last_summary.clear();
            continue;
        }

        let (video_width, video_height) = state.video_size();
        let viewport = Viewport {
            video_width,
            video_height,
            width: config.display.width,
            height: config.display.height,
            mirrored: config.display.mirrored,
        };

        // 人物の並びが変わったときだけ出す
        let summary: Vec<String> = state
            .labeled_poses()
            .into_iter()
            .map(|(identity, body)| {
                format!(
                    "P{} #{:06X} bones={}",
                    identity,
                    character_color(identity),
                    visible_bones(body, &viewport).len()
                )
            })
            .collect();
        let summary = format!("Connected | {} poses | {}", state.pose_count(), summary.join(", "));
        if event == DisplayEvent::Connected || summary != last_summary {
            tracing::info!("{}", summary);
            last_summary = summary;
        }
    }

    tracing::info!("stopped");
    Ok(())
}
