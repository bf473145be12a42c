//! Dial Timer — 旋钮式倒计时桌面小部件（Rust + egui）

mod app;
mod config;
mod countdown;
mod dial;
mod sound;
mod ticker;
mod timer;

use anyhow::Context as _;
use clap::Parser;
use tracing::info;

fn main() -> anyhow::Result<()> {
    let cli = config::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!("dial_timer={}", cli.log_level()))
            }),
        )
        .init();

    let settings = config::load(&cli).context("failed to load settings")?;
    info!("Starting dial-timer v{}", env!("CARGO_PKG_VERSION"));

    let level = if settings.always_on_top {
        egui::viewport::WindowLevel::AlwaysOnTop
    } else {
        egui::viewport::WindowLevel::Normal
    };
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([app::WINDOW_SIZE.0, app::WINDOW_SIZE.1])
            .with_title("Dial Timer")
            .with_decorations(false) // 无系统标题栏，仅保留自定义顶栏
            .with_resizable(false)
            .with_window_level(level)
            .with_icon(egui::IconData::default()),
        ..Default::default()
    };
    eframe::run_native(
        "dial-timer",
        options,
        Box::new(move |cc| Ok(Box::new(app::DialTimerApp::new(cc, settings)))),
    )
    .map_err(|e| anyhow::anyhow!("eframe error: {e}"))
}
