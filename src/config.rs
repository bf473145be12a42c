//! 命令行参数与可选的 JSON 设置文件

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::dial::{DialMode, DialRange};
use crate::timer::{DONE_TEXT, DialSettings};

/// 设置文件名（放在系统配置目录下）
pub const SETTINGS_FILENAME: &str = "settings.json";

/// tick 间隔下限（毫秒）
pub const MIN_TICK_MS: u64 = 10;

const DEFAULT_TICK_MS: u64 = 1000;

/// 表盘一整圈的最大跨度：最长倒计时的秒数必须放得进 u32
pub const MAX_SPAN: i64 = (u32::MAX / 60) as i64;

#[derive(Parser, Debug)]
#[command(name = "dial-timer")]
#[command(about = "A borderless always-on-top dial countdown timer")]
#[command(version)]
pub struct Cli {
    /// Dial mode: continuous (minutes countdown) or discrete (plain value picker)
    #[arg(long, value_enum)]
    pub mode: Option<DialMode>,

    /// Lower bound of the dial range
    #[arg(long, allow_negative_numbers = true)]
    pub min: Option<i64>,

    /// Upper bound of the dial range (one full turn = max - min)
    #[arg(long, allow_negative_numbers = true)]
    pub max: Option<i64>,

    /// Restart the countdown on every drag movement instead of on release
    #[arg(long)]
    pub commit_on_move: bool,

    /// Do not play a sound when the countdown expires
    #[arg(long)]
    pub no_sound: bool,

    /// Use a normal window level instead of always-on-top
    #[arg(long)]
    pub no_always_on_top: bool,

    /// Tick interval in milliseconds
    #[arg(long)]
    pub tick_ms: Option<u64>,

    /// Settings file (JSON); defaults to the user config directory
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}

/// 设置文件内容，所有字段可选
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileSettings {
    pub mode: Option<DialMode>,
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
    pub commit_on_move: Option<bool>,
    pub done_text: Option<String>,
    pub sound: Option<bool>,
    pub always_on_top: Option<bool>,
    pub tick_interval_ms: Option<u64>,
}

/// 合并后的最终设置
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub dial: DialSettings,
    pub sound: bool,
    pub always_on_top: bool,
    pub tick_interval: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("max value {max} must be greater than min value {min}")]
    InvalidRange { min: i64, max: i64 },
    #[error("dial range {min}..{max} is too large, a full turn may span at most 71582788")]
    RangeTooLarge { min: i64, max: i64 },
    #[error("tick interval must be at least 10 ms, got {0} ms")]
    TickTooShort(u64),
}

/// 默认设置文件路径
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dial-timer").join(SETTINGS_FILENAME))
}

/// 读取设置文件并与命令行合并。显式指定的文件必须存在，默认路径不存在时使用默认值
pub fn load(cli: &Cli) -> Result<Settings, ConfigError> {
    let file = match &cli.config {
        Some(path) => read_file(path)?,
        None => match default_settings_path() {
            Some(path) if path.exists() => read_file(&path)?,
            _ => {
                debug!("no settings file, using defaults");
                FileSettings::default()
            }
        },
    };
    let settings = resolve(cli, file)?;
    info!(
        mode = ?settings.dial.mode,
        min = settings.dial.range.min,
        max = settings.dial.range.max,
        commit_on_move = settings.dial.commit_on_move,
        "settings resolved"
    );
    Ok(settings)
}

pub fn read_file(path: &Path) -> Result<FileSettings, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(?path, "settings file loaded");
    Ok(file)
}

/// 命令行优先，其次设置文件，最后是默认值
pub fn resolve(cli: &Cli, file: FileSettings) -> Result<Settings, ConfigError> {
    let mode = cli.mode.or(file.mode).unwrap_or(DialMode::Continuous);
    let min = cli.min.or(file.min_value).unwrap_or(0);
    let max = match cli.max.or(file.max_value) {
        Some(max) => max,
        None => min
            .checked_add(mode.default_max())
            .ok_or(ConfigError::RangeTooLarge { min, max: i64::MAX })?,
    };
    if max <= min {
        return Err(ConfigError::InvalidRange { min, max });
    }
    match max.checked_sub(min) {
        Some(span) if span <= MAX_SPAN => {}
        _ => return Err(ConfigError::RangeTooLarge { min, max }),
    }

    let tick_ms = cli.tick_ms.or(file.tick_interval_ms).unwrap_or(DEFAULT_TICK_MS);
    if tick_ms < MIN_TICK_MS {
        return Err(ConfigError::TickTooShort(tick_ms));
    }

    Ok(Settings {
        dial: DialSettings {
            mode,
            range: DialRange::new(min, max),
            commit_on_move: cli.commit_on_move || file.commit_on_move.unwrap_or(false),
            done_text: file.done_text.unwrap_or_else(|| DONE_TEXT.to_owned()),
        },
        sound: !cli.no_sound && file.sound.unwrap_or(true),
        always_on_top: !cli.no_always_on_top && file.always_on_top.unwrap_or(true),
        tick_interval: Duration::from_millis(tick_ms),
    })
}
