//! 表盘几何与数值映射：指针位置 → 角度 → 时长 / 数值

use std::f64::consts::TAU;

use serde::Deserialize;

/// 表盘坐标系中的点（逻辑像素，y 轴向下）
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// 表盘取值模式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DialMode {
    /// 表盘表示分钟数，松手后开始倒计时
    Continuous,
    /// 表盘只是一个 0..max 的整数选择器，没有倒计时
    Discrete,
}

impl DialMode {
    pub fn default_max(self) -> i64 {
        match self {
            DialMode::Continuous => 30,
            DialMode::Discrete => 100,
        }
    }
}

/// 由指针位置计算角度：0 指向正上方，顺时针增加，结果在 [0, 2π)
///
/// 指针恰好落在圆心时半径为 0，定义为返回 0。
pub fn angle_from_pointer(pos: Point, center: Point) -> f64 {
    let dx = center.x - pos.x;
    let dy = center.y - pos.y;
    let r = (dx * dx + dy * dy).sqrt();
    if r == 0.0 || !r.is_finite() {
        return 0.0;
    }

    // 浮点误差可能让比值略微越过 ±1
    let mut angle = (dy / r).clamp(-1.0, 1.0).acos();
    if pos.x < center.x {
        angle = TAU - angle;
    }
    if angle.is_nan() || angle >= TAU {
        0.0
    } else {
        angle
    }
}

/// 弧度转角度（渲染用）
pub fn to_degrees(angle: f64) -> f64 {
    angle / TAU * 360.0
}

/// 分 + 秒的时长
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DialDuration {
    pub minutes: u32,
    pub seconds: u32,
}

impl DialDuration {
    pub fn total_secs(&self) -> u32 {
        self.minutes.saturating_mul(60).saturating_add(self.seconds)
    }
}

/// 表盘的取值范围 [min, max)，一整圈对应 max - min
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DialRange {
    pub min: i64,
    pub max: i64,
}

impl DialRange {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    /// 一整圈的跨度，至少为 1；溢出时取 i64::MAX
    pub fn span(&self) -> i64 {
        self.max.checked_sub(self.min).unwrap_or(i64::MAX).max(1)
    }

    /// 连续模式：角度 → 分钟数（带小数）
    pub fn angle_to_limit(&self, angle: f64) -> f64 {
        angle / TAU * self.span() as f64
    }

    /// 离散模式：角度 → 整数值（截断）
    pub fn angle_to_value(&self, angle: f64) -> i64 {
        let offset = self.angle_to_limit(angle) as i64;
        self.min + offset.clamp(0, self.span() - 1)
    }

    /// 整数值 → 角度
    pub fn value_to_angle(&self, value: i64) -> f64 {
        (value as f64 - self.min as f64) / self.span() as f64 * TAU
    }

    /// 剩余秒数 → 表盘旋转角（度）
    pub fn remaining_to_degrees(&self, remaining_secs: u32) -> f64 {
        let minutes = remaining_secs as f64 / 60.0;
        minutes * 360.0 / self.span() as f64
    }

    /// 把任意整数折回 [min, max)
    pub fn normalize(&self, value: i64) -> i64 {
        let offset = (i128::from(value) - i128::from(self.min)).rem_euclid(i128::from(self.span()));
        self.min + offset as i64
    }

    /// 加 1，越过上界回到 min
    pub fn increment(&self, value: i64) -> i64 {
        let value = self.normalize(value);
        if value >= self.max - 1 {
            self.min
        } else {
            value + 1
        }
    }

    /// 减 1，低于 min 时回到 max - 1
    pub fn decrement(&self, value: i64) -> i64 {
        let value = self.normalize(value);
        if value <= self.min {
            self.max - 1
        } else {
            value - 1
        }
    }
}

/// 把分钟数拆成整分钟 + 秒
pub fn limit_to_duration(limit: f64) -> DialDuration {
    let limit = if limit.is_finite() { limit.max(0.0) } else { 0.0 };
    let minutes = limit.floor();
    let seconds = ((limit - minutes) * 60.0).floor();
    DialDuration {
        minutes: minutes as u32,
        seconds: (seconds as u32).min(59),
    }
}

/// 解析输入框文本：空串视为 0，无法解析时保持原值
pub fn parse_entry(text: &str, current: i64) -> i64 {
    let text = text.trim();
    if text.is_empty() {
        return 0;
    }
    text.parse::<i64>().unwrap_or(current)
}

/// 秒数格式化为 "MM:SS"
pub fn format_mm_ss(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
