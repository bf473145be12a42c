//! 表盘计时器：把指针 / 按键 / tick 事件转换成一组待执行的副作用
//!
//! 这里不依赖任何 UI 框架，界面层只负责把事件喂进来，再执行返回的 [`Effect`]。

use tracing::{debug, info};

use crate::countdown::{Countdown, CountdownPhase, TickOutcome};
use crate::dial::{
    self, DialDuration, DialMode, DialRange, Point, angle_from_pointer, format_mm_ss,
    limit_to_duration, parse_entry,
};

/// 倒计时结束时显示的文字
pub const DONE_TEXT: &str = "DONE!";

/// 计时器行为配置
#[derive(Clone, Debug, PartialEq)]
pub struct DialSettings {
    pub mode: DialMode,
    pub range: DialRange,
    /// 拖动过程中每次移动都立即重新开始倒计时（否则松手时才开始）
    pub commit_on_move: bool,
    pub done_text: String,
}

impl Default for DialSettings {
    fn default() -> Self {
        let mode = DialMode::Continuous;
        Self {
            mode,
            range: DialRange::new(0, mode.default_max()),
            commit_on_move: false,
            done_text: DONE_TEXT.to_owned(),
        }
    }
}

/// 输入框上的按键
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Enter,
}

/// 界面层需要执行的副作用，按顺序执行
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// 更新显示文字和表盘旋转角（度）
    Render { text: String, angle_deg: f64 },
    /// 改写输入框内容
    SetEntry(String),
    /// 同步停止当前计时线程
    StopTicker,
    /// 启动新的每秒 tick，tick 需带上 generation
    StartTicker { generation: u64, total_secs: u32 },
    PlaySound,
    /// 显示窗口并置于前台
    ActivateWindow,
}

/// 接收渲染输出的一方，只能在 UI 线程上调用
pub trait RenderSink {
    fn render(&mut self, text: &str, angle_deg: f64);
}

/// 一次拖动手势中的表盘状态，每次新手势都会整体替换
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DialState {
    /// 弧度，0 为正上方，顺时针增加
    pub angle: f64,
    pub target: Target,
}

/// 表盘选中的目标值
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    Duration(DialDuration),
    Value(i64),
}

#[derive(Debug, Default)]
struct Gesture {
    dial: Option<DialState>,
    /// 本次手势是否已经开始过倒计时（commit_on_move）
    committed: bool,
}

pub struct DialTimer {
    settings: DialSettings,
    gesture: Option<Gesture>,
    last_dial: Option<DialState>,
    countdown: Countdown,
    /// 输入框对应的数值：离散模式为计数，连续模式为分钟
    entry_value: i64,
}

impl DialTimer {
    pub fn new(settings: DialSettings) -> Self {
        let entry_value = settings.range.min;
        Self {
            settings,
            gesture: None,
            last_dial: None,
            countdown: Countdown::default(),
            entry_value,
        }
    }

    pub fn settings(&self) -> &DialSettings {
        &self.settings
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn is_dragging(&self) -> bool {
        self.gesture.is_some()
    }

    /// 最近一次拖动得到的表盘状态
    pub fn dial_state(&self) -> Option<DialState> {
        self.gesture
            .as_ref()
            .and_then(|g| g.dial)
            .or(self.last_dial)
    }

    pub fn entry_value(&self) -> i64 {
        self.entry_value
    }

    /// 启动时的画面
    pub fn initial_render(&self) -> Vec<Effect> {
        match self.settings.mode {
            DialMode::Continuous => vec![Effect::Render {
                text: format_mm_ss(0),
                angle_deg: 0.0,
            }],
            DialMode::Discrete => self.render_value(self.entry_value),
        }
    }

    pub fn on_pointer_down(&mut self) -> Vec<Effect> {
        self.gesture = Some(Gesture::default());
        Vec::new()
    }

    pub fn on_pointer_move(&mut self, pos: Point, center: Point) -> Vec<Effect> {
        let Some(gesture) = self.gesture.as_mut() else {
            return Vec::new();
        };
        let angle = angle_from_pointer(pos, center);
        let range = self.settings.range;

        match self.settings.mode {
            DialMode::Continuous => {
                let duration = limit_to_duration(range.angle_to_limit(angle));
                gesture.dial = Some(DialState {
                    angle,
                    target: Target::Duration(duration),
                });
                if self.settings.commit_on_move {
                    gesture.committed = true;
                    return self.commit(duration.total_secs());
                }
                vec![Effect::Render {
                    text: format_mm_ss(duration.total_secs()),
                    angle_deg: dial::to_degrees(angle),
                }]
            }
            DialMode::Discrete => {
                let value = range.angle_to_value(angle);
                gesture.dial = Some(DialState {
                    angle,
                    target: Target::Value(value),
                });
                self.entry_value = value;
                let mut effects = self.render_value(value);
                effects.push(Effect::SetEntry(value.to_string()));
                effects
            }
        }
    }

    pub fn on_pointer_up(&mut self) -> Vec<Effect> {
        self.finish_gesture()
    }

    /// 指针离开表盘等同于松手
    pub fn on_pointer_leave(&mut self) -> Vec<Effect> {
        self.finish_gesture()
    }

    pub fn on_key(&mut self, key: Key, text: &str) -> Vec<Effect> {
        let range = self.settings.range;
        let current = range.normalize(parse_entry(text, self.entry_value));

        let value = match key {
            Key::Up => range.increment(current),
            Key::Down => range.decrement(current),
            Key::Enter => current,
        };
        self.entry_value = value;
        debug!(?key, value, "entry changed");

        match self.settings.mode {
            DialMode::Discrete => {
                let mut effects = self.render_value(value);
                effects.push(Effect::SetEntry(value.to_string()));
                effects
            }
            DialMode::Continuous => {
                let minutes = u32::try_from(value.max(0)).unwrap_or(u32::MAX);
                let total_secs = minutes.saturating_mul(60);
                let mut effects = vec![Effect::SetEntry(value.to_string())];
                if key == Key::Enter {
                    self.last_dial = Some(DialState {
                        angle: range.value_to_angle(value),
                        target: Target::Duration(DialDuration { minutes, seconds: 0 }),
                    });
                    effects.extend(self.commit(total_secs));
                } else if !self.countdown.is_running() {
                    effects.push(Effect::Render {
                        text: format_mm_ss(total_secs),
                        angle_deg: dial::to_degrees(range.value_to_angle(value)),
                    });
                }
                effects
            }
        }
    }

    /// 计时线程每秒一次
    pub fn on_tick(&mut self, generation: u64) -> Vec<Effect> {
        match self.countdown.tick(generation) {
            TickOutcome::Ignored => Vec::new(),
            TickOutcome::Advanced(state) => {
                // 拖动中保留预览，不覆盖
                if self.is_dragging() {
                    return Vec::new();
                }
                let remaining = state.remaining_secs();
                vec![Effect::Render {
                    text: format_mm_ss(remaining),
                    angle_deg: self.settings.range.remaining_to_degrees(remaining),
                }]
            }
            TickOutcome::Expired => {
                info!(generation, "countdown expired");
                vec![
                    Effect::StopTicker,
                    Effect::Render {
                        text: self.settings.done_text.clone(),
                        angle_deg: 0.0,
                    },
                    Effect::PlaySound,
                    Effect::ActivateWindow,
                ]
            }
        }
    }

    fn finish_gesture(&mut self) -> Vec<Effect> {
        let Some(gesture) = self.gesture.take() else {
            return Vec::new();
        };
        let Some(dial) = gesture.dial else {
            return Vec::new();
        };
        self.last_dial = Some(dial);

        match dial.target {
            Target::Duration(duration) if !gesture.committed => {
                let minutes = duration.minutes as i64;
                let mut effects = vec![Effect::SetEntry(minutes.to_string())];
                self.entry_value = minutes;
                effects.extend(self.commit(duration.total_secs()));
                effects
            }
            Target::Duration(_) => Vec::new(),
            Target::Value(value) => {
                debug!(value, "dial value picked");
                Vec::new()
            }
        }
    }

    /// 开始新的倒计时，先停掉旧的
    fn commit(&mut self, total_secs: u32) -> Vec<Effect> {
        let commit = self.countdown.commit(total_secs);
        info!(
            total_secs,
            generation = commit.generation,
            preempted = commit.preempted,
            "countdown committed"
        );

        let mut effects = Vec::with_capacity(3);
        if commit.preempted {
            effects.push(Effect::StopTicker);
        }
        effects.push(Effect::StartTicker {
            generation: commit.generation,
            total_secs,
        });
        effects.push(Effect::Render {
            text: format_mm_ss(total_secs),
            angle_deg: self.settings.range.remaining_to_degrees(total_secs),
        });
        effects
    }

    fn render_value(&self, value: i64) -> Vec<Effect> {
        vec![Effect::Render {
            text: value.to_string(),
            angle_deg: dial::to_degrees(self.settings.range.value_to_angle(value)),
        }]
    }

    pub fn phase(&self) -> CountdownPhase {
        self.countdown.phase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CENTER: Point = Point::new(100.0, 100.0);

    fn discrete() -> DialTimer {
        DialTimer::new(DialSettings {
            mode: DialMode::Discrete,
            range: DialRange::new(0, 100),
            ..DialSettings::default()
        })
    }

    fn assert_render(effect: &Effect, expected_text: &str, expected_deg: f64) {
        match effect {
            Effect::Render { text, angle_deg } => {
                assert_eq!(text, expected_text);
                assert!((angle_deg - expected_deg).abs() < 1e-9, "{angle_deg} != {expected_deg}");
            }
            other => panic!("expected Render, got {other:?}"),
        }
    }

    fn started_generation(effects: &[Effect]) -> u64 {
        effects
            .iter()
            .find_map(|e| match e {
                Effect::StartTicker { generation, .. } => Some(*generation),
                _ => None,
            })
            .expect("no StartTicker effect")
    }

    /// 在半径 50 处按给定角度（度）拖动后松手
    fn commit_via_drag(timer: &mut DialTimer, degrees: f64) -> Vec<Effect> {
        let rad = degrees.to_radians();
        let pos = Point::new(CENTER.x + 50.0 * rad.sin(), CENTER.y - 50.0 * rad.cos());
        timer.on_pointer_down();
        timer.on_pointer_move(pos, CENTER);
        timer.on_pointer_up()
    }

    #[test]
    fn move_without_press_does_nothing() {
        let mut timer = DialTimer::new(DialSettings::default());
        assert!(timer.on_pointer_move(Point::new(100.0, 180.0), CENTER).is_empty());
        assert!(timer.on_pointer_up().is_empty());
        assert_eq!(timer.phase(), CountdownPhase::Idle);
    }

    #[test]
    fn drag_previews_then_commits_on_release() {
        let mut timer = DialTimer::new(DialSettings::default());
        timer.on_pointer_down();
        let preview = timer.on_pointer_move(Point::new(100.0, 180.0), CENTER);
        assert_eq!(
            preview,
            vec![Effect::Render {
                text: "15:00".to_owned(),
                angle_deg: 180.0
            }]
        );
        assert_eq!(timer.phase(), CountdownPhase::Idle);

        let effects = timer.on_pointer_up();
        assert_eq!(
            effects,
            vec![
                Effect::SetEntry("15".to_owned()),
                Effect::StartTicker {
                    generation: 1,
                    total_secs: 900
                },
                Effect::Render {
                    text: "15:00".to_owned(),
                    angle_deg: 180.0
                },
            ]
        );
        assert_eq!(timer.phase(), CountdownPhase::Running);
        assert_eq!(
            timer.dial_state().map(|d| d.target),
            Some(Target::Duration(DialDuration { minutes: 15, seconds: 0 }))
        );
    }

    #[test]
    fn full_countdown_expires_once() {
        let mut timer = DialTimer::new(DialSettings::default());
        let effects = timer.on_key(Key::Enter, "5");
        let generation = started_generation(&effects);

        // 30 分钟的表盘上 66.1° 约为 5 分 30.5 秒
        let effects = commit_via_drag(&mut timer, 66.1);
        assert!(effects.contains(&Effect::StopTicker));
        let generation = {
            let next = started_generation(&effects);
            assert!(next > generation);
            next
        };
        assert_eq!(timer.countdown().state().map(|s| s.total_secs), Some(330));

        let mut sounds = 0;
        let mut last_text = String::new();
        for _ in 0..330 {
            for effect in timer.on_tick(generation) {
                match effect {
                    Effect::PlaySound => sounds += 1,
                    Effect::Render { text, .. } => last_text = text,
                    _ => {}
                }
            }
            if let Some(state) = timer.countdown().state() {
                assert!(state.elapsed_secs <= state.total_secs);
            }
        }
        assert_eq!(timer.phase(), CountdownPhase::Expired);
        assert_eq!(last_text, DONE_TEXT);
        assert_eq!(sounds, 1);
        assert_eq!(timer.countdown().elapsed_secs(), 0);
        assert!(timer.on_tick(generation).is_empty());
    }

    #[test]
    fn expiry_stops_ticker_and_activates_window() {
        let mut timer = DialTimer::new(DialSettings::default());
        let generation = started_generation(&timer.on_key(Key::Enter, "0"));
        let effects = timer.on_tick(generation);
        assert_eq!(
            effects,
            vec![
                Effect::StopTicker,
                Effect::Render {
                    text: DONE_TEXT.to_owned(),
                    angle_deg: 0.0
                },
                Effect::PlaySound,
                Effect::ActivateWindow,
            ]
        );
    }

    #[test]
    fn tick_renders_remaining_time() {
        let mut timer = DialTimer::new(DialSettings::default());
        let generation = started_generation(&timer.on_key(Key::Enter, "1"));
        let effects = timer.on_tick(generation);
        assert_eq!(
            effects,
            vec![Effect::Render {
                text: "00:59".to_owned(),
                angle_deg: 59.0 / 60.0 * 360.0 / 30.0
            }]
        );
    }

    #[test]
    fn second_commit_preempts_first() {
        let mut timer = DialTimer::new(DialSettings::default());
        let first = started_generation(&timer.on_key(Key::Enter, "1"));
        for _ in 0..5 {
            timer.on_tick(first);
        }
        assert_eq!(timer.countdown().elapsed_secs(), 5);

        let effects = timer.on_key(Key::Enter, "2");
        // 旧计时线程必须先停，再启动新的
        let stop = effects.iter().position(|e| *e == Effect::StopTicker);
        let start = effects
            .iter()
            .position(|e| matches!(e, Effect::StartTicker { .. }));
        assert!(stop.is_some() && stop < start);

        let state = timer.countdown().state().expect("running countdown");
        assert_eq!(state.total_secs, 120);
        assert_eq!(state.elapsed_secs, 0);
        assert!(timer.on_tick(first).is_empty());
    }

    #[test]
    fn commit_on_move_restarts_every_move() {
        let mut timer = DialTimer::new(DialSettings {
            commit_on_move: true,
            ..DialSettings::default()
        });
        timer.on_pointer_down();
        let first = timer.on_pointer_move(Point::new(160.0, 100.0), CENTER);
        assert_eq!(started_generation(&first), 1);
        let second = timer.on_pointer_move(Point::new(100.0, 180.0), CENTER);
        assert_eq!(second[0], Effect::StopTicker);
        assert_eq!(started_generation(&second), 2);

        // 松手不再重复提交
        assert!(timer.on_pointer_up().is_empty());
        assert_eq!(timer.countdown().state().map(|s| s.total_secs), Some(900));
    }

    #[test]
    fn leaving_the_dial_commits_like_release() {
        let mut timer = DialTimer::new(DialSettings::default());
        timer.on_pointer_down();
        timer.on_pointer_move(Point::new(160.0, 100.0), CENTER);
        let effects = timer.on_pointer_leave();
        assert_eq!(started_generation(&effects), 1);
        assert!(!timer.is_dragging());
        assert!(timer.on_pointer_leave().is_empty());
    }

    #[test]
    fn ticks_during_drag_keep_preview() {
        let mut timer = DialTimer::new(DialSettings::default());
        let generation = started_generation(&timer.on_key(Key::Enter, "3"));
        timer.on_pointer_down();
        timer.on_pointer_move(Point::new(160.0, 100.0), CENTER);
        assert!(timer.on_tick(generation).is_empty());
        assert_eq!(timer.countdown().elapsed_secs(), 1);
    }

    #[test]
    fn discrete_keys_wrap() {
        let mut timer = discrete();
        let effects = timer.on_key(Key::Up, "");
        assert_eq!(timer.entry_value(), 1);
        assert!(effects.contains(&Effect::SetEntry("1".to_owned())));

        timer.on_key(Key::Down, "0");
        assert_eq!(timer.entry_value(), 99);

        timer.on_key(Key::Up, "99");
        assert_eq!(timer.entry_value(), 0);
    }

    #[test]
    fn discrete_bad_text_keeps_value() {
        let mut timer = discrete();
        timer.on_key(Key::Enter, "42");
        assert_eq!(timer.entry_value(), 42);
        let effects = timer.on_key(Key::Up, "4x2");
        assert_eq!(timer.entry_value(), 43);
        assert_render(&effects[0], "43", 43.0 * 360.0 / 100.0);
    }

    #[test]
    fn discrete_drag_picks_value_without_countdown() {
        let mut timer = discrete();
        timer.on_pointer_down();
        let effects = timer.on_pointer_move(Point::new(100.0, 180.0), CENTER);
        assert_eq!(
            effects,
            vec![
                Effect::Render {
                    text: "50".to_owned(),
                    angle_deg: 180.0
                },
                Effect::SetEntry("50".to_owned()),
            ]
        );
        assert!(timer.on_pointer_up().is_empty());
        assert_eq!(timer.entry_value(), 50);
        assert_eq!(timer.phase(), CountdownPhase::Idle);
        assert_eq!(timer.dial_state().map(|d| d.target), Some(Target::Value(50)));
    }

    #[test]
    fn continuous_arrows_preview_minutes() {
        let mut timer = DialTimer::new(DialSettings::default());
        let effects = timer.on_key(Key::Down, "0");
        assert_eq!(effects[0], Effect::SetEntry("29".to_owned()));
        assert_render(&effects[1], "29:00", 29.0 * 360.0 / 30.0);
        assert_eq!(timer.phase(), CountdownPhase::Idle);
    }

    #[test]
    fn typed_minutes_beyond_u32_saturate() {
        let mut timer = DialTimer::new(DialSettings {
            range: DialRange::new(0, i64::MAX),
            ..DialSettings::default()
        });
        let effects = timer.on_key(Key::Enter, "99999999999");
        assert!(effects.contains(&Effect::StartTicker {
            generation: 1,
            total_secs: u32::MAX
        }));
        assert_eq!(timer.countdown().state().map(|s| s.total_secs), Some(u32::MAX));
    }
}
