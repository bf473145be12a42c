//! egui 主界面：表盘绘制、指针 / 按键输入、窗口外壳（拖动、最小化、退出）

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta};
use eframe::egui;
use tracing::{debug, error, info};

use crate::config::Settings;
use crate::countdown::CountdownPhase;
use crate::dial::{DialMode, Point, format_mm_ss};
use crate::sound;
use crate::ticker::{TickEvent, Ticker};
use crate::timer::{DialTimer, Effect, Key, RenderSink, Target};

/// 窗口与桌面右下角的边距（逻辑像素）
const PLACE_MARGIN: f32 = 10.0;
/// 任务栏高度的估计值，egui 拿不到工作区大小
const TASKBAR_ALLOWANCE: f32 = 48.0;

/// 窗口尺寸
pub const WINDOW_SIZE: (f32, f32) = (220.0, 270.0);
const DIAL_SIZE: f32 = 180.0;

/// 表盘配色
mod dial_theme {
    /// 表盘扇区：番茄红
    pub const SECTOR_RGB: (u8, u8, u8) = (217, 17, 83);
    /// 深色背景
    pub const BG_RGB: (u8, u8, u8) = (18, 18, 24);
    /// 表盘底色
    pub const FACE_RGB: (u8, u8, u8) = (238, 238, 242);
    /// 刻度
    pub const TICK_RGB: (u8, u8, u8) = (80, 80, 90);
    pub const TEXT_WHITE: (u8, u8, u8) = (255, 255, 255);
    pub const TEXT_DIM: (u8, u8, u8) = (200, 200, 210);
}

fn rgb((r, g, b): (u8, u8, u8)) -> egui::Color32 {
    egui::Color32::from_rgb(r, g, b)
}

/// 加载系统中文字体（悬停提示为中文）
fn setup_fonts(ctx: &egui::Context) {
    #[cfg(windows)]
    let candidates = [
        r"C:\Windows\Fonts\msyh.ttc",
        r"C:\Windows\Fonts\simhei.ttf",
    ];
    #[cfg(not(windows))]
    let candidates = [
        "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
        "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    ];

    let Some(bytes) = candidates.iter().find_map(|path| std::fs::read(path).ok()) else {
        debug!("no CJK system font found, keeping default fonts");
        return;
    };

    let mut fonts = egui::FontDefinitions::default();
    fonts
        .font_data
        .insert("cjk".to_owned(), Arc::new(egui::FontData::from_owned(bytes)));
    for family in [egui::FontFamily::Proportional, egui::FontFamily::Monospace] {
        fonts.families.entry(family).or_default().push("cjk".to_owned());
    }
    ctx.set_fonts(fonts);
}

/// 界面绑定的两个输出：文字和旋转角
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DialView {
    pub text: String,
    pub angle_deg: f64,
}

impl RenderSink for DialView {
    fn render(&mut self, text: &str, angle_deg: f64) {
        self.text.clear();
        self.text.push_str(text);
        self.angle_deg = angle_deg;
    }
}

pub struct DialTimerApp {
    timer: DialTimer,
    view: DialView,
    entry_text: String,
    ticker: Option<Ticker>,
    tick_tx: Sender<TickEvent>,
    tick_rx: Receiver<TickEvent>,
    tick_interval: Duration,
    sound: bool,
    /// 是否已放到桌面右下角（首帧可能没有显示器信息，下一帧重试）
    placed: bool,
    last_pointer: Option<egui::Pos2>,
    finish_at: Option<DateTime<Local>>,
}

impl DialTimerApp {
    pub fn new(cc: &eframe::CreationContext<'_>, settings: Settings) -> Self {
        setup_fonts(&cc.egui_ctx);
        let (tick_tx, tick_rx) = mpsc::channel();
        let timer = DialTimer::new(settings.dial);
        let mut view = DialView::default();
        for effect in timer.initial_render() {
            if let Effect::Render { text, angle_deg } = effect {
                view.render(&text, angle_deg);
            }
        }
        Self {
            entry_text: timer.entry_value().to_string(),
            timer,
            view,
            ticker: None,
            tick_tx,
            tick_rx,
            tick_interval: settings.tick_interval,
            sound: settings.sound,
            placed: false,
            last_pointer: None,
            finish_at: None,
        }
    }

    /// 在 UI 线程上按顺序执行副作用
    fn apply(&mut self, ctx: &egui::Context, frame: &eframe::Frame, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Render { text, angle_deg } => self.view.render(&text, angle_deg),
                Effect::SetEntry(text) => self.entry_text = text,
                Effect::StopTicker => {
                    if let Some(ticker) = self.ticker.take() {
                        ticker.stop();
                    }
                    self.finish_at = None;
                }
                Effect::StartTicker {
                    generation,
                    total_secs,
                } => self.start_ticker(ctx, generation, total_secs),
                Effect::PlaySound => {
                    if self.sound {
                        sound::play_notification();
                    }
                }
                Effect::ActivateWindow => activate_window(ctx, frame),
            }
        }
    }

    fn start_ticker(&mut self, ctx: &egui::Context, generation: u64, total_secs: u32) {
        // 旧计时器必须已经停下
        if let Some(stale) = self.ticker.take() {
            error!(generation = stale.generation(), "previous ticker still running, stopping it");
            stale.stop();
        }
        let wake_ctx = ctx.clone();
        match Ticker::spawn(generation, self.tick_interval, self.tick_tx.clone(), move || {
            wake_ctx.request_repaint()
        }) {
            Ok(ticker) => {
                let finish = Local::now() + TimeDelta::seconds(i64::from(total_secs));
                info!(
                    generation,
                    total_secs,
                    finish = %finish.format("%H:%M:%S"),
                    "countdown started"
                );
                self.finish_at = Some(finish);
                self.ticker = Some(ticker);
            }
            Err(e) => error!(generation, "failed to spawn ticker thread: {e}"),
        }
    }

    /// 表盘上的指针事件
    fn dial_input(
        &mut self,
        ui: &mut egui::Ui,
        rect: egui::Rect,
        response: &egui::Response,
    ) -> Vec<Effect> {
        let mut effects = Vec::new();
        let center = to_point(rect.center());
        let (pressed, primary_down) =
            ui.input(|i| (i.pointer.primary_pressed(), i.pointer.primary_down()));

        if pressed && response.hovered() {
            effects.extend(self.timer.on_pointer_down());
            self.last_pointer = None;
        }
        if !self.timer.is_dragging() {
            return effects;
        }

        if let Some(pos) = ui.input(|i| i.pointer.latest_pos()) {
            if !rect.contains(pos) {
                effects.extend(self.timer.on_pointer_leave());
                return effects;
            }
            if self.last_pointer != Some(pos) {
                self.last_pointer = Some(pos);
                effects.extend(self.timer.on_pointer_move(to_point(pos), center));
            }
        }
        if !primary_down {
            effects.extend(self.timer.on_pointer_up());
        }
        effects
    }
}

/// 悬停提示：最近一次选中的目标
fn describe_target(target: Target) -> String {
    match target {
        Target::Duration(d) => format!("{} 分 {} 秒", d.minutes, d.seconds),
        Target::Value(v) => v.to_string(),
    }
}

fn to_point(pos: egui::Pos2) -> Point {
    Point::new(f64::from(pos.x), f64::from(pos.y))
}

/// 窗口放在桌面右下角时的位置
fn placement_bottom_right(ctx: &egui::Context) -> Option<egui::Pos2> {
    ctx.input(|i| {
        let size = i.viewport().outer_rect?.size();
        let monitor_size = i.viewport().monitor_size?;
        if 1.0 < monitor_size.x && 1.0 < monitor_size.y {
            Some(egui::pos2(
                monitor_size.x - size.x - PLACE_MARGIN,
                monitor_size.y - size.y - PLACE_MARGIN - TASKBAR_ALLOWANCE,
            ))
        } else {
            None
        }
    })
}

/// 倒计时结束：还原窗口并请求前台
fn activate_window(ctx: &egui::Context, frame: &eframe::Frame) {
    use egui::viewport::ViewportCommand;
    ctx.send_viewport_cmd(ViewportCommand::Minimized(false));
    ctx.send_viewport_cmd(ViewportCommand::Visible(true));
    ctx.send_viewport_cmd(ViewportCommand::Focus);
    if !force_foreground(frame) {
        debug!("native foreground request unavailable");
    }
}

/// Windows：winit 的 Focus 可能被前台锁拦下，直接调用 SetForegroundWindow
#[cfg(windows)]
fn force_foreground(frame: &eframe::Frame) -> bool {
    use raw_window_handle::{HasWindowHandle, RawWindowHandle};
    use std::ffi::c_void;
    use windows_sys::Win32::UI::WindowsAndMessaging::{SW_RESTORE, SetForegroundWindow, ShowWindow};

    let Ok(handle) = frame.window_handle() else {
        return false;
    };
    let hwnd: isize = match handle.as_raw() {
        RawWindowHandle::Win32(w) => w.hwnd.get(),
        _ => return false,
    };
    unsafe {
        ShowWindow(hwnd as *mut c_void, SW_RESTORE);
        SetForegroundWindow(hwnd as *mut c_void) != 0
    }
}

#[cfg(not(windows))]
fn force_foreground(_frame: &eframe::Frame) -> bool {
    false
}

/// 扇区边缘上的点：从正上方顺时针扫过 angle_deg 度
fn sector_points(center: egui::Pos2, radius: f32, angle_deg: f64) -> Vec<egui::Pos2> {
    let sweep = angle_deg.clamp(0.0, 360.0).to_radians() as f32;
    let steps = ((angle_deg.clamp(0.0, 360.0) / 3.0).ceil() as usize).max(1);
    (0..=steps)
        .map(|i| {
            let theta = sweep * i as f32 / steps as f32;
            center + radius * egui::vec2(theta.sin(), -theta.cos())
        })
        .collect()
}

/// 表盘：底盘、剩余扇区、刻度、指针、中心文字
fn paint_dial(ui: &egui::Ui, rect: egui::Rect, view: &DialView, divisions: i64, expired: bool) {
    use dial_theme::{FACE_RGB, SECTOR_RGB, TEXT_WHITE, TICK_RGB};

    let painter = ui.painter();
    let center = rect.center();
    let radius = rect.width().min(rect.height()) * 0.5 - 4.0;

    painter.circle_filled(center, radius, rgb(FACE_RGB));

    if view.angle_deg > 0.0 {
        let mut mesh = egui::Mesh::default();
        mesh.colored_vertex(center, rgb(SECTOR_RGB));
        let rim = sector_points(center, radius * 0.92, view.angle_deg);
        for p in &rim {
            mesh.colored_vertex(*p, rgb(SECTOR_RGB));
        }
        for i in 1..rim.len() as u32 {
            mesh.add_triangle(0, i, i + 1);
        }
        painter.add(egui::Shape::mesh(mesh));
    }

    // 刻度：最多 60 个，每 5 个加粗
    let divisions = divisions.clamp(1, 60);
    for i in 0..divisions {
        let theta = std::f32::consts::TAU * i as f32 / divisions as f32;
        let dir = egui::vec2(theta.sin(), -theta.cos());
        let inner = if i % 5 == 0 { radius * 0.82 } else { radius * 0.9 };
        let width = if i % 5 == 0 { 2.0 } else { 1.0 };
        painter.line_segment(
            [center + dir * inner, center + dir * radius],
            egui::Stroke::new(width, rgb(TICK_RGB)),
        );
    }

    let theta = view.angle_deg.to_radians() as f32;
    let tip = center + radius * 0.92 * egui::vec2(theta.sin(), -theta.cos());
    painter.line_segment([center, tip], egui::Stroke::new(2.0, rgb(TICK_RGB)));
    painter.circle_filled(center, radius * 0.32, rgb(dial_theme::BG_RGB));
    painter.text(
        center,
        egui::Align2::CENTER_CENTER,
        &view.text,
        egui::FontId::monospace(22.0),
        if expired { rgb(SECTOR_RGB) } else { rgb(TEXT_WHITE) },
    );
}

impl eframe::App for DialTimerApp {
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        // 计时线程的 tick 在这里回到 UI 线程
        let mut tick_effects = Vec::new();
        for tick in self.tick_rx.try_iter() {
            tick_effects.extend(self.timer.on_tick(tick.generation));
        }
        self.apply(ctx, frame, tick_effects);

        if !self.placed {
            if let Some(pos) = placement_bottom_right(ctx) {
                ctx.send_viewport_cmd(egui::ViewportCommand::OuterPosition(pos));
                self.placed = true;
            }
        }

        use dial_theme::{BG_RGB, TEXT_DIM};
        let mut effects = Vec::new();
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE.fill(rgb(BG_RGB)))
            .show(ctx, |ui| {
                // 顶栏：拖动区域 + 最小化 + 退出
                ui.horizontal(|ui| {
                    let strip = ui.allocate_response(
                        egui::vec2((ui.available_width() - 48.0).max(0.0), 20.0),
                        egui::Sense::click_and_drag(),
                    );
                    if strip.drag_started() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::StartDrag);
                    }
                    if ui
                        .add(egui::Button::new("—").frame(false))
                        .on_hover_text("最小化")
                        .clicked()
                    {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Minimized(true));
                    }
                    if ui
                        .add(egui::Button::new("×").frame(false))
                        .on_hover_text("退出")
                        .clicked()
                    {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });

                ui.vertical_centered(|ui| {
                    let (rect, response) = ui.allocate_exact_size(
                        egui::vec2(DIAL_SIZE, DIAL_SIZE),
                        egui::Sense::click_and_drag(),
                    );
                    effects.extend(self.dial_input(ui, rect, &response));
                    let expired = self.timer.phase() == CountdownPhase::Expired;
                    paint_dial(ui, rect, &self.view, self.timer.settings().range.span(), expired);
                    if let Some(target) = self.timer.dial_state().map(|d| d.target) {
                        response.on_hover_text(describe_target(target));
                    }

                    ui.add_space(6.0);
                    ui.horizontal(|ui| {
                        let hint = match self.timer.settings().mode {
                            DialMode::Continuous => "分钟",
                            DialMode::Discrete => "数值",
                        };
                        let entry = ui.add(
                            egui::TextEdit::singleline(&mut self.entry_text)
                                .desired_width(48.0)
                                .hint_text(hint),
                        );
                        let key = ui.input(|i| {
                            if entry.has_focus() && i.key_released(egui::Key::ArrowUp) {
                                Some(Key::Up)
                            } else if entry.has_focus() && i.key_released(egui::Key::ArrowDown) {
                                Some(Key::Down)
                            } else if entry.lost_focus() && i.key_pressed(egui::Key::Enter) {
                                Some(Key::Enter)
                            } else {
                                None
                            }
                        });
                        if let Some(key) = key {
                            effects.extend(self.timer.on_key(key, &self.entry_text));
                        }

                        let countdown = self.timer.countdown();
                        if let (Some(finish), Some(state)) = (self.finish_at, countdown.state()) {
                            ui.label(
                                egui::RichText::new(format!("→ {}", finish.format("%H:%M")))
                                    .color(rgb(TEXT_DIM))
                                    .size(13.0),
                            )
                            .on_hover_text(format!(
                                "{} / {}",
                                format_mm_ss(countdown.elapsed_secs()),
                                format_mm_ss(state.total_secs)
                            ));
                        }
                    });
                });
            });

        self.apply(ctx, frame, effects);
    }
}
