//! 后台计时线程：每隔固定间隔发一个 tick，停止时同步等待线程退出

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

/// 计时线程发往 UI 线程的消息
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickEvent {
    pub generation: u64,
}

pub struct Ticker {
    generation: u64,
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    /// 启动计时线程。每次 tick 先发消息，再调用 `wake` 唤醒 UI
    pub fn spawn<W>(
        generation: u64,
        period: Duration,
        events: Sender<TickEvent>,
        wake: W,
    ) -> std::io::Result<Self>
    where
        W: Fn() + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name(format!("dial-ticker-{generation}"))
            .spawn(move || {
                // 按绝对时间点推进，避免累计漂移
                let mut deadline = Instant::now() + period;
                loop {
                    let wait = deadline.saturating_duration_since(Instant::now());
                    match stop_rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {
                            if events.send(TickEvent { generation }).is_err() {
                                break;
                            }
                            wake();
                            deadline += period;
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!(generation, "ticker thread exited");
            })?;

        debug!(generation, period_ms = period.as_millis() as u64, "ticker started");
        Ok(Self {
            generation,
            stop_tx,
            handle: Some(handle),
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// 停止并等待线程退出；返回后不会再有该计时器的 tick 发出
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let _ = self.stop_tx.send(());
        if handle.join().is_err() {
            warn!(generation = self.generation, "ticker thread panicked");
        }
        debug!(generation = self.generation, "ticker stopped");
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
