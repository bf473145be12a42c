//! 倒计时状态机：Idle → Running → Expired

/// 一次倒计时的计数（单位：秒），始终满足 0 <= elapsed <= total
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CountdownState {
    pub total_secs: u32,
    pub elapsed_secs: u32,
}

impl CountdownState {
    pub fn new(total_secs: u32) -> Self {
        Self {
            total_secs,
            elapsed_secs: 0,
        }
    }

    pub fn remaining_secs(&self) -> u32 {
        self.total_secs - self.elapsed_secs
    }
}

/// 倒计时阶段
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CountdownPhase {
    Idle,
    Running,
    Expired,
}

/// 提交新时长的结果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Commit {
    /// 是否打断了一个正在运行的倒计时
    pub preempted: bool,
    /// 新倒计时的代号，计时线程发来的 tick 必须带上它
    pub generation: u64,
}

/// 一次 tick 的结果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// 计数前进一秒，仍在运行
    Advanced(CountdownState),
    /// 本次 tick 使倒计时到期
    Expired,
    /// 没有运行中的倒计时，或 tick 来自已被替换的倒计时
    Ignored,
}

/// 最多只有一个活动倒计时
#[derive(Debug)]
pub struct Countdown {
    phase: CountdownPhase,
    state: Option<CountdownState>,
    generation: u64,
}

impl Default for Countdown {
    fn default() -> Self {
        Self {
            phase: CountdownPhase::Idle,
            state: None,
            generation: 0,
        }
    }
}

impl Countdown {
    pub fn phase(&self) -> CountdownPhase {
        self.phase
    }

    pub fn state(&self) -> Option<CountdownState> {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.phase == CountdownPhase::Running
    }

    /// 当前已走秒数；未运行时为 0
    pub fn elapsed_secs(&self) -> u32 {
        self.state.map_or(0, |s| s.elapsed_secs)
    }

    /// 以新时长替换当前倒计时（旧的计数直接丢弃）
    pub fn commit(&mut self, total_secs: u32) -> Commit {
        let preempted = self.is_running();
        self.generation += 1;
        self.state = Some(CountdownState::new(total_secs));
        self.phase = CountdownPhase::Running;
        Commit {
            preempted,
            generation: self.generation,
        }
    }

    /// 每秒调用一次；代号不符的 tick 被忽略
    pub fn tick(&mut self, generation: u64) -> TickOutcome {
        if self.phase != CountdownPhase::Running || generation != self.generation {
            return TickOutcome::Ignored;
        }
        let Some(mut state) = self.state else {
            return TickOutcome::Ignored;
        };

        let next = state.elapsed_secs + 1;
        if next >= state.total_secs {
            self.expire();
            return TickOutcome::Expired;
        }
        state.elapsed_secs = next;
        self.state = Some(state);
        TickOutcome::Advanced(state)
    }

    fn expire(&mut self) {
        self.phase = CountdownPhase::Expired;
        self.state = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_countdown_is_idle() {
        let countdown = Countdown::default();
        assert_eq!(countdown.phase(), CountdownPhase::Idle);
        assert_eq!(countdown.elapsed_secs(), 0);
        assert!(countdown.state().is_none());
    }

    #[test]
    fn five_and_a_half_minutes_expires_after_330_ticks() {
        let mut countdown = Countdown::default();
        let commit = countdown.commit(330);
        assert!(!commit.preempted);

        let mut expirations = 0;
        for i in 1..=330 {
            match countdown.tick(commit.generation) {
                TickOutcome::Advanced(state) => {
                    assert_eq!(state.elapsed_secs, i);
                    assert!(state.elapsed_secs <= state.total_secs);
                }
                TickOutcome::Expired => expirations += 1,
                TickOutcome::Ignored => panic!("tick {i} ignored"),
            }
        }
        assert_eq!(expirations, 1);
        assert_eq!(countdown.phase(), CountdownPhase::Expired);
        assert_eq!(countdown.elapsed_secs(), 0);

        // 到期后不再响应
        assert_eq!(countdown.tick(commit.generation), TickOutcome::Ignored);
    }

    #[test]
    fn zero_duration_expires_on_first_tick() {
        let mut countdown = Countdown::default();
        let commit = countdown.commit(0);
        assert_eq!(countdown.tick(commit.generation), TickOutcome::Expired);
    }

    #[test]
    fn new_commit_replaces_running_countdown() {
        let mut countdown = Countdown::default();
        let first = countdown.commit(60);
        for _ in 0..10 {
            countdown.tick(first.generation);
        }
        assert_eq!(countdown.elapsed_secs(), 10);

        let second = countdown.commit(120);
        assert!(second.preempted);
        assert_ne!(first.generation, second.generation);
        assert_eq!(
            countdown.state(),
            Some(CountdownState {
                total_secs: 120,
                elapsed_secs: 0
            })
        );

        // 旧计时线程迟到的 tick 不能推进新的倒计时
        assert_eq!(countdown.tick(first.generation), TickOutcome::Ignored);
        assert_eq!(countdown.elapsed_secs(), 0);
    }

    #[test]
    fn commit_after_expiry_restarts() {
        let mut countdown = Countdown::default();
        let first = countdown.commit(1);
        assert_eq!(countdown.tick(first.generation), TickOutcome::Expired);

        let second = countdown.commit(5);
        assert!(!second.preempted);
        assert_eq!(countdown.phase(), CountdownPhase::Running);
    }
}
