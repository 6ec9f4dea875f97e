//! Pomodoro-style study countdown.
//!
//! The timer does not own a clock. The caller drives it by calling
//! [`StudyTimer::tick`] once per elapsed second while it is running.

use serde::Serialize;

pub const DEFAULT_MINUTES: u32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyTimer {
    state: TimerState,
    duration_secs: u32,
    remaining_secs: u32,
}

impl Default for StudyTimer {
    fn default() -> Self {
        Self::with_minutes(DEFAULT_MINUTES)
    }
}

impl StudyTimer {
    pub fn with_minutes(minutes: u32) -> Self {
        Self {
            state: TimerState::Idle,
            duration_secs: minutes.saturating_mul(60),
            remaining_secs: minutes.saturating_mul(60),
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn start(&mut self) {
        match self.state {
            TimerState::Idle | TimerState::Paused => self.state = TimerState::Running,
            TimerState::Expired => {
                self.remaining_secs = self.duration_secs;
                self.state = TimerState::Running;
            }
            TimerState::Running => {}
        }
    }

    pub fn pause(&mut self) {
        if self.state == TimerState::Running {
            self.state = TimerState::Paused;
        }
    }

    pub fn reset(&mut self) {
        self.state = TimerState::Idle;
        self.remaining_secs = self.duration_secs;
    }

    /// Switches to a preset length. Always leaves the timer idle.
    pub fn set_minutes(&mut self, minutes: u32) {
        self.duration_secs = minutes.saturating_mul(60);
        self.reset();
    }

    /// Advances one second. Returns `true` exactly once, on the tick that
    /// runs the countdown out.
    pub fn tick(&mut self) -> bool {
        if self.state != TimerState::Running {
            return false;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.state = TimerState::Expired;
            return true;
        }
        false
    }

    /// Remaining time as `MM:SS`.
    pub fn display(&self) -> String {
        format!(
            "{:02}:{:02}",
            self.remaining_secs / 60,
            self.remaining_secs % 60
        )
    }
}
