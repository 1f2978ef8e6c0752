//! Poll cadence and the displayed progress value

use std::time::Duration;

/// How the displayed percentage follows the reported one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressMode {
    /// Jump straight to the reported value
    Snap,
    /// Ease toward the reported value a fraction at a time
    #[default]
    Smooth,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_poll_errors: u32,
    pub max_duration: Duration,
    pub mode: ProgressMode,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_poll_errors: 3,
            max_duration: Duration::from_secs(30 * 60),
            mode: ProgressMode::Smooth,
        }
    }
}

const SMOOTHING_FACTOR: f32 = 0.35;
const MIN_STEP: f32 = 1.0;

/// Displayed progress. The target never moves backwards, and the display
/// reaches 100 only once the server has reported 100.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSmoother {
    mode: ProgressMode,
    target: f32,
    displayed: f32,
}

impl ProgressSmoother {
    pub fn new(mode: ProgressMode) -> Self {
        Self {
            mode,
            target: 0.0,
            displayed: 0.0,
        }
    }

    pub fn set_target(&mut self, percent: f32) {
        let percent = percent.clamp(0.0, 100.0);
        if percent > self.target {
            self.target = percent;
        }
        if self.mode == ProgressMode::Snap || self.target >= 100.0 {
            self.displayed = self.target;
        }
    }

    /// Advance the display one animation step and return it
    pub fn tick(&mut self) -> f32 {
        if self.displayed < self.target {
            let step = ((self.target - self.displayed) * SMOOTHING_FACTOR).max(MIN_STEP);
            self.displayed = (self.displayed + step).min(self.target);
        }
        self.displayed
    }

    pub fn displayed(&self) -> f32 {
        self.displayed
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn reset(&mut self) {
        self.target = 0.0;
        self.displayed = 0.0;
    }
}
