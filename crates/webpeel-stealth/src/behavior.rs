//! Humanized interaction timing used by the `cloaked` tier (spec.md §4.1:
//! "randomized viewport, human-like mouse movement before action
//! execution").

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorConfig {
    pub min_action_delay_ms: u64,
    pub max_action_delay_ms: u64,
    pub mouse_move_steps: u32,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            min_action_delay_ms: 80,
            max_action_delay_ms: 320,
            mouse_move_steps: 12,
        }
    }
}

impl BehaviorConfig {
    /// A jittered delay to insert before an action, simulating human
    /// reaction time. Bounded by `min`/`max`.
    pub fn jittered_delay(&self) -> Duration {
        let span = self.max_action_delay_ms.saturating_sub(self.min_action_delay_ms);
        let jitter = if span == 0 {
            0
        } else {
            fastrand::u64(0..=span)
        };
        Duration::from_millis(self.min_action_delay_ms + jitter)
    }

    /// A randomized viewport within realistic desktop bounds.
    pub fn randomized_viewport(&self) -> (u32, u32) {
        let width = 1280 + fastrand::u32(0..=640);
        let height = 720 + fastrand::u32(0..=360);
        (width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jittered_delay_within_bounds() {
        let cfg = BehaviorConfig::default();
        for _ in 0..50 {
            let d = cfg.jittered_delay().as_millis() as u64;
            assert!(d >= cfg.min_action_delay_ms && d <= cfg.max_action_delay_ms);
        }
    }

    #[test]
    fn randomized_viewport_within_desktop_bounds() {
        let cfg = BehaviorConfig::default();
        let (w, h) = cfg.randomized_viewport();
        assert!((1280..=1920).contains(&w));
        assert!((720..=1080).contains(&h));
    }
}
