//! User-agent selection for the stealth tier.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RotationStrategy {
    /// Always return the same user agent.
    Sticky,
    /// Walk the pool in order, wrapping around.
    #[default]
    Sequential,
    /// Pick uniformly at random each call.
    Random,
}

pub struct UserAgentPool {
    pool: Vec<String>,
    strategy: RotationStrategy,
    cursor: std::sync::atomic::AtomicUsize,
}

const DEFAULT_POOL: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
];

impl Default for UserAgentPool {
    fn default() -> Self {
        Self::new(
            DEFAULT_POOL.iter().map(|s| s.to_string()).collect(),
            RotationStrategy::Sequential,
        )
    }
}

impl UserAgentPool {
    pub fn new(pool: Vec<String>, strategy: RotationStrategy) -> Self {
        Self {
            pool,
            strategy,
            cursor: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn next(&self) -> &str {
        if self.pool.is_empty() {
            return DEFAULT_POOL[0];
        }
        match self.strategy {
            RotationStrategy::Sticky => &self.pool[0],
            RotationStrategy::Sequential => {
                let idx = self
                    .cursor
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
                    % self.pool.len();
                &self.pool[idx]
            }
            RotationStrategy::Random => self
                .pool
                .choose(&mut rand::thread_rng())
                .map(|s| s.as_str())
                .unwrap_or(DEFAULT_POOL[0]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_strategy_cycles() {
        let pool = UserAgentPool::new(
            vec!["a".to_string(), "b".to_string()],
            RotationStrategy::Sequential,
        );
        assert_eq!(pool.next(), "a");
        assert_eq!(pool.next(), "b");
        assert_eq!(pool.next(), "a");
    }

    #[test]
    fn sticky_strategy_always_same() {
        let pool = UserAgentPool::new(
            vec!["a".to_string(), "b".to_string()],
            RotationStrategy::Sticky,
        );
        assert_eq!(pool.next(), "a");
        assert_eq!(pool.next(), "a");
    }
}
