//! Top-level stealth configuration bundling fingerprint, user-agent, and
//! behavior settings, with preset levels matching the tiers in spec.md
//! §4.1 (stealth vs cloaked).

use serde::{Deserialize, Serialize};

use crate::behavior::BehaviorConfig;
use crate::fingerprint::FingerprintProfile;
use crate::user_agent::{RotationStrategy, UserAgentPool};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StealthPreset {
    #[default]
    Stealth,
    Cloaked,
}

pub struct StealthConfig {
    pub preset: StealthPreset,
    pub fingerprint: FingerprintProfile,
    pub behavior: BehaviorConfig,
    pub user_agents: UserAgentPool,
    pub residential_proxy: Option<String>,
}

impl Default for StealthConfig {
    fn default() -> Self {
        Self::from_preset(StealthPreset::Stealth, Vec::new())
    }
}

impl StealthConfig {
    pub fn from_preset(preset: StealthPreset, proxy_pool: Vec<String>) -> Self {
        let strategy = match preset {
            StealthPreset::Stealth => RotationStrategy::Sequential,
            StealthPreset::Cloaked => RotationStrategy::Random,
        };
        let residential_proxy = match preset {
            StealthPreset::Cloaked => proxy_pool.first().cloned(),
            StealthPreset::Stealth => None,
        };
        Self {
            preset,
            fingerprint: FingerprintProfile::default(),
            behavior: BehaviorConfig::default(),
            user_agents: UserAgentPool::new(Vec::new(), strategy),
            residential_proxy,
        }
    }

    pub fn is_cloaked(&self) -> bool {
        matches!(self.preset, StealthPreset::Cloaked)
    }
}
