//! Anti-detection configuration consumed by `webpeel-fetch`'s stealth and
//! cloaked tiers.
//!
//! This crate carries no network code itself — it describes *what* to spoof
//! and how to pace humanized interaction; the fetch engine is responsible
//! for actually applying it to a browser session.

pub mod behavior;
pub mod config;
pub mod fingerprint;
pub mod user_agent;

pub use behavior::BehaviorConfig;
pub use config::{StealthConfig, StealthPreset};
pub use fingerprint::FingerprintProfile;
pub use user_agent::{RotationStrategy, UserAgentPool};
