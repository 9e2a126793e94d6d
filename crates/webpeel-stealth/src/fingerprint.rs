//! Fingerprint spoofing profile applied by the stealth/cloaked fetch tiers
//! before navigation (spec.md §4.1: "spoofs automation-related navigator
//! properties, plugin lists, WebGL vendor strings, locale, timezone").

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintProfile {
    pub disable_webdriver_flag: bool,
    pub spoof_plugins: bool,
    pub webgl_vendor: String,
    pub webgl_renderer: String,
    pub locale: String,
    pub timezone: String,
    pub hardware_concurrency: u8,
    pub device_memory_gb: u8,
}

impl Default for FingerprintProfile {
    fn default() -> Self {
        Self {
            disable_webdriver_flag: true,
            spoof_plugins: true,
            webgl_vendor: "Intel Inc.".to_string(),
            webgl_renderer: "Intel Iris OpenGL Engine".to_string(),
            locale: "en-US".to_string(),
            timezone: "America/New_York".to_string(),
            hardware_concurrency: 8,
            device_memory_gb: 8,
        }
    }
}

impl FingerprintProfile {
    /// The JS snippet a headless driver would evaluate before the page's
    /// own scripts run, to patch `navigator.*` before detection code reads
    /// it. Kept here (rather than in `webpeel-fetch`) so the profile and the
    /// patch that implements it stay in lockstep.
    pub fn init_script(&self) -> String {
        format!(
            r#"
Object.defineProperty(navigator, 'webdriver', {{ get: () => {webdriver} }});
Object.defineProperty(navigator, 'languages', {{ get: () => ['{locale}'] }});
Object.defineProperty(navigator, 'hardwareConcurrency', {{ get: () => {cores} }});
Object.defineProperty(navigator, 'deviceMemory', {{ get: () => {mem} }});
Object.defineProperty(navigator, 'plugins', {{ get: () => {plugins} }});
"#,
            webdriver = !self.disable_webdriver_flag,
            locale = self.locale,
            cores = self.hardware_concurrency,
            mem = self.device_memory_gb,
            plugins = if self.spoof_plugins {
                "[1,2,3,4,5]"
            } else {
                "[]"
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_script_patches_webdriver_flag() {
        let profile = FingerprintProfile::default();
        let script = profile.init_script();
        assert!(script.contains("=> false"));
    }
}
