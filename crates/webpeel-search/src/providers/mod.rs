//! Concrete [`crate::provider::SearchProvider`] implementations, one module
//! per engine in the fallback chain (spec.md §4.4).

pub mod brave;
pub mod duckduckgo;
pub mod firefox_ddg;
pub mod google;
pub mod google_stealth;
pub mod stealth_engines;

pub use brave::BraveProvider;
pub use duckduckgo::{DuckDuckGoHtmlProvider, DuckDuckGoLiteProvider};
pub use firefox_ddg::FirefoxDdgProvider;
pub use google::GoogleProvider;
pub use google_stealth::GoogleStealthProvider;
pub use stealth_engines::{BingStealthProvider, DdgStealthProvider, EcosiaStealthProvider};
