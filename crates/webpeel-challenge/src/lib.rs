//! Weighted-signal bot-protection and empty-shell classifier (spec.md §4.3).

pub mod detector;
pub mod signals;

pub use detector::{detect, visible_text};
