//! Fetch Strategy Engine (spec.md §4.1): four ordered tiers — simple HTTP,
//! headless browser, stealth browser, cloaked — with post-fetch challenge
//! classification and one level of escalation.

pub mod actions;
pub mod browser;
pub mod errors;
pub mod simple;
pub mod strategy;

pub use errors::FetchError;
pub use strategy::FetchEngine;
