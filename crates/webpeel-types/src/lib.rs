//! Shared data model for the WebPeel extraction core.
//!
//! This crate holds the types every other `webpeel-*` crate depends on, so
//! that the pipeline, fetch engine, search providers, and HTML processors
//! can all speak the same vocabulary without circular crate dependencies.

pub mod context;
pub mod errors;
pub mod fetch;
pub mod options;
pub mod registry;
pub mod result;
pub mod search;

pub use context::PipelineContext;
pub use errors::{ErrorKind, PeelError};
pub use fetch::{
    FetchAction, FetchActionType, FetchMethod, FetchRequest, FetchResult, WaitUntil,
};
pub use options::{AgentModeOptions, ExtractSchema, Format, LlmOptions, PeelOptions};
pub use registry::{ChangeTrackingStore, DomainExtractor, Fallback};
pub use result::{
    BrandingProfile, ChangeTrackingResult, PeelResult, QuickAnswer, ReadabilityResult, Timing,
};
pub use search::{ChallengeType, ChallengeVerdict, SearchResult};
