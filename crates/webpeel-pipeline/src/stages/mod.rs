//! The eight pipeline stages (spec.md §4.2), each operating on a single
//! `PipelineContext` passed by `&mut` — no nested mutable context objects
//! (spec.md §9 REDESIGN FLAG).

pub mod build_result;
pub mod detect_content_type;
pub mod fetch_content;
pub mod finalize;
pub mod normalize_options;
pub mod parse_content;
pub mod post_process;
pub mod special_url;
