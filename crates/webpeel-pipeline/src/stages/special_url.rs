//! Stage 2 — HandleSpecialUrl (spec.md §4.2, §D of SPEC_FULL.md): YouTube
//! transcript short-circuit. Failure falls through to the normal pipeline.

use reqwest::Client;
use tracing::{debug, instrument};
use webpeel_extraction::youtube;
use webpeel_types::{FetchMethod, FetchResult, PipelineContext};

/// Attempt the YouTube transcript specialization. Returns `true` if it
/// short-circuited the pipeline (context is populated and ready for
/// PostProcess onward); `false` means the caller should continue with the
/// normal fetch path.
#[instrument(skip(client, ctx), fields(url = %ctx.url))]
pub async fn try_handle(client: &Client, ctx: &mut PipelineContext) -> bool {
    let Some(video_id) = youtube::video_id(&ctx.url) else {
        return false;
    };

    match youtube::fetch_transcript(client, &video_id, "en").await {
        Ok(transcript) => {
            ctx.content = transcript.content;
            ctx.title = transcript.title;
            ctx.quality = youtube::QUALITY;
            ctx.domain_api_handled = true;
            ctx.fetch_result = Some(FetchResult {
                html: String::new(),
                raw: None,
                final_url: ctx.url.clone(),
                status: 200,
                content_type: "text/markdown".to_string(),
                method: FetchMethod::DomainApi,
                screenshot: None,
                headers: Default::default(),
                challenge_detected: false,
            });
            ctx.mark("handle_special_url");
            true
        }
        Err(e) => {
            debug!(error = %e, "youtube transcript specialization failed, falling through");
            false
        }
    }
}
