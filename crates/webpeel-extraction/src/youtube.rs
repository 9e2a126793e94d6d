//! YouTube transcript specialization (spec.md §D): a Stage 2 short-circuit
//! that pulls the video's caption track from YouTube's internal timedtext
//! endpoint instead of rendering the page, falling through to the normal
//! fetch path on any failure.

use anyhow::{bail, Context};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

pub const METHOD: &str = "domain-api";
pub const QUALITY: f64 = 0.95;

#[derive(Debug, Deserialize)]
struct TimedTextResponse {
    events: Option<Vec<TimedTextEvent>>,
}

#[derive(Debug, Deserialize)]
struct TimedTextEvent {
    #[serde(rename = "tStartMs")]
    t_start_ms: Option<i64>,
    segs: Option<Vec<TimedTextSeg>>,
}

#[derive(Debug, Deserialize)]
struct TimedTextSeg {
    utf8: Option<String>,
}

pub struct YoutubeTranscript {
    pub title: Option<String>,
    pub content: String,
}

/// Extract an `youtube.com`/`youtu.be` video id from a URL, if present.
pub fn video_id(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    if host.ends_with("youtu.be") {
        return url
            .path_segments()
            .and_then(|mut segs| segs.next())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());
    }
    if host.ends_with("youtube.com") {
        if url.path() == "/watch" {
            return url
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.to_string());
        }
        if let Some(rest) = url.path().strip_prefix("/shorts/") {
            return Some(rest.trim_end_matches('/').to_string());
        }
        if let Some(rest) = url.path().strip_prefix("/embed/") {
            return Some(rest.trim_end_matches('/').to_string());
        }
    }
    None
}

fn format_timestamp(ms: i64) -> String {
    let total_seconds = ms / 1000;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{minutes:02}:{seconds:02}")
}

/// Fetch the caption track for `video_id` and synthesize a markdown
/// transcript document (spec.md §D). Returns `Err` on any failure so the
/// caller can fall through to the normal fetch path.
pub async fn fetch_transcript(
    client: &Client,
    video_id: &str,
    lang: &str,
) -> anyhow::Result<YoutubeTranscript> {
    let endpoint = format!(
        "https://www.youtube.com/api/timedtext?v={video_id}&lang={lang}&fmt=json3"
    );
    let resp = client
        .get(&endpoint)
        .send()
        .await
        .context("youtube timedtext request failed")?;
    if !resp.status().is_success() {
        bail!("youtube timedtext endpoint returned {}", resp.status());
    }
    let body = resp.text().await.context("youtube timedtext body read failed")?;
    if body.trim().is_empty() {
        bail!("youtube video has no captions for lang={lang}");
    }
    let parsed: TimedTextResponse =
        serde_json::from_str(&body).context("youtube timedtext response was not valid json3")?;
    let events = parsed.events.unwrap_or_default();
    if events.is_empty() {
        bail!("youtube timedtext response had no caption events");
    }

    let mut lines = Vec::new();
    for event in &events {
        let Some(segs) = &event.segs else { continue };
        let text: String = segs
            .iter()
            .filter_map(|s| s.utf8.as_deref())
            .collect::<Vec<_>>()
            .join("");
        let text = text.trim();
        if text.is_empty() || text == "\n" {
            continue;
        }
        let timestamp = format_timestamp(event.t_start_ms.unwrap_or(0));
        lines.push(format!("`{timestamp}` {}", text.replace('\n', " ")));
    }
    if lines.is_empty() {
        bail!("youtube timedtext response had no non-empty caption text");
    }

    let content = format!("## Transcript\n\n{}\n", lines.join("\n"));
    Ok(YoutubeTranscript {
        title: None,
        content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_id_from_watch_url() {
        let url = Url::parse("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=30s").unwrap();
        assert_eq!(video_id(&url).as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn extracts_id_from_short_url() {
        let url = Url::parse("https://youtu.be/dQw4w9WgXcQ").unwrap();
        assert_eq!(video_id(&url).as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn extracts_id_from_shorts_path() {
        let url = Url::parse("https://www.youtube.com/shorts/dQw4w9WgXcQ").unwrap();
        assert_eq!(video_id(&url).as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn non_youtube_host_returns_none() {
        let url = Url::parse("https://example.com/watch?v=abc").unwrap();
        assert_eq!(video_id(&url), None);
    }

    #[test]
    fn formats_timestamps_as_mm_ss() {
        assert_eq!(format_timestamp(65_000), "01:05");
        assert_eq!(format_timestamp(0), "00:00");
    }
}
