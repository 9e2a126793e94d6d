//! Tier 1: plain HTTP GET with a realistic browser identity (spec.md §4.1
//! "Simple HTTP").

use std::collections::HashMap;
use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::Client;
use tracing::{debug, instrument};
use webpeel_types::{FetchMethod, FetchRequest, FetchResult};

use crate::errors::FetchError;

const MAX_REDIRECTS: usize = 10;

fn build_client(timeout: Duration, user_agent: &str) -> Result<Client, FetchError> {
    Client::builder()
        .user_agent(user_agent)
        .gzip(true)
        .brotli(true)
        .timeout(timeout)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .build()
        .map_err(|e| FetchError::Network {
            url: String::new(),
            message: e.to_string(),
            source: Some(Box::new(e)),
        })
}

/// Perform the simple-HTTP tier fetch: GET with Accept/Accept-Language
/// headers and a same-origin Referer, honoring `req.timeout_ms`.
#[instrument(skip(req), fields(url = %req.url))]
pub async fn fetch(req: &FetchRequest) -> Result<FetchResult, FetchError> {
    let user_agent = req
        .user_agent
        .clone()
        .unwrap_or_else(|| crate::strategy::DEFAULT_USER_AGENT.to_string());
    let client = build_client(Duration::from_millis(req.timeout_ms), &user_agent)?;

    let mut builder = client
        .get(req.url.clone())
        .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
        .header("Accept-Language", "en-US,en;q=0.9")
        .header("Referer", origin_root(&req.url));

    for (k, v) in &req.headers {
        builder = builder.header(k.as_str(), v.as_str());
    }
    if !req.cookies.is_empty() {
        let cookie_header = req
            .cookies
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ");
        builder = builder.header("Cookie", cookie_header);
    }

    let started = std::time::Instant::now();
    let response = builder.send().await.map_err(|e| classify_send_error(req, e, started))?;

    let status = response.status().as_u16();
    let final_url = response.url().clone();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let mut headers = HashMap::new();
    for (name, value) in response.headers() {
        if let Ok(v) = value.to_str() {
            headers.insert(name.as_str().to_lowercase(), v.to_string());
        }
    }

    let bytes = response.bytes().await.map_err(|e| FetchError::Network {
        url: req.url.to_string(),
        message: e.to_string(),
        source: Some(Box::new(e)),
    })?;

    if !(200..400).contains(&status) && status != 304 {
        debug!(status, "non-success status on simple fetch");
    }

    let is_binary = content_type.contains("pdf")
        || content_type.contains("msword")
        || content_type.contains("officedocument");

    let html = if is_binary {
        String::new()
    } else {
        String::from_utf8_lossy(&bytes).to_string()
    };
    let raw = if is_binary { Some(bytes.to_vec()) } else { None };

    Ok(FetchResult {
        html,
        raw,
        final_url: url::Url::parse(final_url.as_str()).unwrap_or_else(|_| req.url.clone()),
        status,
        content_type,
        method: FetchMethod::Simple,
        screenshot: None,
        headers,
        challenge_detected: false,
    })
}

fn origin_root(url: &url::Url) -> String {
    format!("{}://{}/", url.scheme(), url.host_str().unwrap_or(""))
}

fn classify_send_error(req: &FetchRequest, err: reqwest::Error, started: std::time::Instant) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: req.url.to_string(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    } else {
        FetchError::Network {
            url: req.url.to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;
    use webpeel_types::WaitUntil;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn base_request(url: url::Url) -> FetchRequest {
        FetchRequest {
            url,
            render: false,
            stealth: false,
            wait_ms: None,
            user_agent: None,
            headers: Map::new(),
            cookies: Map::new(),
            actions: Vec::new(),
            timeout_ms: 5_000,
            proxies: Vec::new(),
            viewport: None,
            wait_until: WaitUntil::DomContentLoaded,
            wait_selector: None,
            block_resources: false,
            cloaked: false,
            screenshot: false,
            full_page: false,
        }
    }

    #[tokio::test]
    async fn fetches_successful_html() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let url = url::Url::parse(&server.uri()).unwrap();
        let result = fetch(&base_request(url)).await.unwrap();
        assert_eq!(result.status, 200);
        assert!(result.html.contains("ok"));
        assert_eq!(result.method, FetchMethod::Simple);
    }

    #[tokio::test]
    async fn surfaces_bad_status_as_success_with_status_field() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let url = url::Url::parse(&server.uri()).unwrap();
        let result = fetch(&base_request(url)).await.unwrap();
        assert_eq!(result.status, 404);
    }
}
