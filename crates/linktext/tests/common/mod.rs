//! Shared fakes for orchestrator tests

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use linktext::{
    EnhancedFetch, EnhancedPage, HttpFetch, HttpResponse, LinkError, ProgressEvent, ProgressSink,
    RequestOptions, CacheMode,
};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use std::collections::HashMap;
use std::sync::Mutex;

pub const VIDEO_ID: &str = "dQw4w9WgXcQ";
pub const WATCH_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
pub const TIMED_TEXT_URL: &str =
    "https://www.youtube.com/api/timedtext?v=dQw4w9WgXcQ&lang=en&fmt=json3";

/// Transport serving canned responses by exact URL; everything else is a 404
#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<HashMap<String, (u16, String, String)>>,
    requests: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, url: &str, status: u16, content_type: &str, body: &str) -> Self {
        self.set(url, status, content_type, body);
        self
    }

    pub fn set(&self, url: &str, status: u16, content_type: &str, body: &str) {
        self.routes.lock().unwrap().insert(
            url.to_string(),
            (status, content_type.to_string(), body.to_string()),
        );
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpFetch for FakeTransport {
    async fn fetch(&self, url: &str, _options: &RequestOptions) -> Result<HttpResponse, LinkError> {
        self.requests.lock().unwrap().push(url.to_string());
        let route = self.routes.lock().unwrap().get(url).cloned();
        let (status, content_type, body) =
            route.unwrap_or((404, "text/plain".to_string(), "not found".to_string()));

        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&content_type) {
            headers.insert(CONTENT_TYPE, value);
        }
        Ok(HttpResponse {
            status,
            headers,
            body: Bytes::from(body),
            truncated: false,
        })
    }
}

/// Enhanced fetch returning a fixed page
pub struct FakeEnhanced {
    pub page: Option<EnhancedPage>,
    pub calls: Mutex<Vec<(String, CacheMode)>>,
}

impl FakeEnhanced {
    pub fn new(page: Option<EnhancedPage>) -> Self {
        Self {
            page,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl EnhancedFetch for FakeEnhanced {
    async fn scrape(
        &self,
        url: &str,
        cache_mode: CacheMode,
    ) -> Result<Option<EnhancedPage>, LinkError> {
        self.calls.lock().unwrap().push((url.to_string(), cache_mode));
        Ok(self.page.clone())
    }
}

/// Progress sink recording every event
#[derive(Default)]
pub struct RecordingProgress {
    pub events: Mutex<Vec<ProgressEvent>>,
}

impl ProgressSink for RecordingProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// YouTube watch page embedding a player response with one English track
pub fn watch_page(title: &str, description: &str) -> String {
    format!(
        r#"<!DOCTYPE html><html><head><title>{title} - YouTube</title>
<meta property="og:title" content="{title}">
<meta property="og:site_name" content="YouTube"></head>
<body><script>var ytInitialPlayerResponse = {{"videoDetails":{{"videoId":"{VIDEO_ID}","title":"{title}","lengthSeconds":"212","shortDescription":"{description}"}},"captions":{{"playerCaptionsTracklistRenderer":{{"captionTracks":[{{"baseUrl":"https://www.youtube.com/api/timedtext?v={VIDEO_ID}&lang=en","languageCode":"en"}}]}}}}}};</script></body></html>"#
    )
}

/// `json3` timed text with two cues
pub fn timed_text(first: &str, second: &str) -> String {
    format!(
        r#"{{"events":[{{"tStartMs":0,"dDurationMs":4000,"segs":[{{"utf8":"{first}"}}]}},{{"tStartMs":65000,"dDurationMs":3000,"segs":[{{"utf8":"{second}"}}]}}]}}"#
    )
}

/// Transport serving a captioned YouTube video
pub fn youtube_transport(first: &str, second: &str) -> FakeTransport {
    FakeTransport::new()
        .route(WATCH_URL, 200, "text/html", &watch_page("Never Gonna", "A song"))
        .route(TIMED_TEXT_URL, 200, "application/json", &timed_text(first, second))
}
