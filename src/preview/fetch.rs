//! Link preview fetching and extraction
//!
//! Fetches a page with a hard timeout and a byte cap, then pulls Open
//! Graph metadata out of the HTML. Every failure degrades to an empty
//! preview; the caller never sees an error for an unreachable link.

use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

use crate::types::{HearthError, Result};

/// Extracted preview metadata. All fields optional; an empty preview is
/// the "no preview available" answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkPreview {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl LinkPreview {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.image.is_none()
            && self.url.is_none()
            && self.domain.is_none()
    }
}

/// Fetcher with its own bounded HTTP client
pub struct PreviewFetcher {
    http: reqwest::Client,
    max_bytes: usize,
}

impl PreviewFetcher {
    /// Create a fetcher with a request timeout and response byte cap
    pub fn new(timeout: Duration, max_bytes: usize) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(3))
            .build()
            .expect("Failed to create HTTP client");
        Self { http, max_bytes }
    }

    /// Fetch and extract a preview. Never fails: timeouts, oversized
    /// bodies, and non-HTML responses all degrade to an empty preview.
    pub async fn fetch(&self, url: &str) -> LinkPreview {
        match self.fetch_inner(url).await {
            Ok(preview) => preview,
            Err(e) => {
                debug!(url = %url, error = %e, "Link preview unavailable");
                LinkPreview::default()
            }
        }
    }

    async fn fetch_inner(&self, url: &str) -> Result<LinkPreview> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| HearthError::Http(format!("Invalid URL: {}", e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(HearthError::Http("Unsupported URL scheme".into()));
        }

        let mut resp = self.http.get(parsed.clone()).send().await?;
        if !resp.status().is_success() {
            return Err(HearthError::Http(format!(
                "Upstream returned {}",
                resp.status()
            )));
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !content_type.contains("text/html") {
            return Err(HearthError::Http("Not an HTML page".into()));
        }

        // Stream the body up to the cap; anything past it is ignored,
        // not an error, since metadata lives in the head.
        let mut body = Vec::with_capacity(8192);
        while let Some(chunk) = resp.chunk().await? {
            let room = self.max_bytes - body.len();
            if chunk.len() >= room {
                body.extend_from_slice(&chunk[..room]);
                break;
            }
            body.extend_from_slice(&chunk);
        }

        let html = String::from_utf8_lossy(&body);
        let mut preview = extract_preview(&html);
        preview.url = Some(parsed.to_string());
        preview.domain = parsed.host_str().map(str::to_string);
        Ok(preview)
    }
}

// =============================================================================
// HTML extraction
// =============================================================================

fn meta_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<meta\s+[^>]*>").expect("valid meta tag regex"))
}

fn attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([\w:-]+)\s*=\s*["']([^"']*)["']"#).expect("valid attribute regex")
    })
}

fn title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<title[^>]*>([^<]*)</title>").expect("valid title regex"))
}

/// Pull Open Graph / standard metadata out of an HTML document
pub fn extract_preview(html: &str) -> LinkPreview {
    let mut meta: HashMap<String, String> = HashMap::new();

    for tag in meta_tag_re().find_iter(html) {
        let mut key = None;
        let mut content = None;
        for attr in attr_re().captures_iter(tag.as_str()) {
            let name = attr[1].to_ascii_lowercase();
            let value = attr[2].to_string();
            match name.as_str() {
                "property" | "name" => key = Some(value),
                "content" => content = Some(value),
                _ => {}
            }
        }
        if let (Some(key), Some(content)) = (key, content) {
            meta.entry(key).or_insert(content);
        }
    }

    let pick = |keys: &[&str]| -> Option<String> {
        keys.iter()
            .find_map(|k| meta.get(*k))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let title = pick(&["og:title", "twitter:title"]).or_else(|| {
        title_re()
            .captures(html)
            .map(|c| c[1].trim().to_string())
            .filter(|t| !t.is_empty())
    });

    LinkPreview {
        title,
        description: pick(&["og:description", "twitter:description", "description"]),
        image: pick(&["og:image", "twitter:image"]),
        url: None,
        domain: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!doctype html>
<html><head>
<title>Fallback Title</title>
<meta property="og:title" content="Family Reunion Photos" />
<meta content="Shots from the lake weekend" property="og:description"/>
<meta property="og:image" content="https://cdn.example/photo.jpg">
<meta name="description" content="ignored, og wins">
</head><body>Hello</body></html>"#;

    #[test]
    fn open_graph_tags_win() {
        let preview = extract_preview(PAGE);
        assert_eq!(preview.title.as_deref(), Some("Family Reunion Photos"));
        assert_eq!(
            preview.description.as_deref(),
            Some("Shots from the lake weekend")
        );
        assert_eq!(preview.image.as_deref(), Some("https://cdn.example/photo.jpg"));
    }

    #[test]
    fn attribute_order_does_not_matter() {
        let html = r#"<meta content="Reversed" property="og:title">"#;
        assert_eq!(extract_preview(html).title.as_deref(), Some("Reversed"));
    }

    #[test]
    fn title_tag_is_the_fallback() {
        let html = "<html><head><title> Plain Page </title></head></html>";
        let preview = extract_preview(html);
        assert_eq!(preview.title.as_deref(), Some("Plain Page"));
        assert!(preview.description.is_none());
    }

    #[test]
    fn pageless_html_yields_empty_preview() {
        let preview = extract_preview("<html><body>nothing here</body></html>");
        assert!(preview.is_empty());
    }

    #[tokio::test]
    async fn bad_scheme_degrades_silently() {
        let fetcher = PreviewFetcher::new(Duration::from_secs(5), 1024);
        let preview = fetcher.fetch("ftp://example.com/file").await;
        assert!(preview.is_empty());
    }

    #[tokio::test]
    async fn unparseable_url_degrades_silently() {
        let fetcher = PreviewFetcher::new(Duration::from_secs(5), 1024);
        let preview = fetcher.fetch("not a url at all").await;
        assert!(preview.is_empty());
    }
}
