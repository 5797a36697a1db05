//! Link and form extraction from rendered pages
//!
//! Produces the follow-up requests a finished page discovered:
//! - `<a href>` anchors, resolved to absolute URLs
//! - GET probes synthesized from `<form>` elements, one placeholder value
//!   per named input

use crate::job::{JobIdentity, PageRequest};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracted information from a rendered page
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    /// The page title (from the `<title>` tag)
    pub title: Option<String>,

    /// Follow-up requests, deduplicated by identity within the page
    pub requests: Vec<PageRequest>,
}

/// Parses a rendered body and extracts the title and follow-up requests
///
/// Anchor rules:
/// - relative hrefs resolve against `base_url`
/// - `javascript:`, `mailto:`, `tel:` and `data:` schemes are skipped
/// - fragment-only hrefs and `download` links are skipped
///
/// Form rules: every form contributes one GET probe built from its resolved
/// `action` with a placeholder value for each named, non-submit `<input>`.
///
/// Requests are deduplicated within the page by [`JobIdentity`], anchors
/// before forms.
pub fn extract_requests(html: &str, base_url: &Url) -> ExtractedPage {
    let document = Html::parse_document(html);

    let title = extract_title(&document);

    let mut seen: HashSet<JobIdentity> = HashSet::new();
    let mut requests = Vec::new();

    for url in extract_anchor_urls(&document, base_url) {
        if seen.insert(JobIdentity::from_url(&url)) {
            requests.push(PageRequest::new(url.to_string()));
        }
    }

    for url in extract_form_probes(&document, base_url) {
        if seen.insert(JobIdentity::from_url(&url)) {
            requests.push(PageRequest::form(url.to_string()));
        }
    }

    ExtractedPage { title, requests }
}

/// Extracts the page title from the document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Collects resolved anchor targets
fn extract_anchor_urls(document: &Html, base_url: &Url) -> Vec<Url> {
    let mut urls = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                if let Some(url) = resolve_link(href, base_url) {
                    urls.push(url);
                }
            }
        }
    }

    urls
}

/// Synthesizes one GET probe per form
fn extract_form_probes(document: &Html, base_url: &Url) -> Vec<Url> {
    let mut urls = Vec::new();

    let Ok(form_selector) = Selector::parse("form") else {
        return urls;
    };
    let Ok(input_selector) = Selector::parse("input") else {
        return urls;
    };

    for form in document.select(&form_selector) {
        let action = form.value().attr("action").unwrap_or("").trim();

        let Ok(mut url) = base_url.join(action) else {
            continue;
        };

        if url.scheme() != "http" && url.scheme() != "https" {
            continue;
        }

        {
            let mut pairs = url.query_pairs_mut();
            pairs.clear();
            for input in form.select(&input_selector) {
                let input = input.value();
                if input.attr("type") == Some("submit") {
                    continue;
                }
                let Some(name) = input.attr("name").filter(|n| !n.is_empty()) else {
                    continue;
                };
                // Placeholder probe value
                pairs.append_pair(name, "a");
            }
        }

        if url.query() == Some("") {
            url.set_query(None);
        }

        urls.push(url);
    }

    urls
}

/// Resolves a link href to an absolute URL and validates it
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    // Same-page anchors
    if href.starts_with('#') {
        return None;
    }

    match base_url.join(href) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Some(url),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::ResourceKind;

    fn base_url() -> Url {
        Url::parse("https://example.com/page").unwrap()
    }

    #[test]
    fn test_extract_title() {
        let html = r#"<html><head><title>  Test Page </title></head><body></body></html>"#;
        let page = extract_requests(html, &base_url());
        assert_eq!(page.title, Some("Test Page".to_string()));
    }

    #[test]
    fn test_no_title() {
        let html = r#"<html><head></head><body></body></html>"#;
        let page = extract_requests(html, &base_url());
        assert_eq!(page.title, None);
    }

    #[test]
    fn test_extract_absolute_and_relative_links() {
        let html = r#"
            <html><body>
                <a href="https://other.com/page">Absolute</a>
                <a href="/local">Rooted</a>
                <a href="sibling">Relative</a>
            </body></html>
        "#;
        let page = extract_requests(html, &base_url());
        let urls: Vec<&str> = page.requests.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://other.com/page",
                "https://example.com/local",
                "https://example.com/sibling"
            ]
        );
    }

    #[test]
    fn test_skip_special_schemes_and_fragments() {
        let html = r##"
            <html><body>
                <a href="javascript:void(0)">JS</a>
                <a href="mailto:test@example.com">Mail</a>
                <a href="tel:+1234567890">Tel</a>
                <a href="data:text/html,hi">Data</a>
                <a href="#section">Anchor</a>
                <a href="/file.pdf" download>Download</a>
            </body></html>
        "##;
        let page = extract_requests(html, &base_url());
        assert!(page.requests.is_empty());
    }

    #[test]
    fn test_duplicate_links_deduplicated_by_identity() {
        let html = r#"
            <html><body>
                <a href="/next">One</a>
                <a href="/next/">Trailing slash</a>
                <a href="/next#part">Fragment</a>
            </body></html>
        "#;
        let page = extract_requests(html, &base_url());
        assert_eq!(page.requests.len(), 1);
        assert_eq!(page.requests[0].url, "https://example.com/next");
    }

    #[test]
    fn test_form_becomes_get_probe() {
        let html = r#"
            <html><body>
                <form action="/search">
                    <input name="q" type="text" />
                    <input name="lang" type="text" />
                    <input type="submit" value="Go" />
                    <input type="text" />
                </form>
            </body></html>
        "#;
        let page = extract_requests(html, &base_url());
        assert_eq!(page.requests.len(), 1);
        let probe = &page.requests[0];
        assert_eq!(probe.resource, ResourceKind::Form);
        assert_eq!(probe.url, "https://example.com/search?q=a&lang=a");
    }

    #[test]
    fn test_form_without_action_probes_base() {
        let html = r#"
            <html><body>
                <form><input name="token" /></form>
            </body></html>
        "#;
        let page = extract_requests(html, &base_url());
        assert_eq!(page.requests.len(), 1);
        assert_eq!(page.requests[0].url, "https://example.com/page?token=a");
    }

    #[test]
    fn test_form_without_inputs_probes_bare_action() {
        let html = r#"
            <html><body>
                <form action="/ping"></form>
            </body></html>
        "#;
        let page = extract_requests(html, &base_url());
        assert_eq!(page.requests.len(), 1);
        assert_eq!(page.requests[0].url, "https://example.com/ping");
    }

    #[test]
    fn test_anchor_and_form_to_same_target_kept_once() {
        let html = r#"
            <html><body>
                <a href="/search?lang=a&q=a">Link</a>
                <form action="/search">
                    <input name="q" /><input name="lang" />
                </form>
            </body></html>
        "#;
        let page = extract_requests(html, &base_url());
        assert_eq!(page.requests.len(), 1);
        assert_eq!(page.requests[0].resource, ResourceKind::Document);
    }

    #[test]
    fn test_mixed_valid_and_invalid_links() {
        let html = r#"
            <html><body>
                <a href="/valid">Valid</a>
                <a href="javascript:alert('no')">Invalid</a>
                <a href="/another-valid">Valid</a>
            </body></html>
        "#;
        let page = extract_requests(html, &base_url());
        assert_eq!(page.requests.len(), 2);
    }
}
