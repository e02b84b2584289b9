//! HTML page analysis
//!
//! Extracts structural metrics from a fetched page: title, a coarse HTML
//! version tag, heading counts, login-form presence, and the
//! internal/external/broken classification of every hyperlink.

use std::collections::HashSet;

use lazy_static::lazy_static;
use scraper::{Html, Selector};
use url::Url;

use crate::crawler::checker::LinkChecker;
use crate::error::ParseError;
use crate::models::{BrokenLink, CrawlResult, HeadingCounts};

// Helper macro to parse selectors safely at compile time
macro_rules! parse_selector {
    ($s:expr) => {
        Selector::parse($s).expect(concat!("Invalid CSS selector: ", $s))
    };
}

lazy_static! {
    static ref TITLE: Selector = parse_selector!("title");
    static ref HTML_ROOT: Selector = parse_selector!("html");
    static ref PASSWORD_INPUT: Selector = parse_selector!("input[type='password']");
    static ref ANCHOR: Selector = parse_selector!("a[href]");
    static ref HEADINGS: Vec<(&'static str, Selector)> = vec![
        ("h1", parse_selector!("h1")),
        ("h2", parse_selector!("h2")),
        ("h3", parse_selector!("h3")),
        ("h4", parse_selector!("h4")),
        ("h5", parse_selector!("h5")),
        ("h6", parse_selector!("h6")),
    ];
}

/// Metrics pulled out of the document before any network probing
///
/// `scraper::Html` is not `Send`, so extraction is fully synchronous and the
/// document is dropped before the analyzer awaits its liveness probes.
struct Extraction {
    title: String,
    html_version: String,
    heading_counts: HeadingCounts,
    internal_links: u32,
    external_links: u32,
    has_login_form: bool,
    /// Resolved absolute targets to probe, deduplicated by href string
    probe_targets: Vec<String>,
}

/// Page analyzer producing a [`CrawlResult`] per fetched page
pub struct PageAnalyzer {
    checker: LinkChecker,
}

impl PageAnalyzer {
    #[must_use]
    pub fn new(checker: LinkChecker) -> Self {
        Self { checker }
    }

    /// Analyze a page's HTML against its own address
    ///
    /// Probes every resolved link once for liveness; probes run sequentially
    /// per page with the checker's own timeout.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::InvalidBaseUrl` if the record's address cannot
    /// be parsed as a URL.
    pub async fn analyze(&self, html: &str, address: &str) -> Result<CrawlResult, ParseError> {
        let extraction = Self::extract(html, address)?;

        let mut broken_links = Vec::new();
        for target in &extraction.probe_targets {
            let code = self.checker.check(target).await;
            if code >= 400 {
                broken_links.push(BrokenLink {
                    url: target.clone(),
                    code,
                });
            }
        }

        Ok(CrawlResult {
            title: extraction.title,
            html_version: extraction.html_version,
            heading_counts: extraction.heading_counts,
            internal_links: extraction.internal_links,
            external_links: extraction.external_links,
            broken_links,
            has_login_form: extraction.has_login_form,
        })
    }

    /// Synchronous document pass: everything except liveness probing
    fn extract(html: &str, address: &str) -> Result<Extraction, ParseError> {
        let base = Url::parse(address)
            .map_err(|e| ParseError::InvalidBaseUrl(format!("{address}: {e}")))?;

        let document = Html::parse_document(html);

        let title = document
            .select(&TITLE)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        // Coarse best-effort classification, not a doctype parser: a root
        // <html> element means "HTML5", anything else the generic tag.
        let html_version = if document.select(&HTML_ROOT).next().is_some() {
            "HTML5".to_string()
        } else {
            "HTML".to_string()
        };

        let mut heading_counts = CrawlResult::empty_headings();
        for (tag, selector) in HEADINGS.iter() {
            let count = document.select(selector).count() as u32;
            heading_counts.insert((*tag).to_string(), count);
        }

        let has_login_form = document.select(&PASSWORD_INPUT).next().is_some();

        let mut internal_links = 0;
        let mut external_links = 0;
        let mut seen_hrefs = HashSet::new();
        let mut probe_targets = Vec::new();

        for anchor in document.select(&ANCHOR) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            if href.is_empty() {
                continue;
            }

            // Unparseable references are skipped, not counted
            let Ok(resolved) = base.join(href) else {
                continue;
            };

            if same_host(&resolved, &base) {
                internal_links += 1;
            } else {
                external_links += 1;
            }

            // Repeated hrefs within one page are probed at most once
            if seen_hrefs.insert(href.to_string()) {
                probe_targets.push(resolved.into());
            }
        }

        Ok(Extraction {
            title,
            html_version,
            heading_counts,
            internal_links,
            external_links,
            has_login_form,
            probe_targets,
        })
    }
}

/// Host comparison for internal/external classification; the port is part
/// of the host, so two services on one machine are distinct hosts
fn same_host(resolved: &Url, base: &Url) -> bool {
    resolved.host_str() == base.host_str()
        && resolved.port_or_known_default() == base.port_or_known_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://example.com/page";

    fn extract(html: &str) -> Extraction {
        PageAnalyzer::extract(html, BASE).unwrap()
    }

    #[test]
    fn test_title_trimmed() {
        let ex = extract("<html><head><title>  Hello World \n</title></head></html>");
        assert_eq!(ex.title, "Hello World");
    }

    #[test]
    fn test_missing_title_is_empty() {
        let ex = extract("<html><body><p>no title</p></body></html>");
        assert_eq!(ex.title, "");
    }

    #[test]
    fn test_heading_counts() {
        let ex = extract("<html><body><h1>A</h1><h2>B</h2><h2>C</h2></body></html>");
        assert_eq!(ex.heading_counts.get("h1"), Some(&1));
        assert_eq!(ex.heading_counts.get("h2"), Some(&2));
        for tag in ["h3", "h4", "h5", "h6"] {
            assert_eq!(ex.heading_counts.get(tag), Some(&0), "tag {tag}");
        }
    }

    #[test]
    fn test_login_form_detection_outside_form() {
        let ex = extract("<html><body><div><input type='password'></div></body></html>");
        assert!(ex.has_login_form);

        let ex = extract("<html><body><input type='text'></body></html>");
        assert!(!ex.has_login_form);
    }

    #[test]
    fn test_internal_external_classification() {
        let html = r#"<html><body>
            <a href="/about">about</a>
            <a href="https://example.com/contact">contact</a>
            <a href="https://other.example.org/">elsewhere</a>
        </body></html>"#;
        let ex = extract(html);
        assert_eq!(ex.internal_links, 2);
        assert_eq!(ex.external_links, 1);
    }

    #[test]
    fn test_empty_href_skipped() {
        let ex = extract(r#"<html><body><a href="">empty</a></body></html>"#);
        assert_eq!(ex.internal_links, 0);
        assert_eq!(ex.external_links, 0);
        assert!(ex.probe_targets.is_empty());
    }

    #[test]
    fn test_duplicate_hrefs_probed_once_but_counted_each() {
        let html = r#"<html><body>
            <a href="/a">one</a>
            <a href="/a">two</a>
        </body></html>"#;
        let ex = extract(html);
        assert_eq!(ex.internal_links, 2);
        assert_eq!(ex.probe_targets, vec!["https://example.com/a".to_string()]);
    }

    #[test]
    fn test_relative_links_resolve_against_page() {
        let ex = extract(r#"<html><body><a href="sub/dir">rel</a></body></html>"#);
        assert_eq!(ex.probe_targets, vec!["https://example.com/sub/dir".to_string()]);
        assert_eq!(ex.internal_links, 1);
    }

    #[test]
    fn test_different_port_is_external() {
        let html = r#"<html><body><a href="https://example.com:8443/x">x</a></body></html>"#;
        let ex = extract(html);
        assert_eq!(ex.internal_links, 0);
        assert_eq!(ex.external_links, 1);
    }

    #[test]
    fn test_html_version_heuristic() {
        let ex = extract("<html><body></body></html>");
        assert_eq!(ex.html_version, "HTML5");
    }

    #[test]
    fn test_invalid_base_url() {
        let err = PageAnalyzer::extract("<html></html>", "not a url");
        assert!(matches!(err, Err(ParseError::InvalidBaseUrl(_))));
    }
}
