//! Heuristic content extraction
//!
//! Pure functions from an HTML document (plus its source URL, for resolving
//! relative links) to structured post data. Blog markup varies wildly, so
//! every field is extracted through an ordered cascade of strategies: each
//! strategy returns an optional value and the first hit wins. Malformed or
//! unexpected HTML never raises; every step has a defined fallback (empty
//! string, `None`, or the "Untitled" placeholder).
//!
//! No network I/O and no shared state; the orchestrator stamps `blog_url`
//! and `scraped_at` afterwards.

use crate::model::ExtractedPost;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Class-attribute fragments that mark a listing's post containers
const CONTAINER_CLASS_HINTS: &[&str] = &["post", "entry", "article"];

/// Class-attribute fragments that mark the main content element
const CONTENT_CLASS_HINTS: &[&str] = &["content", "post-body", "entry-content"];

/// Class-attribute fragments that mark a teaser/summary element
const EXCERPT_CLASS_HINTS: &[&str] = &["excerpt", "summary", "description"];

/// Link texts that point at a post's own page
const READ_MORE_TEXTS: &[&str] = &[
    "read more",
    "continue reading",
    "full article",
    "full post",
    "full story",
    "learn more",
];

/// Path fragments that mark navigation links rather than post links
const NAVIGATION_HREF_HINTS: &[&str] = &["/page/", "/category/", "/tag/", "/author/", "?page="];

/// Excerpts are cut at this many characters, on a whitespace boundary
const EXCERPT_MAX_LEN: usize = 200;

/// Extracts posts from a listing page.
///
/// Containers are located by cascade: `article` elements, then `div`s whose
/// class mentions post/entry/article, then the nearest block ancestor of
/// each `h2`/`h3` heading. With more than one container, each yields one
/// post (those without a title are dropped). With zero or one, the whole
/// document is treated as a single post and exactly one result is returned.
pub fn extract_listing(html: &str, url: &Url) -> Vec<ExtractedPost> {
    let document = Html::parse_document(html);
    let containers = find_post_containers(&document);

    if containers.len() > 1 {
        tracing::debug!(url = %url, count = containers.len(), "Found post containers");
        let posts: Vec<ExtractedPost> = containers
            .into_iter()
            .map(|container| extract_from_container(container, url))
            .filter(|post| !post.title.is_empty())
            .collect();
        tracing::debug!(url = %url, posts = posts.len(), "Parsed posts from listing");
        posts
    } else {
        vec![extract_single_post(html, url)]
    }
}

/// Extracts one post from a full page (a post's own page, or a listing
/// where no containers were recognizable).
pub fn extract_single_post(html: &str, url: &Url) -> ExtractedPost {
    let document = Html::parse_document(html);

    let title = extract_title(&document);
    let author = extract_author(&document);
    let published_date = extract_date(&document);
    let content = extract_content(&document);
    let excerpt = generate_excerpt(&content);
    let images = extract_images(document.root_element(), url);

    tracing::debug!(url = %url, title = %title, "Parsed single post");

    ExtractedPost {
        blog_url: String::new(),
        post_url: None,
        title,
        author,
        published_date,
        content,
        excerpt,
        images,
        scraped_at: Utc::now(),
    }
}

/// Finds the next-page link on a listing page, resolved against
/// `current_url`. Cascade: class ~ "next", `rel=next`, aria-label ~ "next",
/// title ~ "next", then visible link text containing the word "next" or an
/// arrow glyph (fragment-only hrefs skipped).
pub fn find_next_page_url(html: &str, current_url: &Url) -> Option<Url> {
    let document = Html::parse_document(html);
    let anchors = selector("a")?;

    let attribute_checks: [fn(&ElementRef) -> bool; 4] = [
        |a| attr_contains(a, "class", "next"),
        |a| {
            a.value()
                .attr("rel")
                .map(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("next")))
                .unwrap_or(false)
        },
        |a| attr_contains(a, "aria-label", "next"),
        |a| attr_contains(a, "title", "next"),
    ];

    for check in attribute_checks {
        let found = document
            .select(&anchors)
            .find(|a| check(a) && a.value().attr("href").is_some());
        if let Some(link) = found {
            let href = link.value().attr("href")?;
            return current_url.join(href).ok();
        }
    }

    // Fallback: visible link text
    for link in document.select(&anchors) {
        let text = element_text(link);
        if !looks_like_next(&text) {
            continue;
        }
        if let Some(href) = link.value().attr("href") {
            if !href.starts_with('#') {
                return current_url.join(href).ok();
            }
        }
    }

    tracing::debug!(url = %current_url, "No next page link found");
    None
}

/// Derives an excerpt from content text.
///
/// Content of up to 200 characters is returned unchanged (meaning "full
/// content, no truncation needed"). Longer content is cut at 200
/// characters, trimmed back to the last whitespace boundary to avoid
/// mid-word cuts, and suffixed with an ellipsis. Empty content yields none.
pub fn generate_excerpt(content: &str) -> Option<String> {
    if content.is_empty() {
        return None;
    }

    if content.chars().count() <= EXCERPT_MAX_LEN {
        return Some(content.to_string());
    }

    let cut: String = content.chars().take(EXCERPT_MAX_LEN).collect();
    let trimmed = match cut.rfind(|c: char| c.is_whitespace()) {
        Some(idx) if idx > 0 => &cut[..idx],
        _ => cut.as_str(),
    };

    Some(format!("{}...", trimmed))
}

/// Extracts one post from a single listing container.
///
/// Same field cascades as a full page, but scoped to the container, plus
/// post-URL discovery: a link inside the heading, then a read-more style
/// link, then the first non-fragment link that does not look like
/// pagination/category/tag/author navigation.
fn extract_from_container(container: ElementRef, base_url: &Url) -> ExtractedPost {
    let (title, mut post_url) = extract_container_title(container, base_url);

    if post_url.is_none() {
        post_url = find_read_more_link(container, base_url);
    }
    if post_url.is_none() {
        post_url = find_first_post_link(container, base_url);
    }

    let author = extract_container_author(container);
    let published_date = extract_container_date(container);
    let content = extract_container_content(container);
    let excerpt = generate_excerpt(&content);
    let images = extract_images(container, base_url);

    ExtractedPost {
        blog_url: String::new(),
        post_url,
        title,
        author,
        published_date,
        content,
        excerpt,
        images,
        scraped_at: Utc::now(),
    }
}

/// Locates post containers in a listing document
fn find_post_containers(document: &Html) -> Vec<ElementRef<'_>> {
    // (a) proper article elements
    if let Some(sel) = selector("article") {
        let articles: Vec<ElementRef> = document.select(&sel).collect();
        if !articles.is_empty() {
            return articles;
        }
    }

    // (b) divs whose class looks post-like
    if let Some(sel) = selector("div[class]") {
        let divs: Vec<ElementRef> = document
            .select(&sel)
            .filter(|el| class_matches(el, CONTAINER_CLASS_HINTS))
            .collect();
        if !divs.is_empty() {
            return divs;
        }
    }

    // (c) block ancestors of heading elements, each container used once
    let mut containers = Vec::new();
    let mut seen = HashSet::new();
    if let Some(sel) = selector("h2, h3") {
        for heading in document.select(&sel) {
            let ancestor = heading
                .ancestors()
                .filter_map(ElementRef::wrap)
                .find(|el| matches!(el.value().name(), "div" | "article" | "section"));
            if let Some(container) = ancestor {
                if seen.insert(container.id()) {
                    containers.push(container);
                }
            }
        }
    }
    containers
}

fn extract_title(document: &Html) -> String {
    if let Some(sel) = selector("h1") {
        if let Some(h1) = document.select(&sel).next() {
            let text = element_text(h1);
            if !text.is_empty() {
                return text;
            }
        }
    }

    if let Some(sel) = selector("title") {
        if let Some(title) = document.select(&sel).next() {
            let text = element_text(title);
            if !text.is_empty() {
                return text;
            }
        }
    }

    if let Some(content) = meta_content(document, "property", "og:title") {
        return content;
    }

    "Untitled".to_string()
}

fn extract_author(document: &Html) -> Option<String> {
    if let Some(content) = meta_content(document, "name", "author") {
        return Some(content);
    }

    if let Some(sel) = selector("span[class], div[class]") {
        let found = document
            .select(&sel)
            .find(|el| class_matches(el, &["author"]));
        if let Some(el) = found {
            let text = element_text(el);
            if !text.is_empty() {
                return Some(text);
            }
        }
    }

    if let Some(sel) = selector("a[rel]") {
        let found = document.select(&sel).find(|a| {
            a.value()
                .attr("rel")
                .map(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("author")))
                .unwrap_or(false)
        });
        if let Some(el) = found {
            let text = element_text(el);
            if !text.is_empty() {
                return Some(text);
            }
        }
    }

    meta_content(document, "property", "article:author")
}

fn extract_date(document: &Html) -> Option<DateTime<Utc>> {
    if let Some(sel) = selector("time") {
        if let Some(time) = document.select(&sel).next() {
            if let Some(date) = date_from_time_element(time) {
                return Some(date);
            }
        }
    }

    meta_content(document, "property", "article:published_time")
        .and_then(|content| parse_date(&content))
}

fn extract_content(document: &Html) -> String {
    if let Some(sel) = selector("article") {
        if let Some(article) = document.select(&sel).next() {
            return element_text(article);
        }
    }

    if let Some(sel) = selector("div[class]") {
        let found = document
            .select(&sel)
            .find(|el| class_matches(el, CONTENT_CLASS_HINTS));
        if let Some(el) = found {
            return element_text(el);
        }
    }

    if let Some(sel) = selector("main") {
        if let Some(main) = document.select(&sel).next() {
            return element_text(main);
        }
    }

    if let Some(sel) = selector("div[id]") {
        let found = document.select(&sel).find(|el| {
            el.value()
                .attr("id")
                .map(|id| {
                    let id = id.to_lowercase();
                    id.contains("content") || id.contains("main")
                })
                .unwrap_or(false)
        });
        if let Some(el) = found {
            return element_text(el);
        }
    }

    if let Some(sel) = selector("body") {
        if let Some(body) = document.select(&sel).next() {
            return element_text(body);
        }
    }

    String::new()
}

/// Title and optional post URL from the container's first heading
fn extract_container_title(container: ElementRef, base_url: &Url) -> (String, Option<String>) {
    let heading_sel = match selector("h1, h2, h3, h4") {
        Some(sel) => sel,
        None => return (String::new(), None),
    };

    let heading = match container.select(&heading_sel).next() {
        Some(h) => h,
        None => return (String::new(), None),
    };

    // A linked heading supplies both the title and the post URL
    if let Some(link_sel) = selector("a") {
        if let Some(link) = heading.select(&link_sel).next() {
            let title = element_text(link);
            let post_url = link
                .value()
                .attr("href")
                .and_then(|href| base_url.join(href).ok())
                .map(|u| u.to_string());
            return (title, post_url);
        }
    }

    (element_text(heading), None)
}

fn find_read_more_link(container: ElementRef, base_url: &Url) -> Option<String> {
    let sel = selector("a[href]")?;

    for link in container.select(&sel) {
        let text = normalize_whitespace(&element_text(link).to_lowercase());
        if READ_MORE_TEXTS.iter().any(|pattern| text.contains(pattern)) {
            let href = link.value().attr("href")?;
            return base_url.join(href).ok().map(|u| u.to_string());
        }
    }
    None
}

fn find_first_post_link(container: ElementRef, base_url: &Url) -> Option<String> {
    let sel = selector("a[href]")?;

    for link in container.select(&sel) {
        let href = match link.value().attr("href") {
            Some(h) if !h.starts_with('#') => h,
            _ => continue,
        };

        let href_lower = href.to_lowercase();
        if NAVIGATION_HREF_HINTS
            .iter()
            .any(|hint| href_lower.contains(hint))
        {
            continue;
        }

        return base_url.join(href).ok().map(|u| u.to_string());
    }
    None
}

fn extract_container_author(container: ElementRef) -> Option<String> {
    let sel = selector("span[class], div[class], a[class]")?;
    container
        .select(&sel)
        .find(|el| class_matches(el, &["author"]))
        .map(element_text)
        .filter(|text| !text.is_empty())
}

fn extract_container_date(container: ElementRef) -> Option<DateTime<Utc>> {
    let sel = selector("time")?;
    container.select(&sel).next().and_then(date_from_time_element)
}

fn extract_container_content(container: ElementRef) -> String {
    // An explicit excerpt/summary element wins
    if let Some(sel) = selector("div[class], p[class]") {
        let found = container
            .select(&sel)
            .find(|el| class_matches(el, EXCERPT_CLASS_HINTS));
        if let Some(el) = found {
            return element_text(el);
        }
    }

    // Otherwise joined paragraph text
    if let Some(sel) = selector("p") {
        let paragraphs: Vec<String> = container
            .select(&sel)
            .map(element_text)
            .filter(|text| !text.is_empty())
            .collect();
        if !paragraphs.is_empty() {
            return paragraphs.join("\n");
        }
    }

    element_text(container)
}

/// Every image's `src`, resolved against `base_url`, in document order.
/// Duplicates are kept.
fn extract_images(scope: ElementRef, base_url: &Url) -> Vec<String> {
    let sel = match selector("img[src]") {
        Some(sel) => sel,
        None => return Vec::new(),
    };

    scope
        .select(&sel)
        .filter_map(|img| img.value().attr("src"))
        .filter_map(|src| base_url.join(src).ok())
        .map(|u| u.to_string())
        .collect()
}

fn date_from_time_element(time: ElementRef) -> Option<DateTime<Utc>> {
    let datetime_str = time
        .value()
        .attr("datetime")
        .map(str::to_string)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| element_text(time));

    parse_date(&datetime_str)
}

/// Parses ISO-8601 dates from structured markup. Accepts full RFC 3339
/// (trailing `Z` read as UTC), a naive datetime, or a bare date. Anything
/// else is `None`. No natural-language date guessing.
fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0)?;
        return Some(Utc.from_utc_datetime(&midnight));
    }

    None
}

/// True when link text contains the word "next" or an arrow glyph
fn looks_like_next(text: &str) -> bool {
    if text.contains('→') || text.contains('»') {
        return true;
    }
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| word == "next")
}

fn meta_content(document: &Html, attr: &str, value: &str) -> Option<String> {
    let sel = selector(&format!("meta[{}=\"{}\"]", attr, value))?;
    document
        .select(&sel)
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
}

/// Collects an element's text: each chunk trimmed, empties dropped,
/// joined with newlines
fn element_text(element: ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Case-insensitive substring match against the element's class attribute
fn class_matches(element: &ElementRef, hints: &[&str]) -> bool {
    element
        .value()
        .attr("class")
        .map(|class| {
            let class = class.to_lowercase();
            hints.iter().any(|hint| class.contains(hint))
        })
        .unwrap_or(false)
}

fn attr_contains(element: &ElementRef, attr: &str, needle: &str) -> bool {
    element
        .value()
        .attr(attr)
        .map(|value| value.to_lowercase().contains(needle))
        .unwrap_or(false)
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}
