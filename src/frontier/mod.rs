//! URL classification and crawl-frontier construction.
//!
//! A listing/search-results page yields two things: the set of detail-page
//! URLs reachable from it, and the next pagination URL. Candidates come
//! from plain hyperlinks, `data-href` card attributes, and `detailUrl`/
//! `url` pairs inside embedded scripts. The set is deduplicated and sorted
//! so a crawl visits pages in a reproducible order.

use regex::Regex;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

static DETAIL_SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(?:inmueble|ficha)/").unwrap());
static DETAIL_SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/alquilar/[^/]+-\d{5,}(?:_\d+)?/?(?:\?.*)?$").unwrap());

static HREF_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());
static DATA_HREF_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[data-href]").unwrap());
static SCRIPT_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("script").unwrap());
static SCRIPT_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(?:detailUrl|url)"\s*:\s*"([^"]+)""#).unwrap());

static NEXT_REL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[rel="next"]"#).unwrap());

/// Frontier output for one listing page: detail URLs in sorted order plus
/// at most one pagination URL.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Frontier {
    pub detail_urls: Vec<String>,
    pub next_page: Option<String>,
}

/// Whether an absolute URL points at one specific listing rather than a
/// category page or asset. Item URLs either carry an `inmueble`/`ficha`
/// path segment or end in `<slug>-<long numeric id>`; category slugs lack
/// the long id. URLs without a network scheme are never detail pages.
pub fn is_detail_url(url: &str) -> bool {
    if !url.starts_with("http") {
        return false;
    }
    DETAIL_SEGMENT_RE.is_match(url) || DETAIL_SLUG_RE.is_match(url)
}

/// Collect the frontier from a parsed listing page.
pub fn build_frontier(html: &Html, base: &Url) -> Frontier {
    let mut seen = BTreeSet::new();

    for el in html.select(&HREF_SEL) {
        if let Some(href) = el.value().attr("href") {
            insert_candidate(&mut seen, base, href);
        }
    }

    for el in html.select(&DATA_HREF_SEL) {
        if let Some(href) = el.value().attr("data-href") {
            insert_candidate(&mut seen, base, href);
        }
    }

    for script in html.select(&SCRIPT_SEL) {
        let raw = script.text().collect::<String>();
        for caps in SCRIPT_URL_RE.captures_iter(&raw) {
            let unescaped = caps[1].replace("\\/", "/");
            insert_candidate(&mut seen, base, &unescaped);
        }
    }

    let frontier = Frontier {
        detail_urls: seen.into_iter().collect(),
        next_page: next_page_url(html, base),
    };
    debug!(
        details = frontier.detail_urls.len(),
        has_next = frontier.next_page.is_some(),
        "classified listing page links"
    );
    frontier
}

fn insert_candidate(seen: &mut BTreeSet<String>, base: &Url, href: &str) {
    if let Ok(resolved) = base.join(href) {
        if is_detail_url(resolved.as_str()) {
            seen.insert(resolved.into());
        }
    }
}

/// The next pagination URL: an explicit `rel="next"` link, else the first
/// link whose visible text or class suggests a next page. No match means
/// the frontier terminates for this branch.
fn next_page_url(html: &Html, base: &Url) -> Option<String> {
    let explicit = html
        .select(&NEXT_REL_SEL)
        .next()
        .and_then(|el| el.value().attr("href"));
    if let Some(href) = explicit {
        return base.join(href).ok().map(String::from);
    }

    html.select(&HREF_SEL)
        .find(|el| {
            let by_class = el
                .value()
                .attr("class")
                .is_some_and(|c| c.contains("next"));
            by_class || el.text().collect::<String>().contains("Siguiente")
        })
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| base.join(href).ok())
        .map(String::from)
}
