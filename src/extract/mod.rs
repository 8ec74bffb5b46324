//! Detail-page field resolution.
//!
//! A fetched detail document is turned into a [`ListingRecord`] by running
//! an ordered cascade per field: the structured-metadata pass
//! ([`meta`]) fills what it can, then the DOM/script fallbacks ([`fields`])
//! fill only what is still absent, expressed as `Option::or_else` chains.
//! Any single-field parse failure leaves that field absent; nothing here
//! aborts the record. The assembled record is emitted only if it passes the
//! admissibility check.

pub mod fields;
pub mod images;
pub mod meta;
pub mod text;

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

use crate::models::ListingRecord;

static SCRIPT_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("script").unwrap());

/// One fetched detail document plus its canonical URL. Parsing and script
/// collection happen once at construction; resolution is pure afterwards.
pub struct DetailPage {
    html: Html,
    url: Url,
    scripts: Vec<String>,
}

impl DetailPage {
    pub fn new(body: &str, url: Url) -> Self {
        let html = Html::parse_document(body);
        let scripts = html
            .select(&SCRIPT_SEL)
            .map(|el| el.text().collect::<String>())
            .collect();
        Self { html, url, scripts }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    pub fn scripts(&self) -> &[String] {
        &self.scripts
    }

    /// First capture group of `pattern` across all embedded script blocks.
    /// Shared by the coordinate/agency/phone cascades so each field stays a
    /// pattern, not a bespoke scanner.
    pub fn scan_scripts(&self, pattern: &Regex) -> Option<String> {
        self.scripts.iter().find_map(|script| {
            pattern
                .captures(script)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
        })
    }

    /// Like [`scan_scripts`](Self::scan_scripts) but for patterns with two
    /// capture groups (coordinate pairs).
    pub fn scan_scripts_pair(&self, pattern: &Regex) -> Option<(String, String)> {
        self.scripts.iter().find_map(|script| {
            let caps = pattern.captures(script)?;
            Some((caps.get(1)?.as_str().to_string(), caps.get(2)?.as_str().to_string()))
        })
    }

    /// Rendered text nodes in document order, excluding script/style bodies.
    pub fn text_nodes(&self) -> impl Iterator<Item = &str> {
        self.html.tree.nodes().filter_map(|node| {
            let text = node.value().as_text()?;
            let parent = node.parent()?;
            let element = parent.value().as_element()?;
            if matches!(element.name(), "script" | "style") {
                return None;
            }
            Some(&**text)
        })
    }

    /// First element matching `selector`, its text joined and trimmed.
    pub fn first_text(&self, selector: &Selector) -> Option<String> {
        self.html
            .select(selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// Text of every element matching `selector`, joined with spaces.
    pub fn joined_text(&self, selector: &Selector) -> String {
        let mut parts = Vec::new();
        for el in self.html.select(selector) {
            for chunk in el.text() {
                let chunk = chunk.trim();
                if !chunk.is_empty() {
                    parts.push(chunk);
                }
            }
        }
        parts.join(" ")
    }

    /// Resolve a possibly-relative href against the page URL.
    pub fn resolve(&self, href: &str) -> Option<String> {
        self.url.join(href).ok().map(String::from)
    }
}

/// Run the full cascade over one detail page. Returns `None` when the
/// resulting record fails admissibility (a category page or empty shell
/// that leaked through URL classification).
pub fn resolve_listing(page: &DetailPage) -> Option<ListingRecord> {
    let meta = meta::extract(page);

    let mut record = ListingRecord::new(page.url().as_str().to_string());
    record.listing_id = fields::listing_id(page);
    record.title = meta.title.or_else(|| fields::title(page));
    record.description = meta.description;
    record.price_eur = meta.price_eur.or_else(|| fields::price_eur(page));
    record.address = meta.address;
    record.municipality = meta.municipality;
    record.province = meta.province;

    let features = fields::features_text(page);
    record.rooms = fields::rooms(&features);
    record.bathrooms = fields::bathrooms(&features);
    record.surface_m2 = fields::surface_m2(&features);
    record.floor = fields::floor(page);

    let (has_elevator, is_exterior) = fields::flags(page);
    record.has_elevator = has_elevator;
    record.is_exterior = is_exterior;

    record.agency = meta.agency.or_else(|| fields::agency(page));
    record.phone = fields::phone(page);
    record.published_at = fields::published_at(page);

    let geo = meta
        .coordinates
        .or_else(|| fields::coordinates(page));
    if let Some((lat, lon)) = geo {
        record.latitude = Some(lat);
        record.longitude = Some(lon);
    }

    record.neighborhood = meta
        .neighborhood
        .or_else(|| fields::neighborhood(page, record.municipality.as_deref()));

    let from_meta = meta.images.map(|imgs| images::dedup_images(imgs));
    record.images = match from_meta {
        Some(imgs) if !imgs.is_empty() => Some(imgs),
        _ => fields::gallery_images(page),
    };

    record.is_admissible().then_some(record)
}
