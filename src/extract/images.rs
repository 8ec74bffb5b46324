//! Image candidate filtering.
//!
//! Raw image listings on a detail page are dominated by chrome: site logos,
//! app-store badges, social icons, map tiles. None of those may ever become
//! the listing's photo, so every candidate passes a substring blocklist and
//! an extension check before it counts as content.

use std::collections::HashSet;

/// Substrings marking non-content images.
const BLOCKLIST: &[&str] = &[
    "logo-pisos",
    "/logo_",
    "/logos/",
    "/icons/",
    "googleplay_store",
    "appstore",
    "appgallery",
    "ic_instagram",
    "ic_facebook",
    "ic_twitter",
    "map.imghs.net",
];

/// Vector and animated formats are icons, never listing photos.
const BLOCKED_EXTENSIONS: &[&str] = &[".svg", ".gif"];

/// Path markers of actual photo assets, used when cleaning a DOM gallery.
const CONTENT_MARKERS: &[&str] = &["fotos", "photos", "/media"];

pub fn is_content_image(url: &str) -> bool {
    let lower = url.to_lowercase();
    !BLOCKLIST.iter().any(|bad| lower.contains(bad))
        && !BLOCKED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// First candidate that survives the blocklist, if any.
pub fn pick_main_image<I, S>(urls: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    urls.into_iter()
        .map(|u| u.as_ref().to_string())
        .find(|u| !u.is_empty() && is_content_image(u))
}

/// Deduplicate in insertion order, dropping blocklisted candidates.
pub fn dedup_images<I, S>(urls: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    urls.into_iter()
        .map(|u| u.as_ref().to_string())
        .filter(|u| !u.is_empty() && is_content_image(u))
        .filter(|u| seen.insert(u.clone()))
        .collect()
}

/// Clean a scraped DOM gallery: deduplicate, drop chrome, and keep only
/// URLs that look like photo assets. Gallery markup mixes in thumbnails of
/// every site widget, so a content-path marker is required on top of the
/// blocklist.
pub fn clean_gallery<I, S>(urls: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    dedup_images(urls)
        .into_iter()
        .filter(|u| {
            let lower = u.to_lowercase();
            CONTENT_MARKERS.iter().any(|marker| lower.contains(marker))
        })
        .collect()
}
