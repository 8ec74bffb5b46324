//! DOM and script fallbacks, applied only to fields the metadata pass left
//! absent. Field patterns live here as static data; each extractor is a
//! pure function over the page and never errors, it just yields `None`.

use regex::Regex;
use scraper::Selector;
use std::sync::LazyLock;

use super::{images, text, DetailPage};
use crate::models::TriState;

static LISTING_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-(\d{6,})(?:_\d+)?/?").unwrap());

static PRICE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[class*="price"], [class*="Price"]"#).unwrap());
static EURO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d[\d\.\s,]*)\s*€").unwrap());

static H1_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());

static FEATURES_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        r#"[class*="features"], [class*="caracter"], [class*="characteristics"], [class*="details"]"#,
    )
    .unwrap()
});
static ROOMS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*(?:hab|habitac|dormitori)").unwrap());
static BATHROOMS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*(?:bañ|bano|aseo|wc)").unwrap());
static SURFACE_USABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:[.,]\d+)?)\s*(?:m²|m2)\s*(?:útiles|utiles)").unwrap());
static SURFACE_BUILT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:[.,]\d+)?)\s*(?:m²|m2)\s*construid").unwrap());
static SURFACE_ANY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:[.,]\d+)?)\s*(?:m²|m2)").unwrap());

const FLOOR_WORDS: &[&str] = &["planta", "bajo", "entresuelo", "principal", "ático", "atico"];

static AGENCY_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"[class*="agency"], [class*="publisher"], [class*="company"]"#).unwrap()
});
static AGENCY_SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(?:agencyName|publisher|seller)"\s*:\s*"([^"]+)""#).unwrap()
});

static TEL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[href^="tel:"]"#).unwrap());
// Keyed to a phone-like field so bare digit runs (listing ids, timestamps)
// never qualify; Spanish numbers start with 6-9 after the optional +34.
static PHONE_SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#""(?:phone|phoneNumber|telephone|telefono|teléfono)"\s*:\s*"((?:\+34[\s.\-]?)?[6789]\d{2}[\s.\-]?(?:\d{3}[\s.\-]?\d{3}|\d{2}[\s.\-]?\d{2}[\s.\-]?\d{2}))"#,
    )
    .unwrap()
});

static META_DATE_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        r#"meta[property="article:modified_time"], meta[property="article:published_time"]"#,
    )
    .unwrap()
});

static GEO_DATA_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("[data-lat][data-lng], [data-latitude][data-longitude]").unwrap()
});
static LATITUDE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""latitude"\s*:\s*"?(-?\d+[.,]\d+)"#).unwrap());
static LONGITUDE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""longitude"\s*:\s*"?(-?\d+[.,]\d+)"#).unwrap());
static MAP_CENTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"mapCenter[^{}]*\{[^}]*?lat\w*['"]?\s*:\s*['"]?(-?\d+[.,]\d+)['"]?\s*,\s*['"]?ln?g\w*['"]?\s*:\s*['"]?(-?\d+[.,]\d+)"#,
    )
    .unwrap()
});
static MAP_URL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("iframe[src], img[src], a[href]").unwrap());
static CENTER_PARAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[?&]center=(-?\d+(?:\.\d+)?)(?:,|%2C)(-?\d+(?:\.\d+)?)").unwrap()
});

static NAV_LINK_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("nav a").unwrap());
static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/alquilar/[^/]*?([a-z0-9_]+)-\d").unwrap());
static SLUG_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:piso|apartamento|atico|ático|chalet|estudio|loft|duplex|dúplex|adosado|casa|vivienda|bajo)_?",
    )
    .unwrap()
});

static GALLERY_IMG_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[src], img[data-src]").unwrap());

/// Site-assigned identifier: a run of 6+ digits in the URL, with an
/// optional underscore-suffixed sub-id that is not part of the identity.
pub fn listing_id(page: &DetailPage) -> Option<String> {
    LISTING_ID_RE
        .captures(page.url().as_str())
        .map(|caps| caps[1].to_string())
}

/// Price from a price-styled element, else the first rendered text node
/// carrying the euro sign. `.` groups thousands, `,` marks decimals.
pub fn price_eur(page: &DetailPage) -> Option<u32> {
    let raw = page
        .first_text(&PRICE_SEL)
        .or_else(|| {
            page.text_nodes()
                .find(|t| t.contains('€'))
                .map(str::to_string)
        })?
        .replace('\u{a0}', " ");
    let caps = EURO_RE.captures(&raw)?;
    let n = text::parse_decimal_comma(&caps[1])?;
    (n >= 0.0).then(|| n.round() as u32)
}

pub fn title(page: &DetailPage) -> Option<String> {
    page.first_text(&H1_SEL)
}

/// All feature/characteristics block text, lowercased, for the numeric
/// field regexes below.
pub fn features_text(page: &DetailPage) -> String {
    page.joined_text(&FEATURES_SEL).to_lowercase()
}

pub fn rooms(features: &str) -> Option<u32> {
    grab_int(&ROOMS_RE, features)
}

pub fn bathrooms(features: &str) -> Option<u32> {
    grab_int(&BATHROOMS_RE, features)
}

/// Usable surface preferred over built surface, over a bare measurement.
pub fn surface_m2(features: &str) -> Option<u32> {
    grab_float(&SURFACE_USABLE_RE, features)
        .or_else(|| grab_float(&SURFACE_BUILT_RE, features))
        .or_else(|| grab_float(&SURFACE_ANY_RE, features))
        .map(|s| s as u32)
}

/// First rendered text mentioning a floor descriptor, kept as free text.
pub fn floor(page: &DetailPage) -> Option<String> {
    page.text_nodes()
        .find(|t| {
            let lower = t.to_lowercase();
            FLOOR_WORDS.iter().any(|word| lower.contains(word))
        })
        .map(|t| t.trim().to_string())
}

/// Elevator and exterior flags from substring presence in the rendered
/// text. A page stating "interior" pins `is_exterior` to false; interior
/// and exterior are mutually exclusive once the page states either.
pub fn flags(page: &DetailPage) -> (TriState, TriState) {
    let body: String = page.text_nodes().collect::<Vec<_>>().join(" ").to_lowercase();

    let has_elevator = if body.contains("ascensor") {
        TriState::Yes
    } else {
        TriState::Unknown
    };
    let is_exterior = if body.contains("interior") {
        TriState::No
    } else if body.contains("exterior") {
        TriState::Yes
    } else {
        TriState::Unknown
    };
    (has_elevator, is_exterior)
}

pub fn agency(page: &DetailPage) -> Option<String> {
    let from_dom = page.joined_text(&AGENCY_SEL);
    let from_dom = from_dom.trim();
    if !from_dom.is_empty() {
        return Some(from_dom.to_string());
    }
    page.scan_scripts(&AGENCY_SCRIPT_RE)
}

/// A `tel:` link target, else a Spanish-format digit group under a
/// phone-like key in the scripts.
pub fn phone(page: &DetailPage) -> Option<String> {
    page.html()
        .select(&TEL_SEL)
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(|href| href.trim_start_matches("tel:").trim().to_string())
        .filter(|p| !p.is_empty())
        .or_else(|| page.scan_scripts(&PHONE_SCRIPT_RE).map(|p| p.trim().to_string()))
}

/// Publication date from an "Actualizado"/"Publicado" text, else a
/// modified/published meta tag, normalized to ISO when recognizable.
pub fn published_at(page: &DetailPage) -> Option<String> {
    let from_text = page
        .text_nodes()
        .find(|t| t.contains("Actualizado") || t.contains("Publicado"))
        .map(|t| t.to_string());
    from_text
        .or_else(|| {
            page.html()
                .select(&META_DATE_SEL)
                .next()
                .and_then(|el| el.value().attr("content"))
                .map(str::to_string)
        })
        .map(|raw| text::normalize_date(&raw))
        .filter(|d| !d.is_empty())
}

/// Coordinate cascade: explicit data attributes, a `latitude`/`longitude`
/// key pair in scripts, a `mapCenter` object, then a `center=lat,lon`
/// query parameter on an embedded map URL. Components parse independently;
/// the first pair where both are finite wins.
pub fn coordinates(page: &DetailPage) -> Option<(f64, f64)> {
    from_data_attrs(page)
        .or_else(|| {
            let lat = page.scan_scripts(&LATITUDE_RE)?;
            let lon = page.scan_scripts(&LONGITUDE_RE)?;
            parse_pair(&lat, &lon)
        })
        .or_else(|| {
            let (lat, lon) = page.scan_scripts_pair(&MAP_CENTER_RE)?;
            parse_pair(&lat, &lon)
        })
        .or_else(|| from_center_param(page))
}

fn from_data_attrs(page: &DetailPage) -> Option<(f64, f64)> {
    let el = page.html().select(&GEO_DATA_SEL).next()?;
    let attrs = el.value();
    let lat = attrs.attr("data-lat").or_else(|| attrs.attr("data-latitude"))?;
    let lon = attrs.attr("data-lng").or_else(|| attrs.attr("data-longitude"))?;
    parse_pair(lat, lon)
}

fn from_center_param(page: &DetailPage) -> Option<(f64, f64)> {
    page.html().select(&MAP_URL_SEL).find_map(|el| {
        let target = el.value().attr("src").or_else(|| el.value().attr("href"))?;
        let caps = CENTER_PARAM_RE.captures(target)?;
        parse_pair(&caps[1], &caps[2])
    })
}

fn parse_pair(lat: &str, lon: &str) -> Option<(f64, f64)> {
    Some((text::parse_tolerant_f64(lat)?, text::parse_tolerant_f64(lon)?))
}

/// Breadcrumb link naming the municipality, else the URL slug with the
/// leading property-type word stripped, title-cased.
pub fn neighborhood(page: &DetailPage, municipality: Option<&str>) -> Option<String> {
    if let Some(muni) = municipality {
        let slug = slugify(muni);
        let crumb = page.html().select(&NAV_LINK_SEL).find_map(|el| {
            let href = el.value().attr("href")?;
            if !href.to_lowercase().contains(&slug) {
                return None;
            }
            let label = el.text().collect::<String>().trim().to_string();
            (!label.is_empty()).then_some(label)
        });
        if crumb.is_some() {
            return crumb;
        }
    }

    let caps = SLUG_RE.captures(page.url().as_str())?;
    let stripped = SLUG_TYPE_RE.replace(&caps[1], "");
    let name = text::title_case_slug(stripped.trim_matches('_'));
    (!name.is_empty()).then_some(name)
}

fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| match c {
            'á' => 'a',
            'é' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' | 'ü' => 'u',
            'ñ' => 'n',
            ' ' => '_',
            other => other,
        })
        .collect()
}

/// Gallery fallback when metadata carried no images: every `src`/`data-src`
/// resolved to an absolute URL, cleaned to photo assets; when the cleaning
/// empties the set, degrade to the single best main image.
pub fn gallery_images(page: &DetailPage) -> Option<Vec<String>> {
    let mut candidates = Vec::new();
    for el in page.html().select(&GALLERY_IMG_SEL) {
        for attr in ["data-src", "src"] {
            if let Some(resolved) = el.value().attr(attr).and_then(|u| page.resolve(u)) {
                candidates.push(resolved);
            }
        }
    }

    let gallery = images::clean_gallery(&candidates);
    if !gallery.is_empty() {
        return Some(gallery);
    }
    images::pick_main_image(&candidates).map(|main| vec![main])
}

fn grab_int(pattern: &Regex, haystack: &str) -> Option<u32> {
    pattern
        .captures(haystack)
        .and_then(|caps| caps[1].parse::<u32>().ok())
}

fn grab_float(pattern: &Regex, haystack: &str) -> Option<f64> {
    pattern
        .captures(haystack)
        .and_then(|caps| text::parse_decimal_comma(&caps[1]))
        .filter(|n| *n >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn page(body: &str) -> DetailPage {
        DetailPage::new(
            body,
            Url::parse("https://www.pisos.com/alquilar/piso-os_mallos_a_falperra-170923456_109800/").unwrap(),
        )
    }

    #[test]
    fn listing_id_from_url_digits() {
        let p = page("<html></html>");
        assert_eq!(listing_id(&p).as_deref(), Some("170923456"));
    }

    #[test]
    fn price_from_styled_element() {
        let p = page(r#"<div class="price-tag">950 € /mes</div>"#);
        assert_eq!(price_eur(&p), Some(950));
    }

    #[test]
    fn price_with_thousands_dot() {
        let p = page(r#"<span class="detailPrice">1.200 €</span>"#);
        assert_eq!(price_eur(&p), Some(1200));
    }

    #[test]
    fn price_from_bare_text_node() {
        let p = page("<p>Alquiler por solo 875 € al mes</p>");
        assert_eq!(price_eur(&p), Some(875));
    }

    #[test]
    fn price_ignores_script_text() {
        let p = page(r#"<script>var x = "9.999 €";</script><div>sin precio</div>"#);
        assert_eq!(price_eur(&p), None);
    }

    #[test]
    fn rooms_and_bathrooms_synonyms() {
        let features = "3 habitaciones 2 baños 85 m² construidos";
        assert_eq!(rooms(features), Some(3));
        assert_eq!(bathrooms(features), Some(2));
        assert_eq!(surface_m2(features), Some(85));

        let features = "2 dormitorios 1 aseo";
        assert_eq!(rooms(features), Some(2));
        assert_eq!(bathrooms(features), Some(1));
    }

    #[test]
    fn usable_surface_beats_built() {
        let features = "90 m² construidos 78,5 m² útiles";
        assert_eq!(surface_m2(features), Some(78));
    }

    #[test]
    fn features_text_is_collected_lowercase() {
        let p = page(r#"<ul class="features-list"><li>3 Habitaciones</li><li>1 Baño</li></ul>"#);
        let features = features_text(&p);
        assert_eq!(rooms(&features), Some(3));
        assert_eq!(bathrooms(&features), Some(1));
    }

    #[test]
    fn floor_descriptor_text() {
        let p = page("<div><span>Planta 4ª con ascensor</span></div>");
        assert_eq!(floor(&p).as_deref(), Some("Planta 4ª con ascensor"));
    }

    #[test]
    fn interior_pins_exterior_to_false() {
        let p = page("<div>Piso interior con ascensor</div>");
        let (elevator, exterior) = flags(&p);
        assert_eq!(elevator, TriState::Yes);
        assert_eq!(exterior, TriState::No);
    }

    #[test]
    fn unstated_flags_stay_unknown() {
        let p = page("<div>Piso luminoso</div>");
        let (elevator, exterior) = flags(&p);
        assert_eq!(elevator, TriState::Unknown);
        assert_eq!(exterior, TriState::Unknown);
    }

    #[test]
    fn phone_prefers_tel_link() {
        let p = page(r#"<a href="tel:+34981123456">Llamar</a><script>"phone":"600 11 22 33"</script>"#);
        assert_eq!(phone(&p).as_deref(), Some("+34981123456"));
    }

    #[test]
    fn phone_from_script_digit_groups() {
        let p = page(r#"<script>var contact = {"phone": "981 12 34 56"};</script>"#);
        assert_eq!(phone(&p).as_deref(), Some("981 12 34 56"));

        let p = page(r#"<script>var agent = {"telefono": "+34 600 123 456"};</script>"#);
        assert_eq!(phone(&p).as_deref(), Some("+34 600 123 456"));
    }

    #[test]
    fn unkeyed_digit_runs_are_not_phones() {
        let p = page(r#"<script>var listing = {"id": 170923456, "ts": 1719230000};</script>"#);
        assert_eq!(phone(&p), None);
    }

    #[test]
    fn published_at_from_updated_text() {
        let p = page("<span>Actualizado el 12/10/2025</span>");
        assert_eq!(published_at(&p).as_deref(), Some("2025-10-12"));
    }

    #[test]
    fn published_at_from_meta_tag() {
        let p = page(r#"<meta property="article:modified_time" content="2025-06-01T10:00:00Z">"#);
        assert_eq!(published_at(&p).as_deref(), Some("2025-06-01"));
    }

    #[test]
    fn coordinates_from_data_attrs() {
        let p = page(r#"<div id="map" data-lat="43.3623" data-lng="-8.4115"></div>"#);
        assert_eq!(coordinates(&p), Some((43.3623, -8.4115)));
    }

    #[test]
    fn coordinates_from_script_pair() {
        let p = page(r#"<script>{"geo":{"latitude":"43,3701","longitude":"-8,3959"}}</script>"#);
        assert_eq!(coordinates(&p), Some((43.3701, -8.3959)));
    }

    #[test]
    fn coordinates_from_map_center() {
        let p = page(r#"<script>var mapCenter = {lat: 43.35, lng: -8.41};</script>"#);
        assert_eq!(coordinates(&p), Some((43.35, -8.41)));
    }

    #[test]
    fn coordinates_from_center_query_param() {
        let p = page(
            r#"<iframe src="https://maps.example.com/embed?zoom=15&center=43.3623,-8.4115"></iframe>"#,
        );
        assert_eq!(coordinates(&p), Some((43.3623, -8.4115)));
    }

    #[test]
    fn neighborhood_from_breadcrumb() {
        let p = page(
            r#"<nav><a href="/alquiler/pisos-a_coruna_capital">A Coruña</a>
               <a href="/alquiler/pisos-a_coruna_capital/os_mallos">Os Mallos</a></nav>"#,
        );
        assert_eq!(neighborhood(&p, Some("A Coruña")).as_deref(), Some("A Coruña"));
    }

    #[test]
    fn neighborhood_from_slug_strips_type_word() {
        let p = page("<html></html>");
        assert_eq!(
            neighborhood(&p, None).as_deref(),
            Some("Os Mallos A Falperra")
        );
    }

    #[test]
    fn gallery_resolves_and_cleans() {
        let p = page(
            r#"<img src="/img/logo-pisos.png">
               <img data-src="/fotos/170923456/1.jpg">
               <img src="https://cdn.pisos.com/fotos/170923456/2.jpg">
               <img src="https://cdn.pisos.com/fotos/170923456/1.jpg">"#,
        );
        // data-src thumbnail resolves against the page URL host
        assert_eq!(
            gallery_images(&p),
            Some(vec![
                "https://www.pisos.com/fotos/170923456/1.jpg".to_string(),
                "https://cdn.pisos.com/fotos/170923456/2.jpg".to_string(),
                "https://cdn.pisos.com/fotos/170923456/1.jpg".to_string(),
            ])
        );
    }
}
