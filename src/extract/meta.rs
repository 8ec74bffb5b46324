//! Structured-metadata pass: the primary source of the field cascade.
//!
//! Detail pages embed one or more JSON-LD blocks describing the listing as
//! a schema.org entity. The first well-formed block wins; blocks that fail
//! to parse are skipped in favor of the next one.

use scraper::Selector;
use serde_json::Value;
use std::sync::LazyLock;

use super::{text, DetailPage};

static LD_JSON_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());

/// Fields the metadata pass managed to fill. Each slot is independent; the
/// fallback cascade only touches slots left `None` here.
#[derive(Debug, Default)]
pub struct MetaFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price_eur: Option<u32>,
    pub address: Option<String>,
    pub municipality: Option<String>,
    pub province: Option<String>,
    pub neighborhood: Option<String>,
    pub coordinates: Option<(f64, f64)>,
    pub agency: Option<String>,
    pub images: Option<Vec<String>>,
}

pub fn extract(page: &DetailPage) -> MetaFields {
    let Some(data) = first_block(page) else {
        return MetaFields::default();
    };

    let mut meta = MetaFields {
        title: str_field(&data, "name"),
        description: str_field(&data, "description"),
        ..MetaFields::default()
    };

    if let Some(offer) = data.get("offers").filter(|v| v.is_object()) {
        meta.price_eur = offer.get("price").and_then(price_value);
    }

    if let Some(addr) = data.get("address").filter(|v| v.is_object()) {
        meta.address = str_field(addr, "streetAddress");
        meta.municipality = str_field(addr, "addressLocality");
        meta.province = str_field(addr, "addressRegion");
        meta.neighborhood = str_field(addr, "addressNeighborhood");
    }

    if let Some(geo) = data.get("geo").filter(|v| v.is_object()) {
        let lat = geo.get("latitude").and_then(float_value);
        let lon = geo.get("longitude").and_then(float_value);
        if let (Some(lat), Some(lon)) = (lat, lon) {
            meta.coordinates = Some((lat, lon));
        }
    }

    meta.agency = ["seller", "publisher", "brand"]
        .iter()
        .find_map(|key| data.get(*key).and_then(name_value));

    meta.images = match data.get("image") {
        Some(Value::String(url)) => Some(vec![url.clone()]),
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
        ),
        _ => None,
    };

    meta
}

/// First well-formed JSON-LD block on the page. A top-level array counts
/// when it holds an object carrying `@type`; malformed blocks are skipped.
fn first_block(page: &DetailPage) -> Option<Value> {
    for el in page.html().select(&LD_JSON_SEL) {
        let raw = el.text().collect::<String>();
        match serde_json::from_str::<Value>(raw.trim()) {
            Ok(Value::Array(items)) => {
                if let Some(block) = items
                    .into_iter()
                    .find(|b| b.is_object() && b.get("@type").is_some())
                {
                    return Some(block);
                }
            }
            Ok(block @ Value::Object(_)) => return Some(block),
            _ => continue,
        }
    }
    None
}

fn str_field(data: &Value, key: &str) -> Option<String> {
    data.get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Offer prices arrive as numbers or locale-formatted strings
/// (`"1.234,50"`); either way the result is whole euros, truncated.
fn price_value(value: &Value) -> Option<u32> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => text::parse_decimal_comma(s)?,
        _ => return None,
    };
    (n.is_finite() && n >= 0.0).then_some(n as u32)
}

fn float_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => text::parse_tolerant_f64(s),
        _ => None,
    }
}

/// Seller/publisher/brand may be an object with a `name` or a bare string.
fn name_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Object(_) => str_field(value, "name"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn page_with_ld(json: &str) -> DetailPage {
        let body = format!(
            r#"<html><head><script type="application/ld+json">{json}</script></head><body></body></html>"#
        );
        DetailPage::new(
            &body,
            Url::parse("https://www.pisos.com/inmueble/piso-centro-123456789/").unwrap(),
        )
    }

    #[test]
    fn locale_price_string_truncates_to_euros() {
        let page = page_with_ld(
            r#"{"@type":"Product","name":"Piso en Centro","offers":{"price":"1.234,50"}}"#,
        );
        let meta = extract(&page);
        assert_eq!(meta.price_eur, Some(1234));
        assert_eq!(meta.title.as_deref(), Some("Piso en Centro"));
    }

    #[test]
    fn numeric_price_passes_through() {
        let page = page_with_ld(r#"{"@type":"Product","offers":{"price":950}}"#);
        assert_eq!(extract(&page).price_eur, Some(950));
    }

    #[test]
    fn unparsable_price_leaves_field_absent() {
        let page = page_with_ld(r#"{"@type":"Product","offers":{"price":"a consultar"}}"#);
        assert_eq!(extract(&page).price_eur, None);
    }

    #[test]
    fn address_and_geo_subobjects() {
        let page = page_with_ld(
            r#"{"@type":"Apartment",
                "address":{"streetAddress":"Rúa Barcelona 23","addressLocality":"A Coruña",
                           "addressRegion":"Galicia","addressNeighborhood":"Os Mallos"},
                "geo":{"latitude":"43,3623","longitude":-8.4115}}"#,
        );
        let meta = extract(&page);
        assert_eq!(meta.address.as_deref(), Some("Rúa Barcelona 23"));
        assert_eq!(meta.municipality.as_deref(), Some("A Coruña"));
        assert_eq!(meta.province.as_deref(), Some("Galicia"));
        assert_eq!(meta.neighborhood.as_deref(), Some("Os Mallos"));
        assert_eq!(meta.coordinates, Some((43.3623, -8.4115)));
    }

    #[test]
    fn malformed_block_is_skipped_for_next_one() {
        let body = r#"<html><head>
            <script type="application/ld+json">{not json</script>
            <script type="application/ld+json">{"@type":"Product","name":"Piso real"}</script>
            </head><body></body></html>"#;
        let page = DetailPage::new(
            body,
            Url::parse("https://www.pisos.com/inmueble/x-123456789/").unwrap(),
        );
        assert_eq!(extract(&page).title.as_deref(), Some("Piso real"));
    }

    #[test]
    fn array_block_needs_typed_object() {
        let page = page_with_ld(r#"[{"foo":1},{"@type":"Product","name":"Desde array"}]"#);
        assert_eq!(extract(&page).title.as_deref(), Some("Desde array"));
    }

    #[test]
    fn agency_from_seller_object() {
        let page = page_with_ld(
            r#"{"@type":"Product","seller":{"@type":"Organization","name":"Inmobiliaria Norte"}}"#,
        );
        assert_eq!(extract(&page).agency.as_deref(), Some("Inmobiliaria Norte"));
    }

    #[test]
    fn single_image_string_becomes_list() {
        let page = page_with_ld(r#"{"@type":"Product","image":"https://x/fotos/1.jpg"}"#);
        assert_eq!(
            extract(&page).images,
            Some(vec!["https://x/fotos/1.jpg".to_string()])
        );
    }
}
