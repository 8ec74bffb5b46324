use serde::{Deserialize, Serialize};

/// Generic category-page titles start with this prefix ("Alquiler de pisos
/// en ..."); a record carrying one is not a real listing.
const CATEGORY_TITLE_PREFIX: &str = "alquiler de ";

/// A flag that a page may state as true, state as false, or not mention at
/// all. Serialized as `true`/`false`/`null` so sinks see a nullable boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "Option<bool>", from = "Option<bool>")]
pub enum TriState {
    #[default]
    Unknown,
    Yes,
    No,
}

impl From<TriState> for Option<bool> {
    fn from(value: TriState) -> Self {
        match value {
            TriState::Unknown => None,
            TriState::Yes => Some(true),
            TriState::No => Some(false),
        }
    }
}

impl From<Option<bool>> for TriState {
    fn from(value: Option<bool>) -> Self {
        match value {
            None => TriState::Unknown,
            Some(true) => TriState::Yes,
            Some(false) => TriState::No,
        }
    }
}

/// One extracted rental listing. Every field except `url` is optional:
/// extraction degrades to "absent" on any parse failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingRecord {
    pub url: String,
    pub listing_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub price_eur: Option<u32>,
    pub address: Option<String>,
    pub municipality: Option<String>,
    pub province: Option<String>,
    pub neighborhood: Option<String>,
    pub surface_m2: Option<u32>,
    pub rooms: Option<u32>,
    pub bathrooms: Option<u32>,
    /// Free text (e.g. "Planta 4ª"), absent when no floor is mentioned.
    pub floor: Option<String>,
    pub has_elevator: TriState,
    pub is_exterior: TriState,
    pub agency: Option<String>,
    pub phone: Option<String>,
    /// `YYYY-MM-DD` when the source text was normalizable, raw text otherwise.
    pub published_at: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub images: Option<Vec<String>>,
}

impl ListingRecord {
    pub fn new(url: String) -> Self {
        Self {
            url,
            listing_id: None,
            title: None,
            description: None,
            price_eur: None,
            address: None,
            municipality: None,
            province: None,
            neighborhood: None,
            surface_m2: None,
            rooms: None,
            bathrooms: None,
            floor: None,
            has_elevator: TriState::Unknown,
            is_exterior: TriState::Unknown,
            agency: None,
            phone: None,
            published_at: None,
            latitude: None,
            longitude: None,
            images: None,
        }
    }

    /// A record is worth emitting only when it has a price, or a title that
    /// is not a generic category heading. Category pages that slip past URL
    /// classification fail this check and are dropped.
    pub fn is_admissible(&self) -> bool {
        if self.price_eur.is_some() {
            return true;
        }
        match &self.title {
            Some(title) => !title.to_lowercase().starts_with(CATEGORY_TITLE_PREFIX),
            None => false,
        }
    }
}
