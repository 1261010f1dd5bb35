use serde::{Deserialize, Serialize};

use super::{FragranceFamily, Intensity, Presentation, Season, Sillage};
use crate::error::{AppError, AppResult};

/// A catalog entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Perfume {
    pub id: i64,
    #[serde(flatten)]
    pub details: PerfumeDraft,
}

impl Perfume {
    /// Parsed family, when the catalog uses one of the known families
    pub fn family(&self) -> Option<FragranceFamily> {
        self.details.fragrance_family.parse().ok()
    }

    /// All notes, top to base
    pub fn notes(&self) -> impl Iterator<Item = &str> {
        self.details
            .top_notes
            .iter()
            .chain(&self.details.middle_notes)
            .chain(&self.details.base_notes)
            .map(String::as_str)
    }
}

/// Perfume fields without the id, used for inserts and updates
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerfumeDraft {
    pub name: String,
    pub brand: String,
    /// EDT, EDP, Parfum, Extrait
    pub concentration: String,
    pub price: Option<f64>,

    /// Free text so that blended families ("Woody Floral") are representable
    pub fragrance_family: String,
    pub intensity: Intensity,
    pub longevity_hours: u32,
    /// Close, Moderate, Strong
    pub projection: String,
    pub sillage: Sillage,

    #[serde(default)]
    pub top_notes: Vec<String>,
    #[serde(default)]
    pub middle_notes: Vec<String>,
    #[serde(default)]
    pub base_notes: Vec<String>,

    pub seasonal_focus: Season,
    pub gender_presentation: Presentation,

    /// Ingredients that might cause allergic reactions
    #[serde(default)]
    pub allergens: Vec<String>,
    pub image_url: Option<String>,
}

impl PerfumeDraft {
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() || self.brand.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "name and brand are required".to_string(),
            ));
        }
        if self.fragrance_family.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "fragrance_family is required".to_string(),
            ));
        }
        if let Some(price) = self.price {
            if !price.is_finite() || price < 0.0 {
                return Err(AppError::InvalidInput(
                    "price must be a non-negative number".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Catalog listing filters
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PerfumeFilter {
    /// Substring match on the fragrance family
    pub family: Option<String>,
    pub brand: Option<String>,
    pub presentation: Option<Presentation>,
    pub season: Option<Season>,
    pub max_price: Option<f64>,
}

impl PerfumeFilter {
    pub fn is_empty(&self) -> bool {
        *self == PerfumeFilter::default()
    }

    pub fn matches(&self, perfume: &Perfume) -> bool {
        let details = &perfume.details;

        if let Some(family) = &self.family {
            if !contains_ignore_case(&details.fragrance_family, family) {
                return false;
            }
        }
        if let Some(brand) = &self.brand {
            if !details.brand.eq_ignore_ascii_case(brand.trim()) {
                return false;
            }
        }
        if let Some(presentation) = self.presentation {
            if details.gender_presentation != presentation {
                return false;
            }
        }
        if let Some(season) = self.season {
            if details.seasonal_focus != season {
                return false;
            }
        }
        if let Some(max_price) = self.max_price {
            match details.price {
                Some(price) if price <= max_price => {}
                _ => return false,
            }
        }
        true
    }
}

/// Case-insensitive substring test
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack
        .to_lowercase()
        .contains(&needle.trim().to_lowercase())
}


#[cfg(test)]
mod tests {
    use super::fixtures::perfume;
    use super::*;

    #[test]
    fn test_family_parsing() {
        assert_eq!(perfume(1, "A", "Woody").family(), Some(FragranceFamily::Woody));
        assert_eq!(perfume(2, "B", "Gourmand").family(), None);
    }

    #[test]
    fn test_notes_order() {
        let santal = perfume(1, "A", "Woody");
        let notes: Vec<&str> = santal.notes().collect();
        assert_eq!(notes, vec!["Bergamot", "Iris", "Cedar"]);
    }

    #[test]
    fn test_serialized_shape_is_flat() {
        let json = serde_json::to_value(perfume(4, "Santal", "Woody")).unwrap();
        assert_eq!(json["id"], 4);
        assert_eq!(json["name"], "Santal");
        assert_eq!(json["sillage"], "Moderate");
        assert_eq!(json["seasonal_focus"], "All-year");
    }

    #[test]
    fn test_filter_matching() {
        let p = perfume(1, "A", "White Floral");
        assert!(PerfumeFilter::default().matches(&p));
        assert!(PerfumeFilter {
            family: Some("floral".into()),
            ..Default::default()
        }
        .matches(&p));
        assert!(!PerfumeFilter {
            max_price: Some(50.0),
            ..Default::default()
        }
        .matches(&p));
        assert!(!PerfumeFilter {
            season: Some(Season::Summer),
            ..Default::default()
        }
        .matches(&p));
    }

    #[test]
    fn test_draft_validation() {
        let mut draft = super::fixtures::draft("", "Woody");
        assert!(draft.validate().is_err());
        draft.name = "Ok".into();
        draft.price = Some(-1.0);
        assert!(draft.validate().is_err());
        draft.price = None;
        assert!(draft.validate().is_ok());
    }
}
