use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

use super::{
    Airflow, Answer, FragranceFamily, HumidityBand, Intensity, Level, Presentation, Season,
    SkinTemperature, SkinType, SprayLocation, TemperatureBand,
};
use crate::error::{AppError, AppResult};

/// Most preferred families a profile may list
pub const MAX_PREFERRED_FAMILIES: usize = 3;
/// Upper bound of the wear-time window, in hours
pub const MAX_WINDOW_HOURS: u32 = 24;
pub const MAX_SPRAYS: u32 = 20;
pub const MAX_PROJECTION_WEIGHT: f64 = 10.0;

/// A user's scent profile: skin chemistry, climate, taste, sensitivities and dosing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub user_id: i64,

    // Skin chemistry
    pub skin_type: SkinType,
    pub skin_temperature: SkinTemperature,
    pub skin_hydration: Level,
    pub skin_ph: Option<String>,
    pub recent_body_state: Option<String>,

    // Climate & environment
    pub primary_climate: String,
    pub avg_temperature: TemperatureBand,
    pub avg_humidity: HumidityBand,
    pub typical_environment: String,
    pub ventilation: Option<Level>,
    pub airflow: Option<Airflow>,

    // Preferences
    pub preferred_families: Vec<FragranceFamily>,
    pub disliked_families: Vec<FragranceFamily>,
    pub preferred_intensity: Intensity,
    pub longevity_target: u32,
    pub gender_presentation: Presentation,
    pub preferred_character: Option<String>,
    pub projection_goal: String,
    pub sillage_tolerance_hot: Level,
    pub seasonal_focus: Season,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,

    // Sensitivities & allergies
    pub allergies: Vec<String>,
    pub headache_triggers: Vec<String>,
    pub self_anosmia_musks: Option<Answer>,
    pub sensitivity_sweetness: Level,
    pub sensitivity_projection: Level,

    // Dose & application
    pub number_of_sprays: u32,
    pub preferred_concentration: String,
    pub spray_location: SprayLocation,
    pub fabric_type: Option<String>,

    // Decision window & weighting
    pub time_window_start: u32,
    pub time_window_end: u32,
    /// Lambda: how much projection counts against self-pleasantness
    pub projection_weight: f64,

    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Profile with every field at its default, used when a user has none yet
    pub fn defaults(user_id: i64) -> Self {
        Self {
            user_id,
            skin_type: SkinType::Balanced,
            skin_temperature: SkinTemperature::Neutral,
            skin_hydration: Level::Medium,
            skin_ph: None,
            recent_body_state: None,
            primary_climate: "Temperate".to_string(),
            avg_temperature: TemperatureBand::Mild,
            avg_humidity: HumidityBand::Moderate,
            typical_environment: "Indoor-ventilated".to_string(),
            ventilation: None,
            airflow: None,
            preferred_families: Vec::new(),
            disliked_families: Vec::new(),
            preferred_intensity: Intensity::Moderate,
            longevity_target: 6,
            gender_presentation: Presentation::Unisex,
            preferred_character: None,
            projection_goal: "Arm's length".to_string(),
            sillage_tolerance_hot: Level::Medium,
            seasonal_focus: Season::AllYear,
            budget_min: Some(0.0),
            budget_max: Some(300.0),
            allergies: Vec::new(),
            headache_triggers: Vec::new(),
            self_anosmia_musks: None,
            sensitivity_sweetness: Level::Medium,
            sensitivity_projection: Level::Medium,
            number_of_sprays: 2,
            preferred_concentration: "EDT".to_string(),
            spray_location: SprayLocation::SkinOnly,
            fabric_type: None,
            time_window_start: 0,
            time_window_end: 8,
            projection_weight: 1.0,
            updated_at: Utc::now(),
        }
    }

    pub fn prefers(&self, family: FragranceFamily) -> bool {
        self.preferred_families.contains(&family)
    }

    pub fn dislikes(&self, family: FragranceFamily) -> bool {
        self.disliked_families.contains(&family)
    }

    /// Checks the invariants the scoring model relies on
    pub fn validate(&self) -> AppResult<()> {
        if self.time_window_start >= self.time_window_end {
            return Err(AppError::InvalidInput(format!(
                "time_window_start ({}) must be before time_window_end ({})",
                self.time_window_start, self.time_window_end
            )));
        }
        if self.time_window_end > MAX_WINDOW_HOURS {
            return Err(AppError::InvalidInput(format!(
                "time_window_end must be at most {} hours",
                MAX_WINDOW_HOURS
            )));
        }
        if !self.projection_weight.is_finite()
            || !(0.0..=MAX_PROJECTION_WEIGHT).contains(&self.projection_weight)
        {
            return Err(AppError::InvalidInput(format!(
                "projection_weight must be between 0 and {}",
                MAX_PROJECTION_WEIGHT
            )));
        }
        if self.number_of_sprays > MAX_SPRAYS {
            return Err(AppError::InvalidInput(format!(
                "number_of_sprays must be at most {}",
                MAX_SPRAYS
            )));
        }
        if self.preferred_families.len() > MAX_PREFERRED_FAMILIES {
            return Err(AppError::InvalidInput(format!(
                "at most {} preferred families may be chosen",
                MAX_PREFERRED_FAMILIES
            )));
        }
        if let (Some(min), Some(max)) = (self.budget_min, self.budget_max) {
            if min > max {
                return Err(AppError::InvalidInput(
                    "budget_min must not exceed budget_max".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Partial profile as submitted by clients; unset fields keep their current value
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProfileInput {
    pub skin_type: Option<SkinType>,
    pub skin_temperature: Option<SkinTemperature>,
    pub skin_hydration: Option<Level>,
    pub skin_ph: Option<String>,
    pub recent_body_state: Option<String>,
    pub primary_climate: Option<String>,
    pub avg_temperature: Option<TemperatureBand>,
    pub avg_humidity: Option<HumidityBand>,
    pub typical_environment: Option<String>,
    pub ventilation: Option<Level>,
    pub airflow: Option<Airflow>,
    #[serde(deserialize_with = "list_or_csv")]
    pub preferred_families: Option<Vec<FragranceFamily>>,
    #[serde(deserialize_with = "list_or_csv")]
    pub disliked_families: Option<Vec<FragranceFamily>>,
    pub preferred_intensity: Option<Intensity>,
    pub longevity_target: Option<u32>,
    pub gender_presentation: Option<Presentation>,
    pub preferred_character: Option<String>,
    pub projection_goal: Option<String>,
    pub sillage_tolerance_hot: Option<Level>,
    pub seasonal_focus: Option<Season>,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    #[serde(deserialize_with = "list_or_csv")]
    pub allergies: Option<Vec<String>>,
    #[serde(deserialize_with = "list_or_csv")]
    pub headache_triggers: Option<Vec<String>>,
    pub self_anosmia_musks: Option<Answer>,
    pub sensitivity_sweetness: Option<Level>,
    pub sensitivity_projection: Option<Level>,
    pub number_of_sprays: Option<u32>,
    pub preferred_concentration: Option<String>,
    pub spray_location: Option<SprayLocation>,
    pub fabric_type: Option<String>,
    pub time_window_start: Option<u32>,
    pub time_window_end: Option<u32>,
    pub projection_weight: Option<f64>,
}

impl ProfileInput {
    /// Overlays the supplied fields on `base` and validates the result
    pub fn apply(self, mut base: UserProfile) -> AppResult<UserProfile> {
        macro_rules! overlay {
            ($($field:ident),+ $(,)?) => {
                $(if let Some(value) = self.$field {
                    base.$field = value;
                })+
            };
        }
        macro_rules! overlay_opt {
            ($($field:ident),+ $(,)?) => {
                $(if self.$field.is_some() {
                    base.$field = self.$field;
                })+
            };
        }

        overlay!(
            skin_type,
            skin_temperature,
            skin_hydration,
            primary_climate,
            avg_temperature,
            avg_humidity,
            typical_environment,
            preferred_families,
            disliked_families,
            preferred_intensity,
            longevity_target,
            gender_presentation,
            projection_goal,
            sillage_tolerance_hot,
            seasonal_focus,
            allergies,
            headache_triggers,
            sensitivity_sweetness,
            sensitivity_projection,
            number_of_sprays,
            preferred_concentration,
            spray_location,
            time_window_start,
            time_window_end,
            projection_weight,
        );
        overlay_opt!(
            skin_ph,
            recent_body_state,
            ventilation,
            airflow,
            preferred_character,
            budget_min,
            budget_max,
            self_anosmia_musks,
            fabric_type,
        );

        base.updated_at = Utc::now();
        base.validate()?;
        Ok(base)
    }
}

/// Splits a comma-separated answer, dropping blanks and explicit "None" choices
pub fn split_csv(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty() && !item.eq_ignore_ascii_case("none"))
}

/// Accepts either a JSON array or a comma-separated string; blank and "None" items are dropped
fn list_or_csv<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Csv(String),
    }

    let parse = |item: &str| item.parse::<T>().map_err(de::Error::custom);

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::List(items)) => items
            .iter()
            .flat_map(|item| split_csv(item))
            .map(parse)
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(Raw::Csv(raw)) => split_csv(&raw).map(parse).collect::<Result<Vec<_>, _>>().map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_are_valid() {
        let profile = UserProfile::defaults(1);
        assert!(profile.validate().is_ok());
        assert_eq!(profile.time_window_end, 8);
        assert_eq!(profile.projection_weight, 1.0);
    }

    #[test]
    fn test_apply_overrides_only_supplied_fields() {
        let input: ProfileInput = serde_json::from_value(json!({
            "skin_type": "Oily",
            "number_of_sprays": 4
        }))
        .unwrap();

        let profile = input.apply(UserProfile::defaults(3)).unwrap();
        assert_eq!(profile.skin_type, SkinType::Oily);
        assert_eq!(profile.number_of_sprays, 4);
        assert_eq!(profile.skin_temperature, SkinTemperature::Neutral);
        assert_eq!(profile.user_id, 3);
    }

    #[test]
    fn test_families_accept_list_or_csv() {
        let from_list: ProfileInput =
            serde_json::from_value(json!({ "preferred_families": ["Woody", "Amber"] })).unwrap();
        let from_csv: ProfileInput =
            serde_json::from_value(json!({ "preferred_families": "woody, Amber" })).unwrap();
        assert_eq!(from_list.preferred_families, from_csv.preferred_families);
        assert_eq!(
            from_csv.preferred_families,
            Some(vec![FragranceFamily::Woody, FragranceFamily::Amber])
        );
    }

    #[test]
    fn test_csv_drops_none_choice() {
        let input: ProfileInput =
            serde_json::from_value(json!({ "allergies": "None" })).unwrap();
        assert_eq!(input.allergies, Some(vec![]));
    }

    #[test]
    fn test_list_drops_blank_items() {
        let input: ProfileInput = serde_json::from_value(json!({
            "allergies": [" ", "", " Vanilla ", "none"],
            "disliked_families": ["None", " Musk"]
        }))
        .unwrap();
        assert_eq!(input.allergies, Some(vec!["Vanilla".to_string()]));
        assert_eq!(input.disliked_families, Some(vec![FragranceFamily::Musk]));
    }

    #[test]
    fn test_unknown_family_rejected() {
        let result: Result<ProfileInput, _> =
            serde_json::from_value(json!({ "preferred_families": "Gourmand" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_inverted_window_rejected() {
        let input = ProfileInput {
            time_window_start: Some(10),
            time_window_end: Some(4),
            ..Default::default()
        };
        let err = input.apply(UserProfile::defaults(1)).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_too_many_preferred_families_rejected() {
        let input = ProfileInput {
            preferred_families: Some(vec![
                FragranceFamily::Woody,
                FragranceFamily::Amber,
                FragranceFamily::Musk,
                FragranceFamily::Citrus,
            ]),
            ..Default::default()
        };
        assert!(input.apply(UserProfile::defaults(1)).is_err());
    }

    #[test]
    fn test_budget_bounds_checked() {
        let input = ProfileInput {
            budget_min: Some(200.0),
            budget_max: Some(50.0),
            ..Default::default()
        };
        assert!(input.apply(UserProfile::defaults(1)).is_err());
    }
}
