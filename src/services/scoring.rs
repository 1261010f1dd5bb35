//! Utility-scoring recommendation model.
//!
//! For a (profile, perfume, context) triple the engine derives two curves over wear time:
//! self-pleasantness `Pself(t)` and projection `S(t)`, both on a 0-10 scale. The utility of a
//! perfume is the integral of `Pself(t) + λ·S(t)` over the user's wear window, where λ is the
//! profile's projection weight. Candidates that survive the profile's hard filters are ranked
//! by that utility.

use serde::Serialize;

use crate::models::{
    contains_ignore_case, Airflow, Answer, FragranceFamily, HumidityBand, Intensity, Level,
    Perfume, Predictions, Presentation, Season, Sillage, SkinTemperature, SkinType,
    SprayLocation, TemperatureBand, UserProfile,
};

/// Number of sample points used to integrate the utility curve
pub const SAMPLE_POINTS: usize = 20;

const PREFERRED_FAMILY_WEIGHT: f64 = 2.0;
const DISLIKED_FAMILY_WEIGHT: f64 = -3.0;
const BASE_PLEASANTNESS: f64 = 5.0;
const UNKNOWN_FAMILY_EVAPORATION: f64 = 0.3;
/// Budget bounds at or beyond these values are treated as "no limit"
const BUDGET_FLOOR: f64 = 0.0;
const BUDGET_CEILING: f64 = 1000.0;
const MAX_SCORE: f64 = 10.0;

/// Conditions for one wear; unset climate values fall back to the profile
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoringContext {
    pub temperature_band: Option<TemperatureBand>,
    pub humidity_band: Option<HumidityBand>,
    pub airflow: Option<Airflow>,
    /// Free text such as "rainy", only used in explanations
    pub weather: Option<String>,
    pub activity: Option<String>,
}

/// A ranked candidate
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScoredPerfume {
    pub perfume: Perfume,
    pub predictions: Predictions,
    pub explanation: String,
}

/// Curves for a single (profile, perfume, context) triple with every time-independent
/// factor already folded in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Curves {
    base_pleasantness: f64,
    intensity_match: f64,
    musk_adaptation: bool,
    base_sillage: f64,
    decay_rate: f64,
    sillage_scale: f64,
}

impl Curves {
    /// Self-pleasantness `Pself(t)`, `t` in hours since application
    pub fn pleasantness(&self, t: f64) -> f64 {
        let adaptation = if self.musk_adaptation {
            (1.0 - 0.3 * t).max(0.2)
        } else {
            1.0
        };
        let value = self.base_pleasantness * note_factor(t) * adaptation * self.intensity_match;
        value.clamp(0.0, MAX_SCORE)
    }

    /// Projection / sillage `S(t)`, `t` in hours since application
    pub fn sillage(&self, t: f64) -> f64 {
        let value = self.base_sillage * (-self.decay_rate * t).exp() * self.sillage_scale;
        value.clamp(0.0, MAX_SCORE)
    }
}

/// Top notes dominate the first two hours, heart notes until six, base notes after
fn note_factor(t: f64) -> f64 {
    if t <= 2.0 {
        1.0
    } else if t <= 6.0 {
        0.8 + 0.2 * (-(t - 2.0) * 0.3).exp()
    } else {
        0.6 + 0.4 * (-(t - 6.0) * 0.1).exp()
    }
}

/// Stateless scorer; cheap to construct and share
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecommendationEngine {
    samples: usize,
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RecommendationEngine {
    pub fn new() -> Self {
        Self {
            samples: SAMPLE_POINTS,
        }
    }

    /// Engine with a custom sample count (at least two)
    pub fn with_samples(samples: usize) -> Self {
        Self {
            samples: samples.max(2),
        }
    }

    /// Preference weight of a family: preferred +2, disliked -3 (dislike wins), else 0
    pub fn personal_weight(profile: &UserProfile, family: Option<FragranceFamily>) -> f64 {
        match family {
            Some(family) if profile.dislikes(family) => DISLIKED_FAMILY_WEIGHT,
            Some(family) if profile.prefers(family) => PREFERRED_FAMILY_WEIGHT,
            _ => 0.0,
        }
    }

    /// Skin chemistry multiplier on longevity and projection
    pub fn skin_factor(profile: &UserProfile) -> f64 {
        let skin_type = match profile.skin_type {
            SkinType::Oily => 1.3,
            SkinType::Dry => 0.7,
            SkinType::Balanced => 1.0,
        };
        let temperature = match profile.skin_temperature {
            SkinTemperature::Warm => 1.2,
            SkinTemperature::Cool => 0.9,
            SkinTemperature::Neutral => 1.0,
        };
        let hydration = match profile.skin_hydration {
            Level::High => 1.1,
            Level::Low => 0.9,
            Level::Medium => 1.0,
        };
        skin_type * temperature * hydration
    }

    /// Climate multiplier; context values take precedence over the profile's averages
    pub fn environmental_factor(profile: &UserProfile, context: &ScoringContext) -> f64 {
        let temperature = match context.temperature_band.unwrap_or(profile.avg_temperature) {
            TemperatureBand::Cold => 0.7,
            TemperatureBand::Mild => 1.0,
            TemperatureBand::Warm => 1.3,
            TemperatureBand::Hot => 1.6,
        };
        let humidity = match context.humidity_band.unwrap_or(profile.avg_humidity) {
            HumidityBand::Dry => 1.2,
            HumidityBand::Moderate => 1.0,
            HumidityBand::Humid => 0.8,
        };
        let airflow = match context.airflow.or(profile.airflow) {
            Some(Airflow::Still) => 0.8,
            Some(Airflow::Breezy) => 1.4,
            Some(Airflow::Normal) | None => 1.0,
        };
        temperature * humidity * airflow
    }

    /// Evaporation rate per hour of a family's dominant materials
    pub fn evaporation_rate(family: Option<FragranceFamily>) -> f64 {
        match family {
            Some(FragranceFamily::Citrus) => 0.8,
            Some(FragranceFamily::Green) => 0.6,
            Some(FragranceFamily::Aromatic) => 0.5,
            Some(FragranceFamily::Floral) => 0.4,
            Some(FragranceFamily::WhiteFloral) => 0.3,
            Some(FragranceFamily::Fruity) => 0.7,
            Some(FragranceFamily::Chypre) => 0.2,
            Some(FragranceFamily::Woody) => 0.15,
            Some(FragranceFamily::Amber) => 0.1,
            Some(FragranceFamily::OrientalSpicy) => 0.12,
            Some(FragranceFamily::Leather) => 0.08,
            Some(FragranceFamily::Musk) => 0.05,
            None => UNKNOWN_FAMILY_EVAPORATION,
        }
    }

    /// 1.0 for an exact intensity match, minus 0.3 per step of difference, floored at 0.5
    pub fn intensity_match(perfume: Intensity, preferred: Intensity) -> f64 {
        let diff = f64::from((perfume.scale() - preferred.scale()).abs());
        (1.0 - diff * 0.3).max(0.5)
    }

    fn application_factor(location: SprayLocation) -> f64 {
        match location {
            SprayLocation::ClothesOnly => 1.2,
            SprayLocation::Mix => 1.1,
            SprayLocation::SkinOnly => 1.0,
        }
    }

    fn base_sillage(sillage: Sillage) -> f64 {
        match sillage {
            Sillage::Light => 2.0,
            Sillage::Moderate => 5.0,
            Sillage::Heavy => 8.0,
        }
    }

    /// Folds every time-independent factor into a pair of curves
    pub fn curves(
        &self,
        perfume: &Perfume,
        profile: &UserProfile,
        context: &ScoringContext,
    ) -> Curves {
        let family = perfume.family();
        let env = Self::environmental_factor(profile, context);
        let skin = Self::skin_factor(profile);
        let sprays = (f64::from(profile.number_of_sprays) / 3.0).min(2.0);

        Curves {
            base_pleasantness: BASE_PLEASANTNESS + Self::personal_weight(profile, family),
            intensity_match: Self::intensity_match(
                perfume.details.intensity,
                profile.preferred_intensity,
            ),
            musk_adaptation: family == Some(FragranceFamily::Musk)
                && profile.self_anosmia_musks == Some(Answer::Yes),
            base_sillage: Self::base_sillage(perfume.details.sillage),
            decay_rate: Self::evaporation_rate(family) * env,
            sillage_scale: env * skin * Self::application_factor(profile.spray_location) * sprays,
        }
    }

    /// Integrates the utility curve over the wear window and derives the predictions
    pub fn score(
        &self,
        perfume: &Perfume,
        profile: &UserProfile,
        context: &ScoringContext,
    ) -> Predictions {
        let curves = self.curves(perfume, profile, context);
        let start = f64::from(profile.time_window_start);
        let end = f64::from(profile.time_window_end);
        let lambda = profile.projection_weight;
        let dt = (end - start) / (self.samples - 1) as f64;

        let mut utility = 0.0;
        let mut pleasantness_sum = 0.0;
        let mut sillage_sum = 0.0;
        let mut previous: Option<f64> = None;

        for i in 0..self.samples {
            let t = start + dt * i as f64;
            let pleasantness = curves.pleasantness(t);
            let sillage = curves.sillage(t);
            let value = pleasantness + lambda * sillage;

            if let Some(prev) = previous {
                utility += (prev + value) * 0.5 * dt;
            }
            previous = Some(value);
            pleasantness_sum += pleasantness;
            sillage_sum += sillage;
        }

        let samples = self.samples as f64;
        let env = Self::environmental_factor(profile, context);
        let skin = Self::skin_factor(profile);
        let mean_sillage = sillage_sum / samples;

        Predictions {
            longevity: f64::from(perfume.details.longevity_hours) * skin / env,
            projection: mean_sillage,
            sillage: mean_sillage,
            pleasantness: pleasantness_sum / samples,
            utility_score: utility,
        }
    }

    /// Hard filters: budget, disliked families, allergies, presentation and season
    pub fn is_candidate(profile: &UserProfile, perfume: &Perfume) -> bool {
        let details = &perfume.details;

        if let Some(min) = profile.budget_min.filter(|min| *min > BUDGET_FLOOR) {
            if !details.price.is_some_and(|price| price >= min) {
                return false;
            }
        }
        if let Some(max) = profile.budget_max.filter(|max| *max < BUDGET_CEILING) {
            if !details.price.is_some_and(|price| price <= max) {
                return false;
            }
        }

        if profile
            .disliked_families
            .iter()
            .any(|family| contains_ignore_case(&details.fragrance_family, family.label()))
        {
            return false;
        }

        let allergic = profile
            .allergies
            .iter()
            .filter(|allergy| !allergy.trim().is_empty())
            .any(|allergy| {
                details
                    .allergens
                    .iter()
                    .map(String::as_str)
                    .chain(perfume.notes())
                    .any(|ingredient| contains_ignore_case(ingredient, allergy))
            });
        if allergic {
            return false;
        }

        if profile.gender_presentation != Presentation::Unisex
            && details.gender_presentation != profile.gender_presentation
            && details.gender_presentation != Presentation::Unisex
        {
            return false;
        }

        if profile.seasonal_focus != Season::AllYear
            && details.seasonal_focus != profile.seasonal_focus
            && details.seasonal_focus != Season::AllYear
        {
            return false;
        }

        true
    }

    /// Filters, scores and ranks the catalog; best utility first, ties by perfume id
    pub fn rank(
        &self,
        profile: &UserProfile,
        context: &ScoringContext,
        catalog: &[Perfume],
        limit: usize,
    ) -> Vec<ScoredPerfume> {
        let mut scored: Vec<ScoredPerfume> = catalog
            .iter()
            .filter(|perfume| Self::is_candidate(profile, perfume))
            .map(|perfume| {
                let predictions = self.score(perfume, profile, context);
                ScoredPerfume {
                    explanation: explain(profile, perfume, &predictions, context),
                    perfume: perfume.clone(),
                    predictions,
                }
            })
            .collect();

        tracing::debug!(
            catalog = catalog.len(),
            candidates = scored.len(),
            limit,
            "Scored recommendation candidates"
        );

        scored.sort_by(|a, b| {
            b.predictions
                .utility_score
                .total_cmp(&a.predictions.utility_score)
                .then_with(|| a.perfume.id.cmp(&b.perfume.id))
        });
        scored.truncate(limit);
        scored
    }
}

/// Longevity above which oily skin is called out
const OILY_SKIN_LONGEVITY_HOURS: f64 = 6.0;

fn explain(
    profile: &UserProfile,
    perfume: &Perfume,
    predictions: &Predictions,
    context: &ScoringContext,
) -> String {
    let mut reasons = Vec::new();

    match perfume.family() {
        Some(family) if profile.prefers(family) => {
            reasons.push(format!("matches your preferred {} family", family))
        }
        Some(family) => reasons.push(format!("{} family", family)),
        None => reasons.push(format!("{} family", perfume.details.fragrance_family)),
    }

    if perfume.details.intensity == profile.preferred_intensity {
        reasons.push(format!(
            "{} intensity as you prefer",
            perfume.details.intensity.label().to_lowercase()
        ));
    }

    let situation = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    if let Some(weather) = situation(&context.weather) {
        reasons.push(format!("suitable for {} weather", weather));
    }
    if let Some(activity) = situation(&context.activity) {
        reasons.push(format!("appropriate for {}", activity));
    }

    match profile.skin_type {
        SkinType::Oily if predictions.longevity > OILY_SKIN_LONGEVITY_HOURS => {
            reasons.push("long-lasting on your oily skin".to_string())
        }
        SkinType::Dry => reasons.push("works well with dry skin".to_string()),
        _ => {}
    }

    reasons.push(format!(
        "predicted to last about {:.1} h with sillage {:.1}/10",
        predictions.longevity, predictions.sillage
    ));
    if predictions.longevity >= f64::from(profile.longevity_target) {
        reasons.push(format!(
            "meets your {} h longevity target",
            profile.longevity_target
        ));
    }

    let mut explanation = reasons.join("; ");
    if let Some(first) = explanation.get(0..1) {
        let capital = first.to_uppercase();
        explanation.replace_range(0..1, &capital);
    }
    explanation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::perfume::fixtures::perfume;

    const EPS: f64 = 1e-9;

    fn profile() -> UserProfile {
        UserProfile::defaults(1)
    }

    fn woody() -> Perfume {
        perfume(1, "Santal", "Woody")
    }

    #[test]
    fn test_personal_weights() {
        let mut p = profile();
        p.preferred_families = vec![FragranceFamily::Woody, FragranceFamily::Musk];
        p.disliked_families = vec![FragranceFamily::Musk];

        let weight = |family| RecommendationEngine::personal_weight(&p, Some(family));
        assert_eq!(weight(FragranceFamily::Woody), 2.0);
        assert_eq!(weight(FragranceFamily::Musk), -3.0);
        assert_eq!(weight(FragranceFamily::Citrus), 0.0);
        assert_eq!(RecommendationEngine::personal_weight(&p, None), 0.0);
    }

    #[test]
    fn test_skin_factor() {
        let mut p = profile();
        assert!((RecommendationEngine::skin_factor(&p) - 1.0).abs() < EPS);

        p.skin_type = SkinType::Oily;
        p.skin_temperature = SkinTemperature::Warm;
        p.skin_hydration = Level::High;
        assert!((RecommendationEngine::skin_factor(&p) - 1.3 * 1.2 * 1.1).abs() < EPS);

        p.skin_type = SkinType::Dry;
        p.skin_temperature = SkinTemperature::Cool;
        p.skin_hydration = Level::Low;
        assert!((RecommendationEngine::skin_factor(&p) - 0.7 * 0.9 * 0.9).abs() < EPS);
    }

    #[test]
    fn test_environmental_factor_prefers_context() {
        let mut p = profile();
        p.avg_temperature = TemperatureBand::Hot;
        p.avg_humidity = HumidityBand::Dry;
        p.airflow = Some(Airflow::Breezy);

        let from_profile =
            RecommendationEngine::environmental_factor(&p, &ScoringContext::default());
        assert!((from_profile - 1.6 * 1.2 * 1.4).abs() < EPS);

        let context = ScoringContext {
            temperature_band: Some(TemperatureBand::Cold),
            humidity_band: Some(HumidityBand::Humid),
            airflow: Some(Airflow::Still),
            ..Default::default()
        };
        let from_context = RecommendationEngine::environmental_factor(&p, &context);
        assert!((from_context - 0.7 * 0.8 * 0.8).abs() < EPS);
    }

    #[test]
    fn test_intensity_match() {
        use Intensity::*;
        assert_eq!(RecommendationEngine::intensity_match(Moderate, Moderate), 1.0);
        assert!((RecommendationEngine::intensity_match(Light, Moderate) - 0.7).abs() < EPS);
        assert_eq!(RecommendationEngine::intensity_match(Light, Strong), 0.5);
    }

    #[test]
    fn test_evaporation_rates() {
        assert_eq!(
            RecommendationEngine::evaporation_rate(Some(FragranceFamily::Citrus)),
            0.8
        );
        assert_eq!(
            RecommendationEngine::evaporation_rate(Some(FragranceFamily::Musk)),
            0.05
        );
        assert_eq!(RecommendationEngine::evaporation_rate(None), 0.3);
    }

    #[test]
    fn test_pleasantness_curve_phases() {
        let engine = RecommendationEngine::new();
        let curves = engine.curves(&woody(), &profile(), &ScoringContext::default());

        assert!((curves.pleasantness(0.0) - 5.0).abs() < EPS);
        assert!((curves.pleasantness(2.0) - 5.0).abs() < EPS);
        let heart = 5.0 * (0.8 + 0.2 * (-0.6f64).exp());
        assert!((curves.pleasantness(4.0) - heart).abs() < EPS);
        let base = 5.0 * (0.6 + 0.4 * (-0.4f64).exp());
        assert!((curves.pleasantness(10.0) - base).abs() < EPS);
    }

    #[test]
    fn test_preferred_family_raises_pleasantness() {
        let mut p = profile();
        p.preferred_families = vec![FragranceFamily::Woody];
        let curves = RecommendationEngine::new().curves(&woody(), &p, &ScoringContext::default());
        assert!((curves.pleasantness(1.0) - 7.0).abs() < EPS);

        p.disliked_families = vec![FragranceFamily::Woody];
        let curves = RecommendationEngine::new().curves(&woody(), &p, &ScoringContext::default());
        assert!((curves.pleasantness(1.0) - 2.0).abs() < EPS);
    }

    #[test]
    fn test_musk_adaptation_for_anosmic_users() {
        let mut p = profile();
        p.self_anosmia_musks = Some(Answer::Yes);
        let musk = perfume(2, "Clean Skin", "Musk");
        let curves = RecommendationEngine::new().curves(&musk, &p, &ScoringContext::default());

        assert!((curves.pleasantness(0.0) - 5.0).abs() < EPS);
        assert!((curves.pleasantness(2.0) - 5.0 * 0.4).abs() < EPS);
        let floored = 5.0 * (0.8 + 0.2 * (-0.3f64).exp()) * 0.2;
        assert!((curves.pleasantness(3.0) - floored).abs() < EPS);

        p.self_anosmia_musks = Some(Answer::Unsure);
        let curves = RecommendationEngine::new().curves(&musk, &p, &ScoringContext::default());
        assert!((curves.pleasantness(2.0) - 5.0).abs() < EPS);
    }

    #[test]
    fn test_sillage_curve_decays() {
        let curves = RecommendationEngine::new().curves(&woody(), &profile(), &ScoringContext::default());
        let start = 5.0 * (2.0 / 3.0);
        assert!((curves.sillage(0.0) - start).abs() < EPS);
        assert!((curves.sillage(4.0) - start * (-0.6f64).exp()).abs() < EPS);
        assert!(curves.sillage(8.0) < curves.sillage(1.0));
    }

    #[test]
    fn test_sillage_is_clamped() {
        let mut p = profile();
        p.number_of_sprays = 9;
        p.spray_location = SprayLocation::ClothesOnly;
        p.skin_type = SkinType::Oily;
        let mut heavy = woody();
        heavy.details.sillage = Sillage::Heavy;

        let curves = RecommendationEngine::new().curves(&heavy, &p, &ScoringContext::default());
        assert_eq!(curves.sillage(0.0), 10.0);
    }

    #[test]
    fn test_utility_of_constant_curve() {
        let mut p = profile();
        p.time_window_start = 0;
        p.time_window_end = 2;
        p.projection_weight = 0.0;

        let predictions =
            RecommendationEngine::new().score(&woody(), &p, &ScoringContext::default());
        assert!((predictions.utility_score - 10.0).abs() < 1e-9);
        assert!((predictions.pleasantness - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_utility_adds_weighted_sillage() {
        let mut p = profile();
        p.time_window_start = 0;
        p.time_window_end = 2;
        p.projection_weight = 1.0;

        let predictions =
            RecommendationEngine::new().score(&woody(), &p, &ScoringContext::default());
        let s0 = 5.0 * (2.0 / 3.0);
        let sillage_integral = s0 / 0.15 * (1.0 - (-0.3f64).exp());
        assert!((predictions.utility_score - (10.0 + sillage_integral)).abs() < 1e-3);
    }

    #[test]
    fn test_longevity_prediction() {
        let mut p = profile();
        p.skin_type = SkinType::Oily;
        p.avg_temperature = TemperatureBand::Warm;

        let predictions =
            RecommendationEngine::new().score(&woody(), &p, &ScoringContext::default());
        assert!((predictions.longevity - 8.0 * 1.3 / 1.3).abs() < EPS);
        assert_eq!(predictions.projection, predictions.sillage);
    }

    #[test]
    fn test_candidate_filters() {
        let mut p = profile();
        p.disliked_families = vec![FragranceFamily::Floral];
        assert!(!RecommendationEngine::is_candidate(&p, &perfume(1, "A", "White Floral")));
        assert!(RecommendationEngine::is_candidate(&p, &woody()));

        let mut p = profile();
        p.allergies = vec!["cedar".to_string()];
        assert!(!RecommendationEngine::is_candidate(&p, &woody()));

        let mut p = profile();
        p.budget_max = Some(100.0);
        assert!(!RecommendationEngine::is_candidate(&p, &woody()));
        p.budget_max = Some(5000.0);
        assert!(RecommendationEngine::is_candidate(&p, &woody()));

        let mut p = profile();
        p.gender_presentation = Presentation::Feminine;
        let mut masculine = woody();
        masculine.details.gender_presentation = Presentation::Masculine;
        assert!(!RecommendationEngine::is_candidate(&p, &masculine));
        assert!(RecommendationEngine::is_candidate(&p, &woody()));

        let mut p = profile();
        p.seasonal_focus = Season::Summer;
        let mut winter = woody();
        winter.details.seasonal_focus = Season::Winter;
        assert!(!RecommendationEngine::is_candidate(&p, &winter));
    }

    #[test]
    fn test_unpriced_perfume_fails_active_budget() {
        let mut unpriced = woody();
        unpriced.details.price = None;
        assert!(!RecommendationEngine::is_candidate(&profile(), &unpriced));

        let mut p = profile();
        p.budget_min = None;
        p.budget_max = None;
        assert!(RecommendationEngine::is_candidate(&p, &unpriced));
    }

    #[test]
    fn test_rank_orders_by_utility_and_truncates() {
        let mut p = profile();
        p.preferred_families = vec![FragranceFamily::Amber];
        let catalog = vec![
            perfume(1, "Santal", "Woody"),
            perfume(2, "Ambre", "Amber"),
            perfume(3, "Zest", "Citrus"),
        ];

        let ranked = RecommendationEngine::new().rank(&p, &ScoringContext::default(), &catalog, 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].perfume.id, 2);
        assert!(ranked[0].predictions.utility_score >= ranked[1].predictions.utility_score);
        assert!(ranked[0].explanation.starts_with("Matches your preferred Amber family"));
    }

    #[test]
    fn test_rank_breaks_ties_by_id() {
        let catalog = vec![perfume(9, "Twin B", "Woody"), perfume(4, "Twin A", "Woody")];
        let ranked =
            RecommendationEngine::new().rank(&profile(), &ScoringContext::default(), &catalog, 5);
        let ids: Vec<i64> = ranked.iter().map(|s| s.perfume.id).collect();
        assert_eq!(ids, vec![4, 9]);
    }

    #[test]
    fn test_rank_empty_when_everything_filtered() {
        let mut p = profile();
        p.disliked_families = vec![FragranceFamily::Woody];
        let ranked =
            RecommendationEngine::new().rank(&p, &ScoringContext::default(), &[woody()], 5);
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_blank_allergies_do_not_filter() {
        let mut p = profile();
        p.allergies = vec![" ".to_string(), String::new()];
        assert!(RecommendationEngine::is_candidate(&p, &woody()));

        let ranked =
            RecommendationEngine::new().rank(&p, &ScoringContext::default(), &[woody()], 5);
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn test_explanation_mentions_situation() {
        let context = ScoringContext {
            weather: Some("rainy".to_string()),
            activity: Some(" office ".to_string()),
            ..Default::default()
        };
        let ranked = RecommendationEngine::new().rank(&profile(), &context, &[woody()], 1);
        let explanation = &ranked[0].explanation;
        assert!(explanation.contains("suitable for rainy weather"));
        assert!(explanation.contains("appropriate for office"));

        let plain =
            RecommendationEngine::new().rank(&profile(), &ScoringContext::default(), &[woody()], 1);
        assert!(!plain[0].explanation.contains("weather"));
    }

    #[test]
    fn test_explanation_skin_and_longevity_target() {
        let mut dry = profile();
        dry.skin_type = SkinType::Dry;
        dry.longevity_target = 1;
        let ranked = RecommendationEngine::new().rank(&dry, &ScoringContext::default(), &[woody()], 1);
        assert!(ranked[0].explanation.contains("works well with dry skin"));
        assert!(ranked[0].explanation.contains("meets your 1 h longevity target"));

        let mut oily = profile();
        oily.skin_type = SkinType::Oily;
        oily.longevity_target = 24;
        let ranked = RecommendationEngine::new().rank(&oily, &ScoringContext::default(), &[woody()], 1);
        // 8 h fixture on oily skin in a mild climate lasts well past 6 h
        assert!(ranked[0].explanation.contains("long-lasting on your oily skin"));
        assert!(!ranked[0].explanation.contains("longevity target"));
    }
}
