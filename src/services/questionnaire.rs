//! The fixed question bank and the mapping from answers to profile fields.
//!
//! Question ids are the names of the [`ProfileInput`] fields they populate, so a set of answers
//! becomes a profile by assembling a JSON object and letting serde do the label parsing.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::{
    db::ScentStore,
    error::{AppError, AppResult},
    models::{
        AnswerShape, NewResponse, ProfileInput, Question, QuestionKind, QuestionnaireResponse,
    },
};

const fn select(
    id: &'static str,
    topic: &'static str,
    text: &'static str,
    options: &'static [&'static str],
    shape: AnswerShape,
) -> Question {
    Question {
        id,
        topic,
        text,
        kind: QuestionKind::Select,
        options,
        multiple: matches!(shape, AnswerShape::List),
        min: None,
        max: None,
        shape,
    }
}

const fn number(
    id: &'static str,
    topic: &'static str,
    text: &'static str,
    min: f64,
    max: f64,
    shape: AnswerShape,
) -> Question {
    Question {
        id,
        topic,
        text,
        kind: QuestionKind::Number,
        options: &[],
        multiple: false,
        min: Some(min),
        max: Some(max),
        shape,
    }
}

const LEVELS: &[&str] = &["Low", "Medium", "High"];
const FAMILIES: &[&str] = &[
    "Citrus",
    "Green",
    "Aromatic",
    "Floral",
    "White Floral",
    "Fruity",
    "Chypre",
    "Woody",
    "Amber",
    "Oriental/Spicy",
    "Leather",
    "Musk",
    "None",
];

#[rustfmt::skip]
static QUESTIONS: &[Question] = &[
    // Skin chemistry
    select("skin_type", "Skin Chemistry", "What is your skin type?", &["Dry", "Oily", "Balanced"], AnswerShape::Label),
    select("skin_temperature", "Skin Chemistry", "What is your skin temperature?", &["Cool", "Neutral", "Warm"], AnswerShape::Label),
    select("skin_hydration", "Skin Chemistry", "How would you describe your skin hydration?", LEVELS, AnswerShape::Label),
    select("skin_ph", "Skin Chemistry", "What is your skin pH level?", &["Acidic", "Neutral", "Alkaline", "Unknown"], AnswerShape::Label),
    select("recent_body_state", "Skin Chemistry", "Have you consumed caffeine or alcohol recently?", &["No caffeine/alcohol", "Caffeine", "Alcohol", "Both"], AnswerShape::Label),
    // Environment
    select("primary_climate", "Environment", "What is your primary climate?", &["Hot & Humid", "Hot & Dry", "Temperate", "Cold"], AnswerShape::Label),
    select("avg_temperature", "Environment", "What is your average temperature range?", &["<15°C", "15-25°C", "26-32°C", ">32°C"], AnswerShape::Label),
    select("avg_humidity", "Environment", "What is your average humidity level?", &["<30%", "30-60%", ">60%"], AnswerShape::Label),
    select("typical_environment", "Environment", "What is your typical environment?", &["Outdoor", "Indoor-still", "Indoor-AC", "Indoor-ventilated"], AnswerShape::Label),
    select("ventilation", "Environment", "What is the ventilation level?", LEVELS, AnswerShape::Label),
    select("airflow", "Environment", "How would you describe the airflow?", &["Still", "Normal", "Breezy"], AnswerShape::Label),
    // Preferences
    select("preferred_families", "Preferences", "Which fragrance families do you prefer? (Select up to 3)", FAMILIES, AnswerShape::List),
    select("disliked_families", "Preferences", "Which fragrance families do you dislike?", FAMILIES, AnswerShape::List),
    select("preferred_intensity", "Preferences", "What intensity do you prefer?", &["Skin scent", "Moderate", "Strong"], AnswerShape::Label),
    select("longevity_target", "Preferences", "What is your target longevity (hours)?", &["2-4", "4-8", "8-12", "12-24", "24+"], AnswerShape::Whole),
    select("gender_presentation", "Preferences", "What is your gender presentation?", &["Feminine", "Masculine", "Unisex"], AnswerShape::Label),
    select("preferred_character", "Preferences", "What character do you prefer?", &["Fresh/Clean", "Smooth/Creamy", "Rich/Deep", "Bold/Powerful", "Light/Airy", "Sweet/Playful"], AnswerShape::Label),
    select("projection_goal", "Preferences", "What projection goal do you have?", &["Close to skin", "Arm's length", "Room-filling"], AnswerShape::Label),
    select("sillage_tolerance_hot", "Preferences", "What is your sillage tolerance in hot weather?", LEVELS, AnswerShape::Label),
    select("seasonal_focus", "Preferences", "When do you prefer to wear fragrances?", &["Summer", "Winter", "All-year"], AnswerShape::Label),
    // Budget
    number("budget_min", "Budget", "What is your minimum budget?", 0.0, 2000.0, AnswerShape::Decimal),
    number("budget_max", "Budget", "What is your maximum budget?", 0.0, 2000.0, AnswerShape::Decimal),
    // Sensitivities
    select("allergies", "Sensitivities", "Do you have any allergies? (Select all that apply)", &["None", "Lavender", "Rose", "Jasmine", "Cinnamon", "Vanilla", "Musk", "Amber", "Oakmoss", "Patchouli"], AnswerShape::List),
    select("headache_triggers", "Sensitivities", "What triggers your headaches?", &["None", "Strong florals", "Heavy spices", "Sweet notes", "Animalic notes", "Smoky notes"], AnswerShape::List),
    select("self_anosmia_musks", "Sensitivities", "Are you anosmic to musks?", &["Yes", "No", "Unsure"], AnswerShape::Label),
    select("sensitivity_sweetness", "Sensitivities", "How sensitive are you to sweetness?", LEVELS, AnswerShape::Label),
    select("sensitivity_projection", "Sensitivities", "How sensitive are you to projection?", LEVELS, AnswerShape::Label),
    // Application
    number("number_of_sprays", "Application", "How many sprays do you typically use?", 1.0, 20.0, AnswerShape::Whole),
    select("preferred_concentration", "Application", "What concentration do you prefer?", &["EDT", "EDP", "Parfum", "Extrait"], AnswerShape::Label),
    select("spray_location", "Application", "Where do you typically spray?", &["Skin only", "Clothes only", "Mix"], AnswerShape::Label),
    select("fabric_type", "Application", "What type of fabric do you wear most?", &["Cotton", "Wool", "Synthetic", "Blend"], AnswerShape::Label),
    number("time_window_start", "Application", "What time do you start wearing fragrance? (hours after application)", 0.0, 23.0, AnswerShape::Whole),
    number("time_window_end", "Application", "What time do you stop wearing fragrance? (hours after application)", 1.0, 24.0, AnswerShape::Whole),
    select("projection_weight", "Application", "How important is projection in your fragrance choice?", &["0.2", "1.0", "2.0"], AnswerShape::Decimal),
];

pub fn questions() -> &'static [Question] {
    QUESTIONS
}

pub fn find_question(id: &str) -> Option<&'static Question> {
    QUESTIONS.iter().find(|q| q.id == id)
}

/// Parses "10+", "2000+" and "4-8" style answers
fn parse_number(raw: &str) -> Option<f64> {
    let raw = raw.trim().trim_end_matches('+').trim();
    if let Some((low, high)) = raw.split_once('-') {
        let low: f64 = low.trim().parse().ok()?;
        let high: f64 = high.trim().parse().ok()?;
        return Some((low + high) / 2.0);
    }
    raw.parse().ok()
}

fn invalid_answer(question: &Question, detail: &str) -> AppError {
    AppError::InvalidInput(format!("invalid answer to '{}': {}", question.id, detail))
}

/// Converts one stored answer into the JSON value of its profile field
fn answer_value(
    question: &Question,
    text: Option<&str>,
    number: Option<f64>,
    json: Option<&Value>,
) -> AppResult<Value> {
    let text = text.map(str::trim).filter(|t| !t.is_empty());

    match question.shape {
        AnswerShape::Label => match (text, json) {
            (Some(text), _) => Ok(Value::from(text)),
            (None, Some(Value::String(s))) => Ok(Value::from(s.as_str())),
            (None, Some(Value::Array(items))) => items
                .first()
                .cloned()
                .ok_or_else(|| invalid_answer(question, "no choice given")),
            (None, _) => match number {
                Some(n) => Ok(Value::from(n.to_string())),
                None => Err(invalid_answer(question, "expected a choice")),
            },
        },
        AnswerShape::List => match (json, text) {
            (Some(Value::Array(items)), _) => Ok(Value::Array(items.clone())),
            (Some(Value::String(s)), _) => Ok(Value::from(s.as_str())),
            (_, Some(text)) => Ok(Value::from(text)),
            _ => Err(invalid_answer(question, "expected a list of choices")),
        },
        AnswerShape::Whole | AnswerShape::Decimal => {
            let value = number
                .or_else(|| text.and_then(parse_number))
                .or_else(|| match json {
                    Some(Value::Number(n)) => n.as_f64(),
                    Some(Value::String(s)) => parse_number(s),
                    _ => None,
                })
                .filter(|v| v.is_finite())
                .ok_or_else(|| invalid_answer(question, "expected a number"))?;

            if let (Some(min), Some(max)) = (question.min, question.max) {
                if !(min..=max).contains(&value) {
                    return Err(invalid_answer(
                        question,
                        &format!("must be between {} and {}", min, max),
                    ));
                }
            }

            if question.shape == AnswerShape::Whole {
                if value < 0.0 {
                    return Err(invalid_answer(question, "must not be negative"));
                }
                Ok(Value::from(value.round() as u64))
            } else {
                Ok(Value::from(value))
            }
        }
    }
}

fn to_profile_input(fields: Map<String, Value>) -> AppResult<ProfileInput> {
    serde_json::from_value(Value::Object(fields))
        .map_err(|e| AppError::InvalidInput(format!("invalid questionnaire answer: {}", e)))
}

/// Checks that a submitted answer belongs to a known question and maps onto its profile field
pub fn validate_response(response: &NewResponse) -> AppResult<()> {
    let question = find_question(&response.question_id).ok_or_else(|| {
        AppError::InvalidInput(format!("unknown question '{}'", response.question_id))
    })?;
    if !response.has_answer() {
        return Err(AppError::InvalidInput(
            "an answer (text, number or json) is required".to_string(),
        ));
    }

    let value = answer_value(
        question,
        response.answer_text.as_deref(),
        response.answer_number,
        response.answer_json.as_ref(),
    )?;
    let mut fields = Map::new();
    fields.insert(question.id.to_string(), value);
    to_profile_input(fields).map(|_| ())
}

/// Builds a partial profile from the latest answer to each question.
///
/// `responses` must be ordered newest first; older answers to the same question are ignored,
/// as are answers to questions no longer in the bank.
pub fn profile_input_from_responses(
    responses: &[QuestionnaireResponse],
) -> AppResult<ProfileInput> {
    let mut seen = HashSet::new();
    let mut fields = Map::new();

    for response in responses {
        if !seen.insert(response.question_id.as_str()) {
            continue;
        }
        let Some(question) = find_question(&response.question_id) else {
            tracing::debug!(question_id = %response.question_id, "Skipping answer to unknown question");
            continue;
        };

        let value = answer_value(
            question,
            response.answer_text.as_deref(),
            response.answer_number,
            response.answer_json.as_ref(),
        )?;
        fields.insert(question.id.to_string(), value);
    }

    to_profile_input(fields)
}

/// Stores and lists questionnaire answers
#[derive(Clone)]
pub struct QuestionnaireService {
    store: Arc<dyn ScentStore>,
}

impl QuestionnaireService {
    pub fn new(store: Arc<dyn ScentStore>) -> Self {
        Self { store }
    }

    pub async fn submit(
        &self,
        user_id: i64,
        response: NewResponse,
    ) -> AppResult<QuestionnaireResponse> {
        validate_response(&response)?;
        if self.store.get_user(user_id).await?.is_none() {
            return Err(AppError::NotFound(format!("User {}", user_id)));
        }

        let stored = self.store.add_response(user_id, response).await?;
        tracing::debug!(user_id, question_id = %stored.question_id, "Questionnaire answer stored");
        Ok(stored)
    }

    pub async fn list(&self, user_id: i64) -> AppResult<Vec<QuestionnaireResponse>> {
        self.store.list_responses(user_id).await
    }

    pub async fn delete(&self, user_id: i64, response_id: i64) -> AppResult<()> {
        if !self.store.delete_response(user_id, response_id).await? {
            return Err(AppError::NotFound(format!(
                "Questionnaire response {}",
                response_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FragranceFamily, Intensity, SkinType, TemperatureBand, UserProfile};
    use chrono::Utc;
    use serde_json::json;

    fn response(id: i64, question_id: &str, text: Option<&str>, number: Option<f64>) -> QuestionnaireResponse {
        QuestionnaireResponse {
            id,
            user_id: 1,
            question_id: question_id.to_string(),
            answer_text: text.map(str::to_string),
            answer_number: number,
            answer_json: None,
            created_at: Utc::now(),
        }
    }

    fn new_response(question_id: &str, text: &str) -> NewResponse {
        NewResponse {
            question_id: question_id.to_string(),
            answer_text: Some(text.to_string()),
            answer_number: None,
            answer_json: None,
        }
    }

    #[test]
    fn test_question_ids_are_unique_profile_fields() {
        let mut ids = HashSet::new();
        for question in questions() {
            assert!(ids.insert(question.id), "duplicate id {}", question.id);
            let mut fields = Map::new();
            fields.insert(question.id.to_string(), Value::Null);
            assert!(to_profile_input(fields).is_ok(), "{} is not a profile field", question.id);
        }
        assert_eq!(questions().len(), 34);
    }

    #[test]
    fn test_every_select_option_is_accepted() {
        for question in questions() {
            for option in question.options {
                let answer = new_response(question.id, option);
                assert!(
                    validate_response(&answer).is_ok(),
                    "{} rejected option {}",
                    question.id,
                    option
                );
            }
        }
    }

    #[test]
    fn test_validate_rejects_unknown_and_empty() {
        assert!(validate_response(&new_response("favourite_colour", "Blue")).is_err());

        let mut empty = new_response("skin_type", "");
        empty.answer_text = None;
        assert!(validate_response(&empty).is_err());

        assert!(validate_response(&new_response("skin_type", "Scaly")).is_err());
        assert!(validate_response(&new_response("number_of_sprays", "40")).is_err());
    }

    #[test]
    fn test_parse_number_variants() {
        assert_eq!(parse_number("10+"), Some(10.0));
        assert_eq!(parse_number("4-8"), Some(6.0));
        assert_eq!(parse_number(" 0.2 "), Some(0.2));
        assert_eq!(parse_number("lots"), None);
    }

    #[test]
    fn test_latest_answer_wins() {
        let responses = vec![
            response(3, "skin_type", Some("Oily"), None),
            response(2, "number_of_sprays", None, Some(4.0)),
            response(1, "skin_type", Some("Dry"), None),
        ];

        let input = profile_input_from_responses(&responses).unwrap();
        assert_eq!(input.skin_type, Some(SkinType::Oily));
        assert_eq!(input.number_of_sprays, Some(4));
    }

    #[test]
    fn test_answers_build_a_valid_profile() {
        let mut families = response(5, "preferred_families", None, None);
        families.answer_json = Some(json!(["Woody", "Amber"]));
        let responses = vec![
            families,
            response(4, "avg_temperature", Some("26-32°C"), None),
            response(3, "preferred_intensity", Some("Skin scent"), None),
            response(2, "longevity_target", Some("8-12"), None),
            response(1, "allergies", Some("Rose, None"), None),
        ];

        let input = profile_input_from_responses(&responses).unwrap();
        let profile = input.apply(UserProfile::defaults(1)).unwrap();
        assert_eq!(
            profile.preferred_families,
            vec![FragranceFamily::Woody, FragranceFamily::Amber]
        );
        assert_eq!(profile.avg_temperature, TemperatureBand::Warm);
        assert_eq!(profile.preferred_intensity, Intensity::Light);
        assert_eq!(profile.longevity_target, 10);
        assert_eq!(profile.allergies, vec!["Rose".to_string()]);
    }

    #[test]
    fn test_unknown_questions_are_skipped() {
        let responses = vec![response(1, "retired_question", Some("x"), None)];
        assert_eq!(
            profile_input_from_responses(&responses).unwrap(),
            ProfileInput::default()
        );
    }
}
