use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored answer to one question of the questionnaire
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionnaireResponse {
    pub id: i64,
    pub user_id: i64,
    pub question_id: String,
    pub answer_text: Option<String>,
    pub answer_number: Option<f64>,
    pub answer_json: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Answer submitted by a client
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NewResponse {
    pub question_id: String,
    #[serde(default)]
    pub answer_text: Option<String>,
    #[serde(default)]
    pub answer_number: Option<f64>,
    #[serde(default)]
    pub answer_json: Option<serde_json::Value>,
}

impl NewResponse {
    pub fn has_answer(&self) -> bool {
        self.answer_text.as_deref().is_some_and(|t| !t.trim().is_empty())
            || self.answer_number.is_some()
            || self.answer_json.is_some()
    }
}

/// How a question is answered in the UI
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Select,
    Number,
}

/// Shape of the profile value an answer becomes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerShape {
    /// A single label or free-text choice
    Label,
    /// Several choices
    List,
    /// Whole number; ranges such as "4-8" resolve to their midpoint
    Whole,
    Decimal,
}

/// One entry of the fixed question bank
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Question {
    /// Also the profile field the answer populates
    pub id: &'static str,
    pub topic: &'static str,
    pub text: &'static str,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(skip_serializing_if = "no_options")]
    pub options: &'static [&'static str],
    pub multiple: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip)]
    pub shape: AnswerShape,
}

fn no_options(options: &&'static [&'static str]) -> bool {
    options.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_answer() {
        let mut response = NewResponse {
            question_id: "skin_type".to_string(),
            answer_text: Some("  ".to_string()),
            answer_number: None,
            answer_json: None,
        };
        assert!(!response.has_answer());
        response.answer_number = Some(3.0);
        assert!(response.has_answer());
    }

    #[test]
    fn test_question_serialization() {
        let question = Question {
            id: "number_of_sprays",
            topic: "Application",
            text: "How many sprays do you typically use?",
            kind: QuestionKind::Number,
            options: &[],
            multiple: false,
            min: Some(1.0),
            max: Some(20.0),
            shape: AnswerShape::Whole,
        };
        let json = serde_json::to_value(&question).unwrap();
        assert_eq!(json["type"], "number");
        assert!(json.get("options").is_none());
        assert_eq!(json["max"], 20.0);
        assert!(json.get("shape").is_none());
    }
}
