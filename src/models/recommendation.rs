use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Situation a recommendation was generated for
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecommendationContext {
    pub mood: Option<String>,
    pub activity: Option<String>,
    pub weather: Option<String>,
    /// Degrees Celsius
    pub temperature: Option<f64>,
    /// Relative humidity in percent
    pub humidity: Option<f64>,
}

/// Model outputs for one perfume
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Predictions {
    /// Hours
    pub longevity: f64,
    /// 0-10
    pub projection: f64,
    /// 0-10
    pub sillage: f64,
    /// 0-10
    pub pleasantness: f64,
    pub utility_score: f64,
}

/// What the user reported after wearing the perfume
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Feedback {
    pub user_rating: Option<u8>,
    pub actual_longevity: Option<f64>,
    pub actual_projection: Option<u8>,
    pub actual_sillage: Option<u8>,
    pub user_notes: Option<String>,
    pub feedback_date: Option<DateTime<Utc>>,
}

/// A persisted recommendation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub id: i64,
    pub user_id: i64,
    pub perfume_id: i64,
    pub recommendation_date: DateTime<Utc>,
    pub context: RecommendationContext,
    pub predictions: Predictions,
    pub explanation: Option<String>,
    pub feedback: Feedback,
}

/// Recommendation about to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecommendation {
    pub user_id: i64,
    pub perfume_id: i64,
    pub context: RecommendationContext,
    pub predictions: Predictions,
    pub explanation: Option<String>,
}

/// Feedback submitted by a client
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct FeedbackInput {
    pub rating: Option<u8>,
    pub notes: Option<String>,
    pub actual_longevity: Option<f64>,
    pub actual_projection: Option<u8>,
    pub actual_sillage: Option<u8>,
}

impl FeedbackInput {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(rating) = self.rating {
            if !(1..=5).contains(&rating) {
                return Err(AppError::InvalidInput(
                    "rating must be between 1 and 5".to_string(),
                ));
            }
        }
        for (name, value) in [
            ("actual_projection", self.actual_projection),
            ("actual_sillage", self.actual_sillage),
        ] {
            if let Some(value) = value {
                if !(1..=10).contains(&value) {
                    return Err(AppError::InvalidInput(format!(
                        "{} must be between 1 and 10",
                        name
                    )));
                }
            }
        }
        if let Some(hours) = self.actual_longevity {
            if !hours.is_finite() || hours < 0.0 {
                return Err(AppError::InvalidInput(
                    "actual_longevity must be a non-negative number of hours".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Merges into existing feedback, stamping the feedback date
    pub fn merge_into(self, feedback: &mut Feedback, now: DateTime<Utc>) {
        if self.rating.is_some() {
            feedback.user_rating = self.rating;
        }
        if self.notes.is_some() {
            feedback.user_notes = self.notes;
        }
        if self.actual_longevity.is_some() {
            feedback.actual_longevity = self.actual_longevity;
        }
        if self.actual_projection.is_some() {
            feedback.actual_projection = self.actual_projection;
        }
        if self.actual_sillage.is_some() {
            feedback.actual_sillage = self.actual_sillage;
        }
        feedback.feedback_date = Some(now);
    }
}

pub const DEFAULT_PER_PAGE: u32 = 10;
pub const MAX_PER_PAGE: u32 = 100;

/// Pagination request; pages start at 1
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct PageRequest {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PageRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.page == 0 {
            return Err(AppError::InvalidInput("page starts at 1".to_string()));
        }
        if !(1..=MAX_PER_PAGE).contains(&self.per_page) {
            return Err(AppError::InvalidInput(format!(
                "per_page must be between 1 and {}",
                MAX_PER_PAGE
            )));
        }
        Ok(())
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }
}

/// One page of results
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_validation() {
        assert!(FeedbackInput {
            rating: Some(5),
            actual_projection: Some(10),
            ..Default::default()
        }
        .validate()
        .is_ok());
        assert!(FeedbackInput {
            rating: Some(6),
            ..Default::default()
        }
        .validate()
        .is_err());
        assert!(FeedbackInput {
            actual_sillage: Some(0),
            ..Default::default()
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_merge_keeps_unsent_fields() {
        let mut feedback = Feedback {
            user_rating: Some(2),
            user_notes: Some("too sweet".into()),
            ..Default::default()
        };
        let now = Utc::now();
        FeedbackInput {
            rating: Some(4),
            ..Default::default()
        }
        .merge_into(&mut feedback, now);

        assert_eq!(feedback.user_rating, Some(4));
        assert_eq!(feedback.user_notes.as_deref(), Some("too sweet"));
        assert_eq!(feedback.feedback_date, Some(now));
    }

    #[test]
    fn test_page_request() {
        let page = PageRequest {
            page: 3,
            per_page: 10,
        };
        assert_eq!(page.offset(), 20);
        assert!(page.validate().is_ok());
        assert!(PageRequest { page: 0, per_page: 10 }.validate().is_err());
        assert!(PageRequest { page: 1, per_page: 500 }.validate().is_err());
    }
}
