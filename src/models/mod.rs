pub mod labels;
pub mod perfume;
pub mod profile;
pub mod questionnaire;
pub mod recommendation;
pub mod user;

pub use labels::{
    Airflow, Answer, FragranceFamily, HumidityBand, Intensity, LabelError, Level, Presentation,
    Role, Season, Sillage, SkinTemperature, SkinType, SprayLocation, TemperatureBand,
};
pub use perfume::{contains_ignore_case, Perfume, PerfumeDraft, PerfumeFilter};
pub use profile::{split_csv, ProfileInput, UserProfile};
pub use questionnaire::{AnswerShape, NewResponse, Question, QuestionKind, QuestionnaireResponse};
pub use recommendation::{
    Feedback, FeedbackInput, NewRecommendation, Page, PageRequest, Predictions, Recommendation,
    RecommendationContext,
};
pub use user::{NewUser, PersonalInfo, User, UserChanges};
