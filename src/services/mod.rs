pub mod accounts;
pub mod catalog;
pub mod profiles;
pub mod questionnaire;
pub mod recommendations;
pub mod scoring;
