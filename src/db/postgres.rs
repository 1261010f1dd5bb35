use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, types::Json, FromRow, PgPool, Postgres, QueryBuilder};

use super::ScentStore;
use crate::error::{AppError, AppResult};
use crate::models::{
    Feedback, NewRecommendation, NewResponse, NewUser, PageRequest, Perfume, PerfumeDraft,
    PerfumeFilter, PersonalInfo, Predictions, QuestionnaireResponse, Recommendation,
    RecommendationContext, User, UserChanges, UserProfile,
};

/// Creates a PostgreSQL connection pool and brings the schema up to date
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}

const USER_COLUMNS: &str = "id, username, email, password_hash, role, first_name, last_name, \
     gender, age_group, country_of_residence, country_grew_up, created_at";

const PERFUME_COLUMNS: &str = "id, name, brand, concentration, price, fragrance_family, \
     intensity, longevity_hours, projection, sillage, top_notes, middle_notes, base_notes, \
     seasonal_focus, gender_presentation, allergens, image_url";

const RESPONSE_COLUMNS: &str =
    "id, user_id, question_id, answer_text, answer_number, answer_json, created_at";

const RECOMMENDATION_COLUMNS: &str = "id, user_id, perfume_id, recommendation_date, mood, \
     activity, weather, temperature, humidity, predicted_longevity, predicted_projection, \
     predicted_sillage, predicted_pleasantness, utility_score, explanation, user_rating, \
     actual_longevity, actual_projection, actual_sillage, user_notes, feedback_date";

/// Postgres-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Turns unique-constraint violations into `Conflict`
fn conflict_on_duplicate(err: sqlx::Error, what: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict(format!("{} is already taken", what))
        }
        _ => AppError::Database(err),
    }
}

#[derive(FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    first_name: Option<String>,
    last_name: Option<String>,
    gender: Option<String>,
    age_group: Option<String>,
    country_of_residence: Option<String>,
    country_grew_up: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> AppResult<Self> {
        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role.parse()?,
            personal: PersonalInfo {
                first_name: row.first_name,
                last_name: row.last_name,
                gender: row.gender,
                age_group: row.age_group,
                country_of_residence: row.country_of_residence,
                country_grew_up: row.country_grew_up,
            },
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct PerfumeRow {
    id: i64,
    name: String,
    brand: String,
    concentration: String,
    price: Option<f64>,
    fragrance_family: String,
    intensity: String,
    longevity_hours: i32,
    projection: String,
    sillage: String,
    top_notes: Vec<String>,
    middle_notes: Vec<String>,
    base_notes: Vec<String>,
    seasonal_focus: String,
    gender_presentation: String,
    allergens: Vec<String>,
    image_url: Option<String>,
}

impl TryFrom<PerfumeRow> for Perfume {
    type Error = AppError;

    fn try_from(row: PerfumeRow) -> AppResult<Self> {
        Ok(Perfume {
            id: row.id,
            details: PerfumeDraft {
                name: row.name,
                brand: row.brand,
                concentration: row.concentration,
                price: row.price,
                fragrance_family: row.fragrance_family,
                intensity: row.intensity.parse()?,
                longevity_hours: u32::try_from(row.longevity_hours).unwrap_or_default(),
                projection: row.projection,
                sillage: row.sillage.parse()?,
                top_notes: row.top_notes,
                middle_notes: row.middle_notes,
                base_notes: row.base_notes,
                seasonal_focus: row.seasonal_focus.parse()?,
                gender_presentation: row.gender_presentation.parse()?,
                allergens: row.allergens,
                image_url: row.image_url,
            },
        })
    }
}

#[derive(FromRow)]
struct ResponseRow {
    id: i64,
    user_id: i64,
    question_id: String,
    answer_text: Option<String>,
    answer_number: Option<f64>,
    answer_json: Option<Json<serde_json::Value>>,
    created_at: DateTime<Utc>,
}

impl From<ResponseRow> for QuestionnaireResponse {
    fn from(row: ResponseRow) -> Self {
        QuestionnaireResponse {
            id: row.id,
            user_id: row.user_id,
            question_id: row.question_id,
            answer_text: row.answer_text,
            answer_number: row.answer_number,
            answer_json: row.answer_json.map(|json| json.0),
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct RecommendationRow {
    id: i64,
    user_id: i64,
    perfume_id: i64,
    recommendation_date: DateTime<Utc>,
    mood: Option<String>,
    activity: Option<String>,
    weather: Option<String>,
    temperature: Option<f64>,
    humidity: Option<f64>,
    predicted_longevity: f64,
    predicted_projection: f64,
    predicted_sillage: f64,
    predicted_pleasantness: f64,
    utility_score: f64,
    explanation: Option<String>,
    user_rating: Option<i16>,
    actual_longevity: Option<f64>,
    actual_projection: Option<i16>,
    actual_sillage: Option<i16>,
    user_notes: Option<String>,
    feedback_date: Option<DateTime<Utc>>,
}

impl From<RecommendationRow> for Recommendation {
    fn from(row: RecommendationRow) -> Self {
        let small = |value: Option<i16>| value.and_then(|v| u8::try_from(v).ok());
        Recommendation {
            id: row.id,
            user_id: row.user_id,
            perfume_id: row.perfume_id,
            recommendation_date: row.recommendation_date,
            context: RecommendationContext {
                mood: row.mood,
                activity: row.activity,
                weather: row.weather,
                temperature: row.temperature,
                humidity: row.humidity,
            },
            predictions: Predictions {
                longevity: row.predicted_longevity,
                projection: row.predicted_projection,
                sillage: row.predicted_sillage,
                pleasantness: row.predicted_pleasantness,
                utility_score: row.utility_score,
            },
            explanation: row.explanation,
            feedback: Feedback {
                user_rating: small(row.user_rating),
                actual_longevity: row.actual_longevity,
                actual_projection: small(row.actual_projection),
                actual_sillage: small(row.actual_sillage),
                user_notes: row.user_notes,
                feedback_date: row.feedback_date,
            },
        }
    }
}

fn longevity_column(draft: &PerfumeDraft) -> AppResult<i32> {
    i32::try_from(draft.longevity_hours)
        .map_err(|_| AppError::InvalidInput("longevity_hours is out of range".to_string()))
}

#[async_trait]
impl ScentStore for PgStore {
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let row: UserRow = sqlx::query_as(&format!(
            "INSERT INTO users (username, email, password_hash, role, first_name, last_name, \
             gender, age_group, country_of_residence, country_grew_up) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.label())
        .bind(&user.personal.first_name)
        .bind(&user.personal.last_name)
        .bind(&user.personal.gender)
        .bind(&user.personal.age_group)
        .bind(&user.personal.country_of_residence)
        .bind(&user.personal.country_grew_up)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_duplicate(e, "username or e-mail"))?;

        row.try_into()
    }

    async fn get_user(&self, id: i64) -> AppResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let rows: Vec<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS))
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> AppResult<Option<User>> {
        let Some(mut user) = self.get_user(id).await? else {
            return Ok(None);
        };
        user.apply(changes);

        let row: UserRow = sqlx::query_as(&format!(
            "UPDATE users SET username = $2, email = $3, password_hash = $4, first_name = $5, \
             last_name = $6, gender = $7, age_group = $8, country_of_residence = $9, \
             country_grew_up = $10 WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.personal.first_name)
        .bind(&user.personal.last_name)
        .bind(&user.personal.gender)
        .bind(&user.personal.age_group)
        .bind(&user.personal.country_of_residence)
        .bind(&user.personal.country_grew_up)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_duplicate(e, "username or e-mail"))?;

        row.try_into().map(Some)
    }

    async fn delete_user(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_profile(&self, user_id: i64) -> AppResult<Option<UserProfile>> {
        let data: Option<Json<UserProfile>> =
            sqlx::query_scalar("SELECT data FROM user_profiles WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(data.map(|json| json.0))
    }

    async fn save_profile(&self, profile: UserProfile) -> AppResult<UserProfile> {
        let result = sqlx::query(
            "INSERT INTO user_profiles (user_id, data, updated_at) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id) DO UPDATE SET data = EXCLUDED.data, \
             updated_at = EXCLUDED.updated_at",
        )
        .bind(profile.user_id)
        .bind(Json(&profile))
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(profile),
            Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                Err(AppError::NotFound(format!("User {}", profile.user_id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_profile(&self, user_id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM user_profiles WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_response(
        &self,
        user_id: i64,
        response: NewResponse,
    ) -> AppResult<QuestionnaireResponse> {
        let row: ResponseRow = sqlx::query_as(&format!(
            "INSERT INTO questionnaire_responses \
             (user_id, question_id, answer_text, answer_number, answer_json) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            RESPONSE_COLUMNS
        ))
        .bind(user_id)
        .bind(&response.question_id)
        .bind(&response.answer_text)
        .bind(response.answer_number)
        .bind(response.answer_json.map(Json))
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn list_responses(&self, user_id: i64) -> AppResult<Vec<QuestionnaireResponse>> {
        let rows: Vec<ResponseRow> = sqlx::query_as(&format!(
            "SELECT {} FROM questionnaire_responses WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC",
            RESPONSE_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_response(&self, user_id: i64, response_id: i64) -> AppResult<bool> {
        let result =
            sqlx::query("DELETE FROM questionnaire_responses WHERE id = $1 AND user_id = $2")
                .bind(response_id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_perfume(&self, draft: PerfumeDraft) -> AppResult<Perfume> {
        let row: PerfumeRow = sqlx::query_as(&format!(
            "INSERT INTO perfumes (name, brand, concentration, price, fragrance_family, \
             intensity, longevity_hours, projection, sillage, top_notes, middle_notes, \
             base_notes, seasonal_focus, gender_presentation, allergens, image_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             RETURNING {}",
            PERFUME_COLUMNS
        ))
        .bind(&draft.name)
        .bind(&draft.brand)
        .bind(&draft.concentration)
        .bind(draft.price)
        .bind(&draft.fragrance_family)
        .bind(draft.intensity.label())
        .bind(longevity_column(&draft)?)
        .bind(&draft.projection)
        .bind(draft.sillage.label())
        .bind(&draft.top_notes)
        .bind(&draft.middle_notes)
        .bind(&draft.base_notes)
        .bind(draft.seasonal_focus.label())
        .bind(draft.gender_presentation.label())
        .bind(&draft.allergens)
        .bind(&draft.image_url)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn get_perfume(&self, id: i64) -> AppResult<Option<Perfume>> {
        let row: Option<PerfumeRow> = sqlx::query_as(&format!(
            "SELECT {} FROM perfumes WHERE id = $1",
            PERFUME_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Perfume::try_from).transpose()
    }

    async fn list_perfumes(&self, filter: &PerfumeFilter) -> AppResult<Vec<Perfume>> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM perfumes WHERE TRUE",
            PERFUME_COLUMNS
        ));

        if let Some(family) = &filter.family {
            query
                .push(" AND POSITION(LOWER(")
                .push_bind(family.trim().to_string())
                .push(") IN LOWER(fragrance_family)) > 0");
        }
        if let Some(brand) = &filter.brand {
            query
                .push(" AND LOWER(brand) = LOWER(")
                .push_bind(brand.trim().to_string())
                .push(")");
        }
        if let Some(presentation) = filter.presentation {
            query
                .push(" AND gender_presentation = ")
                .push_bind(presentation.label());
        }
        if let Some(season) = filter.season {
            query.push(" AND seasonal_focus = ").push_bind(season.label());
        }
        if let Some(max_price) = filter.max_price {
            query.push(" AND price <= ").push_bind(max_price);
        }
        query.push(" ORDER BY id");

        let rows: Vec<PerfumeRow> = query.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(Perfume::try_from).collect()
    }

    async fn update_perfume(&self, id: i64, draft: PerfumeDraft) -> AppResult<Option<Perfume>> {
        let row: Option<PerfumeRow> = sqlx::query_as(&format!(
            "UPDATE perfumes SET name = $2, brand = $3, concentration = $4, price = $5, \
             fragrance_family = $6, intensity = $7, longevity_hours = $8, projection = $9, \
             sillage = $10, top_notes = $11, middle_notes = $12, base_notes = $13, \
             seasonal_focus = $14, gender_presentation = $15, allergens = $16, image_url = $17 \
             WHERE id = $1 RETURNING {}",
            PERFUME_COLUMNS
        ))
        .bind(id)
        .bind(&draft.name)
        .bind(&draft.brand)
        .bind(&draft.concentration)
        .bind(draft.price)
        .bind(&draft.fragrance_family)
        .bind(draft.intensity.label())
        .bind(longevity_column(&draft)?)
        .bind(&draft.projection)
        .bind(draft.sillage.label())
        .bind(&draft.top_notes)
        .bind(&draft.middle_notes)
        .bind(&draft.base_notes)
        .bind(draft.seasonal_focus.label())
        .bind(draft.gender_presentation.label())
        .bind(&draft.allergens)
        .bind(&draft.image_url)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Perfume::try_from).transpose()
    }

    async fn delete_perfume(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM perfumes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_perfumes(&self) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM perfumes")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn insert_recommendations(
        &self,
        recommendations: Vec<NewRecommendation>,
    ) -> AppResult<Vec<Recommendation>> {
        let mut tx = self.pool.begin().await?;
        let mut stored = Vec::with_capacity(recommendations.len());

        for new in recommendations {
            let row: RecommendationRow = sqlx::query_as(&format!(
                "INSERT INTO recommendations (user_id, perfume_id, mood, activity, weather, \
                 temperature, humidity, predicted_longevity, predicted_projection, \
                 predicted_sillage, predicted_pleasantness, utility_score, explanation) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) RETURNING {}",
                RECOMMENDATION_COLUMNS
            ))
            .bind(new.user_id)
            .bind(new.perfume_id)
            .bind(&new.context.mood)
            .bind(&new.context.activity)
            .bind(&new.context.weather)
            .bind(new.context.temperature)
            .bind(new.context.humidity)
            .bind(new.predictions.longevity)
            .bind(new.predictions.projection)
            .bind(new.predictions.sillage)
            .bind(new.predictions.pleasantness)
            .bind(new.predictions.utility_score)
            .bind(&new.explanation)
            .fetch_one(&mut *tx)
            .await?;
            stored.push(row.into());
        }

        tx.commit().await?;
        Ok(stored)
    }

    async fn get_recommendation(&self, id: i64) -> AppResult<Option<Recommendation>> {
        let row: Option<RecommendationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM recommendations WHERE id = $1",
            RECOMMENDATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn list_recommendations(
        &self,
        user_id: i64,
        page: PageRequest,
    ) -> AppResult<(Vec<Recommendation>, u64)> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM recommendations WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        let rows: Vec<RecommendationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM recommendations WHERE user_id = $1 \
             ORDER BY recommendation_date DESC, id ASC LIMIT $2 OFFSET $3",
            RECOMMENDATION_COLUMNS
        ))
        .bind(user_id)
        .bind(i64::from(page.per_page))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok((rows.into_iter().map(Into::into).collect(), total.max(0) as u64))
    }

    async fn update_feedback(
        &self,
        id: i64,
        feedback: Feedback,
    ) -> AppResult<Option<Recommendation>> {
        let row: Option<RecommendationRow> = sqlx::query_as(&format!(
            "UPDATE recommendations SET user_rating = $2, actual_longevity = $3, \
             actual_projection = $4, actual_sillage = $5, user_notes = $6, feedback_date = $7 \
             WHERE id = $1 RETURNING {}",
            RECOMMENDATION_COLUMNS
        ))
        .bind(id)
        .bind(feedback.user_rating.map(i16::from))
        .bind(feedback.actual_longevity)
        .bind(feedback.actual_projection.map(i16::from))
        .bind(feedback.actual_sillage.map(i16::from))
        .bind(&feedback.user_notes)
        .bind(feedback.feedback_date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn delete_recommendation(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM recommendations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
