use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    db::ScentStore,
    error::{AppError, AppResult},
    models::{NewUser, PersonalInfo, Role, User, UserChanges},
};

pub const MIN_PASSWORD_LEN: usize = 8;

/// JWT payload of an access token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> AppResult<i64> {
        self.sub
            .parse()
            .map_err(|_| AppError::Unauthorized("Malformed token subject".to_string()))
    }
}

/// Returned by a successful login
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AccessToken {
    pub token: String,
    pub user_id: i64,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies HS256 access tokens
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn issue(&self, user: &User) -> AppResult<AccessToken> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))?;

        Ok(AccessToken {
            token,
            user_id: user.id,
            kind: "access_token",
            expires_at,
        })
    }

    /// Checks signature and expiry
    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))?;
        Ok(data.claims)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(flatten)]
    pub personal: PersonalInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Account update; personal fields that are left out keep their stored value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(flatten)]
    pub personal: PersonalInfo,
}

/// Registration, login and account management
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn ScentStore>,
    tokens: TokenIssuer,
    admin_emails: Vec<String>,
    hash_cost: u32,
}

impl AccountService {
    pub fn new(store: Arc<dyn ScentStore>, config: &Config) -> Self {
        Self {
            store,
            tokens: TokenIssuer::new(&config.jwt_secret, config.token_ttl_minutes),
            admin_emails: config.admin_emails(),
            hash_cost: config.bcrypt_cost,
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub async fn register(&self, request: RegisterRequest) -> AppResult<User> {
        let username = request.username.trim().to_string();
        let email = request.email.trim().to_string();
        validate_username(&username)?;
        validate_email(&email)?;
        validate_password(&request.password)?;

        let role = if self.admin_emails.contains(&email.to_lowercase()) {
            Role::Admin
        } else {
            Role::User
        };

        let password_hash = self.hash_password(request.password).await?;
        let user = self
            .store
            .create_user(NewUser {
                username,
                email,
                password_hash,
                role,
                personal: request.personal,
            })
            .await?;

        tracing::info!(user_id = user.id, role = %user.role, "User registered");
        Ok(user)
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<AccessToken> {
        let invalid = || AppError::Unauthorized("Invalid username or password".to_string());

        let user = self
            .store
            .find_user_by_username(request.username.trim())
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(request.password, user.password_hash.clone()).await? {
            tracing::warn!(user_id = user.id, "Failed login attempt");
            return Err(invalid());
        }

        tracing::debug!(user_id = user.id, "User logged in");
        self.tokens.issue(&user)
    }

    pub async fn get(&self, id: i64) -> AppResult<User> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {}", id)))
    }

    pub async fn list(&self) -> AppResult<Vec<User>> {
        self.store.list_users().await
    }

    pub async fn update(&self, id: i64, request: UpdateUserRequest) -> AppResult<User> {
        let current = self.get(id).await?;

        let username = request.username.map(|u| u.trim().to_string());
        if let Some(username) = &username {
            validate_username(username)?;
        }
        let email = request.email.map(|e| e.trim().to_string());
        if let Some(email) = &email {
            validate_email(email)?;
        }
        let password_hash = match request.password {
            Some(password) => {
                validate_password(&password)?;
                Some(self.hash_password(password).await?)
            }
            None => None,
        };

        let stored = current.personal;
        let personal = request.personal;
        let changes = UserChanges {
            username,
            email,
            password_hash,
            personal: Some(PersonalInfo {
                first_name: personal.first_name.or(stored.first_name),
                last_name: personal.last_name.or(stored.last_name),
                gender: personal.gender.or(stored.gender),
                age_group: personal.age_group.or(stored.age_group),
                country_of_residence: personal
                    .country_of_residence
                    .or(stored.country_of_residence),
                country_grew_up: personal.country_grew_up.or(stored.country_grew_up),
            }),
        };

        self.store
            .update_user(id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {}", id)))
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        if !self.store.delete_user(id).await? {
            return Err(AppError::NotFound(format!("User {}", id)));
        }
        tracing::info!(user_id = id, "User deleted");
        Ok(())
    }

    /// bcrypt is CPU-bound, so hashing runs on the blocking pool
    async fn hash_password(&self, password: String) -> AppResult<String> {
        let cost = self.hash_cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
            .map_err(AppError::from)
    }
}

async fn verify_password(password: String, hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
        .map_err(AppError::from)
}

fn validate_username(username: &str) -> AppResult<()> {
    if username.is_empty() {
        return Err(AppError::InvalidInput("username is required".to_string()));
    }
    Ok(())
}

fn validate_email(email: &str) -> AppResult<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AppError::InvalidInput(format!(
            "'{}' is not a valid e-mail address",
            email
        ))),
    }
}

fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidInput(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MockScentStore;

    fn config() -> Config {
        Config {
            admin_emails: "boss@example.com".to_string(),
            bcrypt_cost: 4,
            ..Default::default()
        }
    }

    fn user(id: i64, password_hash: String) -> User {
        User {
            id,
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash,
            role: Role::User,
            personal: PersonalInfo::default(),
            created_at: Utc::now(),
        }
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            username: " ada ".to_string(),
            email: email.to_string(),
            password: "correct horse".to_string(),
            personal: PersonalInfo::default(),
        }
    }

    #[test]
    fn test_token_round_trip() {
        let issuer = TokenIssuer::new("secret", 30);
        let token = issuer.issue(&user(7, String::new())).unwrap();
        assert_eq!(token.kind, "access_token");
        assert!(token.expires_at > Utc::now());

        let claims = issuer.verify(&token.token).unwrap();
        assert_eq!(claims.user_id().unwrap(), 7);
        assert_eq!(claims.role, Role::User);
    }

    #[test]
    fn test_token_with_wrong_secret_rejected() {
        let token = TokenIssuer::new("secret", 30)
            .issue(&user(7, String::new()))
            .unwrap();
        let result = TokenIssuer::new("other", 30).verify(&token.token);
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = TokenIssuer::new("secret", -10)
            .issue(&user(7, String::new()))
            .unwrap();
        let result = TokenIssuer::new("secret", 30).verify(&token.token);
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_register_hashes_and_assigns_role() {
        let mut store = MockScentStore::new();
        store
            .expect_create_user()
            .withf(|new| {
                new.username == "ada"
                    && new.role == Role::Admin
                    && bcrypt::verify("correct horse", &new.password_hash).unwrap_or(false)
            })
            .times(1)
            .returning(|new| {
                Ok(User {
                    role: new.role,
                    ..user(1, new.password_hash)
                })
            });

        let service = AccountService::new(Arc::new(store), &config());
        let registered = service
            .register(register_request("Boss@Example.com"))
            .await
            .unwrap();
        assert!(registered.is_admin());
    }

    #[tokio::test]
    async fn test_register_validates_before_storing() {
        let store = MockScentStore::new();
        let service = AccountService::new(Arc::new(store), &config());

        let bad_email = service.register(register_request("not-an-email")).await;
        assert!(matches!(bad_email, Err(AppError::InvalidInput(_))));

        let mut short = register_request("ada@example.com");
        short.password = "short".to_string();
        assert!(matches!(
            service.register(short).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_login_checks_password() {
        let hash = bcrypt::hash("correct horse", 4).unwrap();
        let mut store = MockScentStore::new();
        store
            .expect_find_user_by_username()
            .withf(|username| username == "ada")
            .returning(move |_| Ok(Some(user(3, hash.clone()))));

        let service = AccountService::new(Arc::new(store), &config());
        let token = service
            .login(LoginRequest {
                username: "ada".to_string(),
                password: "correct horse".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(token.user_id, 3);

        let wrong = service
            .login(LoginRequest {
                username: "ada".to_string(),
                password: "battery staple".to_string(),
            })
            .await;
        assert!(matches!(wrong, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_unknown_user_cannot_login() {
        let mut store = MockScentStore::new();
        store
            .expect_find_user_by_username()
            .returning(|_| Ok(None));

        let service = AccountService::new(Arc::new(store), &config());
        let result = service
            .login(LoginRequest {
                username: "ghost".to_string(),
                password: "whatever1".to_string(),
            })
            .await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_update_merges_personal_info() {
        let mut store = MockScentStore::new();
        store.expect_get_user().returning(|id| {
            let mut stored = user(id, String::new());
            stored.personal.first_name = Some("Ada".to_string());
            stored.personal.country_of_residence = Some("UK".to_string());
            Ok(Some(stored))
        });
        store
            .expect_update_user()
            .withf(|_, changes| {
                let personal = changes.personal.as_ref().unwrap();
                personal.first_name.as_deref() == Some("Ada")
                    && personal.country_of_residence.as_deref() == Some("France")
                    && changes.password_hash.is_none()
            })
            .returning(|id, changes| {
                let mut updated = user(id, String::new());
                updated.apply(changes);
                Ok(Some(updated))
            });

        let service = AccountService::new(Arc::new(store), &config());
        let request = UpdateUserRequest {
            personal: PersonalInfo {
                country_of_residence: Some("France".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let updated = service.update(5, request).await.unwrap();
        assert_eq!(updated.personal.country_of_residence.as_deref(), Some("France"));
    }
}
