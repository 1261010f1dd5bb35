use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::{
    error::{AppError, AppResult},
    models::Role,
    routes::AppState,
};

/// The caller of a protected route, taken from a `Bearer` access token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i64,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Users may act on their own resources; admins on anyone's
    pub fn ensure_self_or_admin(&self, user_id: i64) -> AppResult<()> {
        if self.user_id == user_id || self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "You may only access your own data".to_string(),
            ))
        }
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Administrator role required".to_string()))
        }
    }
}

fn bearer_token(parts: &Parts) -> AppResult<&str> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("Malformed Authorization header".to_string()))?;

    match header.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(AppError::Unauthorized(
            "Authorization header must be 'Bearer <token>'".to_string(),
        )),
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = state.accounts.tokens().verify(bearer_token(parts)?)?;
        let user = AuthUser {
            user_id: claims.user_id()?,
            role: claims.role,
        };
        tracing::debug!(user_id = user.user_id, role = %user.role, "Authenticated request");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/perfumes");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc.def"))).unwrap(), "abc.def");
        assert_eq!(bearer_token(&parts(Some("bearer  abc"))).unwrap(), "abc");
        assert!(bearer_token(&parts(Some("Basic dXNlcg=="))).is_err());
        assert!(bearer_token(&parts(Some("Bearer "))).is_err());
        assert!(bearer_token(&parts(None)).is_err());
    }

    #[test]
    fn test_access_rules() {
        let user = AuthUser {
            user_id: 1,
            role: Role::User,
        };
        assert!(user.ensure_self_or_admin(1).is_ok());
        assert!(matches!(
            user.ensure_self_or_admin(2),
            Err(AppError::Forbidden(_))
        ));
        assert!(user.require_admin().is_err());

        let admin = AuthUser {
            user_id: 9,
            role: Role::Admin,
        };
        assert!(admin.ensure_self_or_admin(2).is_ok());
        assert!(admin.require_admin().is_ok());
    }
}
