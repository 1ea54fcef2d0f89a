use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use super::Claims;
use crate::{error::AppError, models::user::User, AppState};

/// Extractor for routes that need a verified bearer token.
pub struct AuthUser(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let claims = state.keys.verify(token)?;
        Ok(AuthUser(claims))
    }
}

/// Pulls the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers.get(AUTHORIZATION).ok_or(AppError::MissingToken)?;
    let value = value.to_str().map_err(|_| AppError::InvalidToken)?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => {
            let token = token.trim();
            if token.is_empty() {
                Err(AppError::InvalidToken)
            } else {
                Ok(token)
            }
        }
        _ => Err(AppError::InvalidToken),
    }
}

/// Extractor for seller-only routes: a valid token whose account holds the
/// seller role right now.
pub struct RequireSeller(pub User);

#[async_trait]
impl FromRequestParts<AppState> for RequireSeller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;
        let user = state.users.find_by_email(&claims.email).await?;
        authorize_seller(user).map(RequireSeller)
    }
}

pub fn authorize_seller(user: Option<User>) -> Result<User, AppError> {
    let user = user.ok_or(AppError::UserNotFound)?;
    if !user.is_seller() {
        tracing::warn!(email = %user.email, "non-seller attempted a seller action");
        return Err(AppError::Forbidden);
    }
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;
    use axum::http::HeaderValue;
    use mongodb::bson::Document;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn user(role: Role) -> User {
        User {
            id: None,
            email: "s@x.com".to_string(),
            role,
            wishlist: Vec::new(),
            profile: Document::new(),
        }
    }

    #[test]
    fn missing_header_is_missing_token() {
        assert!(matches!(
            bearer_token(&HeaderMap::new()),
            Err(AppError::MissingToken)
        ));
    }

    #[test]
    fn malformed_header_is_invalid_token() {
        for value in ["abc.def.ghi", "Basic abc", "Bearer ", "Bearer"] {
            assert!(
                matches!(bearer_token(&headers(value)), Err(AppError::InvalidToken)),
                "{value}"
            );
        }
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert_eq!(bearer_token(&headers("bearer abc.def")).unwrap(), "abc.def");
        assert_eq!(bearer_token(&headers("Bearer abc.def")).unwrap(), "abc.def");
    }

    #[test]
    fn seller_gate() {
        assert!(matches!(authorize_seller(None), Err(AppError::UserNotFound)));
        assert!(matches!(
            authorize_seller(Some(user(Role::Buyer))),
            Err(AppError::Forbidden)
        ));
        assert!(authorize_seller(Some(user(Role::Seller))).is_ok());
    }
}
