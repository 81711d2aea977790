use std::convert::Infallible;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::errors::ApiError;

/// Set by the upstream authentication layer for authenticated requests.
pub const USER_ID_HEADER: &str = "X-Auth-User-Id";
pub const USER_ADMIN_HEADER: &str = "X-Auth-User-Admin";

/// Identity the request acts as. Anonymous requests have no user id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthIdentity {
    pub user_id: Option<String>,
    pub admin: bool,
}

impl AuthIdentity {
    #[must_use]
    pub fn user(user_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            admin: false,
        }
    }

    #[must_use]
    pub fn admin(user_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            admin: true,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// # Errors
    ///
    /// Returns an unauthorized error for anonymous identities.
    pub fn require_authenticated(&self) -> Result<(), ApiError> {
        if self.is_authenticated() {
            return Ok(());
        }

        Err(ApiError::unauthorized("authentication required"))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToString::to_string);

        let admin = user_id.is_some()
            && parts
                .headers
                .get(USER_ADMIN_HEADER)
                .and_then(|value| value.to_str().ok())
                .is_some_and(|value| {
                    value.trim().eq_ignore_ascii_case("true") || value.trim() == "1"
                });

        Ok(Self { user_id, admin })
    }
}
