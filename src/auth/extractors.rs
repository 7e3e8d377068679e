use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use tracing::warn;
use uuid::Uuid;

use super::token::{JwtKeys, TokenKind};
use super::repo_types::User;
use crate::access::GlobalRole;
use crate::error::AppError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "session";

/// Extracts and validates the access JWT, returning the user ID.
pub struct AuthUser(pub Uuid);

/// Bearer token first, then the session cookie.
fn token_from_parts(parts: &Parts) -> Option<String> {
    if let Some(auth) = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        return auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .map(|t| t.trim().to_string());
    }
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = token_from_parts(parts)
            .ok_or_else(|| AppError::Unauthenticated("Missing credentials".into()))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(&token, TokenKind::Access).map_err(|e| {
            warn!(error = %e, "access token rejected");
            AppError::Unauthenticated(e.to_string())
        })?;

        Ok(AuthUser(claims.sub))
    }
}

/// Authenticated caller, re-read from the database on every request.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
    pub role: GlobalRole,
}

impl Session {
    pub fn is_super_admin(&self) -> bool {
        self.role == GlobalRole::SuperAdmin
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user_id) = AuthUser::from_request_parts(parts, state).await?;

        let user = User::find_by_id(&state.db, user_id)
            .await?
            .ok_or_else(AppError::unauthenticated)?;

        if user.banned {
            warn!(%user_id, "banned user rejected");
            return Err(AppError::PermissionDenied("Account is banned".into()));
        }

        Ok(Session {
            user_id: user.id,
            email: user.email,
            role: GlobalRole::parse(&user.role).unwrap_or(GlobalRole::Member),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(headers: &[(&str, &str)]) -> Parts {
        let mut req = Request::builder().uri("/");
        for (k, v) in headers {
            req = req.header(*k, *v);
        }
        req.body(()).unwrap().into_parts().0
    }

    #[test]
    fn bearer_header_wins() {
        let parts = parts_with(&[("authorization", "Bearer abc"), ("cookie", "session=zzz")]);
        assert_eq!(token_from_parts(&parts).as_deref(), Some("abc"));
    }

    #[test]
    fn falls_back_to_session_cookie() {
        let parts = parts_with(&[("cookie", "theme=dark; session=tok123")]);
        assert_eq!(token_from_parts(&parts).as_deref(), Some("tok123"));
    }

    #[test]
    fn non_bearer_scheme_yields_nothing() {
        let parts = parts_with(&[("authorization", "Basic Zm9vOmJhcg==")]);
        assert!(token_from_parts(&parts).is_none());
    }

    #[tokio::test]
    async fn missing_token_is_unauthenticated() {
        let state = AppState::fake();
        let mut parts = parts_with(&[]);
        let res = AuthUser::from_request_parts(&mut parts, &state).await;
        assert!(matches!(res, Err(AppError::Unauthenticated(_))));
    }

    #[tokio::test]
    async fn refresh_token_is_not_an_access_token() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let token = keys.sign(Uuid::new_v4(), TokenKind::Refresh).unwrap();
        let header = format!("Bearer {}", token);
        let mut parts = parts_with(&[("authorization", header.as_str())]);
        let res = AuthUser::from_request_parts(&mut parts, &state).await;
        assert!(matches!(res, Err(AppError::Unauthenticated(ref m)) if m == "Access token required"));
    }

    #[tokio::test]
    async fn valid_access_token_yields_user_id() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let user_id = Uuid::new_v4();
        let cookie = format!("session={}", keys.sign(user_id, TokenKind::Access).unwrap());
        let mut parts = parts_with(&[("cookie", cookie.as_str())]);
        let AuthUser(got) = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(got, user_id);
    }
}
