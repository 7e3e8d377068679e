use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest},
        extractors::Session,
        password::{check_strength, hash_password, verify_password},
        repo_types::User,
        services::{is_valid_email, normalize_email},
        token::{JwtKeys, TokenKind},
    },
    error::{ok, ApiResult, AppError},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn issue_tokens(state: &AppState, user: User) -> ApiResult<AuthResponse> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign(user.id, TokenKind::Access)?;
    let refresh_token = keys.sign(user.id, TokenKind::Refresh)?;
    ok(AuthResponse {
        access_token,
        refresh_token,
        user: user.into(),
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<AuthResponse> {
    let email = normalize_email(&payload.email);

    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }
    check_strength(&payload.password)?;

    // Ensure email is not taken
    if User::find_by_email(&state.db, &email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(AppError::conflict("Email already registered"));
    }

    let hash = hash_password(&payload.password)?;
    let name = match payload.name.trim() {
        "" => email.split('@').next().unwrap_or_default().to_string(),
        n => n.to_string(),
    };
    let user = User::create(&state.db, &email, &name, &hash).await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    issue_tokens(&state, user)
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<AuthResponse> {
    let email = normalize_email(&payload.email);

    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }

    let invalid = || AppError::Unauthenticated("Invalid credentials".into());

    let Some(user) = User::find_by_email(&state.db, &email).await? else {
        warn!(%email, "login unknown email");
        return Err(invalid());
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(%email, user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    if user.banned {
        warn!(user_id = %user.id, "login by banned user");
        return Err(AppError::PermissionDenied("Account is banned".into()));
    }

    info!(user_id = %user.id, "user logged in");
    issue_tokens(&state, user)
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<AuthResponse> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify(&payload.refresh_token, TokenKind::Refresh)
        .map_err(|e| AppError::Unauthenticated(e.to_string()))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("User not found".into()))?;

    if user.banned {
        return Err(AppError::PermissionDenied("Account is banned".into()));
    }

    issue_tokens(&state, user)
}

#[instrument(skip(state))]
pub async fn get_me(State(state): State<AppState>, session: Session) -> ApiResult<PublicUser> {
    let user = User::find_by_id(&state.db, session.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("User not found".into()))?;
    ok(user.into())
}

#[cfg(test)]
mod me_tests {
    use super::*;

    #[test]
    fn public_user_hides_password_hash() {
        let user = User {
            id: uuid::Uuid::new_v4(),
            email: "test@example.com".to_string(),
            name: "Test".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: "member".to_string(),
            banned: false,
            ban_reason: None,
            created_at: time::OffsetDateTime::now_utc(),
        };

        let json = serde_json::to_string(&PublicUser::from(user)).unwrap();
        assert!(json.contains("test@example.com"));
        assert!(!json.contains("argon2"));
    }
}
