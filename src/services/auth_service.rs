use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordVerifier},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};

use crate::{
    dto::auth::{AdminLoginRequest, Claims, LoginResponse},
    error::{AppError, AppResult},
    middleware::auth::ADMIN_ROLE,
    response::ApiResponse,
    state::AppState,
};

const TOKEN_TTL_HOURS: i64 = 24;

pub fn issue_token(subject: &str, role: &str, secret: &str) -> AppResult<LoginResponse> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(TOKEN_TTL_HOURS))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: subject.to_string(),
        role: role.to_string(),
        exp: expiration.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?;

    Ok(LoginResponse {
        token: format!("Bearer {}", token),
        expires_at: expiration.timestamp(),
    })
}

pub async fn admin_login(
    state: &AppState,
    payload: AdminLoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let AdminLoginRequest { email, password } = payload;
    let config = &state.config;

    let (Some(admin_email), Some(password_hash)) =
        (config.admin_email.as_deref(), config.admin_password_hash.as_deref())
    else {
        tracing::warn!("admin login attempted but no operator credentials are configured");
        return Err(AppError::Unauthorized);
    };

    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;

    let password_ok = Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok();
    if !email.trim().eq_ignore_ascii_case(admin_email) || !password_ok {
        tracing::warn!("admin login rejected");
        return Err(AppError::Unauthorized);
    }

    let resp = issue_token(admin_email, ADMIN_ROLE, &config.jwt_secret)?;
    tracing::info!("admin logged in");

    Ok(ApiResponse::item("Logged in", resp))
}
