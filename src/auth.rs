//! Credentials, password hashing and bearer tokens.
//!
//! Tokens are HS256 JWTs carrying `sub` (user id) and `email`. Any failure to
//! verify one surfaces as [`TrackerError::Unauthenticated`].

use chrono::Duration;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rusqlite::{ErrorCode, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::db::{self, Database};
use crate::error::{Result, TrackerError};
use crate::models::{AuthPayload, Identity, User};
use crate::validate;

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// bcrypt ignores input past 72 bytes.
pub const MAX_PASSWORD_LENGTH: usize = 72;

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub bcrypt_cost: u32,
}

impl AuthSettings {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            jwt_secret: config.jwt_secret.clone(),
            token_ttl: config.token_ttl()?,
            bcrypt_cost: config.bcrypt_cost,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

pub fn signup(
    db: &Database,
    settings: &AuthSettings,
    email: &str,
    password: &str,
    name: Option<&str>,
) -> Result<AuthPayload> {
    let email = validate::email(email)?;
    validate_password(password)?;

    if find_user_by_email(db, &email)?.is_some() {
        return Err(TrackerError::Conflict("Email already in use".to_string()));
    }

    let user = User {
        id: Uuid::new_v4(),
        email,
        password_hash: bcrypt::hash(password, settings.bcrypt_cost)?,
        name: validate::optional_text(name),
        created_at: db::now(),
    };

    db.conn()
        .execute(
            "INSERT INTO users (id, email, password_hash, name, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.id.to_string(),
                user.email,
                user.password_hash,
                user.name,
                db::format_timestamp(&user.created_at),
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
                TrackerError::Conflict("Email already in use".to_string())
            }
            other => TrackerError::Database(other),
        })?;

    tracing::info!(user = %user.id, "user signed up");
    issue_token(settings, user.id, &user.email)
}

pub fn login(db: &Database, settings: &AuthSettings, email: &str, password: &str) -> Result<AuthPayload> {
    let email = email.trim().to_lowercase();
    let user = find_user_by_email(db, &email)?.ok_or(TrackerError::InvalidCredentials)?;

    if !bcrypt::verify(password, &user.password_hash)? {
        tracing::warn!(user = %user.id, "login rejected");
        return Err(TrackerError::InvalidCredentials);
    }

    tracing::info!(user = %user.id, "user logged in");
    issue_token(settings, user.id, &user.email)
}

pub fn issue_token(settings: &AuthSettings, user_id: Uuid, email: &str) -> Result<AuthPayload> {
    let now = chrono::Utc::now();
    let expires_at = now
        .checked_add_signed(settings.token_ttl)
        .ok_or_else(|| TrackerError::Token("token expiry out of range".to_string()))?;
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
    };
    let access_token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
    )
    .map_err(|e| TrackerError::Token(e.to_string()))?;
    Ok(AuthPayload { access_token })
}

/// Resolves a bearer token to the identity it was issued for.
pub fn authenticate(db: &Database, settings: &AuthSettings, token: &str) -> Result<Identity> {
    let token = token.trim();
    let token = token.strip_prefix("Bearer ").unwrap_or(token);

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.jwt_secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| {
        tracing::debug!(error = %e, "token rejected");
        TrackerError::Unauthenticated
    })?;

    let user_id = Uuid::parse_str(&data.claims.sub).map_err(|_| TrackerError::Unauthenticated)?;
    let exists: Option<String> = db
        .conn()
        .query_row(
            "SELECT id FROM users WHERE id = ?1",
            [user_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    if exists.is_none() {
        return Err(TrackerError::Unauthenticated);
    }

    Ok(Identity {
        user_id,
        email: data.claims.email,
    })
}

pub fn me(identity: &Identity) -> Identity {
    identity.clone()
}

pub fn find_user_by_email(db: &Database, email: &str) -> Result<Option<User>> {
    db.conn()
        .query_row(
            "SELECT id, email, password_hash, name, created_at FROM users WHERE email = ?1",
            [email],
            |row| {
                Ok(User {
                    id: db::get_uuid(row, 0)?,
                    email: row.get(1)?,
                    password_hash: row.get(2)?,
                    name: row.get(3)?,
                    created_at: db::get_timestamp(row, 4)?,
                })
            },
        )
        .optional()
        .map_err(TrackerError::from)
}

fn validate_password(password: &str) -> Result<()> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(TrackerError::invalid(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(TrackerError::invalid(format!(
            "password must be at most {} characters",
            MAX_PASSWORD_LENGTH
        )));
    }
    Ok(())
}
