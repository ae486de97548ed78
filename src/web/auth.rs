use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{Html, Redirect},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration as ChronoDuration, Utc};
use cookie::time::Duration as CookieDuration;
use rand_core::OsRng;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use crate::web::{
    AppState,
    templates::{self, FlashQuery, server_error},
};

#[derive(Clone, sqlx::FromRow)]
pub struct DbUserAuth {
    pub id: Uuid,
    pub password_hash: String,
    pub is_admin: bool,
}

#[derive(Clone, sqlx::FromRow)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub is_admin: bool,
}

pub const SESSION_COOKIE: &str = "codecraft_session";
pub const SESSION_TTL_DAYS: i64 = 7;

#[derive(Deserialize)]
pub struct CredentialsForm {
    pub username: String,
    pub password: String,
}

pub async fn register_page(Query(flash): Query<FlashQuery>) -> Html<String> {
    Html(templates::render_register_page(&flash))
}

pub async fn process_register(
    State(state): State<AppState>,
    Form(form): Form<CredentialsForm>,
) -> Result<Redirect, (StatusCode, Html<String>)> {
    let username = form.username.trim();
    let pool = state.pool();

    match fetch_user_by_username(&pool, username).await {
        Ok(Some(_)) => return Ok(Redirect::to("/user-register?error=duplicate")),
        Ok(None) => {}
        Err(err) => {
            error!(?err, "failed to check username during registration");
            return Err(server_error());
        }
    }

    let password_hash = match hash_password(&form.password) {
        Ok(hash) => hash,
        Err(err) => {
            error!(%err, "failed to hash password during registration");
            return Err(server_error());
        }
    };

    if let Err(err) = sqlx::query(
        "INSERT INTO users (id, username, password_hash, is_admin, joined_on) VALUES ($1, $2, $3, FALSE, NOW())",
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(password_hash)
    .execute(state.pool_ref())
    .await
    {
        error!(?err, "failed to insert user during registration");
        return Err(server_error());
    }

    Ok(Redirect::to("/user-login?status=registered"))
}

pub async fn login_page(Query(flash): Query<FlashQuery>) -> Html<String> {
    Html(templates::render_user_login_page(&flash))
}

pub async fn process_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Result<(CookieJar, Redirect), (StatusCode, Html<String>)> {
    let username = form.username.trim();
    let pool = state.pool();

    let user = match fetch_user_by_username(&pool, username).await {
        Ok(Some(user)) => user,
        Ok(None) => return Ok((jar, Redirect::to("/user-login?error=not_found"))),
        Err(err) => {
            error!(?err, "failed to fetch user during login");
            return Err(server_error());
        }
    };

    // A hash that fails to parse as a PHC string counts as a corrupted
    // account, same flash as a wrong password.
    if !verify_password(&form.password, &user.password_hash) {
        return Ok((jar, Redirect::to("/user-login?error=bad_credentials")));
    }

    let jar = match open_session(&state, jar, user.id).await {
        Ok(jar) => jar,
        Err(err) => {
            error!(?err, "failed to create session");
            return Err(server_error());
        }
    };

    Ok((jar, Redirect::to("/splash?status=welcome")))
}

pub async fn user_logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    let jar = close_session(&state, jar).await;
    (jar, Redirect::to("/user-login?status=logged_out"))
}

pub async fn admin_login_page(Query(flash): Query<FlashQuery>) -> Html<String> {
    Html(templates::render_admin_login_page(&flash))
}

/// Admin sign-in runs through the same credential verification as regular
/// users, with the extra requirement that the account carries the admin role.
pub async fn process_admin_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Result<(CookieJar, Redirect), (StatusCode, Html<String>)> {
    let username = form.username.trim();
    let pool = state.pool();

    let user = match fetch_user_by_username(&pool, username).await {
        Ok(Some(user)) => user,
        Ok(None) => return Ok((jar, Redirect::to("/login?error=invalid"))),
        Err(err) => {
            error!(?err, "failed to fetch user during admin login");
            return Err(server_error());
        }
    };

    if !user.is_admin || !verify_password(&form.password, &user.password_hash) {
        return Ok((jar, Redirect::to("/login?error=invalid")));
    }

    let jar = match open_session(&state, jar, user.id).await {
        Ok(jar) => jar,
        Err(err) => {
            error!(?err, "failed to create admin session");
            return Err(server_error());
        }
    };

    Ok((jar, Redirect::to("/admin")))
}

pub async fn admin_logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    let jar = close_session(&state, jar).await;
    (jar, Redirect::to("/login"))
}

async fn open_session(state: &AppState, jar: CookieJar, user_id: Uuid) -> sqlx::Result<CookieJar> {
    let session_token = Uuid::new_v4();
    let expires_at = Utc::now() + ChronoDuration::days(SESSION_TTL_DAYS);

    sqlx::query("INSERT INTO sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
        .bind(session_token)
        .bind(user_id)
        .bind(expires_at)
        .execute(state.pool_ref())
        .await?;

    let mut cookie = Cookie::new(SESSION_COOKIE, session_token.to_string());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_max_age(CookieDuration::days(SESSION_TTL_DAYS));

    Ok(jar.add(cookie))
}

/// Remove the session row, its workspace, and the cookie. Safe to call with
/// no session present.
pub async fn close_session(state: &AppState, jar: CookieJar) -> CookieJar {
    let mut jar = jar;

    if let Some(token) = session_token(&jar) {
        if let Err(err) = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(token)
            .execute(state.pool_ref())
            .await
        {
            error!(?err, "failed to remove session during logout");
        }
        state.drop_workspace(token).await;
    }

    let mut removal = Cookie::new(SESSION_COOKIE, "");
    removal.set_path("/");
    removal.set_http_only(true);
    removal.set_same_site(SameSite::Lax);
    removal.set_max_age(CookieDuration::seconds(0));
    jar = jar.remove(removal);

    jar
}

pub fn session_token(jar: &CookieJar) -> Option<Uuid> {
    let cookie = jar.get(SESSION_COOKIE)?;
    Uuid::parse_str(cookie.value()).ok()
}

/// Resolve the current session to its user, requiring a live (unexpired)
/// session row. Returns the session token alongside the user so callers can
/// key workspace state off it.
pub async fn current_user(state: &AppState, jar: &CookieJar) -> Option<(Uuid, AuthUser)> {
    let token = session_token(jar)?;
    let pool = state.pool();

    match fetch_user_by_session(&pool, token).await {
        Ok(Some(user)) => Some((token, user)),
        Ok(None) => {
            // Expired or deleted session; its workspace can never be reached
            // again through this token.
            state.drop_workspace(token).await;
            None
        }
        Err(err) => {
            error!(?err, "failed to validate session");
            None
        }
    }
}

/// Gate for the user-facing pages; unauthenticated requests go to the login
/// page.
pub async fn require_user(state: &AppState, jar: &CookieJar) -> Result<(Uuid, AuthUser), Redirect> {
    current_user(state, jar)
        .await
        .ok_or_else(|| Redirect::to("/user-login"))
}

/// Gate for the admin view; non-admin sessions go to the admin login page.
pub async fn require_admin(state: &AppState, jar: &CookieJar) -> Result<AuthUser, Redirect> {
    match current_user(state, jar).await {
        Some((_, user)) if user.is_admin => Ok(user),
        _ => Err(Redirect::to("/login")),
    }
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let parsed = PasswordHash::new(password_hash);
    match parsed {
        Ok(hash) => Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok(),
        Err(_) => false,
    }
}

pub async fn fetch_user_by_username(
    pool: &PgPool,
    username: &str,
) -> sqlx::Result<Option<DbUserAuth>> {
    sqlx::query_as::<_, DbUserAuth>(
        "SELECT id, password_hash, is_admin FROM users WHERE username = $1",
    )
    .bind(username)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_user_by_session(pool: &PgPool, token: Uuid) -> sqlx::Result<Option<AuthUser>> {
    sqlx::query_as::<_, AuthUser>(
        "SELECT users.id, users.username, users.is_admin FROM sessions JOIN users ON users.id = sessions.user_id WHERE sessions.id = $1 AND sessions.expires_at > NOW()",
    )
    .bind(token)
    .fetch_optional(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trips() {
        let hash = hash_password("pw1").expect("hashing should succeed");
        assert!(verify_password("pw1", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn malformed_stored_hash_never_verifies() {
        assert!(!verify_password("pw1", "$2b$not-a-real-hash"));
        assert!(!verify_password("pw1", ""));
    }

    #[test]
    fn distinct_hashes_for_same_password() {
        let first = hash_password("pw1").expect("hashing should succeed");
        let second = hash_password("pw1").expect("hashing should succeed");
        assert_ne!(first, second);
    }
}
