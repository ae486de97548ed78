use axum::{
    Router,
    http::{StatusCode, header},
    response::{IntoResponse, Redirect},
    routing::get,
};

use crate::{
    modules,
    web::{AppState, admin, auth},
};

const ROBOTS_TXT_BODY: &str = include_str!("../../robots.txt");

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route(
            "/user-register",
            get(auth::register_page).post(auth::process_register),
        )
        .route(
            "/user-login",
            get(auth::login_page).post(auth::process_login),
        )
        .route("/user-logout", get(auth::user_logout))
        .route(
            "/login",
            get(auth::admin_login_page).post(auth::process_admin_login),
        )
        .route("/logout", get(auth::admin_logout))
        .route("/admin", get(admin::dashboard))
        .route("/healthz", get(healthz))
        .route("/robots.txt", get(robots_txt))
        .merge(modules::workshop::router())
        .with_state(state)
}

async fn root() -> Redirect {
    Redirect::to("/user-register")
}

async fn robots_txt() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        ROBOTS_TXT_BODY,
    )
}

async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}
