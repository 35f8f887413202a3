use super::{
    admin, application,
    error::AppError,
    login::{login, logout, register_new_user, BackEnd},
    lookup, reservations, users,
};
use axum::routing::get;
use axum_login::AuthManagerLayerBuilder;
use axum_messages::MessagesManagerLayer;
use std::time::Duration;
use tower_sessions::{cookie::Key, Expiry, MemoryStore, SessionManagerLayer};

pub(super) fn setup(
    app_state: super::AppState,
    backend: BackEnd,
    session_key: Key,
    session_expiry: Duration,
) -> axum::routing::Router {
    let inactivity = tower_sessions::cookie::time::Duration::seconds(
        i64::try_from(session_expiry.as_secs()).unwrap_or(i64::MAX),
    );
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_expiry(Expiry::OnInactivity(inactivity))
        .with_signed(session_key);
    let auth_layer = AuthManagerLayerBuilder::new(backend, session_layer).build();
    axum::Router::new()
        .route("/", get(application::home::get))
        .route(
            "/register",
            get(register_new_user::get).post(register_new_user::post),
        )
        .route("/login", get(login::get).post(login::post))
        .route("/logout", get(logout::get))
        .route("/check/{username}", get(lookup::username))
        .route("/verify/{phone}", get(lookup::phone))
        .route("/lookup/{email}", get(lookup::email))
        .route("/users/{id}", get(users::dashboard::get))
        .route(
            "/users/edit_profile/{id}",
            get(users::edit_profile::get).post(users::edit_profile::post),
        )
        .route(
            "/res",
            get(reservations::create::get).post(reservations::create::post),
        )
        .route(
            "/res/res_form",
            get(reservations::create::get).post(reservations::create::post),
        )
        .route(
            "/res/edit_res/{id}",
            get(reservations::edit::get).post(reservations::edit::post),
        )
        .route("/res/view/{id}", get(reservations::view::get))
        .route(
            "/res/email_res_form/{id}",
            get(reservations::email::get).post(reservations::email::post),
        )
        .route(
            "/admin/register",
            get(admin::register::get).post(admin::register::post),
        )
        .route(
            "/admin/login",
            get(admin::sign_in::get).post(admin::sign_in::post),
        )
        .route("/admin/logout", get(admin::sign_out::get))
        .route("/admin/home", get(admin::home::get))
        .route(
            "/admin/edit_profile/{id}",
            get(admin::edit_profile::get).post(admin::edit_profile::post),
        )
        .route(
            "/admin/edit_res/{id}",
            get(admin::edit_res::get).post(admin::edit_res::post),
        )
        .route(
            "/admin/res_form",
            get(admin::res_form::get).post(admin::res_form::post),
        )
        .fallback(fallback)
        .layer(MessagesManagerLayer)
        .layer(auth_layer)
        .with_state(app_state)
}

pub async fn fallback(_uri: axum::http::Uri) -> AppError {
    AppError::NotFound
}
