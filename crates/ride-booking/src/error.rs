use crate::{application::Page, identity::Unauthorized, ledger, notify, registry};
use askama::Template;
use axum::response::{Html, IntoResponse, Response};
use http::StatusCode;

/// Failures that end a request with one of the fixed error pages.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("not authorized")]
    Unauthorized,
    #[error("not found")]
    NotFound,
    #[error("notification delivery failed: {0}")]
    Delivery(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn internal(err: impl std::fmt::Display) -> Self {
        AppError::Internal(err.to_string())
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Delivery(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Unauthorized> for AppError {
    fn from(_: Unauthorized) -> Self {
        AppError::Unauthorized
    }
}

impl From<askama::Error> for AppError {
    fn from(err: askama::Error) -> Self {
        AppError::internal(format!("Template Error: {err}"))
    }
}

impl From<registry::Error> for AppError {
    fn from(err: registry::Error) -> Self {
        match err {
            registry::Error::NotFound => AppError::NotFound,
            err => AppError::internal(err),
        }
    }
}

impl From<ledger::Error> for AppError {
    fn from(err: ledger::Error) -> Self {
        match err {
            ledger::Error::NotFound => AppError::NotFound,
            ledger::Error::Unauthorized(_) => AppError::Unauthorized,
            err => AppError::internal(err),
        }
    }
}

impl From<notify::Error> for AppError {
    fn from(err: notify::Error) -> Self {
        match err {
            notify::Error::Delivery(reason) => AppError::Delivery(reason),
            err => AppError::internal(err),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate {
    page: Page,
    code: u16,
    title: &'static str,
    detail: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (title, detail) = match &self {
            AppError::Unauthorized => (
                "Not authorized",
                "You need to log in with an account that may open this page.",
            ),
            AppError::NotFound => ("Not found", "There is nothing at this address."),
            AppError::Delivery(_) => (
                "Message not sent",
                "Your booking is saved, but the message could not be delivered. Please try again later.",
            ),
            AppError::Internal(_) => ("Something went wrong", "Please try again later."),
        };
        if status.is_server_error() {
            tracing::error!("{self}");
        }
        let body = ErrorTemplate {
            page: Page::default(),
            code: status.as_u16(),
            title,
            detail,
        }
        .render()
        .unwrap_or_else(|err| {
            tracing::error!("rendering error page: {err}");
            title.to_owned()
        });
        (status, Html(body)).into_response()
    }
}
