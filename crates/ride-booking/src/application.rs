use crate::{error::AppError, identity::Identity};
use askama::Template;
use axum::response::{Html, IntoResponse};
use axum_messages::{Level, Messages};

#[derive(Clone, Debug)]
pub struct Flash {
    pub level: &'static str,
    pub text: String,
}

impl Flash {
    pub fn danger(text: impl Into<String>) -> Self {
        Self {
            level: "danger",
            text: text.into(),
        }
    }
}

/// Navigation state and pending flash messages shared by every page.
#[derive(Clone, Debug, Default)]
pub struct Page {
    pub logged_in: bool,
    pub is_admin: bool,
    pub home: String,
    pub profile: String,
    pub flashes: Vec<Flash>,
}

impl Page {
    pub fn new(identity: &Identity, messages: Messages) -> Self {
        let flashes = messages
            .into_iter()
            .map(|message| Flash {
                level: match message.level {
                    Level::Error => "danger",
                    Level::Warning => "warning",
                    Level::Success => "success",
                    _ => "info",
                },
                text: message.message,
            })
            .collect();
        let profile = match identity {
            Identity::Anonymous => String::new(),
            Identity::User(account) => format!("/users/edit_profile/{}", account.id),
            Identity::Admin(account) => format!("/admin/edit_profile/{}", account.id),
        };
        Self {
            logged_in: identity.account().is_some(),
            is_admin: identity.is_admin(),
            home: identity.landing_page(),
            profile,
            flashes,
        }
    }

    pub fn with_errors(mut self, errors: impl IntoIterator<Item = String>) -> Self {
        self.flashes.extend(errors.into_iter().map(Flash::danger));
        self
    }
}

pub fn render(template: &impl Template) -> Result<Html<String>, AppError> {
    Ok(Html(template.render()?))
}

pub mod home {
    use super::*;

    #[derive(Template)]
    #[template(path = "home.html")]
    pub struct HomeTemplate {
        page: Page,
    }

    pub async fn get(identity: Identity, messages: Messages) -> Result<impl IntoResponse, AppError> {
        render(&HomeTemplate {
            page: Page::new(&identity, messages),
        })
    }
}
