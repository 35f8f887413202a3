//! Administrator pages. Registration, login, profile and reservation editing
//! share their flow with the public handlers through [`Portal::Admin`].

use crate::{
    application::{render, Page},
    error::AppError,
    identity::Identity,
    ledger::{self, ReservationForm},
    login::{self, AuthSession, Credentials, Portal},
    registry::Registration,
    reservations::{self, OwnerOption, ReservationRow},
    users::{self, AccountRow},
    AppState,
};
use askama::Template;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_messages::Messages;
use ride_db::{AccountId, AccountRole, ReservationId};
use std::collections::HashMap;

pub mod register {
    use super::*;

    pub async fn get(
        State(app_state): State<AppState>,
        identity: Identity,
        messages: Messages,
    ) -> Result<Response, AppError> {
        login::register_new_user::show(Portal::Admin, app_state, identity, messages).await
    }

    pub async fn post(
        State(app_state): State<AppState>,
        identity: Identity,
        auth_session: AuthSession,
        messages: Messages,
        Form(registration): Form<Registration>,
    ) -> Result<Response, AppError> {
        login::register_new_user::submit(
            Portal::Admin,
            app_state,
            identity,
            auth_session,
            messages,
            registration,
        )
        .await
    }
}

pub mod sign_in {
    use super::*;

    #[derive(Debug, serde::Deserialize)]
    pub struct NextUrl {
        next: Option<String>,
    }

    pub async fn get(
        identity: Identity,
        messages: Messages,
        Query(NextUrl { next }): Query<NextUrl>,
    ) -> Result<Response, AppError> {
        login::login::show(Portal::Admin, identity, messages, next)
    }

    pub async fn post(
        auth_session: AuthSession,
        messages: Messages,
        Form(creds): Form<Credentials>,
    ) -> Result<Response, AppError> {
        login::login::submit(Portal::Admin, auth_session, messages, creds).await
    }
}

pub mod sign_out {
    use super::*;

    pub async fn get(auth_session: AuthSession, messages: Messages) -> Result<Response, AppError> {
        login::logout::sign_out(Portal::Admin, auth_session, messages).await
    }
}

pub mod home {
    use super::*;

    #[derive(Template)]
    #[template(path = "admin/home.html")]
    pub struct AdminHomeTemplate {
        page: Page,
        accounts: Vec<AccountRow>,
        reservations: Vec<ReservationRow>,
    }

    pub async fn get(
        State(app_state): State<AppState>,
        identity: Identity,
        messages: Messages,
    ) -> Result<Response, AppError> {
        identity.require_admin()?;
        let accounts = app_state.registry.list_all().await?;
        let owners: HashMap<AccountId, _> = accounts.iter().map(|a| (a.id, a)).collect();
        let reservations = app_state
            .ledger
            .list_all(&identity)
            .await?
            .iter()
            .filter_map(|reservation| {
                owners
                    .get(&reservation.account_id)
                    .map(|owner| ReservationRow::new(reservation, owner))
            })
            .collect();
        Ok(render(&AdminHomeTemplate {
            page: Page::new(&identity, messages),
            accounts: accounts.iter().map(AccountRow::from).collect(),
            reservations,
        })?
        .into_response())
    }
}

pub mod edit_profile {
    use super::*;
    use users::edit_profile::{show, submit, ProfileForm};

    pub async fn get(
        State(app_state): State<AppState>,
        identity: Identity,
        messages: Messages,
        Path(id): Path<AccountId>,
    ) -> Result<Response, AppError> {
        show(Portal::Admin, app_state, identity, messages, id).await
    }

    pub async fn post(
        State(app_state): State<AppState>,
        identity: Identity,
        messages: Messages,
        Path(id): Path<AccountId>,
        Form(form): Form<ProfileForm>,
    ) -> Result<Response, AppError> {
        submit(Portal::Admin, app_state, identity, messages, id, form).await
    }
}

pub mod edit_res {
    use super::*;
    use reservations::edit::{show, submit};

    pub async fn get(
        State(app_state): State<AppState>,
        identity: Identity,
        messages: Messages,
        Path(id): Path<ReservationId>,
    ) -> Result<Response, AppError> {
        show(Portal::Admin, app_state, identity, messages, id).await
    }

    pub async fn post(
        State(app_state): State<AppState>,
        identity: Identity,
        messages: Messages,
        Path(id): Path<ReservationId>,
        Form(form): Form<ReservationForm>,
    ) -> Result<Response, AppError> {
        submit(Portal::Admin, app_state, identity, messages, id, form).await
    }
}

/// Booking on behalf of a chosen standard account.
pub mod res_form {
    use super::*;

    #[derive(Clone, Debug, Default, serde::Deserialize)]
    #[serde(default)]
    pub struct OnBehalfForm {
        owner_id: String,
        #[serde(flatten)]
        reservation: ReservationForm,
    }

    async fn owner_options(
        app_state: &AppState,
        chosen: Option<AccountId>,
    ) -> Result<Vec<OwnerOption>, AppError> {
        let accounts: Vec<_> = app_state
            .registry
            .list_all()
            .await?
            .into_iter()
            .filter(|account| account.role == AccountRole::Standard)
            .collect();
        Ok(OwnerOption::list(&accounts, chosen))
    }

    pub async fn get(
        State(app_state): State<AppState>,
        identity: Identity,
        messages: Messages,
    ) -> Result<Response, AppError> {
        identity.require_admin()?;
        let owners = owner_options(&app_state, None).await?;
        reservations::form_page(
            Page::new(&identity, messages),
            "New reservation for a customer".to_owned(),
            "/admin/res_form".to_owned(),
            ReservationForm::default(),
            owners,
        )
    }

    pub async fn post(
        State(app_state): State<AppState>,
        identity: Identity,
        messages: Messages,
        Form(form): Form<OnBehalfForm>,
    ) -> Result<Response, AppError> {
        identity.require_admin()?;
        let owner_id = form.owner_id.trim().parse::<AccountId>().ok();
        let outcome = match owner_id {
            Some(owner_id) => {
                app_state
                    .ledger
                    .create_on_behalf(&identity, owner_id, &form.reservation)
                    .await
            }
            None => {
                let mut errors = crate::validation::FieldErrors::new();
                errors.push("owner_id", "Choose an existing account");
                Err(ledger::Error::Validation(errors))
            }
        };
        match outcome {
            Ok(reservation) => {
                if let Some(owner) = app_state.registry.get(reservation.account_id).await? {
                    reservations::notify_booked(&app_state, messages, &reservation, &owner).await;
                }
                Ok(Redirect::to("/admin/home").into_response())
            }
            Err(ledger::Error::Validation(errors)) => {
                let owners = owner_options(&app_state, owner_id).await?;
                reservations::form_page(
                    Page::new(&identity, messages).with_errors(errors.messages()),
                    "New reservation for a customer".to_owned(),
                    "/admin/res_form".to_owned(),
                    form.reservation,
                    owners,
                )
            }
            Err(err) => Err(err.into()),
        }
    }
}
