use crate::{
    application::{render, Page},
    error::AppError,
    identity::Identity,
    login::Portal,
    registry,
    reservations::ReservationRow,
    AppState,
};
use askama::Template;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_messages::Messages;
use ride_db::{Account, AccountId, Profile};

#[derive(Clone, Debug)]
pub struct AccountRow {
    pub id: AccountId,
    pub username: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: String,
}

impl From<&Account> for AccountRow {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.profile.username.clone(),
            name: format!("{} {}", account.profile.first_name, account.profile.last_name),
            email: account.profile.email.clone(),
            phone: account.profile.phone.clone(),
            role: account.role.to_string(),
        }
    }
}

pub mod dashboard {
    use super::*;

    #[derive(Template)]
    #[template(path = "users/dashboard.html")]
    pub struct DashboardTemplate {
        page: Page,
        account: AccountRow,
        reservations: Vec<ReservationRow>,
    }

    pub async fn get(
        State(app_state): State<AppState>,
        identity: Identity,
        messages: Messages,
        Path(id): Path<AccountId>,
    ) -> Result<Response, AppError> {
        identity.require_authenticated()?;
        let owner = app_state.registry.get(id).await?.ok_or(AppError::NotFound)?;
        identity.authorize_profile(owner.id)?;
        let reservations = app_state
            .ledger
            .list_for_owner(&owner)
            .await?
            .iter()
            .map(|reservation| ReservationRow::new(reservation, &owner))
            .collect();
        Ok(render(&DashboardTemplate {
            page: Page::new(&identity, messages),
            account: AccountRow::from(&owner),
            reservations,
        })?
        .into_response())
    }
}

pub mod edit_profile {
    use super::*;

    #[derive(Clone, Debug, Default, serde::Deserialize)]
    #[serde(default)]
    pub struct ProfileForm {
        username: String,
        email: String,
        first_name: String,
        last_name: String,
        phone: String,
        current_password: String,
    }

    impl ProfileForm {
        fn profile(&self) -> Profile {
            Profile {
                username: self.username.clone(),
                email: self.email.clone(),
                first_name: self.first_name.clone(),
                last_name: self.last_name.clone(),
                phone: self.phone.clone(),
            }
        }
    }

    impl From<&Profile> for ProfileForm {
        fn from(profile: &Profile) -> Self {
            Self {
                username: profile.username.clone(),
                email: profile.email.clone(),
                first_name: profile.first_name.clone(),
                last_name: profile.last_name.clone(),
                phone: profile.phone.clone(),
                current_password: String::new(),
            }
        }
    }

    #[derive(Template)]
    #[template(path = "users/edit_profile.html")]
    pub struct ProfileTemplate {
        page: Page,
        action: String,
        form: ProfileForm,
    }

    /// The caller's own account, when `id` names it.
    async fn own_account(
        portal: Portal,
        app_state: &AppState,
        identity: &Identity,
        id: AccountId,
    ) -> Result<Account, AppError> {
        match portal {
            Portal::Public => identity.require_authenticated()?,
            Portal::Admin => identity.require_admin()?,
        };
        app_state.registry.get(id).await?.ok_or(AppError::NotFound)?;
        Ok(identity.authorize_profile(id)?.clone())
    }

    fn form_page(
        portal: Portal,
        page: Page,
        id: AccountId,
        mut form: ProfileForm,
    ) -> Result<Response, AppError> {
        form.current_password.clear();
        let action = match portal {
            Portal::Public => format!("/users/edit_profile/{id}"),
            Portal::Admin => format!("/admin/edit_profile/{id}"),
        };
        Ok(render(&ProfileTemplate { page, action, form })?.into_response())
    }

    pub async fn show(
        portal: Portal,
        app_state: AppState,
        identity: Identity,
        messages: Messages,
        id: AccountId,
    ) -> Result<Response, AppError> {
        let account = own_account(portal, &app_state, &identity, id).await?;
        form_page(
            portal,
            Page::new(&identity, messages),
            id,
            ProfileForm::from(&account.profile),
        )
    }

    pub async fn submit(
        portal: Portal,
        app_state: AppState,
        identity: Identity,
        messages: Messages,
        id: AccountId,
        form: ProfileForm,
    ) -> Result<Response, AppError> {
        let account = own_account(portal, &app_state, &identity, id).await?;
        let problems = match app_state
            .registry
            .update_profile(&account, form.profile(), &form.current_password)
            .await
        {
            Ok(_) => {
                messages.success("Profile updated");
                return Ok(Redirect::to(&identity.landing_page()).into_response());
            }
            Err(registry::Error::WrongPassword) => {
                vec!["Wrong password, please try again!".to_owned()]
            }
            Err(registry::Error::Validation(errors)) => errors.messages(),
            Err(registry::Error::DuplicateIdentity(field)) => {
                vec![format!("That {} is already taken", field.label())]
            }
            Err(err) => return Err(err.into()),
        };
        form_page(
            portal,
            Page::new(&identity, messages).with_errors(problems),
            id,
            form,
        )
    }

    pub async fn get(
        State(app_state): State<AppState>,
        identity: Identity,
        messages: Messages,
        Path(id): Path<AccountId>,
    ) -> Result<Response, AppError> {
        show(Portal::Public, app_state, identity, messages, id).await
    }

    pub async fn post(
        State(app_state): State<AppState>,
        identity: Identity,
        messages: Messages,
        Path(id): Path<AccountId>,
        Form(form): Form<ProfileForm>,
    ) -> Result<Response, AppError> {
        submit(Portal::Public, app_state, identity, messages, id, form).await
    }
}
