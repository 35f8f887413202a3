use crate::{
    application::{render, Page},
    error::AppError,
    identity::Identity,
    ledger::{self, ReservationForm},
    login::Portal,
    notify::{format_address, Confirmation},
    validation::FieldErrors,
    AppState,
};
use askama::Template;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_messages::Messages;
use ride_db::{Account, AccountId, AccountRole, Reservation, ReservationId, VehicleClass};

/// One line of a reservation table.
#[derive(Clone, Debug)]
pub struct ReservationRow {
    pub id: ReservationId,
    pub owner: String,
    pub passenger_name: String,
    pub vehicle: String,
    pub pickup_at: String,
    pub pickup_address: String,
    pub dropoff_address: String,
}

impl ReservationRow {
    pub fn new(reservation: &Reservation, owner: &Account) -> Self {
        let details = &reservation.details;
        Self {
            id: reservation.id,
            owner: owner.profile.username.clone(),
            passenger_name: details.passenger_name.clone(),
            vehicle: details.vehicle_class.to_string(),
            pickup_at: format!(
                "{} {}",
                details.pickup_date.strftime("%m/%d/%Y"),
                details.pickup_time.strftime("%I:%M %p")
            ),
            pickup_address: format_address(&details.pickup),
            dropoff_address: format_address(&details.dropoff),
        }
    }
}

#[derive(Clone, Debug)]
pub struct VehicleOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

fn vehicle_options(chosen: &str) -> Vec<VehicleOption> {
    VehicleClass::ALL
        .iter()
        .map(|class| VehicleOption {
            value: class.name(),
            label: class.label(),
            selected: class.name() == chosen,
        })
        .collect()
}

#[derive(Clone, Debug)]
pub struct OwnerOption {
    pub id: AccountId,
    pub label: String,
    pub selected: bool,
}

impl OwnerOption {
    pub fn list(accounts: &[Account], chosen: Option<AccountId>) -> Vec<Self> {
        accounts
            .iter()
            .map(|account| Self {
                id: account.id,
                label: format!(
                    "{} ({} {})",
                    account.profile.username,
                    account.profile.first_name,
                    account.profile.last_name
                ),
                selected: Some(account.id) == chosen,
            })
            .collect()
    }
}

#[derive(Template)]
#[template(path = "res/form.html")]
pub struct ReservationFormTemplate {
    page: Page,
    heading: String,
    action: String,
    form: ReservationForm,
    vehicles: Vec<VehicleOption>,
    owners: Vec<OwnerOption>,
}

pub fn form_page(
    page: Page,
    heading: String,
    action: String,
    form: ReservationForm,
    owners: Vec<OwnerOption>,
) -> Result<Response, AppError> {
    Ok(render(&ReservationFormTemplate {
        page,
        heading,
        vehicles: vehicle_options(&form.vehicle_class),
        action,
        form,
        owners,
    })?
    .into_response())
}

/// Sends the passenger text after a booking; a failure only costs a warning.
pub async fn notify_booked(
    app_state: &AppState,
    messages: Messages,
    reservation: &Reservation,
    owner: &Account,
) {
    let messages = messages.success(format!(
        "Reservation booked. Your confirmation number is {}",
        reservation.id
    ));
    match app_state
        .dispatcher
        .send_booking_notice(reservation, owner)
        .await
    {
        Ok(true) => {
            messages.info("A text confirmation was sent to the passenger phone");
        }
        Ok(false) => {}
        Err(err) => {
            tracing::error!(reservation = reservation.id, "booking notice failed: {err}");
            messages.warning(
                "The reservation is saved, but the text confirmation could not be sent",
            );
        }
    }
}

pub mod create {
    use super::*;

    pub async fn get(identity: Identity, messages: Messages) -> Result<Response, AppError> {
        identity.require_role(AccountRole::Standard)?;
        form_page(
            Page::new(&identity, messages),
            "New reservation".to_owned(),
            "/res".to_owned(),
            ReservationForm::default(),
            Vec::new(),
        )
    }

    pub async fn post(
        State(app_state): State<AppState>,
        identity: Identity,
        messages: Messages,
        Form(form): Form<ReservationForm>,
    ) -> Result<Response, AppError> {
        let owner = identity.require_role(AccountRole::Standard)?;
        match app_state.ledger.create(owner, &form).await {
            Ok(reservation) => {
                notify_booked(&app_state, messages, &reservation, owner).await;
                Ok(Redirect::to(&identity.landing_page()).into_response())
            }
            Err(ledger::Error::Validation(errors)) => form_page(
                Page::new(&identity, messages).with_errors(errors.messages()),
                "New reservation".to_owned(),
                "/res".to_owned(),
                form,
                Vec::new(),
            ),
            Err(err) => Err(err.into()),
        }
    }
}

pub mod edit {
    use super::*;

    fn action(portal: Portal, id: ReservationId) -> String {
        match portal {
            Portal::Public => format!("/res/edit_res/{id}"),
            Portal::Admin => format!("/admin/edit_res/{id}"),
        }
    }

    fn gate(portal: Portal, identity: &Identity) -> Result<(), AppError> {
        match portal {
            Portal::Public => identity.require_authenticated()?,
            Portal::Admin => identity.require_admin()?,
        };
        Ok(())
    }

    pub async fn show(
        portal: Portal,
        app_state: AppState,
        identity: Identity,
        messages: Messages,
        id: ReservationId,
    ) -> Result<Response, AppError> {
        gate(portal, &identity)?;
        let reservation = app_state.ledger.get_for(id, &identity).await?;
        form_page(
            Page::new(&identity, messages),
            format!("Edit reservation {id}"),
            action(portal, id),
            ReservationForm::from_details(&reservation.details),
            Vec::new(),
        )
    }

    pub async fn submit(
        portal: Portal,
        app_state: AppState,
        identity: Identity,
        messages: Messages,
        id: ReservationId,
        form: ReservationForm,
    ) -> Result<Response, AppError> {
        gate(portal, &identity)?;
        match app_state.ledger.update(id, &form, &identity).await {
            Ok(reservation) => {
                messages.success(format!("Reservation {} updated", reservation.id));
                Ok(Redirect::to(&identity.landing_page()).into_response())
            }
            Err(ledger::Error::Validation(errors)) => form_page(
                Page::new(&identity, messages).with_errors(errors.messages()),
                format!("Edit reservation {id}"),
                action(portal, id),
                form,
                Vec::new(),
            ),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn get(
        State(app_state): State<AppState>,
        identity: Identity,
        messages: Messages,
        Path(id): Path<ReservationId>,
    ) -> Result<Response, AppError> {
        show(Portal::Public, app_state, identity, messages, id).await
    }

    pub async fn post(
        State(app_state): State<AppState>,
        identity: Identity,
        messages: Messages,
        Path(id): Path<ReservationId>,
        Form(form): Form<ReservationForm>,
    ) -> Result<Response, AppError> {
        submit(Portal::Public, app_state, identity, messages, id, form).await
    }
}

/// The owner of a reservation the caller may see.
async fn open_reservation(
    app_state: &AppState,
    identity: &Identity,
    id: ReservationId,
) -> Result<(Reservation, Account), AppError> {
    let reservation = app_state.ledger.get_for(id, identity).await?;
    let owner = app_state
        .registry
        .get(reservation.account_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok((reservation, owner))
}

pub mod view {
    use super::*;

    #[derive(Template)]
    #[template(path = "res/view.html")]
    pub struct ViewTemplate {
        page: Page,
        confirmation: Confirmation,
        edit_link: String,
    }

    pub async fn get(
        State(app_state): State<AppState>,
        identity: Identity,
        messages: Messages,
        Path(id): Path<ReservationId>,
    ) -> Result<Response, AppError> {
        let (reservation, owner) = open_reservation(&app_state, &identity, id).await?;
        let edit_link = if identity.is_admin() {
            format!("/admin/edit_res/{id}")
        } else {
            format!("/res/edit_res/{id}")
        };
        Ok(render(&ViewTemplate {
            page: Page::new(&identity, messages),
            confirmation: Confirmation::new(&reservation, &owner),
            edit_link,
        })?
        .into_response())
    }
}

pub mod email {
    use super::*;

    #[derive(Clone, Debug, Default, serde::Deserialize)]
    #[serde(default)]
    pub struct EmailForm {
        email: String,
    }

    #[derive(Template)]
    #[template(path = "res/email.html")]
    pub struct EmailTemplate {
        page: Page,
        reservation_id: ReservationId,
        email: String,
    }

    pub async fn get(
        State(app_state): State<AppState>,
        identity: Identity,
        messages: Messages,
        Path(id): Path<ReservationId>,
    ) -> Result<Response, AppError> {
        let (reservation, owner) = open_reservation(&app_state, &identity, id).await?;
        Ok(render(&EmailTemplate {
            page: Page::new(&identity, messages),
            reservation_id: reservation.id,
            email: owner.profile.email,
        })?
        .into_response())
    }

    /// A delivery failure answers 502; the reservation itself is untouched.
    pub async fn post(
        State(app_state): State<AppState>,
        identity: Identity,
        messages: Messages,
        Path(id): Path<ReservationId>,
        Form(form): Form<EmailForm>,
    ) -> Result<Response, AppError> {
        let (reservation, owner) = open_reservation(&app_state, &identity, id).await?;
        let mut errors = FieldErrors::new();
        let email = errors.required("email", "E-mail", &form.email);
        errors.email("email", "E-mail", &email);
        if !errors.is_empty() {
            return Ok(render(&EmailTemplate {
                page: Page::new(&identity, messages).with_errors(errors.messages()),
                reservation_id: reservation.id,
                email,
            })?
            .into_response());
        }
        app_state
            .dispatcher
            .send_confirmation(&reservation, &owner, &email)
            .await?;
        messages.success(format!("Confirmation {} sent to {email}", reservation.id));
        Ok(Redirect::to(&identity.landing_page()).into_response())
    }
}
