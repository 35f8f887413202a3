use crate::{
    identity::{Identity, Unauthorized},
    store::{AccountRepository, ReservationRepository},
    validation::{optional, FieldErrors},
};
use jiff::civil;
use ride_db::{
    Account, AccountId, Address, Reservation, ReservationDetails, ReservationId, VehicleClass,
};
use std::sync::Arc;

const REGION_MAX: usize = 3;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid reservation fields: {0}")]
    Validation(FieldErrors),
    #[error("reservation not found")]
    NotFound,
    #[error(transparent)]
    Unauthorized(#[from] Unauthorized),
    #[error("Reservation database error: {0}")]
    Store(#[from] ride_db::Error),
}

/// The reservation fields as submitted by a form.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct ReservationForm {
    pub passenger_name: String,
    pub passenger_phone: String,
    pub passenger_email: String,
    pub vehicle_class: String,
    pub pickup_date: String,
    pub pickup_time: String,
    pub pickup_street: String,
    pub pickup_street_2: String,
    pub pickup_city: String,
    pub pickup_region: String,
    pub pickup_postal_code: String,
    pub pickup_country: String,
    pub dropoff_street: String,
    pub dropoff_street_2: String,
    pub dropoff_city: String,
    pub dropoff_region: String,
    pub dropoff_postal_code: String,
    pub dropoff_country: String,
    pub notes: String,
}

struct AddressFields<'a> {
    label: &'static str,
    street_field: &'static str,
    city_field: &'static str,
    region_field: &'static str,
    street: &'a str,
    street_2: &'a str,
    city: &'a str,
    region: &'a str,
    postal_code: &'a str,
    country: &'a str,
}

impl AddressFields<'_> {
    fn validate(&self, errors: &mut FieldErrors) -> Address {
        let label = self.label;
        let street = errors.required(self.street_field, &format!("{label} street"), self.street);
        let city = errors.required(self.city_field, &format!("{label} city"), self.city);
        let region = optional(self.region);
        if let Some(region) = &region {
            errors.max_chars(self.region_field, &format!("{label} state"), region, REGION_MAX);
        }
        Address {
            street,
            street_2: optional(self.street_2),
            city,
            region,
            postal_code: optional(self.postal_code),
            country: optional(self.country),
        }
    }
}

fn parse_time(value: &str) -> Option<civil::Time> {
    ["%H:%M", "%H:%M:%S", "%I:%M %p"]
        .into_iter()
        .find_map(|format| civil::Time::strptime(format, value).ok())
}

impl ReservationForm {
    pub fn validate(&self) -> Result<ReservationDetails, FieldErrors> {
        let mut errors = FieldErrors::new();
        let passenger_name =
            errors.required("passenger_name", "Passenger name", &self.passenger_name);
        let passenger_phone =
            errors.required("passenger_phone", "Passenger phone", &self.passenger_phone);
        let passenger_email = optional(&self.passenger_email);
        if let Some(email) = &passenger_email {
            errors.email("passenger_email", "Passenger e-mail", email);
        }
        let vehicle_class = VehicleClass::from_name(self.vehicle_class.trim());
        if vehicle_class.is_none() {
            errors.push("vehicle_class", "Choose a vehicle class");
        }
        let pickup_date = errors.required("pickup_date", "Pickup date", &self.pickup_date);
        let pickup_date = if pickup_date.is_empty() {
            None
        } else {
            let parsed = pickup_date.parse::<civil::Date>().ok();
            if parsed.is_none() {
                errors.push("pickup_date", "Pickup date must be a date like 2026-10-14");
            }
            parsed
        };
        let pickup_time = errors.required("pickup_time", "Pickup time", &self.pickup_time);
        let pickup_time = if pickup_time.is_empty() {
            None
        } else {
            let parsed = parse_time(&pickup_time);
            if parsed.is_none() {
                errors.push("pickup_time", "Pickup time must be a time like 14:30");
            }
            parsed
        };
        let pickup = AddressFields {
            label: "Pickup",
            street_field: "pickup_street",
            city_field: "pickup_city",
            region_field: "pickup_region",
            street: &self.pickup_street,
            street_2: &self.pickup_street_2,
            city: &self.pickup_city,
            region: &self.pickup_region,
            postal_code: &self.pickup_postal_code,
            country: &self.pickup_country,
        }
        .validate(&mut errors);
        let dropoff = AddressFields {
            label: "Drop-off",
            street_field: "dropoff_street",
            city_field: "dropoff_city",
            region_field: "dropoff_region",
            street: &self.dropoff_street,
            street_2: &self.dropoff_street_2,
            city: &self.dropoff_city,
            region: &self.dropoff_region,
            postal_code: &self.dropoff_postal_code,
            country: &self.dropoff_country,
        }
        .validate(&mut errors);
        match (vehicle_class, pickup_date, pickup_time) {
            (Some(vehicle_class), Some(pickup_date), Some(pickup_time)) if errors.is_empty() => {
                Ok(ReservationDetails {
                    passenger_name,
                    passenger_phone,
                    passenger_email,
                    vehicle_class,
                    pickup_date,
                    pickup_time,
                    pickup,
                    dropoff,
                    notes: optional(&self.notes),
                })
            }
            _ => Err(errors),
        }
    }

    /// Prefills an edit form from a stored reservation.
    pub fn from_details(details: &ReservationDetails) -> Self {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        Self {
            passenger_name: details.passenger_name.clone(),
            passenger_phone: details.passenger_phone.clone(),
            passenger_email: text(&details.passenger_email),
            vehicle_class: details.vehicle_class.name().to_owned(),
            pickup_date: details.pickup_date.to_string(),
            pickup_time: if details.pickup_time.second() == 0 {
                details.pickup_time.strftime("%H:%M").to_string()
            } else {
                details.pickup_time.strftime("%H:%M:%S").to_string()
            },
            pickup_street: details.pickup.street.clone(),
            pickup_street_2: text(&details.pickup.street_2),
            pickup_city: details.pickup.city.clone(),
            pickup_region: text(&details.pickup.region),
            pickup_postal_code: text(&details.pickup.postal_code),
            pickup_country: text(&details.pickup.country),
            dropoff_street: details.dropoff.street.clone(),
            dropoff_street_2: text(&details.dropoff.street_2),
            dropoff_city: details.dropoff.city.clone(),
            dropoff_region: text(&details.dropoff.region),
            dropoff_postal_code: text(&details.dropoff.postal_code),
            dropoff_country: text(&details.dropoff.country),
            notes: text(&details.notes),
        }
    }
}

pub struct Ledger {
    reservations: Arc<dyn ReservationRepository>,
    accounts: Arc<dyn AccountRepository>,
}

impl Ledger {
    pub fn new(
        reservations: Arc<dyn ReservationRepository>,
        accounts: Arc<dyn AccountRepository>,
    ) -> Self {
        Self {
            reservations,
            accounts,
        }
    }

    #[tracing::instrument(skip(self, owner, form), fields(owner = owner.id))]
    pub async fn create(
        &self,
        owner: &Account,
        form: &ReservationForm,
    ) -> Result<Reservation, Error> {
        let details = form.validate().map_err(Error::Validation)?;
        let reservation = self
            .reservations
            .insert_reservation(owner.id, details)
            .await?;
        tracing::info!(reservation = reservation.id, "created reservation");
        Ok(reservation)
    }

    /// An administrator booking for another account.
    #[tracing::instrument(skip(self, requester, form))]
    pub async fn create_on_behalf(
        &self,
        requester: &Identity,
        owner_id: AccountId,
        form: &ReservationForm,
    ) -> Result<Reservation, Error> {
        requester.require_admin()?;
        let Some(owner) = self.accounts.account_by_id(owner_id).await? else {
            let mut errors = FieldErrors::new();
            errors.push("owner_id", "Choose an existing account");
            return Err(Error::Validation(errors));
        };
        self.create(&owner, form).await
    }

    pub async fn get(&self, id: ReservationId) -> Result<Reservation, Error> {
        self.reservations
            .reservation_by_id(id)
            .await?
            .ok_or(Error::NotFound)
    }

    /// Anonymous callers get `Unauthorized` before the lookup.
    pub async fn get_for(
        &self,
        id: ReservationId,
        requester: &Identity,
    ) -> Result<Reservation, Error> {
        requester.require_authenticated()?;
        let reservation = self.get(id).await?;
        requester.authorize_reservation(&reservation)?;
        Ok(reservation)
    }

    /// Last write wins; every field is replaced.
    #[tracing::instrument(skip(self, form, requester))]
    pub async fn update(
        &self,
        id: ReservationId,
        form: &ReservationForm,
        requester: &Identity,
    ) -> Result<Reservation, Error> {
        let reservation = self.get_for(id, requester).await?;
        let details = form.validate().map_err(Error::Validation)?;
        self.reservations
            .update_reservation(reservation.id, details)
            .await?
            .ok_or(Error::NotFound)
    }

    pub async fn list_all(&self, requester: &Identity) -> Result<Vec<Reservation>, Error> {
        requester.require_admin()?;
        Ok(self.reservations.reservations().await?)
    }

    pub async fn list_for_owner(&self, owner: &Account) -> Result<Vec<Reservation>, Error> {
        Ok(self.reservations.reservations_for_account(owner.id).await?)
    }
}
