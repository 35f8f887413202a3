//! Storage-independent shapes of the records the application works with.

use crate::types_cache::{AccountRole, VehicleClass};

pub type AccountId = i32;
pub type ReservationId = i32;

/// The account fields a person can see and edit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Profile {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub profile: Profile,
    pub password_hash: String,
    pub role: AccountRole,
    pub created: jiff::Timestamp,
    pub updated: jiff::Timestamp,
}

#[derive(Clone, Debug)]
pub struct NewAccount {
    pub profile: Profile,
    pub password_hash: String,
    pub role: AccountRole,
}

/// Columns that must be unique across accounts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IdentityField {
    Username,
    Email,
    Phone,
}

impl IdentityField {
    pub const ALL: [IdentityField; 3] = [Self::Username, Self::Email, Self::Phone];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Username => "username",
            Self::Email => "email",
            Self::Phone => "phone",
        }
    }

    pub fn value_in<'a>(&self, profile: &'a Profile) -> &'a str {
        match self {
            Self::Username => &profile.username,
            Self::Email => &profile.email,
            Self::Phone => &profile.phone,
        }
    }

    pub(crate) fn from_constraint(constraint: &str) -> Option<Self> {
        match constraint {
            "account_username_key" => Some(Self::Username),
            "account_email_key" => Some(Self::Email),
            "account_phone_role_key" => Some(Self::Phone),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Address {
    pub street: String,
    pub street_2: Option<String>,
    pub city: String,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReservationDetails {
    pub passenger_name: String,
    pub passenger_phone: String,
    pub passenger_email: Option<String>,
    pub vehicle_class: VehicleClass,
    pub pickup_date: jiff::civil::Date,
    pub pickup_time: jiff::civil::Time,
    pub pickup: Address,
    pub dropoff: Address,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reservation {
    pub id: ReservationId,
    pub account_id: AccountId,
    pub details: ReservationDetails,
    pub created: jiff::Timestamp,
    pub updated: jiff::Timestamp,
}
