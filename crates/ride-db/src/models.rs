use diesel::prelude::*;

use crate::{
    entities,
    types_cache::{self, Cache},
};

#[derive(Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::ride::account_role)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AccountRoleEntry {
    pub id: i32,
    pub name: String,
    pub created: jiff_diesel::Timestamp,
    pub updated: jiff_diesel::Timestamp,
}

#[derive(Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::ride::vehicle_class)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct VehicleClassEntry {
    pub id: i32,
    pub name: String,
    pub created: jiff_diesel::Timestamp,
    pub updated: jiff_diesel::Timestamp,
}

#[derive(Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::ride::account)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Account {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub role_id: i32,
    pub created: jiff_diesel::Timestamp,
    pub updated: jiff_diesel::Timestamp,
}

impl Account {
    pub(crate) fn into_entity(self, cache: &Cache) -> Result<entities::Account, types_cache::Error> {
        Ok(entities::Account {
            id: self.id,
            role: cache.account_role.variant_of(self.role_id)?,
            profile: entities::Profile {
                username: self.username,
                email: self.email,
                first_name: self.first_name,
                last_name: self.last_name,
                phone: self.phone,
            },
            password_hash: self.password_hash,
            created: self.created.to_jiff(),
            updated: self.updated.to_jiff(),
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::ride::account)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewAccount {
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub role_id: i32,
    pub created: jiff_diesel::Timestamp,
    pub updated: jiff_diesel::Timestamp,
}

#[derive(AsChangeset)]
#[diesel(table_name = crate::schema::ride::account)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AccountProfileChanges {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub updated: jiff_diesel::Timestamp,
}

#[derive(Identifiable, Queryable, Selectable, Associations)]
#[diesel(table_name = crate::schema::ride::reservation)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(belongs_to(Account))]
pub struct Reservation {
    pub id: i32,
    pub account_id: i32,
    pub passenger_name: String,
    pub passenger_phone: String,
    pub passenger_email: Option<String>,
    pub vehicle_class_id: i32,
    pub pickup_date: jiff_diesel::Date,
    pub pickup_time: jiff_diesel::Time,
    pub pickup_street: String,
    pub pickup_street_2: Option<String>,
    pub pickup_city: String,
    pub pickup_region: Option<String>,
    pub pickup_postal_code: Option<String>,
    pub pickup_country: Option<String>,
    pub dropoff_street: String,
    pub dropoff_street_2: Option<String>,
    pub dropoff_city: String,
    pub dropoff_region: Option<String>,
    pub dropoff_postal_code: Option<String>,
    pub dropoff_country: Option<String>,
    pub notes: Option<String>,
    pub created: jiff_diesel::Timestamp,
    pub updated: jiff_diesel::Timestamp,
}

impl Reservation {
    pub(crate) fn into_entity(
        self,
        cache: &Cache,
    ) -> Result<entities::Reservation, types_cache::Error> {
        Ok(entities::Reservation {
            id: self.id,
            account_id: self.account_id,
            details: entities::ReservationDetails {
                passenger_name: self.passenger_name,
                passenger_phone: self.passenger_phone,
                passenger_email: self.passenger_email,
                vehicle_class: cache.vehicle_class.variant_of(self.vehicle_class_id)?,
                pickup_date: self.pickup_date.to_jiff(),
                pickup_time: self.pickup_time.to_jiff(),
                pickup: entities::Address {
                    street: self.pickup_street,
                    street_2: self.pickup_street_2,
                    city: self.pickup_city,
                    region: self.pickup_region,
                    postal_code: self.pickup_postal_code,
                    country: self.pickup_country,
                },
                dropoff: entities::Address {
                    street: self.dropoff_street,
                    street_2: self.dropoff_street_2,
                    city: self.dropoff_city,
                    region: self.dropoff_region,
                    postal_code: self.dropoff_postal_code,
                    country: self.dropoff_country,
                },
                notes: self.notes,
            },
            created: self.created.to_jiff(),
            updated: self.updated.to_jiff(),
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::ride::reservation)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewReservation {
    pub account_id: i32,
    #[diesel(embed)]
    pub changes: ReservationChanges,
    pub created: jiff_diesel::Timestamp,
}

/// Every editable reservation column; `None` clears an optional column.
#[derive(Insertable, AsChangeset)]
#[diesel(table_name = crate::schema::ride::reservation)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct ReservationChanges {
    pub passenger_name: String,
    pub passenger_phone: String,
    pub passenger_email: Option<String>,
    pub vehicle_class_id: i32,
    pub pickup_date: jiff_diesel::Date,
    pub pickup_time: jiff_diesel::Time,
    pub pickup_street: String,
    pub pickup_street_2: Option<String>,
    pub pickup_city: String,
    pub pickup_region: Option<String>,
    pub pickup_postal_code: Option<String>,
    pub pickup_country: Option<String>,
    pub dropoff_street: String,
    pub dropoff_street_2: Option<String>,
    pub dropoff_city: String,
    pub dropoff_region: Option<String>,
    pub dropoff_postal_code: Option<String>,
    pub dropoff_country: Option<String>,
    pub notes: Option<String>,
    pub updated: jiff_diesel::Timestamp,
}

impl ReservationChanges {
    pub(crate) fn from_details(
        details: entities::ReservationDetails,
        cache: &Cache,
        now: jiff_diesel::Timestamp,
    ) -> Result<Self, types_cache::Error> {
        let entities::ReservationDetails {
            passenger_name,
            passenger_phone,
            passenger_email,
            vehicle_class,
            pickup_date,
            pickup_time,
            pickup,
            dropoff,
            notes,
        } = details;
        Ok(Self {
            passenger_name,
            passenger_phone,
            passenger_email,
            vehicle_class_id: cache.vehicle_class.id_of(vehicle_class)?,
            pickup_date: pickup_date.into(),
            pickup_time: pickup_time.into(),
            pickup_street: pickup.street,
            pickup_street_2: pickup.street_2,
            pickup_city: pickup.city,
            pickup_region: pickup.region,
            pickup_postal_code: pickup.postal_code,
            pickup_country: pickup.country,
            dropoff_street: dropoff.street,
            dropoff_street_2: dropoff.street_2,
            dropoff_city: dropoff.city,
            dropoff_region: dropoff.region,
            dropoff_postal_code: dropoff.postal_code,
            dropoff_country: dropoff.country,
            notes,
            updated: now,
        })
    }
}
