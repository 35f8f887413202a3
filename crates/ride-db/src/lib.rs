use diesel::{
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
};
use diesel_async::{
    pooled_connection::{
        mobc::{Builder, Pool},
        AsyncDieselConnectionManager,
    },
    scoped_futures::ScopedFutureExt,
    AsyncConnection, AsyncPgConnection, RunQueryDsl,
};
use std::time::Duration;

pub mod entities;
pub mod models;
mod schema;
mod sql_functions;
#[cfg(test)]
mod tests;
pub mod types_cache;

pub use entities::{
    Account, AccountId, Address, IdentityField, NewAccount, Profile, Reservation,
    ReservationDetails, ReservationId,
};
pub use types_cache::{AccountRole, VehicleClass};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("getting connection from pool: {0}")]
    GetConnectionPool(#[from] mobc::Error<diesel_async::pooled_connection::PoolError>),
    #[error("result failure: {0}")]
    Result(DieselError),
    #[error("type cache: {0}")]
    TypeCache(#[from] types_cache::Error),
    #[error("{} is already registered", .0.label())]
    Duplicate(IdentityField),
}

impl From<DieselError> for Error {
    fn from(err: DieselError) -> Self {
        if let DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) = &err {
            if let Some(field) = info.constraint_name().and_then(IdentityField::from_constraint) {
                return Error::Duplicate(field);
            }
        }
        Error::Result(err)
    }
}

#[derive(Clone, Debug)]
pub struct Store {
    pool: Pool<AsyncPgConnection>,
    types_cache: types_cache::Cache,
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub db_url: String,
    max_open: u64,
    max_idle: u64,
    #[serde(with = "humantime_serde", default)]
    max_lifetime: Option<Duration>,
    #[serde(with = "humantime_serde", default)]
    max_idle_lifetime: Option<Duration>,
    #[serde(with = "humantime_serde")]
    timeout_for_get: Duration,
}

pub async fn create(config: &Config) -> Result<Store, Error> {
    let pool = create_pool(config);
    let types_cache = create_types_cache(pool.clone()).await?;
    Ok(Store { pool, types_cache })
}

fn create_pool(config: &Config) -> mobc::Pool<AsyncDieselConnectionManager<AsyncPgConnection>> {
    let builder = Builder::new()
        .max_open(config.max_open)
        .max_idle(config.max_idle)
        .max_lifetime(config.max_lifetime)
        .max_idle_lifetime(config.max_idle_lifetime)
        .get_timeout(Some(config.timeout_for_get));
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.db_url);
    builder.build(manager)
}

async fn create_types_cache(
    pool: mobc::Pool<AsyncDieselConnectionManager<AsyncPgConnection>>,
) -> Result<types_cache::Cache, Error> {
    let conn = pool.get().await?;
    let cache = types_cache::Cache::new();
    cache.populate(conn).await?;
    Ok(cache)
}

impl Store {
    async fn connection(
        &self,
    ) -> Result<mobc::Connection<AsyncDieselConnectionManager<AsyncPgConnection>>, Error> {
        self.pool.get().await.map_err(Into::into)
    }

    #[tracing::instrument(skip(self))]
    pub async fn load_account_by_username(&self, name: &str) -> Result<Option<Account>, Error> {
        use schema::ride::account::dsl::*;
        use sql_functions::lower;
        let mut conn = self.connection().await?;
        let loaded = account
            .filter(lower(username).eq(lower(name)))
            .select(models::Account::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        loaded
            .map(|row| row.into_entity(&self.types_cache))
            .transpose()
            .map_err(Into::into)
    }

    #[tracing::instrument(skip(self))]
    pub async fn load_account_by_id(&self, account_id: AccountId) -> Result<Option<Account>, Error> {
        use schema::ride::account::dsl::*;
        let mut conn = self.connection().await?;
        let loaded = account
            .filter(id.eq(account_id))
            .select(models::Account::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        loaded
            .map(|row| row.into_entity(&self.types_cache))
            .transpose()
            .map_err(Into::into)
    }

    /// Whether any account other than `except` already holds `value` in
    /// `field`. `role_scope` narrows the search to accounts of one role.
    #[tracing::instrument(skip(self))]
    pub async fn identity_taken(
        &self,
        field: IdentityField,
        value: &str,
        role_scope: Option<AccountRole>,
        except: Option<AccountId>,
    ) -> Result<bool, Error> {
        use schema::ride::account;
        use sql_functions::lower;
        let mut query = account::table.select(account::id).into_boxed();
        query = match field {
            IdentityField::Username => query.filter(lower(account::username).eq(lower(value))),
            IdentityField::Email => query.filter(lower(account::email).eq(lower(value))),
            IdentityField::Phone => query.filter(account::phone.eq(value)),
        };
        if let Some(role) = role_scope {
            let role_id = self.types_cache.account_role.id_of(role)?;
            query = query.filter(account::role_id.eq(role_id));
        }
        if let Some(except) = except {
            query = query.filter(account::id.ne(except));
        }
        let mut conn = self.connection().await?;
        let found: Option<i32> = query.first(&mut conn).await.optional()?;
        Ok(found.is_some())
    }

    #[tracing::instrument(skip(self, new_account), fields(username = %new_account.profile.username))]
    pub async fn register_account(&self, new_account: NewAccount) -> Result<Account, Error> {
        let now: jiff_diesel::Timestamp = jiff::Timestamp::now().into();
        let NewAccount {
            profile,
            password_hash,
            role,
        } = new_account;
        let new_account = models::NewAccount {
            username: profile.username,
            password_hash,
            email: profile.email,
            first_name: profile.first_name,
            last_name: profile.last_name,
            phone: profile.phone,
            role_id: self.types_cache.account_role.id_of(role)?,
            created: now,
            updated: now,
        };
        let row = self
            .connection()
            .await?
            .transaction(|conn| {
                use schema::ride::account;
                async move {
                    diesel::insert_into(account::table)
                        .values(new_account)
                        .returning(models::Account::as_returning())
                        .get_result(conn)
                        .await
                        .map_err(Error::from)
                }
                .scope_boxed()
            })
            .await?;
        row.into_entity(&self.types_cache).map_err(Into::into)
    }

    #[tracing::instrument(skip(self, profile))]
    pub async fn update_account_profile(
        &self,
        account_id: AccountId,
        profile: Profile,
    ) -> Result<Option<Account>, Error> {
        let changes = models::AccountProfileChanges {
            username: profile.username,
            email: profile.email,
            first_name: profile.first_name,
            last_name: profile.last_name,
            phone: profile.phone,
            updated: jiff::Timestamp::now().into(),
        };
        let row = self
            .connection()
            .await?
            .transaction(move |conn| {
                use schema::ride::account;
                async move {
                    diesel::update(account::table.find(account_id))
                        .set(changes)
                        .returning(models::Account::as_returning())
                        .get_result(conn)
                        .await
                        .optional()
                        .map_err(Error::from)
                }
                .scope_boxed()
            })
            .await?;
        row.map(|row| row.into_entity(&self.types_cache))
            .transpose()
            .map_err(Into::into)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_accounts(&self) -> Result<Vec<Account>, Error> {
        use schema::ride::account::dsl::*;
        let mut conn = self.connection().await?;
        let rows = account
            .order(id.asc())
            .select(models::Account::as_select())
            .load(&mut conn)
            .await?;
        rows.into_iter()
            .map(|row| row.into_entity(&self.types_cache).map_err(Into::into))
            .collect()
    }

    #[tracing::instrument(skip(self))]
    pub async fn count_accounts_with_role(&self, role: AccountRole) -> Result<i64, Error> {
        use schema::ride::account::dsl::*;
        let wanted = self.types_cache.account_role.id_of(role)?;
        let mut conn = self.connection().await?;
        account
            .filter(role_id.eq(wanted))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(Into::into)
    }

    #[tracing::instrument(skip(self, details))]
    pub async fn insert_reservation(
        &self,
        owner: AccountId,
        details: ReservationDetails,
    ) -> Result<Reservation, Error> {
        let now: jiff_diesel::Timestamp = jiff::Timestamp::now().into();
        let new_reservation = models::NewReservation {
            account_id: owner,
            changes: models::ReservationChanges::from_details(details, &self.types_cache, now)?,
            created: now,
        };
        let row = self
            .connection()
            .await?
            .transaction(|conn| {
                use schema::ride::reservation;
                async move {
                    diesel::insert_into(reservation::table)
                        .values(new_reservation)
                        .returning(models::Reservation::as_returning())
                        .get_result(conn)
                        .await
                        .map_err(Error::from)
                }
                .scope_boxed()
            })
            .await?;
        row.into_entity(&self.types_cache).map_err(Into::into)
    }

    #[tracing::instrument(skip(self))]
    pub async fn load_reservation_by_id(
        &self,
        reservation_id: ReservationId,
    ) -> Result<Option<Reservation>, Error> {
        use schema::ride::reservation::dsl::*;
        let mut conn = self.connection().await?;
        let loaded = reservation
            .filter(id.eq(reservation_id))
            .select(models::Reservation::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        loaded
            .map(|row| row.into_entity(&self.types_cache))
            .transpose()
            .map_err(Into::into)
    }

    /// Replaces every editable column of the reservation in one transaction.
    /// Concurrent updates are last-write-wins.
    #[tracing::instrument(skip(self, details))]
    pub async fn update_reservation(
        &self,
        reservation_id: ReservationId,
        details: ReservationDetails,
    ) -> Result<Option<Reservation>, Error> {
        let changes = models::ReservationChanges::from_details(
            details,
            &self.types_cache,
            jiff::Timestamp::now().into(),
        )?;
        let row = self
            .connection()
            .await?
            .transaction(move |conn| {
                use schema::ride::reservation;
                async move {
                    diesel::update(reservation::table.find(reservation_id))
                        .set(changes)
                        .returning(models::Reservation::as_returning())
                        .get_result(conn)
                        .await
                        .optional()
                        .map_err(Error::from)
                }
                .scope_boxed()
            })
            .await?;
        row.map(|row| row.into_entity(&self.types_cache))
            .transpose()
            .map_err(Into::into)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_reservations_for_account(
        &self,
        owner: AccountId,
    ) -> Result<Vec<Reservation>, Error> {
        use schema::ride::reservation::dsl::*;
        let mut conn = self.connection().await?;
        let rows = reservation
            .filter(account_id.eq(owner))
            .order(id.asc())
            .select(models::Reservation::as_select())
            .load(&mut conn)
            .await?;
        rows.into_iter()
            .map(|row| row.into_entity(&self.types_cache).map_err(Into::into))
            .collect()
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_reservations(&self) -> Result<Vec<Reservation>, Error> {
        use schema::ride::reservation::dsl::*;
        let mut conn = self.connection().await?;
        let rows = reservation
            .order(id.asc())
            .select(models::Reservation::as_select())
            .load(&mut conn)
            .await?;
        rows.into_iter()
            .map(|row| row.into_entity(&self.types_cache).map_err(Into::into))
            .collect()
    }
}
