//! In-process repositories mirroring the Postgres unique indexes and the
//! reservation id sequence.

use super::{AccountRepository, ReservationRepository};
use async_trait::async_trait;
use ride_db::{
    Account, AccountId, AccountRole, Error, IdentityField, NewAccount, Profile, Reservation,
    ReservationDetails, ReservationId,
};
use std::{collections::BTreeMap, sync::Mutex};

pub const FIRST_RESERVATION_ID: ReservationId = 10001;

#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    accounts: BTreeMap<AccountId, Account>,
    reservations: BTreeMap<ReservationId, Reservation>,
    next_account_id: AccountId,
    next_reservation_id: ReservationId,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner {
                accounts: BTreeMap::new(),
                reservations: BTreeMap::new(),
                next_account_id: 1,
                next_reservation_id: FIRST_RESERVATION_ID,
            }),
        }
    }
}

impl MemoryStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn holds(account: &Account, field: IdentityField, value: &str) -> bool {
    let stored = field.value_in(&account.profile);
    match field {
        IdentityField::Username | IdentityField::Email => stored.eq_ignore_ascii_case(value),
        IdentityField::Phone => stored == value,
    }
}

impl Inner {
    /// Same rules as the unique indexes: username and email case-insensitive,
    /// phone unique within a role.
    fn index_violation(
        &self,
        profile: &Profile,
        role: AccountRole,
        except: Option<AccountId>,
    ) -> Option<IdentityField> {
        let others = || {
            self.accounts
                .values()
                .filter(move |a| Some(a.id) != except)
        };
        IdentityField::ALL.into_iter().find(|field| {
            others().any(|a| {
                holds(a, *field, field.value_in(profile))
                    && (*field != IdentityField::Phone || a.role == role)
            })
        })
    }
}

#[async_trait]
impl AccountRepository for MemoryStore {
    async fn account_by_id(&self, id: AccountId) -> Result<Option<Account>, Error> {
        Ok(self.lock().accounts.get(&id).cloned())
    }

    async fn account_by_username(&self, username: &str) -> Result<Option<Account>, Error> {
        Ok(self
            .lock()
            .accounts
            .values()
            .find(|a| holds(a, IdentityField::Username, username))
            .cloned())
    }

    async fn identity_taken(
        &self,
        field: IdentityField,
        value: &str,
        role_scope: Option<AccountRole>,
        except: Option<AccountId>,
    ) -> Result<bool, Error> {
        Ok(self.lock().accounts.values().any(|a| {
            Some(a.id) != except
                && role_scope.map_or(true, |role| a.role == role)
                && holds(a, field, value)
        }))
    }

    async fn insert_account(&self, account: NewAccount) -> Result<Account, Error> {
        let mut inner = self.lock();
        if let Some(field) = inner.index_violation(&account.profile, account.role, None) {
            return Err(Error::Duplicate(field));
        }
        let now = jiff::Timestamp::now();
        let id = inner.next_account_id;
        inner.next_account_id += 1;
        let account = Account {
            id,
            profile: account.profile,
            password_hash: account.password_hash,
            role: account.role,
            created: now,
            updated: now,
        };
        inner.accounts.insert(id, account.clone());
        Ok(account)
    }

    async fn update_profile(
        &self,
        id: AccountId,
        profile: Profile,
    ) -> Result<Option<Account>, Error> {
        let mut inner = self.lock();
        let Some(role) = inner.accounts.get(&id).map(|a| a.role) else {
            return Ok(None);
        };
        if let Some(field) = inner.index_violation(&profile, role, Some(id)) {
            return Err(Error::Duplicate(field));
        }
        Ok(inner.accounts.get_mut(&id).map(|account| {
            account.profile = profile;
            account.updated = jiff::Timestamp::now();
            account.clone()
        }))
    }

    async fn accounts(&self) -> Result<Vec<Account>, Error> {
        Ok(self.lock().accounts.values().cloned().collect())
    }

    async fn count_with_role(&self, role: AccountRole) -> Result<u64, Error> {
        Ok(self
            .lock()
            .accounts
            .values()
            .filter(|a| a.role == role)
            .count() as u64)
    }
}

#[async_trait]
impl ReservationRepository for MemoryStore {
    async fn insert_reservation(
        &self,
        owner: AccountId,
        details: ReservationDetails,
    ) -> Result<Reservation, Error> {
        let mut inner = self.lock();
        let now = jiff::Timestamp::now();
        let id = inner.next_reservation_id;
        inner.next_reservation_id += 1;
        let reservation = Reservation {
            id,
            account_id: owner,
            details,
            created: now,
            updated: now,
        };
        inner.reservations.insert(id, reservation.clone());
        Ok(reservation)
    }

    async fn reservation_by_id(&self, id: ReservationId) -> Result<Option<Reservation>, Error> {
        Ok(self.lock().reservations.get(&id).cloned())
    }

    async fn update_reservation(
        &self,
        id: ReservationId,
        details: ReservationDetails,
    ) -> Result<Option<Reservation>, Error> {
        Ok(self.lock().reservations.get_mut(&id).map(|reservation| {
            reservation.details = details;
            reservation.updated = jiff::Timestamp::now();
            reservation.clone()
        }))
    }

    async fn reservations_for_account(&self, owner: AccountId) -> Result<Vec<Reservation>, Error> {
        Ok(self
            .lock()
            .reservations
            .values()
            .filter(|r| r.account_id == owner)
            .cloned()
            .collect())
    }

    async fn reservations(&self) -> Result<Vec<Reservation>, Error> {
        Ok(self.lock().reservations.values().cloned().collect())
    }
}
