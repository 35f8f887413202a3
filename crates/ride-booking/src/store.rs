//! Storage seam for the registry and the ledger. `ride_db::Store` backs both
//! traits in production.

use async_trait::async_trait;
use ride_db::{
    Account, AccountId, AccountRole, Error, IdentityField, NewAccount, Profile, Reservation,
    ReservationDetails, ReservationId,
};

#[cfg(test)]
pub mod memory;

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn account_by_id(&self, id: AccountId) -> Result<Option<Account>, Error>;

    async fn account_by_username(&self, username: &str) -> Result<Option<Account>, Error>;

    async fn identity_taken(
        &self,
        field: IdentityField,
        value: &str,
        role_scope: Option<AccountRole>,
        except: Option<AccountId>,
    ) -> Result<bool, Error>;

    async fn insert_account(&self, account: NewAccount) -> Result<Account, Error>;

    async fn update_profile(
        &self,
        id: AccountId,
        profile: Profile,
    ) -> Result<Option<Account>, Error>;

    async fn accounts(&self) -> Result<Vec<Account>, Error>;

    async fn count_with_role(&self, role: AccountRole) -> Result<u64, Error>;
}

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    async fn insert_reservation(
        &self,
        owner: AccountId,
        details: ReservationDetails,
    ) -> Result<Reservation, Error>;

    async fn reservation_by_id(&self, id: ReservationId) -> Result<Option<Reservation>, Error>;

    async fn update_reservation(
        &self,
        id: ReservationId,
        details: ReservationDetails,
    ) -> Result<Option<Reservation>, Error>;

    async fn reservations_for_account(&self, owner: AccountId) -> Result<Vec<Reservation>, Error>;

    async fn reservations(&self) -> Result<Vec<Reservation>, Error>;
}

#[async_trait]
impl AccountRepository for ride_db::Store {
    async fn account_by_id(&self, id: AccountId) -> Result<Option<Account>, Error> {
        self.load_account_by_id(id).await
    }

    async fn account_by_username(&self, username: &str) -> Result<Option<Account>, Error> {
        self.load_account_by_username(username).await
    }

    async fn identity_taken(
        &self,
        field: IdentityField,
        value: &str,
        role_scope: Option<AccountRole>,
        except: Option<AccountId>,
    ) -> Result<bool, Error> {
        ride_db::Store::identity_taken(self, field, value, role_scope, except).await
    }

    async fn insert_account(&self, account: NewAccount) -> Result<Account, Error> {
        self.register_account(account).await
    }

    async fn update_profile(
        &self,
        id: AccountId,
        profile: Profile,
    ) -> Result<Option<Account>, Error> {
        self.update_account_profile(id, profile).await
    }

    async fn accounts(&self) -> Result<Vec<Account>, Error> {
        self.list_accounts().await
    }

    async fn count_with_role(&self, role: AccountRole) -> Result<u64, Error> {
        Ok(self.count_accounts_with_role(role).await?.max(0) as u64)
    }
}

#[async_trait]
impl ReservationRepository for ride_db::Store {
    async fn insert_reservation(
        &self,
        owner: AccountId,
        details: ReservationDetails,
    ) -> Result<Reservation, Error> {
        ride_db::Store::insert_reservation(self, owner, details).await
    }

    async fn reservation_by_id(&self, id: ReservationId) -> Result<Option<Reservation>, Error> {
        self.load_reservation_by_id(id).await
    }

    async fn update_reservation(
        &self,
        id: ReservationId,
        details: ReservationDetails,
    ) -> Result<Option<Reservation>, Error> {
        ride_db::Store::update_reservation(self, id, details).await
    }

    async fn reservations_for_account(&self, owner: AccountId) -> Result<Vec<Reservation>, Error> {
        self.list_reservations_for_account(owner).await
    }

    async fn reservations(&self) -> Result<Vec<Reservation>, Error> {
        self.list_reservations().await
    }
}
