//! Who the caller is, resolved once per request, and what they may touch.

use ride_db::{Account, AccountId, AccountRole, Reservation};

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("not authorized")]
pub struct Unauthorized;

#[derive(Clone, Debug, Default)]
pub enum Identity {
    #[default]
    Anonymous,
    User(Account),
    Admin(Account),
}

impl From<Option<Account>> for Identity {
    fn from(account: Option<Account>) -> Self {
        match account {
            None => Identity::Anonymous,
            Some(account) => match account.role {
                AccountRole::Standard => Identity::User(account),
                AccountRole::Administrator => Identity::Admin(account),
            },
        }
    }
}

impl Identity {
    pub fn account(&self) -> Option<&Account> {
        match self {
            Identity::Anonymous => None,
            Identity::User(account) | Identity::Admin(account) => Some(account),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Identity::Admin(_))
    }

    pub fn require_authenticated(&self) -> Result<&Account, Unauthorized> {
        self.account().ok_or(Unauthorized)
    }

    pub fn require_role(&self, expected: AccountRole) -> Result<&Account, Unauthorized> {
        self.account()
            .filter(|account| account.role == expected)
            .ok_or(Unauthorized)
    }

    pub fn require_admin(&self) -> Result<&Account, Unauthorized> {
        self.require_role(AccountRole::Administrator)
    }

    /// The owning standard account or any administrator.
    pub fn authorize_reservation(&self, reservation: &Reservation) -> Result<(), Unauthorized> {
        match self {
            Identity::Admin(_) => Ok(()),
            Identity::User(account) if account.id == reservation.account_id => Ok(()),
            _ => Err(Unauthorized),
        }
    }

    /// Only the account itself.
    pub fn authorize_profile(&self, account_id: AccountId) -> Result<&Account, Unauthorized> {
        self.account()
            .filter(|account| account.id == account_id)
            .ok_or(Unauthorized)
    }

    /// Where a caller lands after logging in or finishing a form.
    pub fn landing_page(&self) -> String {
        match self {
            Identity::Anonymous => "/".to_owned(),
            Identity::User(account) => format!("/users/{}", account.id),
            Identity::Admin(_) => "/admin/home".to_owned(),
        }
    }
}
