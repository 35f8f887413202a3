use crate::{
    credentials,
    store::AccountRepository,
    validation::FieldErrors,
};
use ride_db::{Account, AccountId, AccountRole, IdentityField, NewAccount, Profile};
use std::sync::Arc;

const USERNAME_MIN: usize = 4;
const USERNAME_MAX: usize = 25;
const NAME_MAX: usize = 30;
const EMAIL_MAX: usize = 320;
const PHONE_MAX: usize = 32;

/// Whether a phone number may be reused by an account of the other role.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhoneUniqueness {
    #[default]
    Global,
    PerRole,
}

#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub phone_uniqueness: PhoneUniqueness,
    #[serde(default)]
    pub admin_self_registration: bool,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid account fields: {0}")]
    Validation(FieldErrors),
    #[error("{} is already taken", .0.label())]
    DuplicateIdentity(IdentityField),
    #[error("current password is incorrect")]
    WrongPassword,
    #[error("account not found")]
    NotFound,
    #[error("{0}")]
    Credential(credentials::Error),
    #[error("Account database error: {0}")]
    Store(ride_db::Error),
}

impl From<ride_db::Error> for Error {
    fn from(err: ride_db::Error) -> Self {
        match err {
            ride_db::Error::Duplicate(field) => Error::DuplicateIdentity(field),
            err => Error::Store(err),
        }
    }
}

/// Submitted registration fields, untrimmed.
#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

impl Registration {
    pub fn profile(&self) -> Profile {
        Profile {
            username: self.username.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: self.phone.clone(),
        }
    }
}

/// Trims every field and records shape errors.
pub fn validate_profile(errors: &mut FieldErrors, profile: &Profile) -> Profile {
    let username = errors.required("username", "Username", &profile.username);
    if !username.is_empty() {
        let length = username.chars().count();
        if length < USERNAME_MIN || length > USERNAME_MAX {
            errors.push(
                "username",
                format!("Username must be between {USERNAME_MIN} and {USERNAME_MAX} characters in length"),
            );
        }
        if username.contains(|c: char| !(c.is_alphanumeric() || matches!(c, '.' | '-' | '_'))) {
            errors.push(
                "username",
                "Username must only consist of letters, numbers, and '.', '-' or '_'",
            );
        }
    }
    let email = errors.required("email", "E-mail", &profile.email);
    errors.max_chars("email", "E-mail", &email, EMAIL_MAX);
    errors.email("email", "E-mail", &email);
    let first_name = errors.required("first_name", "First name", &profile.first_name);
    errors.max_chars("first_name", "First name", &first_name, NAME_MAX);
    let last_name = errors.required("last_name", "Last name", &profile.last_name);
    errors.max_chars("last_name", "Last name", &last_name, NAME_MAX);
    let phone = errors.required("phone", "Phone number", &profile.phone);
    errors.max_chars("phone", "Phone number", &phone, PHONE_MAX);
    if phone.contains(|c: char| !(c.is_ascii_digit() || " +-().".contains(c))) {
        errors.push("phone", "Phone number may only contain digits, spaces, and + - ( ) .");
    }
    Profile {
        username,
        email,
        first_name,
        last_name,
        phone,
    }
}

pub struct Registry {
    accounts: Arc<dyn AccountRepository>,
    config: Config,
}

impl Registry {
    pub fn new(accounts: Arc<dyn AccountRepository>, config: Config) -> Self {
        Self { accounts, config }
    }

    pub fn admin_self_registration(&self) -> bool {
        self.config.admin_self_registration
    }

    fn role_scope(&self, field: IdentityField, role: AccountRole) -> Option<AccountRole> {
        match (field, self.config.phone_uniqueness) {
            (IdentityField::Phone, PhoneUniqueness::PerRole) => Some(role),
            _ => None,
        }
    }

    /// First field of `profile`, in username, email, phone order, already held
    /// by another account.
    async fn first_conflict(
        &self,
        profile: &Profile,
        role: AccountRole,
        except: Option<&Account>,
    ) -> Result<Option<IdentityField>, Error> {
        for field in IdentityField::ALL {
            let value = field.value_in(profile);
            if let Some(current) = except {
                if field.value_in(&current.profile).eq_ignore_ascii_case(value) {
                    continue;
                }
            }
            if self
                .accounts
                .identity_taken(
                    field,
                    value,
                    self.role_scope(field, role),
                    except.map(|a| a.id),
                )
                .await?
            {
                return Ok(Some(field));
            }
        }
        Ok(None)
    }

    #[tracing::instrument(skip(self, registration), fields(username = %registration.username))]
    pub async fn register_account(
        &self,
        registration: Registration,
        role: AccountRole,
    ) -> Result<Account, Error> {
        let mut errors = FieldErrors::new();
        let profile = validate_profile(&mut errors, &registration.profile());
        if let Err(err) = credentials::check_strength(&registration.password) {
            errors.push("password", err.to_string());
        }
        if !errors.is_empty() {
            return Err(Error::Validation(errors));
        }
        if let Some(field) = self.first_conflict(&profile, role, None).await? {
            return Err(Error::DuplicateIdentity(field));
        }
        let password_hash =
            credentials::hash(&registration.password).map_err(Error::Credential)?;
        let account = self
            .accounts
            .insert_account(NewAccount {
                profile,
                password_hash,
                role,
            })
            .await?;
        tracing::info!(account = account.id, %role, "registered account");
        Ok(account)
    }

    /// `None` for an unknown username and for a wrong password alike.
    #[tracing::instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Account>, Error> {
        Ok(self
            .accounts
            .account_by_username(username.trim())
            .await?
            .filter(|account| credentials::verify(password, &account.password_hash)))
    }

    #[tracing::instrument(skip(self, account, changes, current_password), fields(account = account.id))]
    pub async fn update_profile(
        &self,
        account: &Account,
        changes: Profile,
        current_password: &str,
    ) -> Result<Account, Error> {
        let current = self
            .accounts
            .account_by_id(account.id)
            .await?
            .ok_or(Error::NotFound)?;
        if !credentials::verify(current_password, &current.password_hash) {
            return Err(Error::WrongPassword);
        }
        let mut errors = FieldErrors::new();
        let profile = validate_profile(&mut errors, &changes);
        if !errors.is_empty() {
            return Err(Error::Validation(errors));
        }
        if let Some(field) = self
            .first_conflict(&profile, current.role, Some(&current))
            .await?
        {
            return Err(Error::DuplicateIdentity(field));
        }
        self.accounts
            .update_profile(current.id, profile)
            .await?
            .ok_or(Error::NotFound)
    }

    /// `true` when no account of `role`'s uniqueness scope holds `value`.
    #[tracing::instrument(skip(self))]
    pub async fn is_available(
        &self,
        field: IdentityField,
        value: &str,
        role: AccountRole,
    ) -> Result<bool, Error> {
        let taken = self
            .accounts
            .identity_taken(field, value.trim(), self.role_scope(field, role), None)
            .await?;
        Ok(!taken)
    }

    pub async fn get(&self, id: AccountId) -> Result<Option<Account>, Error> {
        Ok(self.accounts.account_by_id(id).await?)
    }

    pub async fn list_all(&self) -> Result<Vec<Account>, Error> {
        Ok(self.accounts.accounts().await?)
    }

    pub async fn administrator_count(&self) -> Result<u64, Error> {
        Ok(self
            .accounts
            .count_with_role(AccountRole::Administrator)
            .await?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    pub(crate) fn registration(username: &str, email: &str, phone: &str) -> Registration {
        Registration {
            username: username.to_owned(),
            password: "longenough1".to_owned(),
            email: email.to_owned(),
            first_name: "Alice".to_owned(),
            last_name: "Doe".to_owned(),
            phone: phone.to_owned(),
        }
    }

    fn registry_with(config: Config) -> (Registry, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        (Registry::new(store.clone(), config), store)
    }

    fn registry() -> (Registry, Arc<MemoryStore>) {
        registry_with(Config::default())
    }

    #[tokio::test]
    async fn registered_account_authenticates_with_its_password_only() {
        let (registry, _) = registry();
        let account = registry
            .register_account(
                registration("alice", "alice@x.com", "5551234567"),
                AccountRole::Standard,
            )
            .await
            .expect("should register");
        assert_eq!(account.role, AccountRole::Standard);
        assert_ne!(account.password_hash, "longenough1");

        let found = registry
            .authenticate("alice", "longenough1")
            .await
            .expect("lookup should succeed");
        assert_eq!(found.map(|a| a.id), Some(account.id));
        assert!(registry
            .authenticate("alice", "wrongpassword")
            .await
            .expect("lookup should succeed")
            .is_none());
        assert!(registry
            .authenticate("nobody", "longenough1")
            .await
            .expect("lookup should succeed")
            .is_none());
    }

    #[tokio::test]
    async fn invalid_fields_are_all_reported() {
        let (registry, store) = registry();
        let err = registry
            .register_account(
                Registration {
                    username: "al".to_owned(),
                    password: "short".to_owned(),
                    email: "not-an-email".to_owned(),
                    first_name: "".to_owned(),
                    last_name: "x".repeat(31),
                    phone: "555-1234".to_owned(),
                },
                AccountRole::Standard,
            )
            .await
            .expect_err("should reject");
        let Error::Validation(errors) = err else {
            panic!("expected validation error, got {err:?}");
        };
        for field in ["username", "password", "email", "first_name", "last_name"] {
            assert!(errors.contains(field), "missing error for {field}: {errors}");
        }
        assert!(!errors.contains("phone"));
        assert!(store.accounts().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn duplicate_identity_names_the_first_conflicting_field() {
        let (registry, store) = registry();
        registry
            .register_account(
                registration("alice", "alice@x.com", "5551234567"),
                AccountRole::Standard,
            )
            .await
            .expect("should register");

        let err = registry
            .register_account(
                registration("ALICE", "alice@x.com", "5551234567"),
                AccountRole::Standard,
            )
            .await
            .expect_err("should reject");
        assert!(matches!(err, Error::DuplicateIdentity(IdentityField::Username)));

        let err = registry
            .register_account(
                registration("bobby", "Alice@X.com", "5550000000"),
                AccountRole::Standard,
            )
            .await
            .expect_err("should reject");
        assert!(matches!(err, Error::DuplicateIdentity(IdentityField::Email)));

        let err = registry
            .register_account(
                registration("bobby", "bobby@x.com", "5551234567"),
                AccountRole::Standard,
            )
            .await
            .expect_err("should reject");
        assert!(matches!(err, Error::DuplicateIdentity(IdentityField::Phone)));

        assert_eq!(store.accounts().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn phone_uniqueness_spans_roles_unless_configured_per_role() {
        let (registry, _) = registry();
        registry
            .register_account(
                registration("alice", "alice@x.com", "5551234567"),
                AccountRole::Standard,
            )
            .await
            .expect("should register");
        let err = registry
            .register_account(
                registration("admin1", "admin@x.com", "5551234567"),
                AccountRole::Administrator,
            )
            .await
            .expect_err("should reject");
        assert!(matches!(err, Error::DuplicateIdentity(IdentityField::Phone)));

        let (registry, _) = registry_with(Config {
            phone_uniqueness: PhoneUniqueness::PerRole,
            admin_self_registration: false,
        });
        registry
            .register_account(
                registration("alice", "alice@x.com", "5551234567"),
                AccountRole::Standard,
            )
            .await
            .expect("should register");
        registry
            .register_account(
                registration("admin1", "admin@x.com", "5551234567"),
                AccountRole::Administrator,
            )
            .await
            .expect("per-role phone uniqueness should allow the admin");
        assert_eq!(registry.administrator_count().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn storage_level_duplicate_maps_to_duplicate_identity() {
        let err = Error::from(ride_db::Error::Duplicate(IdentityField::Email));
        assert!(matches!(err, Error::DuplicateIdentity(IdentityField::Email)));
    }

    #[tokio::test]
    async fn profile_update_requires_the_current_password() {
        let (registry, _) = registry();
        let account = registry
            .register_account(
                registration("alice", "alice@x.com", "5551234567"),
                AccountRole::Standard,
            )
            .await
            .expect("should register");
        let mut changes = account.profile.clone();
        changes.last_name = "Smith".to_owned();

        let err = registry
            .update_profile(&account, changes.clone(), "wrongpassword")
            .await
            .expect_err("should reject");
        assert!(matches!(err, Error::WrongPassword));
        let unchanged = registry.get(account.id).await.expect("get").expect("exists");
        assert_eq!(unchanged.profile.last_name, "Doe");

        let updated = registry
            .update_profile(&account, changes, "longenough1")
            .await
            .expect("should update");
        assert_eq!(updated.profile.last_name, "Smith");
        assert_eq!(updated.profile.username, "alice");
    }

    #[tokio::test]
    async fn profile_update_rejects_identities_held_by_others() {
        let (registry, _) = registry();
        let alice = registry
            .register_account(
                registration("alice", "alice@x.com", "5551234567"),
                AccountRole::Standard,
            )
            .await
            .expect("should register");
        registry
            .register_account(
                registration("bobby", "bob@x.com", "5557654321"),
                AccountRole::Standard,
            )
            .await
            .expect("should register");
        let mut changes = alice.profile.clone();
        changes.email = "BOB@x.com".to_owned();
        let err = registry
            .update_profile(&alice, changes, "longenough1")
            .await
            .expect_err("should reject");
        assert!(matches!(err, Error::DuplicateIdentity(IdentityField::Email)));
    }

    #[tokio::test]
    async fn availability_reflects_existing_accounts() {
        let (registry, _) = registry();
        assert!(registry
            .is_available(IdentityField::Username, "alice", AccountRole::Standard)
            .await
            .expect("lookup"));
        registry
            .register_account(
                registration("alice", "alice@x.com", "5551234567"),
                AccountRole::Standard,
            )
            .await
            .expect("should register");
        assert!(!registry
            .is_available(IdentityField::Username, "Alice", AccountRole::Standard)
            .await
            .expect("lookup"));
        assert!(!registry
            .is_available(IdentityField::Phone, "5551234567", AccountRole::Standard)
            .await
            .expect("lookup"));
        assert!(registry
            .is_available(IdentityField::Email, "carol@x.com", AccountRole::Standard)
            .await
            .expect("lookup"));
    }
}
