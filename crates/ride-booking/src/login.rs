use crate::{
    application::{render, Page},
    error::AppError,
    identity::Identity,
    registry::{self, Registration, Registry},
    AppState,
};
use askama::Template;
use axum::{
    extract::{FromRequestParts, Query, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_login::{AuthUser, AuthnBackend, UserId};
use axum_messages::Messages;
use http::{request::Parts, StatusCode};
use ride_db::{Account, AccountRole};
use rs_sha512::HasherContext;
use std::{hash::Hasher, sync::Arc};

pub type AuthSession = axum_login::AuthSession<BackEnd>;

#[derive(Clone)]
pub struct BackEnd {
    registry: Arc<Registry>,
}

impl BackEnd {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }
}

/// The session's account. The auth hash follows the stored password hash, so
/// changing the password ends other sessions.
#[derive(Clone, Debug)]
pub struct User {
    account: Account,
    session_auth_hash: [u8; 64],
}

impl AuthUser for User {
    type Id = i32;

    fn id(&self) -> Self::Id {
        self.account.id
    }

    fn session_auth_hash(&self) -> &[u8] {
        &self.session_auth_hash
    }
}

impl From<Account> for User {
    fn from(account: Account) -> Self {
        let mut hasher = rs_sha512::Sha512Hasher::default();
        hasher.write(account.password_hash.as_bytes());
        let _ = hasher.finish();
        let final_result = HasherContext::finish(&mut hasher);
        Self {
            account,
            session_auth_hash: final_result.into(),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Credentials {
    username: String,
    password: String,
    next: Option<String>,
}

#[async_trait::async_trait]
impl AuthnBackend for BackEnd {
    type User = User;
    type Credentials = Credentials;
    type Error = registry::Error;

    async fn authenticate(
        &self,
        credentials: Self::Credentials,
    ) -> Result<Option<Self::User>, Self::Error> {
        Ok(self
            .registry
            .authenticate(&credentials.username, &credentials.password)
            .await?
            .map(User::from))
    }

    async fn get_user(&self, user_id: &UserId<Self>) -> Result<Option<Self::User>, Self::Error> {
        Ok(self.registry.get(*user_id).await?.map(User::from))
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_session =
            <AuthSession as FromRequestParts<S>>::from_request_parts(parts, state).await?;
        Ok(Identity::from(auth_session.user.map(|user| user.account)))
    }
}

async fn login_account(auth_session: &mut AuthSession, account: Account) -> Result<(), AppError> {
    auth_session
        .login(&User::from(account))
        .await
        .map_err(AppError::internal)
}

/// Which of the two front doors a login or registration came through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Portal {
    Public,
    Admin,
}

impl Portal {
    fn role(self) -> AccountRole {
        match self {
            Portal::Public => AccountRole::Standard,
            Portal::Admin => AccountRole::Administrator,
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            Portal::Public => "",
            Portal::Admin => "/admin",
        }
    }

    fn heading(self) -> &'static str {
        match self {
            Portal::Public => "",
            Portal::Admin => "Administrator ",
        }
    }

    fn accepts(self, role: AccountRole) -> bool {
        match self {
            Portal::Public => true,
            Portal::Admin => role == AccountRole::Administrator,
        }
    }
}

/// Only same-site paths are followed after login.
fn local_path(next: Option<&str>) -> Option<&str> {
    next.filter(|path| path.starts_with('/') && !path.starts_with("//"))
}

pub mod register_new_user {
    use super::*;

    #[derive(Template)]
    #[template(path = "register.html")]
    pub struct RegisterTemplate {
        page: Page,
        heading: &'static str,
        action: String,
        form: Registration,
    }

    fn form_page(
        portal: Portal,
        page: Page,
        mut form: Registration,
    ) -> Result<Response, AppError> {
        form.password.clear();
        Ok(render(&RegisterTemplate {
            page,
            heading: portal.heading(),
            action: format!("{}/register", portal.prefix()),
            form,
        })?
        .into_response())
    }

    /// An administrator, anyone while no administrator exists, or anyone when
    /// self-registration is switched on.
    pub async fn admin_registration_open(
        registry: &Registry,
        identity: &Identity,
    ) -> Result<bool, AppError> {
        Ok(identity.is_admin()
            || registry.admin_self_registration()
            || registry.administrator_count().await? == 0)
    }

    pub async fn show(
        portal: Portal,
        app_state: AppState,
        identity: Identity,
        messages: Messages,
    ) -> Result<Response, AppError> {
        if portal == Portal::Admin
            && !admin_registration_open(&app_state.registry, &identity).await?
        {
            return Err(AppError::Unauthorized);
        }
        form_page(portal, Page::new(&identity, messages), Registration::default())
    }

    pub async fn submit(
        portal: Portal,
        app_state: AppState,
        identity: Identity,
        mut auth_session: AuthSession,
        messages: Messages,
        registration: Registration,
    ) -> Result<Response, AppError> {
        if portal == Portal::Admin
            && !admin_registration_open(&app_state.registry, &identity).await?
        {
            return Err(AppError::Unauthorized);
        }
        let account = match app_state
            .registry
            .register_account(registration.clone(), portal.role())
            .await
        {
            Ok(account) => account,
            Err(registry::Error::Validation(errors)) => {
                let page = Page::new(&identity, messages).with_errors(errors.messages());
                return form_page(portal, page, registration);
            }
            Err(registry::Error::DuplicateIdentity(field)) => {
                let page = Page::new(&identity, messages)
                    .with_errors([format!("That {} is already taken", field.label())]);
                return form_page(portal, page, registration);
            }
            Err(err) => return Err(err.into()),
        };
        if portal == Portal::Admin && identity.is_admin() {
            messages.success(format!(
                "Administrator {} registered",
                account.profile.username
            ));
            return Ok(Redirect::to("/admin/home").into_response());
        }
        let landing = Identity::from(Some(account.clone())).landing_page();
        login_account(&mut auth_session, account).await?;
        messages.success("Welcome! Your account is ready");
        Ok(Redirect::to(&landing).into_response())
    }

    pub async fn get(
        State(app_state): State<AppState>,
        identity: Identity,
        messages: Messages,
    ) -> Result<Response, AppError> {
        show(Portal::Public, app_state, identity, messages).await
    }

    pub async fn post(
        State(app_state): State<AppState>,
        identity: Identity,
        auth_session: AuthSession,
        messages: Messages,
        Form(registration): Form<Registration>,
    ) -> Result<Response, AppError> {
        submit(
            Portal::Public,
            app_state,
            identity,
            auth_session,
            messages,
            registration,
        )
        .await
    }
}

pub mod login {
    use super::*;

    #[derive(Template)]
    #[template(path = "login.html")]
    pub struct LoginTemplate {
        page: Page,
        heading: &'static str,
        action: String,
        next: Option<String>,
    }

    #[derive(Debug, serde::Deserialize)]
    pub struct NextUrl {
        next: Option<String>,
    }

    pub fn show(
        portal: Portal,
        identity: Identity,
        messages: Messages,
        next: Option<String>,
    ) -> Result<Response, AppError> {
        if identity.account().is_some_and(|a| portal.accepts(a.role)) {
            return Ok(Redirect::to(&identity.landing_page()).into_response());
        }
        Ok(render(&LoginTemplate {
            page: Page::new(&identity, messages),
            heading: portal.heading(),
            action: format!("{}/login", portal.prefix()),
            next,
        })?
        .into_response())
    }

    pub async fn submit(
        portal: Portal,
        mut auth_session: AuthSession,
        messages: Messages,
        creds: Credentials,
    ) -> Result<Response, AppError> {
        let user = match auth_session.authenticate(creds.clone()).await {
            Ok(Some(user)) if portal.accepts(user.account.role) => user,
            Ok(_) => {
                messages.error("Invalid username or password");
                let mut login_url = format!("{}/login", portal.prefix());
                if let Some(next) = local_path(creds.next.as_deref()) {
                    login_url = format!("{login_url}?next={next}");
                }
                return Ok(Redirect::to(&login_url).into_response());
            }
            Err(err) => return Err(AppError::internal(err)),
        };
        let landing = Identity::from(Some(user.account.clone())).landing_page();
        auth_session.login(&user).await.map_err(AppError::internal)?;
        messages.success("Successfully logged in");
        Ok(Redirect::to(local_path(creds.next.as_deref()).unwrap_or(&landing)).into_response())
    }

    pub async fn get(
        identity: Identity,
        messages: Messages,
        Query(NextUrl { next }): Query<NextUrl>,
    ) -> Result<Response, AppError> {
        show(Portal::Public, identity, messages, next)
    }

    pub async fn post(
        auth_session: AuthSession,
        messages: Messages,
        Form(creds): Form<Credentials>,
    ) -> Result<Response, AppError> {
        submit(Portal::Public, auth_session, messages, creds).await
    }
}

pub mod logout {
    use super::*;

    pub async fn sign_out(
        portal: Portal,
        mut auth_session: AuthSession,
        messages: Messages,
    ) -> Result<Response, AppError> {
        auth_session.logout().await.map_err(AppError::internal)?;
        messages.info("You have been logged out");
        let target = match portal {
            Portal::Public => "/",
            Portal::Admin => "/admin/login",
        };
        Ok(Redirect::to(target).into_response())
    }

    pub async fn get(auth_session: AuthSession, messages: Messages) -> Result<Response, AppError> {
        sign_out(Portal::Public, auth_session, messages).await
    }
}
