use anyhow::Context;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod admin;
mod application;
mod config;
mod credentials;
mod error;
mod identity;
mod ledger;
mod login;
mod lookup;
mod notify;
mod registry;
mod reservations;
mod routes;
mod session_key;
mod store;
mod users;
mod validation;

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    let config = config::load().context("loading configuration")?;
    init_tracing(&config.tracing);
    let session_key =
        session_key::create(&config.session_secret).context("configuring session key")?;
    let store = Arc::new(
        ride_db::create(&config.database)
            .await
            .context("creating database store")?,
    );
    let app_state = AppState::new(
        Arc::new(registry::Registry::new(store.clone(), config.accounts.clone())),
        store,
        notify::Dispatcher::from_config(config.mail.clone(), config.sms.clone()),
    );
    let backend = login::BackEnd::new(app_state.registry.clone());
    let app = routes::setup(app_state, backend, session_key, config.session.expiry);
    let listener = tokio::net::TcpListener::bind((config.bind_address.as_str(), config.bind_port))
        .await
        .context("binding listener")?;
    tracing::info!(
        "listening on {}",
        listener.local_addr().context("reading bound address")?
    );
    let cancellation_token = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancellation_token.clone()));
    axum::serve(listener, app)
        .with_graceful_shutdown(cancellation_token.cancelled_owned())
        .await
        .context("serving application")
}

fn init_tracing(config: &config::TracingConfig) {
    if config.console {
        console_subscriber::init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .init();
    }
}

async fn cancel_on_signal(cancellation_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("listening for ctrl-c: {err}");
        }
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("listening for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();
    tokio::select! {
        _ = ctrl_c => (),
        _ = terminate => (),
    }
    tracing::info!("shutting down");
    cancellation_token.cancel();
}

#[derive(Clone)]
struct AppState {
    registry: Arc<registry::Registry>,
    ledger: Arc<ledger::Ledger>,
    dispatcher: Arc<notify::Dispatcher>,
}

impl AppState {
    fn new<S>(registry: Arc<registry::Registry>, store: Arc<S>, dispatcher: notify::Dispatcher) -> Self
    where
        S: store::AccountRepository + store::ReservationRepository + 'static,
    {
        Self {
            registry,
            ledger: Arc::new(ledger::Ledger::new(store.clone(), store)),
            dispatcher: Arc::new(dispatcher),
        }
    }
}
