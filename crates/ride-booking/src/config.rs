use crate::{notify, registry};
use anyhow::Context;
use std::{io::Read, time::Duration};

#[derive(serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub bind_address: String,
    pub bind_port: u16,
    #[serde(default)]
    pub session_secret: String,
    pub session: SessionConfig,
    pub database: ride_db::Config,
    #[serde(default)]
    pub accounts: registry::Config,
    pub mail: notify::MailConfig,
    pub sms: Option<notify::SmsConfig>,
    pub tracing: TracingConfig,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SessionConfig {
    #[serde(with = "humantime_serde")]
    pub expiry: Duration,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TracingConfig {
    pub console: bool,
}

pub fn load() -> anyhow::Result<Config> {
    let _ = dotenvy::dotenv();
    let mut configuration = String::with_capacity(4096);
    std::fs::File::open("./app-config.toml")
        .context("unable to open configuration file ./app-config.toml")?
        .read_to_string(&mut configuration)
        .context("unable to read configuration file ./app-config.toml")?;
    let mut config = parse(&configuration)?;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

fn parse(configuration: &str) -> anyhow::Result<Config> {
    toml::from_str::<Config>(configuration)
        .context("unable to parse configuration file ./app-config.toml")
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(db_url) = var("RIDE_DATABASE_URL") {
        config.database.db_url = db_url;
    }
    if let Some(session_secret) = var("RIDE_SESSION_SECRET") {
        config.session_secret = session_secret;
    }
    if let Some(smtp_user_name) = var("RIDE_SMTP_USER_NAME") {
        config.mail.smtp_user_name = smtp_user_name;
    }
    if let Some(smtp_password) = var("RIDE_SMTP_PASSWORD") {
        config.mail.smtp_password = smtp_password;
    }
    if let Some(sms) = config.sms.as_mut() {
        if let Some(account_sid) = var("RIDE_SMS_ACCOUNT_SID") {
            sms.account_sid = account_sid;
        }
        if let Some(auth_token) = var("RIDE_SMS_AUTH_TOKEN") {
            sms.auth_token = auth_token;
        }
        if let Some(from_number) = var("RIDE_SMS_FROM_NUMBER") {
            sms.from_number = from_number;
        }
    }
}
