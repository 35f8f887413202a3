use askama::Template;
use async_trait::async_trait;
use itertools::Itertools;
use ride_db::{Account, Address, Reservation};
use std::{sync::Arc, time::Duration};

#[derive(Clone, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_implicit_tls: bool,
    #[serde(with = "humantime_serde")]
    pub smtp_connect_timeout: Duration,
    #[serde(default)]
    pub smtp_user_name: String,
    #[serde(default)]
    pub smtp_password: String,
    pub from_address: String,
}

#[derive(Clone, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SmsConfig {
    pub enabled: bool,
    pub api_base: String,
    #[serde(default)]
    pub account_sid: String,
    #[serde(default)]
    pub auth_token: String,
    #[serde(default)]
    pub from_number: String,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Template Error: {0}")]
    Template(#[from] askama::Error),
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[async_trait]
pub trait MailChannel: Send + Sync {
    async fn deliver(&self, email: OutboundEmail) -> Result<(), String>;
}

#[async_trait]
pub trait SmsChannel: Send + Sync {
    async fn deliver(&self, to: &str, body: &str) -> Result<(), String>;
}

pub struct SmtpChannel {
    config: MailConfig,
}

impl SmtpChannel {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl MailChannel for SmtpChannel {
    #[tracing::instrument(skip(self, email), fields(to = %email.to))]
    async fn deliver(&self, email: OutboundEmail) -> Result<(), String> {
        let message = mail_builder::MessageBuilder::new()
            .subject(email.subject.as_str())
            .from(self.config.from_address.as_str())
            .sender(self.config.from_address.as_str())
            .to(email.to.as_str())
            .html_body(email.html.as_str())
            .text_body(email.text.as_str());
        let mut client = mail_send::SmtpClientBuilder::new(
            self.config.smtp_host.as_str(),
            self.config.smtp_port,
        )
        .implicit_tls(self.config.smtp_implicit_tls)
        .timeout(self.config.smtp_connect_timeout);
        if !self.config.smtp_user_name.is_empty() {
            client = client.credentials((
                self.config.smtp_user_name.as_str(),
                self.config.smtp_password.as_str(),
            ));
        }
        client
            .connect()
            .await
            .map_err(|err| format!("Connecting to SMTP Server: {err:?}"))?
            .send(message)
            .await
            .map_err(|err| format!("Sending Email: {err:?}"))
    }
}

/// Twilio-compatible REST messaging endpoint.
pub struct TwilioChannel {
    client: reqwest::Client,
    config: SmsConfig,
}

impl TwilioChannel {
    pub fn new(config: SmsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl SmsChannel for TwilioChannel {
    #[tracing::instrument(skip(self, body))]
    async fn deliver(&self, to: &str, body: &str) -> Result<(), String> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid
        );
        let response = self
            .client
            .post(url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("To", to),
                ("From", self.config.from_number.as_str()),
                ("Body", body),
            ])
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|err| format!("Sending SMS: {err:?}"))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(format!("SMS provider rejected message: {status}"))
        }
    }
}

/// Joins the non-empty parts of an address into one line.
pub fn format_address(address: &Address) -> String {
    let region_line = [address.region.as_deref(), address.postal_code.as_deref()]
        .into_iter()
        .flatten()
        .join(" ");
    let line = [
        Some(address.street.as_str()),
        address.street_2.as_deref(),
        Some(address.city.as_str()),
        Some(region_line.as_str()),
        address.country.as_deref(),
    ]
    .into_iter()
    .flatten()
    .filter(|part| !part.is_empty())
    .join(", ");
    line
}

/// Everything a confirmation shows, already formatted.
#[derive(Clone, Debug)]
pub struct Confirmation {
    pub number: i32,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub pickup_date_long: String,
    pub pickup_date_numeric: String,
    pub pickup_time: String,
    pub passenger_name: String,
    pub passenger_phone: String,
    pub passenger_email: String,
    pub vehicle_class: String,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub notes: String,
}

impl Confirmation {
    pub fn new(reservation: &Reservation, owner: &Account) -> Self {
        let details = &reservation.details;
        Self {
            number: reservation.id,
            first_name: owner.profile.first_name.clone(),
            last_name: owner.profile.last_name.clone(),
            phone: owner.profile.phone.clone(),
            pickup_date_long: details.pickup_date.strftime("%A, %B %d, %Y").to_string(),
            pickup_date_numeric: details.pickup_date.strftime("%m/%d/%Y").to_string(),
            pickup_time: details.pickup_time.strftime("%I:%M %p").to_string(),
            passenger_name: details.passenger_name.clone(),
            passenger_phone: details.passenger_phone.clone(),
            passenger_email: details.passenger_email.clone().unwrap_or_default(),
            vehicle_class: details.vehicle_class.to_string(),
            pickup_address: format_address(&details.pickup),
            dropoff_address: format_address(&details.dropoff),
            notes: details.notes.clone().unwrap_or_default(),
        }
    }
}

#[derive(Template)]
#[template(path = "email/confirmation.html")]
struct ConfirmationHtmlTemplate<'a> {
    confirmation: &'a Confirmation,
}

#[derive(Template)]
#[template(path = "email/confirmation.txt")]
struct ConfirmationTextTemplate<'a> {
    confirmation: &'a Confirmation,
}

#[derive(Template)]
#[template(path = "sms/booking_notice.txt")]
struct BookingNoticeTemplate<'a> {
    confirmation: &'a Confirmation,
}

pub struct Dispatcher {
    mail: Arc<dyn MailChannel>,
    sms: Option<Arc<dyn SmsChannel>>,
}

impl Dispatcher {
    pub fn new(mail: Arc<dyn MailChannel>, sms: Option<Arc<dyn SmsChannel>>) -> Self {
        Self { mail, sms }
    }

    pub fn from_config(mail: MailConfig, sms: Option<SmsConfig>) -> Self {
        let sms = sms
            .filter(|sms| sms.enabled)
            .map(|sms| Arc::new(TwilioChannel::new(sms)) as Arc<dyn SmsChannel>);
        Self::new(Arc::new(SmtpChannel::new(mail)), sms)
    }

    /// One message, no retry.
    #[tracing::instrument(skip(self, reservation, owner), fields(reservation = reservation.id))]
    pub async fn send_confirmation(
        &self,
        reservation: &Reservation,
        owner: &Account,
        recipient_email: &str,
    ) -> Result<(), Error> {
        let confirmation = Confirmation::new(reservation, owner);
        let email = OutboundEmail {
            to: recipient_email.to_owned(),
            subject: format!("Booking confirmation {}", reservation.id),
            html: ConfirmationHtmlTemplate {
                confirmation: &confirmation,
            }
            .render()?,
            text: ConfirmationTextTemplate {
                confirmation: &confirmation,
            }
            .render()?,
        };
        self.mail.deliver(email).await.map_err(Error::Delivery)?;
        tracing::info!("sent booking confirmation");
        Ok(())
    }

    /// `false` when no SMS provider is configured.
    #[tracing::instrument(skip(self, reservation, owner), fields(reservation = reservation.id))]
    pub async fn send_booking_notice(
        &self,
        reservation: &Reservation,
        owner: &Account,
    ) -> Result<bool, Error> {
        let Some(sms) = &self.sms else {
            return Ok(false);
        };
        let confirmation = Confirmation::new(reservation, owner);
        let body = BookingNoticeTemplate {
            confirmation: &confirmation,
        }
        .render()?;
        sms.deliver(&reservation.details.passenger_phone, body.trim())
            .await
            .map_err(Error::Delivery)?;
        tracing::info!("sent booking notice");
        Ok(true)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{identity::tests::account, ledger::tests::filled_form};
    use ride_db::AccountRole;
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct RecordingMail {
        pub(crate) sent: Mutex<Vec<OutboundEmail>>,
    }

    #[async_trait]
    impl MailChannel for RecordingMail {
        async fn deliver(&self, email: OutboundEmail) -> Result<(), String> {
            self.sent
                .lock()
                .expect("lock should not be poisoned")
                .push(email);
            Ok(())
        }
    }

    pub(crate) struct FailingMail;

    #[async_trait]
    impl MailChannel for FailingMail {
        async fn deliver(&self, _email: OutboundEmail) -> Result<(), String> {
            Err("Connecting to SMTP Server: connection refused".to_owned())
        }
    }

    #[derive(Default)]
    struct RecordingSms {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl SmsChannel for RecordingSms {
        async fn deliver(&self, to: &str, body: &str) -> Result<(), String> {
            self.sent
                .lock()
                .expect("lock should not be poisoned")
                .push((to.to_owned(), body.to_owned()));
            Ok(())
        }
    }

    struct FailingSms;

    #[async_trait]
    impl SmsChannel for FailingSms {
        async fn deliver(&self, _to: &str, _body: &str) -> Result<(), String> {
            Err("SMS provider rejected message: 401 Unauthorized".to_owned())
        }
    }

    fn reservation() -> Reservation {
        let mut form = filled_form();
        form.notes = "Meet at door 3".to_owned();
        let now = jiff::Timestamp::now();
        Reservation {
            id: 10001,
            account_id: 1,
            details: form.validate().expect("should validate"),
            created: now,
            updated: now,
        }
    }

    #[test]
    fn confirmation_formats_dates_times_and_addresses() {
        let confirmation = Confirmation::new(&reservation(), &account(1, AccountRole::Standard));
        assert_eq!(confirmation.pickup_date_long, "Wednesday, October 14, 2026");
        assert_eq!(confirmation.pickup_date_numeric, "10/14/2026");
        assert_eq!(confirmation.pickup_time, "02:30 PM");
        assert_eq!(confirmation.vehicle_class, "SUV");
        assert_eq!(confirmation.pickup_address, "1 Main St, Chicago, IL 60601");
        assert_eq!(confirmation.dropoff_address, "O'Hare Terminal 1, Chicago, IL");
    }

    #[test]
    fn address_line_skips_absent_parts() {
        let address = Address {
            street: "1 Main St".to_owned(),
            street_2: Some("Suite 4".to_owned()),
            city: "Chicago".to_owned(),
            region: None,
            postal_code: Some("60601".to_owned()),
            country: Some("US".to_owned()),
        };
        assert_eq!(format_address(&address), "1 Main St, Suite 4, Chicago, 60601, US");

        let bare = Address {
            street_2: None,
            postal_code: None,
            country: None,
            ..address
        };
        assert_eq!(format_address(&bare), "1 Main St, Chicago");
    }

    #[tokio::test]
    async fn confirmation_email_carries_the_booking() {
        let mail = Arc::new(RecordingMail::default());
        let dispatcher = Dispatcher::new(mail.clone(), None);
        dispatcher
            .send_confirmation(
                &reservation(),
                &account(1, AccountRole::Standard),
                "alice@x.com",
            )
            .await
            .expect("should send");
        let sent = mail.sent.lock().expect("lock").clone();
        assert_eq!(sent.len(), 1);
        let email = &sent[0];
        assert_eq!(email.to, "alice@x.com");
        assert_eq!(email.subject, "Booking confirmation 10001");
        for text in [&email.html, &email.text] {
            assert!(text.contains("10001"));
            assert!(text.contains("Wednesday, October 14, 2026"));
            assert!(text.contains("02:30 PM"));
            assert!(text.contains("SUV"));
            assert!(text.contains("1 Main St"));
            assert!(text.contains("Meet at door 3"));
        }
        assert!(email.html.contains("O&#x27;Hare") || email.html.contains("O&#39;Hare"));
        assert!(email.text.contains("O'Hare Terminal 1"));
    }

    #[tokio::test]
    async fn failed_delivery_is_reported() {
        let dispatcher = Dispatcher::new(Arc::new(FailingMail), None);
        let err = dispatcher
            .send_confirmation(
                &reservation(),
                &account(1, AccountRole::Standard),
                "alice@x.com",
            )
            .await
            .expect_err("should fail");
        assert!(matches!(err, Error::Delivery(_)));
    }

    #[tokio::test]
    async fn booking_notice_goes_to_the_passenger_phone_when_enabled() {
        let owner = account(1, AccountRole::Standard);
        let disabled = Dispatcher::new(Arc::new(RecordingMail::default()), None);
        assert!(!disabled
            .send_booking_notice(&reservation(), &owner)
            .await
            .expect("disabled is not an error"));

        let sms = Arc::new(RecordingSms::default());
        let enabled = Dispatcher::new(Arc::new(RecordingMail::default()), Some(sms.clone()));
        assert!(enabled
            .send_booking_notice(&reservation(), &owner)
            .await
            .expect("should send"));
        let sent = sms.sent.lock().expect("lock").clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "5551234567");
        assert!(sent[0].1.contains("10001"));
        assert!(sent[0].1.contains("10/14/2026"));

        let failing = Dispatcher::new(Arc::new(RecordingMail::default()), Some(Arc::new(FailingSms)));
        assert!(matches!(
            failing.send_booking_notice(&reservation(), &owner).await,
            Err(Error::Delivery(_))
        ));
    }
}
