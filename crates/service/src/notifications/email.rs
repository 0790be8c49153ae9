//! Notifier that emails the buyer.
//!
//! Uses SMTP via lettre with an Askama plain-text template.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use tracing::info;

use ordering_core::OrderId;
use ordering_core::notification::StatusChangeEvent;

use super::{NotificationError, Notifier};
use crate::config::EmailConfig;

/// Plain text body for a status change email.
#[derive(Template)]
#[template(path = "email/status_change.txt")]
struct StatusChangeEmailText<'a> {
    order_id: OrderId,
    previous_status: &'a str,
    new_status: &'a str,
    placed: bool,
}

impl<'a> StatusChangeEmailText<'a> {
    fn for_event(event: &'a StatusChangeEvent) -> Self {
        Self {
            order_id: event.order_id,
            previous_status: event.previous_status.as_str(),
            new_status: event.new_status.as_str(),
            placed: event.is_placement(),
        }
    }
}

/// Sends status change emails over SMTP.
#[derive(Clone)]
pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailNotifier {
    /// Create a notifier from SMTP configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    fn build_message(&self, event: &StatusChangeEvent) -> Result<Message, NotificationError> {
        let body = StatusChangeEmailText::for_event(event).render()?;

        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| NotificationError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(event
                .buyer_email
                .parse()
                .map_err(|_| NotificationError::InvalidAddress(event.buyer_email.clone()))?)
            .subject(event.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(body)?;

        Ok(message)
    }
}

impl Notifier for EmailNotifier {
    async fn deliver(&self, event: &StatusChangeEvent) -> Result<(), NotificationError> {
        let message = self.build_message(event)?;
        self.mailer.send(message).await?;

        info!(
            order_id = %event.order_id,
            to = %event.buyer_email,
            new_status = %event.new_status,
            "Status email sent"
        );
        Ok(())
    }
}
