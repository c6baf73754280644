//! Contact form emails.
//!
//! Uses SMTP via lettre for delivery with Askama templates. Sends are
//! fire-and-forget: a failed send is logged and never affects the stored
//! contact message.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use omoide_core::{ContactId, Email};

use crate::config::EmailConfig;
use crate::models::NewContact;

/// Auto-reply to the customer.
#[derive(Template)]
#[template(path = "email/contact_confirmation.html")]
struct ContactConfirmationHtml<'a> {
    name: &'a str,
    subject: &'a str,
    message: &'a str,
    site_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/contact_confirmation.txt")]
struct ContactConfirmationText<'a> {
    name: &'a str,
    subject: &'a str,
    message: &'a str,
    site_url: &'a str,
}

/// Notification to the shop owner.
#[derive(Template)]
#[template(path = "email/contact_notification.html")]
struct ContactNotificationHtml<'a> {
    contact_id: ContactId,
    name: &'a str,
    email: &'a str,
    subject: &'a str,
    message: &'a str,
    admin_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/contact_notification.txt")]
struct ContactNotificationText<'a> {
    contact_id: ContactId,
    name: &'a str,
    email: &'a str,
    subject: &'a str,
    message: &'a str,
    admin_url: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// A rendered message ready to send.
struct Rendered {
    to: Email,
    subject: String,
    text: String,
    html: String,
}

/// Email service for contact form mail.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: Email,
    admin_address: Email,
    admin_url: String,
    site_url: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig, site_url: &str) -> Result<Self, SmtpError> {
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
            admin_address: config.admin_address.clone(),
            admin_url: config.admin_url.trim_end_matches('/').to_string(),
            site_url: site_url.trim_end_matches('/').to_string(),
        })
    }

    /// Send the customer auto-reply and the admin notification in the
    /// background. Returns immediately; failures are only logged.
    pub fn notify_contact_received(&self, contact_id: ContactId, contact: &NewContact) {
        let messages = [
            self.render_confirmation(contact),
            self.render_notification(contact_id, contact),
        ];

        for message in messages {
            let service = self.clone();
            tokio::spawn(async move {
                let result = match message {
                    Ok(rendered) => service.send(rendered).await,
                    Err(e) => Err(e),
                };
                if let Err(e) = result {
                    tracing::error!(error = %e, contact_id = %contact_id, "Contact email failed");
                }
            });
        }
    }

    fn render_confirmation(&self, contact: &NewContact) -> Result<Rendered, EmailError> {
        let html = ContactConfirmationHtml {
            name: &contact.name,
            subject: &contact.subject,
            message: &contact.message,
            site_url: &self.site_url,
        }
        .render()?;
        let text = ContactConfirmationText {
            name: &contact.name,
            subject: &contact.subject,
            message: &contact.message,
            site_url: &self.site_url,
        }
        .render()?;

        Ok(Rendered {
            to: contact.email.clone(),
            subject: "【思い出売場】お問い合わせを受け付けました".to_string(),
            text,
            html,
        })
    }

    fn render_notification(
        &self,
        contact_id: ContactId,
        contact: &NewContact,
    ) -> Result<Rendered, EmailError> {
        let html = ContactNotificationHtml {
            contact_id,
            name: &contact.name,
            email: contact.email.as_str(),
            subject: &contact.subject,
            message: &contact.message,
            admin_url: &self.admin_url,
        }
        .render()?;
        let text = ContactNotificationText {
            contact_id,
            name: &contact.name,
            email: contact.email.as_str(),
            subject: &contact.subject,
            message: &contact.message,
            admin_url: &self.admin_url,
        }
        .render()?;

        Ok(Rendered {
            to: self.admin_address.clone(),
            subject: format!("【思い出売場】新規お問い合わせ: {}", contact.subject),
            text,
            html,
        })
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send(&self, message: Rendered) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(mailbox(&self.from_address)?)
            .to(mailbox(&message.to)?)
            .subject(&message.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(message.text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(message.html),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %message.to, subject = %message.subject, "Email sent successfully");
        Ok(())
    }
}

fn mailbox(address: &Email) -> Result<Mailbox, EmailError> {
    address
        .as_str()
        .parse()
        .map_err(|_| EmailError::InvalidAddress(address.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn service() -> EmailService {
        let config = EmailConfig {
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 587,
            smtp_username: "mailer".to_string(),
            smtp_password: SecretString::from("hunter2".to_string()),
            from_address: Email::parse("noreply@omoideuriba.com").unwrap(),
            admin_address: Email::parse("admin@omoideuriba.com").unwrap(),
            admin_url: "https://admin.omoideuriba.com/".to_string(),
        };
        EmailService::new(&config, "https://omoideuriba.com").unwrap()
    }

    fn contact() -> NewContact {
        NewContact {
            name: "山田 <太郎>".to_string(),
            email: Email::parse("taro@example.com").unwrap(),
            subject: "再入荷について".to_string(),
            message: "ゲームボーイの再入荷予定を教えてください。".to_string(),
        }
    }

    #[tokio::test]
    async fn test_confirmation_goes_to_customer() {
        let rendered = service().render_confirmation(&contact()).unwrap();
        assert_eq!(rendered.to.as_str(), "taro@example.com");
        assert_eq!(rendered.subject, "【思い出売場】お問い合わせを受け付けました");
        assert!(rendered.text.contains("山田 <太郎> 様"));
        assert!(!rendered.html.contains("<太郎>"));
        assert!(rendered.text.contains("https://omoideuriba.com"));
    }

    #[tokio::test]
    async fn test_notification_links_to_admin() {
        let rendered = service()
            .render_notification(ContactId::new(42), &contact())
            .unwrap();
        assert_eq!(rendered.to.as_str(), "admin@omoideuriba.com");
        assert_eq!(rendered.subject, "【思い出売場】新規お問い合わせ: 再入荷について");
        assert!(
            rendered
                .text
                .contains("https://admin.omoideuriba.com/contacts/42")
        );
    }

    #[test]
    fn test_mailbox_parses_email() {
        let mb = mailbox(&Email::parse("shop@omoideuriba.com").unwrap()).unwrap();
        assert_eq!(mb.email.to_string(), "shop@omoideuriba.com");
    }
}
