use std::sync::Arc;

use minijinja::context;

use super::email::{Email, EmailSender};
use super::sms::SmsSender;
use super::templates;

/// Messages the application sends to users outside the HTTP response
#[derive(Debug, Clone)]
pub enum Notification {
    AccountVerification {
        email: String,
        mobile: String,
        name: String,
        code: String,
        expires_in_minutes: i64,
    },
    PasswordReset {
        email: String,
        name: String,
        reset_url: String,
        expires_in_minutes: i64,
    },
    ReportStatusChanged {
        email: String,
        name: String,
        report_title: String,
        old_status: String,
        new_status: String,
        notes: Option<String>,
    },
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::AccountVerification { .. } => "account_verification",
            Notification::PasswordReset { .. } => "password_reset",
            Notification::ReportStatusChanged { .. } => "report_status_changed",
        }
    }

    /// Email rendering of the notification
    pub fn to_email(&self) -> Result<Email, templates::TemplateError> {
        match self {
            Notification::AccountVerification {
                email,
                name,
                code,
                expires_in_minutes,
                ..
            } => {
                let title = "Verify Your Email Address";
                let html = templates::render(
                    "verification.html.jinja",
                    context! { title, name, code, expires_in_minutes },
                )?;
                Ok(Email {
                    to: email.clone(),
                    subject: title.to_string(),
                    text: format!(
                        "Hello {},\n\nYour Bien Unido verification code is {}. It expires in {} minutes.",
                        name, code, expires_in_minutes
                    ),
                    html,
                })
            }
            Notification::PasswordReset {
                email,
                name,
                reset_url,
                expires_in_minutes,
            } => {
                let title = "Reset Your Password";
                let html = templates::render(
                    "password_reset.html.jinja",
                    context! { title, name, reset_url, expires_in_minutes },
                )?;
                Ok(Email {
                    to: email.clone(),
                    subject: title.to_string(),
                    text: format!(
                        "Hello {},\n\nReset your password here: {}\nThis link expires in {} minutes.",
                        name, reset_url, expires_in_minutes
                    ),
                    html,
                })
            }
            Notification::ReportStatusChanged {
                email,
                name,
                report_title,
                old_status,
                new_status,
                notes,
            } => {
                let title = "Report Status Update";
                let html = templates::render(
                    "report_status.html.jinja",
                    context! { title, name, report_title, old_status, new_status, notes },
                )?;
                let mut text = format!(
                    "Hello {},\n\nYour report \"{}\" changed from {} to {}.",
                    name, report_title, old_status, new_status
                );
                if let Some(notes) = notes {
                    text.push_str("\n\n");
                    text.push_str(notes);
                }
                Ok(Email {
                    to: email.clone(),
                    subject: format!("{}: {}", title, report_title),
                    text,
                    html,
                })
            }
        }
    }

    /// Mobile number and body when the notification also goes out by SMS
    pub fn to_sms(&self) -> Option<(String, String)> {
        match self {
            Notification::AccountVerification {
                mobile,
                code,
                expires_in_minutes,
                ..
            } => Some((
                mobile.clone(),
                format!(
                    "Your Bien Unido verification code is {}. It expires in {} minutes.",
                    code, expires_in_minutes
                ),
            )),
            _ => None,
        }
    }
}

/// Fire-and-forget delivery over email and SMS.
///
/// Nothing is returned to the caller; delivery failures are logged.
pub struct Notifier {
    email: Arc<EmailSender>,
    sms: Arc<SmsSender>,
}

impl Notifier {
    pub fn new(email: EmailSender, sms: SmsSender) -> Self {
        Self {
            email: Arc::new(email),
            sms: Arc::new(sms),
        }
    }

    /// Notifier whose channels only log
    #[cfg(test)]
    pub fn disabled() -> Self {
        use crate::core::config::SmsConfig;

        let from = "Bien Unido <noreply@bienunido.test>"
            .parse()
            .expect("static mailbox parses");
        Self::new(
            EmailSender::mock(from),
            SmsSender::new(&SmsConfig {
                account_sid: None,
                auth_token: None,
                from_number: None,
                api_base_url: "http://127.0.0.1:1".to_string(),
                mock: true,
            }),
        )
    }

    pub fn dispatch(&self, notification: Notification) {
        let email = Arc::clone(&self.email);
        let sms = Arc::clone(&self.sms);

        tokio::spawn(async move {
            deliver(&email, &sms, notification).await;
        });
    }
}

async fn deliver(email: &EmailSender, sms: &SmsSender, notification: Notification) {
    let kind = notification.kind();

    match notification.to_email() {
        Ok(message) => {
            if let Err(e) = email.send(&message).await {
                tracing::warn!("Failed to send {} email to {}: {}", kind, message.to, e);
            }
        }
        Err(e) => tracing::warn!("Failed to render {} email: {}", kind, e),
    }

    if let Some((to, body)) = notification.to_sms() {
        if let Err(e) = sms.send(&to, &body).await {
            tracing::warn!("Failed to send {} SMS to {}: {}", kind, to, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verification() -> Notification {
        Notification::AccountVerification {
            email: "maria@example.com".to_string(),
            mobile: "09171234567".to_string(),
            name: "Maria".to_string(),
            code: "123456".to_string(),
            expires_in_minutes: 15,
        }
    }

    #[test]
    fn test_verification_goes_out_by_email_and_sms() {
        let n = verification();
        let email = n.to_email().unwrap();
        assert_eq!(email.to, "maria@example.com");
        assert!(email.html.contains("123456"));

        let (to, body) = n.to_sms().unwrap();
        assert_eq!(to, "09171234567");
        assert!(body.contains("123456"));
    }

    #[test]
    fn test_report_status_is_email_only() {
        let n = Notification::ReportStatusChanged {
            email: "jose@example.com".to_string(),
            name: "Jose".to_string(),
            report_title: "Broken streetlight".to_string(),
            old_status: "pending".to_string(),
            new_status: "in_progress".to_string(),
            notes: Some("Crew dispatched".to_string()),
        };
        let email = n.to_email().unwrap();
        assert!(email.subject.contains("Broken streetlight"));
        assert!(email.text.contains("Crew dispatched"));
        assert!(n.to_sms().is_none());
    }

    #[tokio::test]
    async fn test_deliver_with_mock_channels_does_not_panic() {
        let notifier = Notifier::disabled();
        deliver(&notifier.email, &notifier.sms, verification()).await;
        notifier.dispatch(verification());
    }
}
