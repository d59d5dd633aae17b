//! Outbound notifications over email and SMS

mod email;
mod notifier;
mod sms;
mod templates;

pub use email::EmailSender;
pub use notifier::{Notification, Notifier};
pub use sms::SmsSender;
