//! Outbound mail for slackntell.
//!
//! [`Mailer`] is the transport boundary the relay hands finished digests to;
//! [`SmtpMailer`] delivers them through an SMTPS relay with `lettre`.

pub mod error;
pub mod mailer;

pub use {
    error::{Error, Result},
    mailer::{Mailer, OutgoingMail, SmtpMailer},
};
