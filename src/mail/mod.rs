pub mod compose;
pub mod smtp;

use std::time::Duration;

use thiserror::Error;

pub use compose::{compose, ArbitrationForm, Attachment, OutboundMessage};
pub use smtp::Mailer;

/// Everything that can go wrong between a composed message and the SMTP server.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("SMTP credentials are not set")]
    MissingCredentials,
    #[error("invalid {role} address: {address:?}")]
    InvalidAddress {
        role: &'static str,
        address: String,
    },
    #[error("could not build email: {0}")]
    Build(String),
    #[error("SMTP send failed: {0}")]
    Transport(String),
    #[error("SMTP send failed: timed out after {0:?}")]
    Timeout(Duration),
}
