//! Gmail delivery for the forecast email.
//!
//! Renders the forecast into an inline-image HTML message and sends it
//! through the Gmail API.

pub mod client;
pub mod compose;
pub mod error;
pub mod sender;
pub mod types;

pub use client::GmailClient;
pub use compose::{ComposeError, ComposedMessage, EmailComposer};
pub use error::GmailError;
pub use sender::EmailSender;
pub use types::{SendEnvelope, SentMessage};
