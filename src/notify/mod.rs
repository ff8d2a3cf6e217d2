// src/notify/mod.rs
//! Daily digest: formatting, SMTP delivery and the scheduling task.

pub mod digest;
pub mod email;
pub mod scheduler;

pub use digest::{format_digest, DIGEST_TITLE};
pub use email::{DigestDispatcher, DispatchOutcome, MailTransport, SmtpMailer};
pub use scheduler::{next_run_after, spawn_digest_scheduler};
