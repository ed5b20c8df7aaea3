//! Core SMTP types.

mod extension;
mod reply;

pub use extension::{AuthMechanism, Capabilities};
pub use reply::{Reply, ReplyCode};
