//! Core SMTP types.

mod envelope;
mod extension;
mod reply;

pub use envelope::Envelope;
pub use extension::{Capabilities, Extension};
pub use reply::{Reply, ReplyClass, ReplyCode, ReplyLine};
