//! Sender records.
//!
//! Senders are managed elsewhere; this module reads their encrypted
//! credentials and maintains the lifetime `sent_count`.

mod model;
mod repository;

pub use model::{NewSender, Sender, SenderId};
pub use repository::SenderRepository;
