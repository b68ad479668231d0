//! Outbound messages and their delivery history.
//!
//! Emails and follow-ups live in parallel tables with parallel event logs; a
//! [`MessageKind`] selects the pair.

mod model;
mod repository;

pub use model::{
    DeliveryEvent, DeliveryEventType, DeliveryUpdate, NewDeliveryEvent, NewOutboundMessage,
    OutboundId, OutboundMessage,
};
pub use outreach_esp::MessageKind;
pub use repository::MessageRepository;
