pub mod messaging;
pub mod telegram;

pub use messaging::{ChatRole, DeleteOutcome, InboundEvent, InboundKind, MessagingGateway};
pub use telegram::TelegramGateway;
