mod channels;
mod core;
mod retention;

pub use channels::TelegramConfig;
pub use core::Config;
pub use retention::{ForwardedPolicy, RetentionConfig};
