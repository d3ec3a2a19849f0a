pub mod schema;

pub use schema::{Config, ForwardedPolicy, RetentionConfig, TelegramConfig};
