pub mod client;
pub mod commands;
pub mod markdown;
pub mod types;

pub use client::{TelegramClient, TelegramError};
pub use commands::{parse_command, Command, CommandError};
pub use markdown::escape_markdown_v2;
pub use types::{Chat, Message, Update};
