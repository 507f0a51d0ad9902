pub mod api;
pub mod message;
pub mod reporter;

pub use message::{escape, render};
pub use reporter::{TelegramConfig, TelegramReporter};
