pub mod discord;
pub mod telegram;

pub use telegram::TelegramNotifier;
