pub mod auth;
pub mod drive;
pub mod error;
pub mod sheets;
pub mod tts;

pub use auth::{ServiceAccountAuth, ServiceAccountKey};
pub use drive::{Drive, DriveFile};
pub use error::{GoogleError, Result};
pub use sheets::{a1, Sheets};
pub use tts::{AudioEncoding, TextToSpeech, VoiceSelection};

/// OAuth scopes used across the clients in this crate.
pub mod scopes {
    pub const CLOUD_PLATFORM: &str = "https://www.googleapis.com/auth/cloud-platform";
    pub const DRIVE_FILE: &str = "https://www.googleapis.com/auth/drive.file";
    pub const SPREADSHEETS: &str = "https://www.googleapis.com/auth/spreadsheets";
}
