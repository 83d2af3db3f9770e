pub mod capture;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod feedback;
pub mod nlu;
pub mod pipeline;
pub mod secrets;
pub mod session;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum MutterError {
    #[error("Speech capture error: {0}")]
    CaptureError(String),

    #[error("Intent resolution error: {0}")]
    ResolveError(String),

    #[error("Directory error: {0}")]
    DirectoryError(String),

    #[error("Platform error: {0}")]
    PlatformError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for MutterError {
    fn from(e: std::io::Error) -> Self {
        MutterError::IOError(e.to_string())
    }
}

impl MutterError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Capture errors are typically transient (mic busy, timeout)
            MutterError::CaptureError(_) => true,
            // The next utterance may resolve fine
            MutterError::ResolveError(_) => true,
            // Directory snapshots may load on a later attempt
            MutterError::DirectoryError(_) => true,
            // Platform call failures are typically transient
            MutterError::PlatformError(_) => true,
            // Channel errors indicate internal issues
            MutterError::ChannelError(_) => false,
            // Config errors require user intervention
            MutterError::ConfigError(_) => false,
            MutterError::IOError(_) => false,
        }
    }

    /// Get a user-friendly description suitable for the overlay
    pub fn user_message(&self) -> String {
        match self {
            MutterError::CaptureError(_) => {
                "Speech recognition failed. Please try again.".to_string()
            }
            MutterError::ResolveError(_) => {
                "Couldn't understand that command. Please try again.".to_string()
            }
            MutterError::DirectoryError(_) => {
                "Couldn't read the app or contact list.".to_string()
            }
            MutterError::PlatformError(_) => {
                "Couldn't complete that action. Please try again.".to_string()
            }
            MutterError::ChannelError(_) => {
                "Internal communication error. Please restart the launcher.".to_string()
            }
            MutterError::ConfigError(_) => {
                "Configuration error. Please check settings.".to_string()
            }
            MutterError::IOError(_) => "File system error occurred.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MutterError>;
