use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Browser error: {0}")]
    BrowserError(#[from] chromiumoxide::error::CdpError),

    #[error("Failed to launch browser: {0}")]
    LaunchError(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid cookie: {0}")]
    InvalidCookie(String),

    #[error("Navigation to {url} timed out after {}s", after.as_secs_f64())]
    Timeout { url: String, after: Duration },

    #[error("Navigation to {url} failed: {reason}")]
    NavigationFailed { url: String, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        match self {
            FetchError::Timeout { .. } => true,
            FetchError::HttpError(e) => e.is_timeout(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
