use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0} is not set. Please provide it or set it as an environment variable.")]
    MissingCredential(&'static str),

    #[error("Invalid pipeline type: '{0}'. Must be 'top_rated' or 'popular'.")]
    InvalidKind(String),

    #[error("Invalid page count: {0}. Must be at least 1.")]
    InvalidPages(u32),

    #[error("Could not read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Could not parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Could not decode response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },
}

impl Error {
    /// Configuration errors abort a run. Everything else is absorbed per page.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::MissingCredential(_)
                | Error::InvalidKind(_)
                | Error::InvalidPages(_)
                | Error::Io { .. }
                | Error::Toml(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
